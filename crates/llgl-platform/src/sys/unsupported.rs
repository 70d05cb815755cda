//! Targets without a dynamic loader (e.g. `wasm32-unknown-unknown`).

use std::path::Path;

use crate::ModuleError;

pub(crate) struct Library(());

impl Library {
    pub(crate) fn open(filename: &Path) -> Result<Self, ModuleError> {
        Err(ModuleError::Unsupported {
            filename: filename.to_path_buf(),
        })
    }

    pub(crate) unsafe fn get<T: Copy>(&self, _symbol: &str) -> Option<T> {
        None
    }

    pub(crate) fn close(self, _filename: &Path) -> Result<(), ModuleError> {
        Ok(())
    }
}
