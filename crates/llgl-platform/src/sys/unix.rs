//! `dlopen`-based loader (Linux, Android, macOS, iOS, Emscripten).

use std::path::Path;

use libloading::os::unix::{Library as RawLibrary, RTLD_LAZY, RTLD_LOCAL};

use crate::ModuleError;

pub(crate) struct Library(RawLibrary);

impl Library {
    pub(crate) fn open(filename: &Path) -> Result<Self, ModuleError> {
        // SAFETY: backend modules run no initialisers with preconditions.
        unsafe { RawLibrary::open(Some(filename), RTLD_LAZY | RTLD_LOCAL) }
            .map(Self)
            .map_err(|err| ModuleError::Load {
                filename: filename.to_path_buf(),
                reason: err.to_string(),
            })
    }

    /// # Safety
    ///
    /// `T` must match the type of the exported symbol.
    pub(crate) unsafe fn get<T: Copy>(&self, symbol: &str) -> Option<T> {
        unsafe { self.0.get::<T>(symbol.as_bytes()) }.ok().map(|sym| *sym)
    }

    pub(crate) fn close(self, filename: &Path) -> Result<(), ModuleError> {
        self.0.close().map_err(|err| ModuleError::Unload {
            filename: filename.to_path_buf(),
            reason: err.to_string(),
        })
    }
}
