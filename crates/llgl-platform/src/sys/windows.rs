//! `LoadLibraryExW`-based loader.
//!
//! `libloading` suppresses the critical-error dialog while loading, so a
//! missing dependency of a backend DLL fails quietly instead of blocking
//! enumeration.

use std::path::Path;

use libloading::os::windows::Library as RawLibrary;

use crate::ModuleError;

pub(crate) struct Library(RawLibrary);

impl Library {
    pub(crate) fn open(filename: &Path) -> Result<Self, ModuleError> {
        // SAFETY: backend modules run no DllMain work with preconditions.
        unsafe { RawLibrary::new(filename) }
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
