//! Portable wrapper around the OS dynamic library loader.
//!
//! [`Module`] owns one loaded backend library. On Unix-like targets it is
//! backed by `dlopen`, on Windows by `LoadLibraryExW`; targets without a
//! loader report every load as unsupported. [`module_filename`] maps a
//! logical backend name to the platform filename.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use thiserror::Error;
use tracing::{debug, trace};

pub mod filename;
pub use filename::{library_name, module_filename};

// Platform-specific implementations.

#[cfg(unix)]
#[path = "sys/unix.rs"]
mod sys;

#[cfg(windows)]
#[path = "sys/windows.rs"]
mod sys;

#[cfg(not(any(unix, windows)))]
#[path = "sys/unsupported.rs"]
mod sys;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("failed to load shared library (\"{}\"): {reason}", filename.display())]
    Load { filename: PathBuf, reason: String },
    #[error("failed to unload shared library (\"{}\"): {reason}", filename.display())]
    Unload { filename: PathBuf, reason: String },
    #[error("cannot load shared library (\"{}\"): dynamic libraries are not supported on this target", filename.display())]
    Unsupported { filename: PathBuf },
}

impl ModuleError {
    pub fn filename(&self) -> &Path {
        match self {
            Self::Load { filename, .. } | Self::Unload { filename, .. } | Self::Unsupported { filename } => {
                filename
            }
        }
    }
}

/// A loaded dynamic library. The OS handle is released on drop.
pub struct Module {
    library: sys::Library,
    filename: PathBuf,
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module").field("filename", &self.filename).finish_non_exhaustive()
    }
}

impl Module {
    /// Whether `filename` can be loaded right now. The library is closed
    /// again before returning.
    pub fn is_available(filename: impl AsRef<Path>) -> bool {
        let filename = filename.as_ref();
        let available = match sys::Library::open(filename) {
            Ok(library) => {
                if let Err(err) = library.close(filename) {
                    debug!("{err}");
                }
                true
            }
            Err(_) => false,
        };
        trace!("probed {}: {available}", filename.display());
        available
    }

    pub fn load(filename: impl AsRef<Path>) -> Result<Self, ModuleError> {
        let filename = filename.as_ref();
        let library = sys::Library::open(filename)?;
        debug!("loaded {}", filename.display());
        Ok(Self {
            library,
            filename: filename.to_path_buf(),
        })
    }

    /// Address of the exported symbol `name`, or `None` if it is absent.
    pub fn load_procedure(&self, name: &str) -> Option<NonNull<c_void>> {
        // SAFETY: reading a symbol's address as a data pointer is valid for
        // every symbol type.
        let address = unsafe { self.library.get::<*mut c_void>(name) }?;
        NonNull::new(address)
    }

    /// Typed variant of [`Module::load_procedure`].
    ///
    /// # Safety
    ///
    /// `F` must be the exact function pointer type of the exported symbol.
    pub unsafe fn load_function<F: Copy>(&self, name: &str) -> Option<F> {
        unsafe { self.library.get::<F>(name) }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Unload explicitly, surfacing the OS error that a plain drop would
    /// swallow.
    pub fn close(self) -> Result<(), ModuleError> {
        debug!("unloading {}", self.filename.display());
        self.library.close(&self.filename)
    }
}
