//! Backend module filename conventions.
//!
//! These strings are a fixed contract with existing backend binaries:
//!
//! | OS                   | Filename                               |
//! |----------------------|----------------------------------------|
//! | Windows              | `LLGL_<name>[D].dll`                   |
//! | macOS, iOS           | `libLLGL_<name>[D].dylib`              |
//! | Android              | `libLLGL_<name>[D].so`                 |
//! | Linux, other Unix    | `<exe dir>/libLLGL_<name>[D].so`       |
//! | Emscripten, Wasm     | `<exe dir>/libLLGL_<name>[D].so`       |
//!
//! The `D` suffix is present when the `debug-suffix` feature is enabled.

use std::path::{Path, PathBuf};

/// Suffix appended to the backend name for debug module builds.
pub const DEBUG_SUFFIX: &str = if cfg!(feature = "debug-suffix") { "D" } else { "" };

#[cfg(target_os = "windows")]
const PREFIX: &str = "LLGL_";
#[cfg(not(target_os = "windows"))]
const PREFIX: &str = "libLLGL_";

#[cfg(target_os = "windows")]
const EXTENSION: &str = ".dll";
#[cfg(any(target_os = "macos", target_os = "ios"))]
const EXTENSION: &str = ".dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "ios")))]
const EXTENSION: &str = ".so";

/// Bare library filename for `name`, without any directory.
pub fn library_name(name: &str) -> String {
    format!("{PREFIX}{name}{DEBUG_SUFFIX}{EXTENSION}")
}

/// Filename handed to the OS loader for backend `name`.
#[cfg(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "android"
))]
pub fn module_filename(name: &str) -> PathBuf {
    PathBuf::from(library_name(name))
}

/// Filename handed to the OS loader for backend `name`.
///
/// Resolved next to the running executable so relocated application
/// bundles find their own backends. Falls back to the bare name (standard
/// search path) when the executable path is unknown.
#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "android"
)))]
pub fn module_filename(name: &str) -> PathBuf {
    match program_dir() {
        Some(dir) => dir.join(library_name(name)),
        None => PathBuf::from(library_name(name)),
    }
}

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "android"
)))]
fn program_dir() -> Option<&'static Path> {
    use std::sync::OnceLock;

    static PROGRAM_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();
    PROGRAM_DIR
        .get_or_init(|| {
            std::fs::read_link("/proc/self/exe")
                .or_else(|_| std::env::current_exe())
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        })
        .as_deref()
}
