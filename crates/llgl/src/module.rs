//! [`RenderSystemModule`]: a backend library bound to its five entry points.

use std::ffi::c_int;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use llgl_core::ffi::{self, EntryPoints, RenderSystemHeader};
use llgl_core::{RenderSystemDescriptor, RendererId};
use llgl_platform::{module_filename, Module};
use tracing::{debug, error};

use crate::error::RenderSystemError;
use crate::render_system::RenderSystemPtr;

// ---------------------------------------------------------------------------
// Backend enumeration
// ---------------------------------------------------------------------------

/// Backends this platform may ship, most preferred first.
#[cfg(target_os = "windows")]
pub const KNOWN_MODULES: &[&str] = &["Direct3D12", "Direct3D11", "Vulkan", "OpenGL", "Null"];

#[cfg(target_os = "macos")]
pub const KNOWN_MODULES: &[&str] = &["Metal", "OpenGL", "Null"];

#[cfg(target_os = "ios")]
pub const KNOWN_MODULES: &[&str] = &["Metal", "OpenGLES3", "Null"];

#[cfg(target_os = "android")]
pub const KNOWN_MODULES: &[&str] = &["Vulkan", "OpenGLES3", "Null"];

#[cfg(target_family = "wasm")]
pub const KNOWN_MODULES: &[&str] = &["OpenGLES3", "Null"];

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "android",
    target_family = "wasm"
)))]
pub const KNOWN_MODULES: &[&str] = &["Vulkan", "OpenGL", "Null"];

/// Names of the known backends whose library can be loaded on this machine.
pub fn find_modules() -> Vec<String> {
    find_modules_with(|name| Module::is_available(module_filename(name)))
}

/// [`find_modules`] with a custom availability check.
pub fn find_modules_with(mut is_available: impl FnMut(&str) -> bool) -> Vec<String> {
    KNOWN_MODULES
        .iter()
        .filter(|name| is_available(name))
        .map(|name| name.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// RenderSystemModule
// ---------------------------------------------------------------------------

/// A loaded backend module.
///
/// One instance exists per backend name in a [`RenderSystemRegistry`]. The
/// use count tracks live renderers allocated from it and is only changed by
/// the registry, under its lock.
///
/// [`RenderSystemRegistry`]: crate::RenderSystemRegistry
pub struct RenderSystemModule {
    name: String,
    filename: Option<PathBuf>,
    entry_points: EntryPoints,
    use_count: AtomicUsize,
    library: Option<Module>,
}

impl std::fmt::Debug for RenderSystemModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSystemModule")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("use_count", &self.use_count())
            .finish_non_exhaustive()
    }
}

impl RenderSystemModule {
    /// Bind an already loaded library. Missing symbols leave their slot empty.
    pub fn new(name: impl Into<String>, library: Module) -> Self {
        // SAFETY: the symbol types are fixed by the backend ABI.
        let entry_points = unsafe {
            EntryPoints {
                build_id: library.load_function(ffi::SYMBOL_BUILD_ID),
                renderer_id: library.load_function(ffi::SYMBOL_RENDERER_ID),
                name: library.load_function(ffi::SYMBOL_NAME),
                alloc: library.load_function(ffi::SYMBOL_ALLOC),
                free: library.load_function(ffi::SYMBOL_FREE),
            }
        };
        Self {
            name: name.into(),
            filename: Some(library.filename().to_path_buf()),
            entry_points,
            use_count: AtomicUsize::new(0),
            library: Some(library),
        }
    }

    /// A backend linked into the host executable.
    pub fn from_static(name: impl Into<String>, entry_points: EntryPoints) -> Self {
        Self {
            name: name.into(),
            filename: None,
            entry_points,
            use_count: AtomicUsize::new(0),
            library: None,
        }
    }

    /// Resolve the filename for `name` and load it.
    pub fn load(name: &str) -> Result<Self, RenderSystemError> {
        let filename = module_filename(name);
        let library = Module::load(&filename).map_err(|error| RenderSystemError::ModuleLoad {
            name: name.to_string(),
            error,
        })?;
        debug!("loaded render system module \"{name}\" from {}", filename.display());
        Ok(Self::new(name, library))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the library was loaded from; `None` for static modules.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.library.is_none()
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    /// The module's build ID, or 0 when it does not export one.
    pub fn build_id(&self) -> c_int {
        // SAFETY: ABI-defined signature, no arguments.
        self.entry_points.build_id.map_or(0, |f| unsafe { f() })
    }

    pub fn renderer_id(&self) -> RendererId {
        // SAFETY: ABI-defined signature, no arguments.
        self.entry_points
            .renderer_id
            .map_or(RendererId::Undefined, |f| RendererId::from_raw(unsafe { f() }))
    }

    /// Display name reported by the module, or empty.
    pub fn renderer_name(&self) -> String {
        // SAFETY: the returned string is static data of the module.
        self.entry_points
            .name
            .map(|f| unsafe { ffi::string_from_ptr(f()) })
            .unwrap_or_default()
    }

    pub fn use_count(&self) -> usize {
        self.use_count.load(Ordering::Relaxed)
    }

    pub(crate) fn add_ref(&self) -> usize {
        self.use_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the use count, never below zero.
    pub(crate) fn release(&self) -> usize {
        let previous = self
            .use_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| Some(count.saturating_sub(1)))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    /// Allocate a renderer through the module's `Alloc` entry point.
    ///
    /// The returned pointer is freed through this module's `Free` and keeps
    /// the module loaded until then. An object whose report has errors, or
    /// whose header names a different renderer than the module's
    /// `RendererID` export, is freed right away.
    pub fn alloc_render_system(
        self: &Arc<Self>,
        desc: &RenderSystemDescriptor,
    ) -> Result<RenderSystemPtr, RenderSystemError> {
        let alloc = self.entry_points.alloc.ok_or_else(|| self.missing(ffi::SYMBOL_ALLOC))?;
        let free = self.entry_points.free.ok_or_else(|| self.missing(ffi::SYMBOL_FREE))?;

        let encoded = desc.encode();
        // SAFETY: `encoded` outlives the call and its size is passed alongside.
        let raw = unsafe { alloc(encoded.as_ptr(), encoded.byte_size()) };
        let Some(raw) = NonNull::new(raw) else {
            error!("render system module \"{}\" returned no render system", self.name);
            return Err(RenderSystemError::AllocFailed {
                name: self.name.clone(),
            });
        };

        let module = Arc::clone(self);
        let deleter = move |raw: NonNull<RenderSystemHeader>| {
            // SAFETY: called once, with the pointer this module's `Alloc` returned.
            unsafe { free(raw.as_ptr().cast()) };
            debug!("freed render system of module \"{}\"", module.name);
        };
        // SAFETY: the object stays live until the deleter runs.
        let ptr = unsafe { RenderSystemPtr::from_raw(raw.cast(), deleter) };

        let header_size = ptr.header_size();
        if header_size < RenderSystemHeader::SIZE {
            error!("render system module \"{}\" uses a {header_size} byte header", self.name);
            return Err(RenderSystemError::IncompatibleHeader {
                name: self.name.clone(),
                expected: RenderSystemHeader::SIZE,
                found: header_size,
            });
        }

        let report = ptr.report();
        if report.has_errors() {
            error!("render system module \"{}\" reported errors: {report}", self.name);
            return Err(RenderSystemError::ReportedErrors {
                name: self.name.clone(),
                report,
            });
        }

        let expected = self.renderer_id();
        let found = ptr.renderer_id();
        if expected != RendererId::Undefined && found != expected {
            error!(
                "render system module \"{}\" exports renderer {expected:?} but allocated {found:?}",
                self.name
            );
            return Err(RenderSystemError::RendererIdMismatch {
                name: self.name.clone(),
                expected,
                found,
            });
        }

        Ok(ptr)
    }

    fn missing(&self, symbol: &'static str) -> RenderSystemError {
        RenderSystemError::MissingEntryPoint {
            name: self.name.clone(),
            symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_keeps_priority_order() {
        let all = find_modules_with(|_| true);
        assert_eq!(all, KNOWN_MODULES.iter().map(|n| n.to_string()).collect::<Vec<_>>());
        assert_eq!(all.last().map(String::as_str), Some("Null"));
    }

    #[test]
    fn only_null_available() {
        assert_eq!(find_modules_with(|name| name == "Null"), vec!["Null".to_string()]);
        assert!(find_modules_with(|_| false).is_empty());
    }

    #[test]
    fn unknown_backend_is_never_enumerated() {
        let found = find_modules();
        assert!(!found.iter().any(|name| name == "Direct3D99"));
        assert!(found.iter().all(|name| KNOWN_MODULES.contains(&name.as_str())));
    }

    #[test]
    fn absent_entry_points_read_as_defaults() {
        let module = RenderSystemModule::from_static("Empty", EntryPoints::default());
        assert_eq!(module.build_id(), 0);
        assert_eq!(module.renderer_id(), RendererId::Undefined);
        assert_eq!(module.renderer_name(), "");
        assert!(module.is_static());
        assert!(module.filename().is_none());
    }

    #[test]
    fn missing_alloc_fails_without_crashing() {
        let module = Arc::new(RenderSystemModule::from_static("Empty", EntryPoints::default()));
        let err = module.alloc_render_system(&RenderSystemDescriptor::new("Empty")).unwrap_err();
        assert!(matches!(
            err,
            RenderSystemError::MissingEntryPoint { symbol: ffi::SYMBOL_ALLOC, .. }
        ));
    }

    #[test]
    fn use_count_never_goes_negative() {
        let module = RenderSystemModule::from_static("Empty", EntryPoints::default());
        assert_eq!(module.add_ref(), 1);
        assert_eq!(module.add_ref(), 2);
        assert_eq!(module.release(), 1);
        assert_eq!(module.release(), 0);
        assert_eq!(module.release(), 0);
        assert_eq!(module.use_count(), 0);
    }

    #[test]
    fn load_failure_mentions_filename() {
        let err = RenderSystemModule::load("Direct3D99").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Direct3D99"), "{message}");
        assert!(message.contains(&llgl_platform::library_name("Direct3D99")), "{message}");
        assert_eq!(err.module_name(), "Direct3D99");
    }
}
