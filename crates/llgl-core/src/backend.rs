//! The [`RenderSystemBackend`] trait and the C-repr object a backend module
//! hands out from `LLGL_RenderSystem_Alloc`.
//!
//! Backend authors implement [`RenderSystemBackend`] on their renderer type
//! and invoke [`render_system_main!`](crate::render_system_main) once in the
//! crate root. The macro exports the five ABI symbols and routes `Alloc` /
//! `Free` through [`BackendObject`].

use std::ffi::{c_int, c_void, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error};

use crate::descriptor::RenderSystemDesc;
use crate::ffi::{string_from_ptr, RawRendererInfo, RenderSystemHeader, RendererId};
use crate::report::Report;

/// Details a renderer reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererInfo {
    pub renderer_name: String,
    pub device_name: String,
    pub vendor_name: String,
    pub shading_language_name: String,
}

impl RendererInfo {
    /// Copy the strings of a renderer header's info block.
    ///
    /// # Safety
    ///
    /// Every pointer in `raw` must be null or a valid NUL-terminated string.
    pub unsafe fn from_raw(raw: &RawRendererInfo) -> Self {
        unsafe {
            Self {
                renderer_name: string_from_ptr(raw.renderer_name),
                device_name: string_from_ptr(raw.device_name),
                vendor_name: string_from_ptr(raw.vendor_name),
                shading_language_name: string_from_ptr(raw.shading_language_name),
            }
        }
    }
}

/// Trait for the top-level renderer type of a backend module.
///
/// # Example
///
/// ```rust,ignore
/// struct MyRenderer;
///
/// impl RenderSystemBackend for MyRenderer {
///     const RENDERER_ID: RendererId = RendererId::Vulkan;
///     const NAME: &'static CStr = c"Vulkan";
///
///     fn new(desc: &RenderSystemDesc<'_>, report: &mut Report) -> anyhow::Result<Self> {
///         Ok(MyRenderer)
///     }
///
///     fn renderer_info(&self) -> RendererInfo {
///         RendererInfo::default()
///     }
/// }
///
/// llgl_core::render_system_main!(MyRenderer);
/// ```
pub trait RenderSystemBackend: Sized + 'static {
    const RENDERER_ID: RendererId;
    const NAME: &'static CStr;

    /// Create the renderer. Non-fatal notes may be appended to `report`; an
    /// error makes the allocation unusable for the host.
    fn new(desc: &RenderSystemDesc<'_>, report: &mut Report) -> anyhow::Result<Self>;

    fn renderer_info(&self) -> RendererInfo;
}

struct OwnedStrings {
    report: CString,
    renderer_name: CString,
    device_name: CString,
    vendor_name: CString,
    shading_language_name: CString,
}

fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', " ")).unwrap_or_default()
}

/// Heap object behind the pointer returned by `LLGL_RenderSystem_Alloc`.
///
/// The header comes first so the host can read it without knowing `T`.
/// Header strings point into the owned `CString`s, whose heap buffers do not move with
/// the object.
#[repr(C)]
pub struct BackendObject<T> {
    header: RenderSystemHeader,
    _strings: OwnedStrings,
    report: Report,
    backend: Option<T>,
}

impl<T: RenderSystemBackend> BackendObject<T> {
    fn create(descriptor: *const c_void, descriptor_size: c_int) -> Self {
        let mut report = Report::new();
        // SAFETY: a matching size means the host passed a `RawRenderSystemDescriptor`.
        let backend = match unsafe { RenderSystemDesc::from_raw(descriptor, descriptor_size) } {
            Ok(desc) => match T::new(&desc, &mut report) {
                Ok(backend) => Some(backend),
                Err(err) => {
                    report.error(format!("failed to create {} renderer: {err:#}", T::NAME.to_string_lossy()));
                    None
                }
            },
            Err(err) => {
                report.error(err.to_string());
                None
            }
        };
        let info = backend.as_ref().map(T::renderer_info).unwrap_or_default();
        Self::assemble(report, info, backend)
    }

    fn assemble(report: Report, info: RendererInfo, backend: Option<T>) -> Self {
        let strings = OwnedStrings {
            report: c_string(report.text()),
            renderer_name: c_string(&info.renderer_name),
            device_name: c_string(&info.device_name),
            vendor_name: c_string(&info.vendor_name),
            shading_language_name: c_string(&info.shading_language_name),
        };
        let header = RenderSystemHeader {
            header_size: RenderSystemHeader::SIZE,
            renderer_id: T::RENDERER_ID.as_raw(),
            has_errors: report.has_errors(),
            report_text: strings.report.as_ptr(),
            info: RawRendererInfo {
                renderer_name: strings.renderer_name.as_ptr(),
                device_name: strings.device_name.as_ptr(),
                vendor_name: strings.vendor_name.as_ptr(),
                shading_language_name: strings.shading_language_name.as_ptr(),
            },
        };
        Self {
            header,
            _strings: strings,
            report,
            backend,
        }
    }

    /// Body of `LLGL_RenderSystem_Alloc`. Never unwinds; a panic yields null.
    pub fn alloc(descriptor: *const c_void, descriptor_size: c_int) -> *mut c_void {
        crate::logging::init();

        match catch_unwind(AssertUnwindSafe(|| Self::create(descriptor, descriptor_size))) {
            Ok(object) => {
                if object.report.has_errors() {
                    debug!("{} renderer created with errors: {}", T::NAME.to_string_lossy(), object.report);
                }
                Box::into_raw(Box::new(object)).cast()
            }
            Err(_) => {
                error!("panic while allocating {} renderer", T::NAME.to_string_lossy());
                std::ptr::null_mut()
            }
        }
    }

    /// Body of `LLGL_RenderSystem_Free`.
    ///
    /// # Safety
    ///
    /// `render_system` must be null or a pointer returned by
    /// [`BackendObject::alloc`] for the same `T` that was not freed yet.
    pub unsafe fn free(render_system: *mut c_void) {
        if render_system.is_null() {
            return;
        }
        let object = unsafe { Box::from_raw(render_system.cast::<Self>()) };
        if catch_unwind(AssertUnwindSafe(move || drop(object))).is_err() {
            error!("panic while releasing {} renderer", T::NAME.to_string_lossy());
        }
    }

    /// Reinterpret an allocation made by this module.
    ///
    /// # Safety
    ///
    /// Same requirements as [`BackendObject::free`], and the returned
    /// reference must not outlive the allocation.
    pub unsafe fn from_raw<'a>(render_system: *mut c_void) -> Option<&'a mut Self> {
        unsafe { render_system.cast::<Self>().as_mut() }
    }

    pub fn header(&self) -> &RenderSystemHeader {
        &self.header
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn backend(&self) -> Option<&T> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut T> {
        self.backend.as_mut()
    }
}

/// Export the five backend module entry points for a [`RenderSystemBackend`].
///
/// Also defines `pub fn entry_points()` so the same backend can be
/// registered as a static module.
#[macro_export]
macro_rules! render_system_main {
    ($backend:ty) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn LLGL_RenderSystem_BuildID() -> ::std::ffi::c_int {
            $crate::BUILD_ID
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn LLGL_RenderSystem_RendererID() -> ::std::ffi::c_int {
            <$backend as $crate::backend::RenderSystemBackend>::RENDERER_ID.as_raw()
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn LLGL_RenderSystem_Name() -> *const ::std::ffi::c_char {
            <$backend as $crate::backend::RenderSystemBackend>::NAME.as_ptr()
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub extern "C" fn LLGL_RenderSystem_Alloc(
            descriptor: *const ::std::ffi::c_void,
            descriptor_size: ::std::ffi::c_int,
        ) -> *mut ::std::ffi::c_void {
            $crate::backend::BackendObject::<$backend>::alloc(descriptor, descriptor_size)
        }

        /// # Safety
        ///
        /// `render_system` must come from `LLGL_RenderSystem_Alloc` of this
        /// module and must not be freed twice.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn LLGL_RenderSystem_Free(render_system: *mut ::std::ffi::c_void) {
            unsafe { $crate::backend::BackendObject::<$backend>::free(render_system) }
        }

        /// Entry points of this backend for static registration.
        pub fn entry_points() -> $crate::ffi::EntryPoints {
            $crate::ffi::EntryPoints {
                build_id: Some(LLGL_RenderSystem_BuildID),
                renderer_id: Some(LLGL_RenderSystem_RendererID),
                name: Some(LLGL_RenderSystem_Name),
                alloc: Some(LLGL_RenderSystem_Alloc),
                free: Some(LLGL_RenderSystem_Free),
            }
        }
    };
}
