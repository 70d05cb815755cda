use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use llgl_core::ffi::RenderSystemHeader;
use llgl_core::{RenderSystemDescriptor, RendererId, RendererInfo, Report, BUILD_ID};
use tracing::{debug, info, warn};

use crate::error::RenderSystemError;
use crate::module::RenderSystemModule;
use crate::registry::{RenderSystemRegistry, RendererHandle, SharedRegistry};

type Deleter = Box<dyn FnOnce(NonNull<RenderSystemHeader>)>;

/// Owning pointer to a renderer object allocated inside a backend module.
///
/// The object is released through the deleter it was created with, never
/// through the host allocator.
pub struct RenderSystemPtr {
    raw: NonNull<RenderSystemHeader>,
    deleter: Option<Deleter>,
}

impl RenderSystemPtr {
    /// # Safety
    ///
    /// `raw` must point to a live object starting with a
    /// [`RenderSystemHeader`] that stays valid until `deleter` is called.
    pub unsafe fn from_raw(
        raw: NonNull<RenderSystemHeader>,
        deleter: impl FnOnce(NonNull<RenderSystemHeader>) + 'static,
    ) -> Self {
        Self {
            raw,
            deleter: Some(Box::new(deleter)),
        }
    }

    pub fn header(&self) -> &RenderSystemHeader {
        // SAFETY: valid until drop, see `from_raw`.
        unsafe { self.raw.as_ref() }
    }

    pub fn header_size(&self) -> u32 {
        self.header().header_size
    }

    /// Renderer the object says it implements.
    pub fn renderer_id(&self) -> RendererId {
        RendererId::from_raw(self.header().renderer_id)
    }

    pub fn report(&self) -> Report {
        // SAFETY: the header's report text is owned by the live object.
        unsafe { Report::from_header(self.header()) }
    }

    pub fn renderer_info(&self) -> RendererInfo {
        // SAFETY: the info strings are owned by the live object.
        unsafe { RendererInfo::from_raw(&self.header().info) }
    }

    pub fn as_ptr(&self) -> *mut RenderSystemHeader {
        self.raw.as_ptr()
    }

    pub fn handle(&self) -> RendererHandle {
        RendererHandle::from_ptr(self.raw.as_ptr())
    }
}

impl fmt::Debug for RenderSystemPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RenderSystemPtr").field(&self.raw).finish()
    }
}

impl Drop for RenderSystemPtr {
    fn drop(&mut self) {
        if let Some(deleter) = self.deleter.take() {
            deleter(self.raw);
        }
    }
}

/// A live renderer together with the module it was allocated from.
///
/// Dropping it frees the renderer through the module's `Free` and then
/// unregisters it, which unloads the module once no renderer uses it.
pub struct RenderSystem {
    ptr: Option<RenderSystemPtr>,
    module: Arc<RenderSystemModule>,
    registry: SharedRegistry,
    name: String,
    renderer_id: RendererId,
    info: RendererInfo,
}

impl RenderSystem {
    pub fn load(desc: &RenderSystemDescriptor, registry: &SharedRegistry) -> Result<Self, RenderSystemError> {
        let name = desc.module_name.as_str();
        let mut guard = registry.lock();

        let module = guard.load_module(name)?;

        let found = module.build_id();
        if found != BUILD_ID {
            warn!("render system module \"{name}\" has build ID {found:#06x}, expected {BUILD_ID:#06x}");
            return Err(RenderSystemError::BuildIdMismatch {
                name: name.to_string(),
                expected: BUILD_ID,
                found,
            });
        }

        let ptr = module.alloc_render_system(desc)?;
        if !guard.register_render_system(ptr.handle(), &module) {
            return Err(RenderSystemError::AlreadyRegistered { name: name.to_string() });
        }
        drop(guard);

        let info = ptr.renderer_info();
        let renderer_id = ptr.renderer_id();
        let renderer_name = module.renderer_name();
        info!(
            "created {} render system ({} on {})",
            info.renderer_name, info.device_name, info.vendor_name
        );
        let report = ptr.report();
        if !report.is_empty() {
            debug!("{name}: {report}");
        }

        Ok(Self {
            ptr: Some(ptr),
            module,
            registry: Arc::clone(registry),
            name: renderer_name,
            renderer_id,
            info,
        })
    }

    /// Load through the process-wide registry.
    pub fn load_default(desc: &RenderSystemDescriptor) -> Result<Self, RenderSystemError> {
        Self::load(desc, RenderSystemRegistry::global())
    }

    /// Free the renderer now. Same as dropping it.
    pub fn unload(self) {}

    /// Display name the module exports, e.g. "Direct3D 12". Use
    /// [`RenderSystemModule::name`] through [`RenderSystem::module`] for the
    /// name it was loaded by.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renderer_id(&self) -> RendererId {
        self.renderer_id
    }

    pub fn info(&self) -> &RendererInfo {
        &self.info
    }

    pub fn module(&self) -> &Arc<RenderSystemModule> {
        &self.module
    }

    /// Current report of the renderer object.
    pub fn report(&self) -> Report {
        self.ptr.as_ref().map(RenderSystemPtr::report).unwrap_or_default()
    }

    pub fn as_ptr(&self) -> *mut RenderSystemHeader {
        self.ptr
            .as_ref()
            .map_or(std::ptr::null_mut(), RenderSystemPtr::as_ptr)
    }
}

impl fmt::Debug for RenderSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSystem")
            .field("name", &self.name)
            .field("module", &self.module.name())
            .field("renderer_id", &self.renderer_id)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl Drop for RenderSystem {
    fn drop(&mut self) {
        let Some(ptr) = self.ptr.take() else {
            return;
        };
        let mut registry = self.registry.lock();
        let handle = ptr.handle();
        drop(ptr);
        registry.unregister_render_system(handle);
        debug!("unloaded {} render system", self.module.name());
    }
}
