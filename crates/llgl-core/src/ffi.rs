//! Hardcoded backend module ABI: exported symbol names, entry-point
//! signatures and the C-repr structs exchanged between host and backend.
//!
//! Every backend module exports exactly five C-linkage symbols. Their names
//! and signatures are a fixed contract with already-built backend binaries
//! and must not change.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_void, CStr};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

// =====================================================================
// Exported symbol names
// =====================================================================

pub const SYMBOL_BUILD_ID: &str = "LLGL_RenderSystem_BuildID";
pub const SYMBOL_RENDERER_ID: &str = "LLGL_RenderSystem_RendererID";
pub const SYMBOL_NAME: &str = "LLGL_RenderSystem_Name";
pub const SYMBOL_ALLOC: &str = "LLGL_RenderSystem_Alloc";
pub const SYMBOL_FREE: &str = "LLGL_RenderSystem_Free";

// =====================================================================
// Entry-point signatures
// =====================================================================

pub type PFN_LLGL_RenderSystem_BuildID = unsafe extern "C" fn() -> c_int;
pub type PFN_LLGL_RenderSystem_RendererID = unsafe extern "C" fn() -> c_int;
pub type PFN_LLGL_RenderSystem_Name = unsafe extern "C" fn() -> *const c_char;
pub type PFN_LLGL_RenderSystem_Alloc =
    unsafe extern "C" fn(descriptor: *const c_void, descriptor_size: c_int) -> *mut c_void;
pub type PFN_LLGL_RenderSystem_Free = unsafe extern "C" fn(render_system: *mut c_void);

/// The five entry points of one backend module.
///
/// Any slot may be `None` when the module does not export the symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryPoints {
    pub build_id: Option<PFN_LLGL_RenderSystem_BuildID>,
    pub renderer_id: Option<PFN_LLGL_RenderSystem_RendererID>,
    pub name: Option<PFN_LLGL_RenderSystem_Name>,
    pub alloc: Option<PFN_LLGL_RenderSystem_Alloc>,
    pub free: Option<PFN_LLGL_RenderSystem_Free>,
}

// =====================================================================
// Renderer IDs
// =====================================================================

/// Identifies the native API a backend module wraps.
///
/// Values above [`RendererId::Reserved`] are free for custom backends and
/// read back as [`RendererId::Undefined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum RendererId {
    Undefined = 0x00,
    Null = 0x01,
    OpenGL = 0x02,
    OpenGLES = 0x03,
    WebGL = 0x04,
    WebGPU = 0x05,
    Direct3D9 = 0x06,
    Direct3D10 = 0x07,
    Direct3D11 = 0x08,
    Direct3D12 = 0x09,
    Vulkan = 0x0A,
    Metal = 0x0B,
    Reserved = 0xFF,
}

impl RendererId {
    pub fn from_raw(id: c_int) -> Self {
        Self::from_i32(id).unwrap_or(Self::Undefined)
    }

    pub fn as_raw(self) -> c_int {
        self as c_int
    }
}

// =====================================================================
// C-repr structs
// =====================================================================

/// Descriptor blob passed to `LLGL_RenderSystem_Alloc`.
///
/// Its `size_of` travels alongside it as `descriptor_size` so a backend can
/// detect a host built against a different layout.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct RawRenderSystemDescriptor {
    pub module_name: *const c_char,
    pub flags: u32,
    pub renderer_config: *const c_void,
    pub renderer_config_size: usize,
    pub native_handle: *const c_void,
    pub native_handle_size: usize,
}

/// Renderer details as NUL-terminated strings owned by the backend.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct RawRendererInfo {
    pub renderer_name: *const c_char,
    pub device_name: *const c_char,
    pub vendor_name: *const c_char,
    pub shading_language_name: *const c_char,
}

/// First field of every object returned by `LLGL_RenderSystem_Alloc`.
///
/// A backend that fails softly still returns an object; `has_errors` is then
/// set and `report_text` describes the failure. All strings stay valid
/// until the object is passed to `LLGL_RenderSystem_Free`.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct RenderSystemHeader {
    pub header_size: u32,
    pub renderer_id: c_int,
    pub has_errors: bool,
    pub report_text: *const c_char,
    pub info: RawRendererInfo,
}

impl RenderSystemHeader {
    pub const SIZE: u32 = std::mem::size_of::<RenderSystemHeader>() as u32;
}

// =====================================================================
// Utility
// =====================================================================

/// Copy a backend-owned C string into an owned Rust string.
///
/// A null pointer reads as the empty string; invalid UTF-8 is replaced.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn string_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
