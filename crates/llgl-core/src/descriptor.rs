//! Render system descriptor: owned builder on the host side, validated
//! borrowed view on the backend side.

use std::ffi::{c_int, c_void, CString};
use std::marker::PhantomData;

use bitflags::bitflags;
use thiserror::Error;

use crate::ffi::{string_from_ptr, RawRenderSystemDescriptor};

bitflags! {
    /// Device selection hints passed to the backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderSystemFlags: u32 {
        const DEBUG_DEVICE = 1 << 0;
        const PREFER_NVIDIA = 1 << 1;
        const PREFER_AMD = 1 << 2;
        const PREFER_INTEL = 1 << 3;
        const SOFTWARE_DEVICE = 1 << 4;
    }
}

/// Host-side description of the renderer to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSystemDescriptor {
    pub module_name: String,
    pub flags: RenderSystemFlags,
    pub renderer_config: Vec<u8>,
    pub native_handle: Vec<u8>,
}

impl RenderSystemDescriptor {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: RenderSystemFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_renderer_config(mut self, config: impl Into<Vec<u8>>) -> Self {
        self.renderer_config = config.into();
        self
    }

    pub fn with_native_handle(mut self, handle: impl Into<Vec<u8>>) -> Self {
        self.native_handle = handle.into();
        self
    }

    /// Lay the descriptor out as the C blob handed to a backend.
    pub fn encode(&self) -> EncodedDescriptor<'_> {
        let module_name = CString::new(self.module_name.replace('\0', "")).unwrap_or_default();
        let raw = RawRenderSystemDescriptor {
            module_name: module_name.as_ptr(),
            flags: self.flags.bits(),
            renderer_config: slice_ptr(&self.renderer_config),
            renderer_config_size: self.renderer_config.len(),
            native_handle: slice_ptr(&self.native_handle),
            native_handle_size: self.native_handle.len(),
        };
        EncodedDescriptor {
            raw,
            _module_name: module_name,
            _source: PhantomData,
        }
    }
}

fn slice_ptr(bytes: &[u8]) -> *const c_void {
    if bytes.is_empty() {
        std::ptr::null()
    } else {
        bytes.as_ptr().cast()
    }
}

/// A descriptor encoded for the ABI, borrowing its byte blobs from the
/// [`RenderSystemDescriptor`] it came from.
#[derive(Debug)]
pub struct EncodedDescriptor<'a> {
    raw: RawRenderSystemDescriptor,
    _module_name: CString,
    _source: PhantomData<&'a RenderSystemDescriptor>,
}

impl EncodedDescriptor<'_> {
    pub fn as_ptr(&self) -> *const c_void {
        (&self.raw as *const RawRenderSystemDescriptor).cast()
    }

    pub fn byte_size(&self) -> c_int {
        std::mem::size_of::<RawRenderSystemDescriptor>() as c_int
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("render system descriptor is null")]
    Null,
    #[error("render system descriptor has {found} bytes, expected {expected}")]
    SizeMismatch { expected: usize, found: c_int },
}

/// Backend-side view of the descriptor the host passed to `Alloc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSystemDesc<'a> {
    pub module_name: String,
    pub flags: RenderSystemFlags,
    pub renderer_config: &'a [u8],
    pub native_handle: &'a [u8],
}

impl<'a> RenderSystemDesc<'a> {
    /// Decode the blob received by `LLGL_RenderSystem_Alloc`.
    ///
    /// Unknown flag bits are dropped.
    ///
    /// # Safety
    ///
    /// When `size` matches, `descriptor` must point to a valid
    /// [`RawRenderSystemDescriptor`] whose pointers stay valid for `'a`.
    pub unsafe fn from_raw(descriptor: *const c_void, size: c_int) -> Result<Self, DescriptorError> {
        if descriptor.is_null() {
            return Err(DescriptorError::Null);
        }
        let expected = std::mem::size_of::<RawRenderSystemDescriptor>();
        if usize::try_from(size).ok() != Some(expected) {
            return Err(DescriptorError::SizeMismatch { expected, found: size });
        }

        let raw = unsafe { &*descriptor.cast::<RawRenderSystemDescriptor>() };
        Ok(Self {
            module_name: unsafe { string_from_ptr(raw.module_name) },
            flags: RenderSystemFlags::from_bits_truncate(raw.flags),
            renderer_config: unsafe { bytes_from_raw(raw.renderer_config, raw.renderer_config_size) },
            native_handle: unsafe { bytes_from_raw(raw.native_handle, raw.native_handle_size) },
        })
    }
}

unsafe fn bytes_from_raw<'a>(data: *const c_void, size: usize) -> &'a [u8] {
    if data.is_null() || size == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_descriptor_decodes_on_backend_side() {
        let desc = RenderSystemDescriptor::new("Vulkan")
            .with_flags(RenderSystemFlags::DEBUG_DEVICE | RenderSystemFlags::PREFER_AMD)
            .with_renderer_config(vec![1, 2, 3]);
        let encoded = desc.encode();

        let view = unsafe { RenderSystemDesc::from_raw(encoded.as_ptr(), encoded.byte_size()) }.unwrap();
        assert_eq!(view.module_name, "Vulkan");
        assert_eq!(view.flags, RenderSystemFlags::DEBUG_DEVICE | RenderSystemFlags::PREFER_AMD);
        assert_eq!(view.renderer_config, &[1, 2, 3]);
        assert!(view.native_handle.is_empty());
    }

    #[test]
    fn size_mismatch_is_detected() {
        let desc = RenderSystemDescriptor::new("Null");
        let encoded = desc.encode();

        let err = unsafe { RenderSystemDesc::from_raw(encoded.as_ptr(), encoded.byte_size() - 8) }.unwrap_err();
        assert!(matches!(err, DescriptorError::SizeMismatch { .. }));

        let err = unsafe { RenderSystemDesc::from_raw(std::ptr::null(), encoded.byte_size()) }.unwrap_err();
        assert_eq!(err, DescriptorError::Null);
    }
}
