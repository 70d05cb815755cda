//! Resource objects of the Null renderer. They hold their descriptors and
//! CPU-side contents only.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferDescriptor {
    pub size: usize,
    pub bind_flags: u32,
}

#[derive(Debug)]
pub struct NullBuffer {
    desc: BufferDescriptor,
    data: Vec<u8>,
}

impl NullBuffer {
    pub(crate) fn new(desc: BufferDescriptor) -> Self {
        Self {
            desc,
            data: vec![0; desc.size],
        }
    }

    pub fn desc(&self) -> &BufferDescriptor {
        &self.desc
    }

    /// Copy `bytes` in at `offset`. Returns false if they do not fit.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> bool {
        match offset.checked_add(bytes.len()) {
            Some(end) if end <= self.data.len() => {
                self.data[offset..end].copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            layers: 1,
        }
    }
}

/// View over a whole texture. The default view of a texture is shared with
/// every render target that attaches it.
#[derive(Debug, PartialEq, Eq)]
pub struct NullTextureView {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct NullTexture {
    desc: TextureDescriptor,
    default_view: Arc<NullTextureView>,
}

impl NullTexture {
    pub(crate) fn new(desc: TextureDescriptor) -> Self {
        Self {
            desc,
            default_view: Arc::new(NullTextureView {
                width: desc.width,
                height: desc.height,
            }),
        }
    }

    pub fn desc(&self) -> &TextureDescriptor {
        &self.desc
    }

    pub fn default_view(&self) -> &Arc<NullTextureView> {
        &self.default_view
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    Mirror,
    Clamp,
}

/// Sampler state. Ordered so identical samplers can share one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SamplerDescriptor {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub address_mode: AddressMode,
    pub max_anisotropy: u32,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            address_mode: AddressMode::Repeat,
            max_anisotropy: 1,
        }
    }
}

#[derive(Debug)]
pub struct NullSampler {
    pub desc: SamplerDescriptor,
}

#[derive(Debug, Default)]
pub struct NullRenderTarget {
    attachments: Vec<Arc<NullTextureView>>,
}

impl NullRenderTarget {
    pub fn attachments(&self) -> &[Arc<NullTextureView>] {
        &self.attachments
    }

    pub(crate) fn attachments_mut(&mut self) -> &mut Vec<Arc<NullTextureView>> {
        &mut self.attachments
    }
}
