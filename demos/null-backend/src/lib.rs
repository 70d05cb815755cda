#![allow(non_snake_case)]

//! Null render system.
//!
//! A complete LLGL backend module that performs no GPU work: resources are
//! tracked in CPU memory so hosts and tests can exercise the whole module
//! lifecycle on any machine. Built as `LLGL_Null` so the host finds it under
//! the platform's module filename, and as an rlib for static registration.

use std::collections::VecDeque;
use std::ffi::CStr;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use anyhow::Context;
use llgl_core::ownership::{
    add_once_to_shared_list, find_or_insert_sorted, remove_from_shared_list, remove_from_unique_set,
    take_ownership, UniqueSet,
};
use llgl_core::{RenderSystemBackend, RenderSystemDesc, RenderSystemFlags, RendererId, RendererInfo, Report};
use tracing::debug;

pub mod resources;

pub use resources::{
    AddressMode, BufferDescriptor, Filter, NullBuffer, NullRenderTarget, NullSampler, NullTexture,
    NullTextureView, SamplerDescriptor, TextureDescriptor,
};

const DEFAULT_DEVICE_NAME: &str = "CPU";

pub struct NullRenderSystem {
    device_name: String,
    flags: RenderSystemFlags,
    buffers: UniqueSet<NullBuffer>,
    textures: Vec<Box<NullTexture>>,
    render_targets: VecDeque<Box<NullRenderTarget>>,
    // Sorted by descriptor; identical samplers are shared.
    samplers: Vec<Arc<NullSampler>>,
}

impl NullRenderSystem {
    /// Build a renderer directly, without going through the module ABI.
    pub fn with_device_name(device_name: impl Into<String>, flags: RenderSystemFlags) -> Self {
        Self {
            device_name: device_name.into(),
            flags,
            buffers: UniqueSet::new(),
            textures: Vec::new(),
            render_targets: VecDeque::new(),
            samplers: Vec::new(),
        }
    }

    pub fn flags(&self) -> RenderSystemFlags {
        self.flags
    }

    // --- Buffers ---

    pub fn create_buffer(&mut self, desc: BufferDescriptor) -> NonNull<NullBuffer> {
        take_ownership(&mut self.buffers, Box::new(NullBuffer::new(desc)))
    }

    pub fn buffer_mut(&mut self, buffer: *const NullBuffer) -> Option<&mut NullBuffer> {
        self.buffers.get_mut(buffer)
    }

    pub fn release_buffer(&mut self, buffer: *const NullBuffer) -> bool {
        remove_from_unique_set(&mut self.buffers, buffer)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    // --- Textures ---

    pub fn create_texture(&mut self, desc: TextureDescriptor) -> NonNull<NullTexture> {
        take_ownership(&mut self.textures, Box::new(NullTexture::new(desc)))
    }

    /// Destroy a texture. Render targets keep its default view alive.
    pub fn release_texture(&mut self, texture: *const NullTexture) -> bool {
        remove_from_unique_set(&mut self.textures, texture)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // --- Render targets ---

    /// Render target attaching the default views of `attachments`. Unknown
    /// textures are skipped and attaching the same texture twice has no
    /// effect.
    pub fn create_render_target(&mut self, attachments: &[*const NullTexture]) -> NonNull<NullRenderTarget> {
        let mut render_target = Box::<NullRenderTarget>::default();
        for &attachment in attachments {
            if let Some(texture) = self.textures.iter().find(|t| ptr::eq(&***t, attachment)) {
                add_once_to_shared_list(render_target.attachments_mut(), texture.default_view());
            }
        }
        take_ownership(&mut self.render_targets, render_target)
    }

    /// Drop the render target's reference to `view`.
    pub fn detach(&mut self, render_target: *const NullRenderTarget, view: *const NullTextureView) -> bool {
        self.render_targets
            .iter_mut()
            .find(|rt| ptr::eq(&***rt, render_target))
            .is_some_and(|rt| remove_from_shared_list(rt.attachments_mut(), view))
    }

    pub fn release_render_target(&mut self, render_target: *const NullRenderTarget) -> bool {
        remove_from_unique_set(&mut self.render_targets, render_target)
    }

    pub fn render_target_count(&self) -> usize {
        self.render_targets.len()
    }

    // --- Samplers ---

    /// Sampler for `desc`, shared with every other request for the same state.
    pub fn create_sampler(&mut self, desc: SamplerDescriptor) -> Arc<NullSampler> {
        self.prune_samplers();
        let (index, inserted) = find_or_insert_sorted(
            &mut self.samplers,
            |sampler| desc.cmp(&sampler.desc),
            || Arc::new(NullSampler { desc }),
        );
        if inserted {
            debug!("new sampler state {desc:?}");
        }
        Arc::clone(&self.samplers[index])
    }

    /// Release the caller's reference. Returns whether it was the last one,
    /// which drops the sampler from the cache.
    pub fn release_sampler(&mut self, sampler: Arc<NullSampler>) -> bool {
        let raw = Arc::as_ptr(&sampler);
        drop(sampler);
        let last = self
            .samplers
            .iter()
            .any(|cached| ptr::eq(Arc::as_ptr(cached), raw) && Arc::strong_count(cached) == 1);
        let released = last && remove_from_shared_list(&mut self.samplers, raw);
        self.prune_samplers();
        released
    }

    /// Samplers still referenced outside the cache.
    pub fn sampler_count(&self) -> usize {
        self.samplers.iter().filter(|cached| Arc::strong_count(cached) > 1).count()
    }

    // Entries whose outside references were all dropped without a release.
    fn prune_samplers(&mut self) {
        self.samplers.retain(|cached| Arc::strong_count(cached) > 1);
    }
}

impl RenderSystemBackend for NullRenderSystem {
    const RENDERER_ID: RendererId = RendererId::Null;
    const NAME: &'static CStr = c"Null";

    /// The renderer config, when given, is the device name to report.
    fn new(desc: &RenderSystemDesc<'_>, report: &mut Report) -> anyhow::Result<Self> {
        let device_name = if desc.renderer_config.is_empty() {
            DEFAULT_DEVICE_NAME.to_string()
        } else {
            std::str::from_utf8(desc.renderer_config)
                .context("renderer config is not a UTF-8 device name")?
                .to_string()
        };
        if desc.flags.contains(RenderSystemFlags::DEBUG_DEVICE) {
            report.append("debug device requested; the Null renderer has no debug layer");
        }
        debug!("creating Null render system on \"{device_name}\"");
        Ok(Self::with_device_name(device_name, desc.flags))
    }

    fn renderer_info(&self) -> RendererInfo {
        RendererInfo {
            renderer_name: "Null".into(),
            device_name: self.device_name.clone(),
            vendor_name: "LLGL".into(),
            shading_language_name: "Dummy".into(),
        }
    }
}

llgl_core::render_system_main!(NullRenderSystem);
