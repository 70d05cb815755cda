//! Host side of LLGL backend loading.
//!
//! This crate ties together [`llgl_core`] (the backend ABI) and
//! [`llgl_platform`] (the OS loader) into the lifecycle of a renderer.
//!
//! # Overview
//!
//! - [`RenderSystemModule`] binds a loaded backend library to its entry
//!   points and allocates renderer objects from it.
//! - [`RenderSystemRegistry`] caches one module per backend name and keeps
//!   it loaded while renderers allocated from it are alive.
//! - [`RenderSystem`] is a live renderer; dropping it frees the object
//!   inside its module and releases the module.
//! - [`find_modules`] lists the backends available on this machine, most
//!   preferred first.
//!
//! # Example
//!
//! ```rust,no_run
//! use llgl::{find_modules, RenderSystem, RenderSystemDescriptor};
//!
//! let name = find_modules().into_iter().next().expect("no backend");
//! let renderer = RenderSystem::load_default(&RenderSystemDescriptor::new(name))?;
//! println!("{}", renderer.info().renderer_name);
//! # Ok::<(), llgl::RenderSystemError>(())
//! ```

pub mod error;
pub mod module;
pub mod registry;
pub mod render_system;

pub use error::RenderSystemError;
pub use module::{find_modules, find_modules_with, RenderSystemModule, KNOWN_MODULES};
pub use registry::{RenderSystemRegistry, RendererHandle, SharedRegistry};
pub use render_system::{RenderSystem, RenderSystemPtr};

// Re-export the types callers need to describe and inspect a renderer.
pub use llgl_core::{EntryPoints, RenderSystemDescriptor, RenderSystemFlags, RendererId, RendererInfo, Report};
