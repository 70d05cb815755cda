//! Contract shared by the LLGL host and its backend modules.
//!
//! - [`ffi`] holds the exported symbol names, entry-point signatures and
//!   C-repr structs that cross the module boundary.
//! - [`Report`] carries renderer diagnostics.
//! - [`RenderSystemDescriptor`] is encoded into the versioned, size-stamped
//!   blob passed to a backend's `Alloc`.
//! - [`backend::RenderSystemBackend`] and [`render_system_main!`] turn a Rust
//!   type into a loadable backend module.
//! - [`ownership`] provides the container helpers every backend uses to own
//!   its resources.

use std::ffi::c_int;

pub mod backend;
pub mod descriptor;
pub mod ffi;
pub mod logging;
pub mod ownership;
pub mod report;

pub use backend::{RenderSystemBackend, RendererInfo};
pub use descriptor::{RenderSystemDesc, RenderSystemDescriptor, RenderSystemFlags};
pub use ffi::{EntryPoints, RendererId};
pub use report::Report;

/// Version of the layouts in [`ffi`]. Bump on any change to them.
pub const ABI_VERSION: c_int = 1;

/// Identifies how this crate was built. Host and backend must agree.
pub const BUILD_ID: c_int = (ABI_VERSION << 8) | if cfg!(debug_assertions) { 1 } else { 0 };
