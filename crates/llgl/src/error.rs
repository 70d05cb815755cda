//! Failures surfaced while loading a backend module or creating a renderer.

use std::ffi::c_int;

use llgl_core::{RendererId, Report};
use llgl_platform::ModuleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderSystemError {
    /// The OS could not open the backend library.
    #[error("failed to load render system module \"{name}\": {error}")]
    ModuleLoad { name: String, error: ModuleError },

    /// The module was built against a different ABI or configuration.
    #[error("build ID mismatch in render system module \"{name}\" (expected {expected:#06x}, found {found:#06x})")]
    BuildIdMismatch { name: String, expected: c_int, found: c_int },

    #[error("render system module \"{name}\" does not export {symbol}")]
    MissingEntryPoint { name: String, symbol: &'static str },

    /// `Alloc` returned null.
    #[error("failed to allocate render system from module \"{name}\"")]
    AllocFailed { name: String },

    #[error("render system from module \"{name}\" has an incompatible header ({found} bytes, expected at least {expected})")]
    IncompatibleHeader { name: String, expected: u32, found: u32 },

    /// `Alloc` returned an object whose report has errors.
    #[error("render system module \"{name}\" reported errors: {report}")]
    ReportedErrors { name: String, report: Report },

    /// The object's header and the module's `RendererID` export disagree.
    #[error("render system from module \"{name}\" reports renderer {found:?}, but the module exports {expected:?}")]
    RendererIdMismatch {
        name: String,
        expected: RendererId,
        found: RendererId,
    },

    #[error("render system from module \"{name}\" is already registered")]
    AlreadyRegistered { name: String },
}

impl RenderSystemError {
    /// Logical backend name the failure belongs to.
    pub fn module_name(&self) -> &str {
        match self {
            Self::ModuleLoad { name, .. }
            | Self::BuildIdMismatch { name, .. }
            | Self::MissingEntryPoint { name, .. }
            | Self::AllocFailed { name }
            | Self::IncompatibleHeader { name, .. }
            | Self::ReportedErrors { name, .. }
            | Self::RendererIdMismatch { name, .. }
            | Self::AlreadyRegistered { name } => name,
        }
    }
}
