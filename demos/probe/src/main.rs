//! Backend probe.
//!
//! Lists the render system modules that can be loaded here, then creates a
//! renderer from the requested (or most preferred) one and prints what it
//! reports about itself.
//!
//! ```text
//! LLGL_LOG=debug llgl-probe --static-null
//! llgl-probe --backend Vulkan --debug-device
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use llgl::{RenderSystem, RenderSystemDescriptor, RenderSystemFlags, RenderSystemRegistry};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "llgl-probe", about = "Probe LLGL render system modules", version)]
struct Args {
    /// Backend to load instead of the first available one.
    #[arg(long)]
    backend: Option<String>,

    /// Only list the available backends.
    #[arg(long)]
    list: bool,

    /// Link the Null backend into this process instead of loading its library.
    #[arg(long)]
    static_null: bool,

    /// Request a debug device.
    #[arg(long)]
    debug_device: bool,

    /// Prefer a software device.
    #[arg(long)]
    software: bool,
}

fn main() -> anyhow::Result<()> {
    llgl_core::logging::init();
    let args = Args::parse();

    let registry = RenderSystemRegistry::global();
    if args.static_null {
        registry
            .lock()
            .register_static_module("Null", LLGL_Null::entry_points());
    }

    let available = registry.lock().find_modules();
    if available.is_empty() {
        println!("no render system modules available");
    } else {
        println!("available render system modules: {}", available.join(", "));
    }
    if args.list {
        return Ok(());
    }

    let name = match args.backend {
        Some(name) => name,
        None => match available.into_iter().next() {
            Some(name) => name,
            None => bail!("no render system module to load"),
        },
    };

    let mut flags = RenderSystemFlags::empty();
    flags.set(RenderSystemFlags::DEBUG_DEVICE, args.debug_device);
    flags.set(RenderSystemFlags::SOFTWARE_DEVICE, args.software);

    let desc = RenderSystemDescriptor::new(&name).with_flags(flags);
    let renderer = RenderSystem::load(&desc, registry).with_context(|| format!("creating \"{name}\" render system"))?;

    let renderer_info = renderer.info();
    println!("renderer:         {} ({:?})", renderer_info.renderer_name, renderer.renderer_id());
    println!("device:           {}", renderer_info.device_name);
    println!("vendor:           {}", renderer_info.vendor_name);
    println!("shading language: {}", renderer_info.shading_language_name);
    match renderer.module().filename() {
        Some(filename) => println!("module:           {}", filename.display()),
        None => println!("module:           (static)"),
    }

    let report = renderer.report();
    if !report.is_empty() {
        println!("report:\n{report}");
    }

    renderer.unload();
    info!("{} modules still loaded", registry.lock().module_count());
    Ok(())
}
