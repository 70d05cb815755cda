use std::ffi::{c_char, c_int, c_void};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use llgl::{
    EntryPoints, RenderSystem, RenderSystemDescriptor, RenderSystemError, RenderSystemFlags, RenderSystemRegistry,
    RendererId, SharedRegistry,
};
use llgl_core::ffi::{RawRendererInfo, RenderSystemHeader, SYMBOL_ALLOC, SYMBOL_FREE};
use llgl_core::BUILD_ID;
use rstest::rstest;

fn null_registry() -> SharedRegistry {
    let registry = RenderSystemRegistry::shared();
    registry.lock().register_static_module("Null", LLGL_Null::entry_points());
    registry
}

fn use_count(registry: &SharedRegistry, name: &str) -> Option<usize> {
    registry.lock().find_module(name).map(|m| m.use_count())
}

// ---------------------------------------------------------------------------
// Null backend
// ---------------------------------------------------------------------------

#[test]
fn null_backend_lifecycle() -> anyhow::Result<()> {
    let registry = null_registry();
    let desc = RenderSystemDescriptor::new("Null");

    let first = RenderSystem::load(&desc, &registry)?;
    assert_eq!(first.name(), "Null");
    assert_eq!(first.renderer_id(), RendererId::Null);
    assert_eq!(first.info().renderer_name, "Null");
    assert_eq!(first.info().device_name, "CPU");
    assert_eq!(first.info().vendor_name, "LLGL");
    assert!(first.module().is_static());
    assert!(!first.as_ptr().is_null());
    assert_eq!(use_count(&registry, "Null"), Some(1));

    let second = RenderSystem::load(&desc, &registry)?;
    assert!(Arc::ptr_eq(first.module(), second.module()));
    assert_eq!(use_count(&registry, "Null"), Some(2));
    assert_eq!(registry.lock().render_system_count(), 2);

    drop(first);
    assert_eq!(use_count(&registry, "Null"), Some(1));

    second.unload();
    assert_eq!(use_count(&registry, "Null"), None);
    assert_eq!(registry.lock().module_count(), 0);
    assert_eq!(registry.lock().render_system_count(), 0);
    Ok(())
}

#[test]
fn renderer_config_names_the_device() -> anyhow::Result<()> {
    let registry = null_registry();
    let desc = RenderSystemDescriptor::new("Null").with_renderer_config(&b"Imaginary GPU"[..]);
    let renderer = RenderSystem::load(&desc, &registry)?;
    assert_eq!(renderer.info().device_name, "Imaginary GPU");
    Ok(())
}

#[test]
fn debug_device_is_noted_in_report() -> anyhow::Result<()> {
    let registry = null_registry();
    let desc = RenderSystemDescriptor::new("Null").with_flags(RenderSystemFlags::DEBUG_DEVICE);
    let renderer = RenderSystem::load(&desc, &registry)?;
    let report = renderer.report();
    assert!(!report.has_errors());
    assert!(report.text().contains("debug"), "{report}");
    Ok(())
}

#[test]
fn backend_construction_error_is_reported() {
    let registry = null_registry();
    let desc = RenderSystemDescriptor::new("Null").with_renderer_config(vec![0xff, 0xfe]);

    let err = RenderSystem::load(&desc, &registry).unwrap_err();
    match &err {
        RenderSystemError::ReportedErrors { name, report } => {
            assert_eq!(name, "Null");
            assert!(report.has_errors());
            assert!(report.text().contains("UTF-8"), "{report}");
        }
        other => panic!("unexpected error: {other}"),
    }

    // The module stays cached but unretained.
    assert_eq!(use_count(&registry, "Null"), Some(0));
    assert_eq!(registry.lock().render_system_count(), 0);
}

/// Loads the `LLGL_Null` cdylib that cargo places next to the test binary.
#[cfg(all(target_os = "linux", not(feature = "debug-suffix")))]
#[test]
fn null_backend_loads_from_shared_library() -> anyhow::Result<()> {
    let registry = RenderSystemRegistry::shared();
    assert!(registry.lock().find_modules().contains(&"Null".to_string()));

    let renderer = RenderSystem::load(&RenderSystemDescriptor::new("Null"), &registry)?;
    let module = Arc::clone(renderer.module());
    assert!(!module.is_static());
    let filename = module.filename().map(|path| path.to_path_buf()).unwrap_or_default();
    assert!(filename.ends_with(llgl_platform::library_name("Null")), "{}", filename.display());
    assert_eq!(module.renderer_id(), RendererId::Null);
    assert_eq!(renderer.renderer_id(), RendererId::Null);
    assert_eq!(renderer.name(), "Null");
    assert_eq!(renderer.info().renderer_name, "Null");
    assert_eq!(renderer.info().vendor_name, "LLGL");
    assert_eq!(renderer.info().device_name, "CPU");
    assert_eq!(registry.lock().module_count(), 1);
    assert_eq!(use_count(&registry, "Null"), Some(1));

    drop(renderer);
    assert_eq!(registry.lock().module_count(), 0);
    assert_eq!(Arc::strong_count(&module), 1);
    Ok(())
}

#[test]
fn global_registry_loads_static_null() -> anyhow::Result<()> {
    RenderSystemRegistry::global()
        .lock()
        .register_static_module("Null", LLGL_Null::entry_points());
    let renderer = RenderSystem::load_default(&RenderSystemDescriptor::new("Null"))?;
    assert_eq!(renderer.renderer_id(), RendererId::Null);
    assert!(RenderSystemRegistry::global().lock().find_modules().contains(&"Null".to_string()));
    Ok(())
}

// ---------------------------------------------------------------------------
// Missing and unknown backends
// ---------------------------------------------------------------------------

#[test]
fn nonexistent_backend_fails_with_filename() {
    let registry = RenderSystemRegistry::shared();
    assert!(!registry.lock().find_modules().contains(&"Direct3D99".to_string()));

    let err = RenderSystem::load(&RenderSystemDescriptor::new("Direct3D99"), &registry).unwrap_err();
    assert!(matches!(err, RenderSystemError::ModuleLoad { .. }));
    let message = err.to_string();
    assert!(message.contains("Direct3D99"), "{message}");
    assert!(message.contains(&llgl_platform::library_name("Direct3D99")), "{message}");
    assert_eq!(registry.lock().module_count(), 0);
}

#[test]
fn only_null_available_enumerates_null() {
    assert_eq!(llgl::find_modules_with(|name| name == "Null"), vec!["Null".to_string()]);
}

// ---------------------------------------------------------------------------
// Misbehaving modules
// ---------------------------------------------------------------------------

static FREED: [AtomicUsize; 5] = [const { AtomicUsize::new(0) }; 5];

extern "C" fn matching_build_id() -> c_int {
    BUILD_ID
}

extern "C" fn other_build_id() -> c_int {
    BUILD_ID ^ 0x7f00
}

extern "C" fn null_renderer_id() -> c_int {
    RendererId::Null.as_raw()
}

extern "C" fn vulkan_renderer_id() -> c_int {
    RendererId::Vulkan.as_raw()
}

extern "C" fn fake_name() -> *const c_char {
    c"Fake Renderer 1.0".as_ptr()
}

fn fake_header(header_size: u32, has_errors: bool) -> *mut c_void {
    let header = RenderSystemHeader {
        header_size,
        renderer_id: RendererId::Null.as_raw(),
        has_errors,
        report_text: c"device lost".as_ptr(),
        info: RawRendererInfo {
            renderer_name: ptr::null(),
            device_name: ptr::null(),
            vendor_name: ptr::null(),
            shading_language_name: ptr::null(),
        },
    };
    Box::into_raw(Box::new(header)).cast()
}

extern "C" fn alloc_with_errors(_: *const c_void, _: c_int) -> *mut c_void {
    fake_header(RenderSystemHeader::SIZE, true)
}

extern "C" fn alloc_small_header(_: *const c_void, _: c_int) -> *mut c_void {
    fake_header(4, false)
}

extern "C" fn alloc_healthy(_: *const c_void, _: c_int) -> *mut c_void {
    fake_header(RenderSystemHeader::SIZE, false)
}

extern "C" fn alloc_null(_: *const c_void, _: c_int) -> *mut c_void {
    ptr::null_mut()
}

unsafe extern "C" fn counting_free<const SLOT: usize>(render_system: *mut c_void) {
    drop(unsafe { Box::from_raw(render_system.cast::<RenderSystemHeader>()) });
    FREED[SLOT].fetch_add(1, Ordering::SeqCst);
}

fn fake_module(entry_points: EntryPoints) -> SharedRegistry {
    let registry = RenderSystemRegistry::shared();
    registry.lock().register_static_module("Fake", entry_points);
    registry
}

fn load_fake(registry: &SharedRegistry) -> Result<RenderSystem, RenderSystemError> {
    RenderSystem::load(&RenderSystemDescriptor::new("Fake"), registry)
}

#[test]
fn error_report_frees_object_and_fails() {
    let registry = fake_module(EntryPoints {
        build_id: Some(matching_build_id),
        alloc: Some(alloc_with_errors),
        free: Some(counting_free::<0>),
        ..EntryPoints::default()
    });

    let err = load_fake(&registry).unwrap_err();
    match err {
        RenderSystemError::ReportedErrors { report, .. } => assert_eq!(report.text(), "device lost"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(FREED[0].load(Ordering::SeqCst), 1);
    assert_eq!(use_count(&registry, "Fake"), Some(0));
    assert_eq!(registry.lock().render_system_count(), 0);
}

#[test]
fn small_header_is_rejected() {
    let registry = fake_module(EntryPoints {
        build_id: Some(matching_build_id),
        alloc: Some(alloc_small_header),
        free: Some(counting_free::<1>),
        ..EntryPoints::default()
    });

    let err = load_fake(&registry).unwrap_err();
    assert!(matches!(err, RenderSystemError::IncompatibleHeader { found: 4, .. }), "{err}");
    assert_eq!(FREED[1].load(Ordering::SeqCst), 1);
}

#[test]
fn fake_renderer_is_freed_through_its_module() -> anyhow::Result<()> {
    let registry = fake_module(EntryPoints {
        build_id: Some(matching_build_id),
        alloc: Some(alloc_healthy),
        free: Some(counting_free::<2>),
        ..EntryPoints::default()
    });

    let renderers = (0..3).map(|_| load_fake(&registry)).collect::<Result<Vec<_>, _>>()?;
    assert_eq!(use_count(&registry, "Fake"), Some(3));
    assert_eq!(renderers[0].renderer_id(), RendererId::Null);
    assert_eq!(renderers[0].name(), "");
    assert_eq!(FREED[2].load(Ordering::SeqCst), 0);

    drop(renderers);
    assert_eq!(FREED[2].load(Ordering::SeqCst), 3);
    assert!(!registry.lock().is_loaded("Fake"));
    Ok(())
}

#[test]
fn renderer_name_comes_from_the_name_export() -> anyhow::Result<()> {
    let registry = fake_module(EntryPoints {
        build_id: Some(matching_build_id),
        renderer_id: Some(null_renderer_id),
        name: Some(fake_name),
        alloc: Some(alloc_healthy),
        free: Some(counting_free::<3>),
    });

    let renderer = load_fake(&registry)?;
    assert_eq!(renderer.name(), "Fake Renderer 1.0");
    assert_eq!(renderer.module().name(), "Fake");
    assert_eq!(renderer.renderer_id(), RendererId::Null);

    drop(renderer);
    assert_eq!(FREED[3].load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn renderer_id_mismatch_frees_object_and_fails() {
    let registry = fake_module(EntryPoints {
        build_id: Some(matching_build_id),
        renderer_id: Some(vulkan_renderer_id),
        alloc: Some(alloc_healthy),
        free: Some(counting_free::<4>),
        ..EntryPoints::default()
    });

    match load_fake(&registry).unwrap_err() {
        RenderSystemError::RendererIdMismatch { name, expected, found } => {
            assert_eq!(name, "Fake");
            assert_eq!(expected, RendererId::Vulkan);
            assert_eq!(found, RendererId::Null);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(FREED[4].load(Ordering::SeqCst), 1);
    assert_eq!(registry.lock().render_system_count(), 0);
}

#[test]
fn null_alloc_fails() {
    let registry = fake_module(EntryPoints {
        build_id: Some(matching_build_id),
        alloc: Some(alloc_null),
        free: Some(counting_free::<0>),
        ..EntryPoints::default()
    });
    let err = load_fake(&registry).unwrap_err();
    assert!(matches!(err, RenderSystemError::AllocFailed { .. }), "{err}");
}

#[rstest]
#[case::no_alloc(None, Some(counting_free::<0> as _), SYMBOL_ALLOC)]
#[case::no_free(Some(alloc_healthy as _), None, SYMBOL_FREE)]
fn missing_entry_point_fails(
    #[case] alloc: Option<llgl_core::ffi::PFN_LLGL_RenderSystem_Alloc>,
    #[case] free: Option<llgl_core::ffi::PFN_LLGL_RenderSystem_Free>,
    #[case] missing: &str,
) {
    let registry = fake_module(EntryPoints {
        build_id: Some(matching_build_id),
        alloc,
        free,
        ..EntryPoints::default()
    });
    match load_fake(&registry).unwrap_err() {
        RenderSystemError::MissingEntryPoint { name, symbol } => {
            assert_eq!(name, "Fake");
            assert_eq!(symbol, missing);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(registry.lock().render_system_count(), 0);
}

#[rstest]
#[case::mismatch(Some(other_build_id as _), BUILD_ID ^ 0x7f00)]
#[case::absent(None, 0)]
fn build_id_mismatch_refuses_to_allocate(
    #[case] build_id: Option<llgl_core::ffi::PFN_LLGL_RenderSystem_BuildID>,
    #[case] found: c_int,
) {
    let registry = fake_module(EntryPoints {
        build_id,
        alloc: Some(alloc_null),
        ..EntryPoints::default()
    });
    match load_fake(&registry).unwrap_err() {
        RenderSystemError::BuildIdMismatch { expected, found: actual, .. } => {
            assert_eq!(expected, BUILD_ID);
            assert_eq!(actual, found);
        }
        other => panic!("unexpected error: {other}"),
    }
}
