//! Process-wide cache of backend modules and the renderers allocated from
//! them.
//!
//! A module is *loaded* by [`RenderSystemRegistry::load_module`] but only
//! *retained* by [`RenderSystemRegistry::register_render_system`]. When the
//! last registered renderer of a module is unregistered, the module leaves
//! the cache and its library is unloaded once the final `Arc` goes away.
//!
//! The registry itself is a plain struct so tests can use private
//! instances; [`RenderSystemRegistry::global`] is the shared one.

use std::sync::Arc;

use llgl_core::EntryPoints;
use llgl_platform::{module_filename, Module};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::RenderSystemError;
use crate::module::{find_modules_with, RenderSystemModule};

/// Identity of a renderer object: its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererHandle(usize);

impl RendererHandle {
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }
}

pub type SharedRegistry = Arc<Mutex<RenderSystemRegistry>>;

static GLOBAL: Lazy<SharedRegistry> = Lazy::new(|| Arc::new(Mutex::new(RenderSystemRegistry::new())));

#[derive(Debug, Default)]
pub struct RenderSystemRegistry {
    static_modules: Vec<(String, EntryPoints)>,
    modules: Vec<Arc<RenderSystemModule>>,
    render_systems: Vec<(RendererHandle, Arc<RenderSystemModule>)>,
}

impl RenderSystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh registry behind the lock type [`RenderSystem`] expects.
    ///
    /// [`RenderSystem`]: crate::RenderSystem
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn global() -> &'static SharedRegistry {
        &GLOBAL
    }

    /// Make a backend linked into the executable loadable by `name`.
    /// Replaces an earlier registration of the same name.
    pub fn register_static_module(&mut self, name: impl Into<String>, entry_points: EntryPoints) {
        let name = name.into();
        debug!("registered static render system module \"{name}\"");
        match self.static_modules.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry_points,
            None => self.static_modules.push((name, entry_points)),
        }
    }

    /// Cached module named `name`, loading it on first use.
    ///
    /// Loading does not retain the module; a failed load leaves the cache
    /// untouched.
    pub fn load_module(&mut self, name: &str) -> Result<Arc<RenderSystemModule>, RenderSystemError> {
        if let Some(module) = self.find_module(name) {
            return Ok(module);
        }

        let module = match self.static_modules.iter().find(|(n, _)| n == name) {
            Some((_, entry_points)) => RenderSystemModule::from_static(name, *entry_points),
            None => RenderSystemModule::load(name)?,
        };
        let module = Arc::new(module);
        self.modules.push(Arc::clone(&module));
        Ok(module)
    }

    /// Record that `handle` was allocated from `module`.
    ///
    /// Returns false, changing nothing, if `module` is not in this registry
    /// or `handle` is already registered.
    pub fn register_render_system(&mut self, handle: RendererHandle, module: &Arc<RenderSystemModule>) -> bool {
        if !self.modules.iter().any(|m| Arc::ptr_eq(m, module)) {
            warn!("render system module \"{}\" is not owned by this registry", module.name());
            return false;
        }
        if self.render_systems.iter().any(|(h, _)| *h == handle) {
            warn!("render system {handle:?} is already registered");
            return false;
        }
        let count = module.add_ref();
        debug!("render system module \"{}\" use count: {count}", module.name());
        self.render_systems.push((handle, Arc::clone(module)));
        true
    }

    /// Forget `handle`, evicting its module when no renderer uses it anymore.
    ///
    /// Returns false if `handle` was never registered.
    pub fn unregister_render_system(&mut self, handle: RendererHandle) -> bool {
        let Some(index) = self.render_systems.iter().position(|(h, _)| *h == handle) else {
            warn!("render system {handle:?} is not registered");
            return false;
        };
        let (_, module) = self.render_systems.remove(index);
        let count = module.release();
        debug!("render system module \"{}\" use count: {count}", module.name());
        if count == 0 {
            self.evict(&module);
        }
        true
    }

    /// Evict every cached module without live renderers. Returns how many
    /// were dropped.
    pub fn unload_unused(&mut self) -> usize {
        let before = self.modules.len();
        self.modules.retain(|module| module.use_count() > 0);
        before - self.modules.len()
    }

    /// Known backends usable right now: static modules plus dynamic libraries
    /// that can be loaded, in platform priority order. Static modules with
    /// unknown names follow.
    pub fn find_modules(&self) -> Vec<String> {
        let mut names = find_modules_with(|name| {
            self.is_static(name) || Module::is_available(module_filename(name))
        });
        for (name, _) in &self.static_modules {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    pub fn find_module(&self, name: &str) -> Option<Arc<RenderSystemModule>> {
        self.modules.iter().find(|m| m.name() == name).cloned()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name() == name)
    }

    pub fn is_static(&self, name: &str) -> bool {
        self.static_modules.iter().any(|(n, _)| n == name)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn render_system_count(&self) -> usize {
        self.render_systems.len()
    }

    fn evict(&mut self, module: &Arc<RenderSystemModule>) {
        self.modules.retain(|m| !Arc::ptr_eq(m, module));
        debug!("evicted render system module \"{}\"", module.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[&str]) -> RenderSystemRegistry {
        let mut registry = RenderSystemRegistry::new();
        for name in names {
            registry.register_static_module(*name, EntryPoints::default());
        }
        registry
    }

    fn handle(n: usize) -> RendererHandle {
        RendererHandle(0x1000 + n * 0x10)
    }

    #[test]
    fn load_module_is_deduplicated() {
        let mut registry = registry_with(&["Null"]);
        let first = registry.load_module("Null").unwrap();
        for _ in 0..8 {
            let again = registry.load_module("Null").unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(registry.module_count(), 1);
        assert_eq!(first.use_count(), 0);
    }

    #[test]
    fn failed_load_leaves_cache_empty() {
        let mut registry = RenderSystemRegistry::new();
        let err = registry.load_module("Direct3D99").unwrap_err();
        assert_eq!(err.module_name(), "Direct3D99");
        assert_eq!(registry.module_count(), 0);
        assert!(!registry.is_loaded("Direct3D99"));
    }

    #[test]
    fn module_evicted_after_last_unregister() {
        let mut registry = registry_with(&["Null"]);
        let module = registry.load_module("Null").unwrap();

        const K: usize = 5;
        for i in 0..K {
            assert!(registry.register_render_system(handle(i), &module));
        }
        assert_eq!(module.use_count(), K);

        for i in 0..K - 1 {
            assert!(registry.unregister_render_system(handle(i)));
            assert!(registry.is_loaded("Null"));
        }
        let again = registry.load_module("Null").unwrap();
        assert!(Arc::ptr_eq(&module, &again));
        assert_eq!(module.use_count(), 1);

        assert!(registry.unregister_render_system(handle(K - 1)));
        assert!(!registry.is_loaded("Null"));
        assert_eq!(module.use_count(), 0);
        assert_eq!(registry.render_system_count(), 0);
    }

    #[test]
    fn foreign_module_is_rejected() {
        let mut registry = registry_with(&["Null"]);
        let owned = registry.load_module("Null").unwrap();
        let foreign = Arc::new(RenderSystemModule::from_static("Null", EntryPoints::default()));

        assert!(!registry.register_render_system(handle(0), &foreign));
        assert_eq!(foreign.use_count(), 0);
        assert_eq!(owned.use_count(), 0);
        assert_eq!(registry.render_system_count(), 0);
    }

    #[test]
    fn duplicate_handle_is_rejected() {
        let mut registry = registry_with(&["Null"]);
        let module = registry.load_module("Null").unwrap();
        assert!(registry.register_render_system(handle(0), &module));
        assert!(!registry.register_render_system(handle(0), &module));
        assert_eq!(module.use_count(), 1);
    }

    #[test]
    fn second_unregister_is_a_no_op() {
        let mut registry = registry_with(&["Null"]);
        let module = registry.load_module("Null").unwrap();
        assert!(registry.register_render_system(handle(0), &module));
        assert!(registry.register_render_system(handle(1), &module));

        assert!(registry.unregister_render_system(handle(0)));
        assert_eq!(module.use_count(), 1);
        assert!(!registry.unregister_render_system(handle(0)));
        assert_eq!(module.use_count(), 1);
        assert!(registry.is_loaded("Null"));
    }

    #[test]
    fn unload_unused_keeps_retained_modules() {
        let mut registry = registry_with(&["Null", "Other"]);
        let null = registry.load_module("Null").unwrap();
        registry.load_module("Other").unwrap();
        assert!(registry.register_render_system(handle(0), &null));

        assert_eq!(registry.unload_unused(), 1);
        assert!(registry.is_loaded("Null"));
        assert!(!registry.is_loaded("Other"));
    }

    #[test]
    fn static_registration_replaces_by_name() {
        let mut registry = registry_with(&["Null", "Null"]);
        assert!(registry.is_static("Null"));
        assert_eq!(registry.find_modules().iter().filter(|n| *n == "Null").count(), 1);
    }

    #[test]
    fn find_modules_lists_static_backends() {
        let registry = registry_with(&["Null", "Custom"]);
        let found = registry.find_modules();
        assert!(found.contains(&"Null".to_string()));
        assert_eq!(found.last().map(String::as_str), Some("Custom"));
        assert!(!found.iter().any(|n| n == "Direct3D99"));
    }
}
