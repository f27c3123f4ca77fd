//! Ordered controller registry.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use synergy_core::{Controller, Request, Schema, SharedController};

/// An ordered, internally synchronized list of controllers.
///
/// Registration order is the tie-break for resolution: when several
/// controllers can handle a request, the one registered first is tried
/// first. Mutation is expected during assembly, but is safe at any time;
/// in-flight requests keep the snapshot they enumerated.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: RwLock<Vec<SharedController>>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a controller.
    pub fn register<C: Controller>(&self, controller: C) {
        self.register_shared(Arc::new(controller));
    }

    /// Appends a controller that is shared elsewhere.
    pub fn register_shared(&self, controller: SharedController) {
        tracing::debug!(
            controller = controller.name(),
            schemas = ?controller.schemas(),
            "Controller registered"
        );
        self.controllers.write().push(controller);
    }

    /// Removes the first controller named `name`, returning it.
    pub fn remove(&self, name: &str) -> Option<SharedController> {
        let mut controllers = self.controllers.write();
        let index = controllers.iter().position(|c| c.name() == name)?;
        Some(controllers.remove(index))
    }

    /// Removes every controller.
    pub fn clear(&self) {
        self.controllers.write().clear();
    }

    /// Returns a snapshot of the registered controllers in order.
    #[must_use]
    pub fn controllers(&self) -> Vec<SharedController> {
        self.controllers.read().clone()
    }

    /// Returns the registered controller names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.controllers
            .read()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Returns the controllers that can handle `request`, in registration order.
    #[must_use]
    pub fn candidates(&self, request: &Request) -> Vec<SharedController> {
        self.controllers
            .read()
            .iter()
            .filter(|c| c.can_handle(request))
            .cloned()
            .collect()
    }

    /// Returns true if any controller serves `schema`, ignoring filters.
    #[must_use]
    pub fn declares_schema(&self, schema: &Schema) -> bool {
        self.controllers.read().iter().any(|c| c.serves(schema))
    }

    /// Returns the number of registered controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.read().len()
    }

    /// Returns true if no controller is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.read().is_empty()
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.names())
            .finish()
    }
}

impl<C: Controller> FromIterator<C> for ControllerRegistry {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        let registry = Self::new();
        for controller in iter {
            registry.register(controller);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synergy_core::fixtures::RecordingController;
    use synergy_core::ControllerFilter;

    fn registry() -> ControllerRegistry {
        [
            RecordingController::found("mem", "file"),
            RecordingController::found("disk", "file").with_tag("persistent"),
            RecordingController::found("kv", "memory"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_candidates_preserve_registration_order() {
        let registry = registry();
        let names: Vec<String> = registry
            .candidates(&Request::read("file", "a"))
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["mem", "disk"]);
    }

    #[test]
    fn test_candidates_apply_filter() {
        let registry = registry();
        let request = Request::read("file", "a").with_filter(ControllerFilter::by_tag("persistent"));
        let candidates = registry.candidates(&request);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name(), "disk");
    }

    #[test]
    fn test_declares_schema_ignores_filter() {
        let registry = registry();
        assert!(registry.declares_schema(&Schema::new("FILE")));
        assert!(!registry.declares_schema(&Schema::new("sql")));
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = registry();
        assert_eq!(registry.len(), 3);

        let removed = registry.remove("disk").unwrap();
        assert_eq!(removed.name(), "disk");
        assert!(registry.remove("disk").is_none());
        assert_eq!(registry.names(), vec!["mem", "kv"]);

        registry.clear();
        assert!(registry.is_empty());
    }
}
