// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Component Registry - Name → Factory Resolution
//
// Explicit registration map handed to the orchestrator at construction.
// Everything a descriptor can name (guards, error handlers, fallbacks,
// injectors) must be registered here before the first call; an unknown name
// fails metadata resolution instead of being discovered reflectively.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::error_handler::ErrorHandler;
use crate::domain::fallback::FallbackResolver;
use crate::domain::guard::Guard;
use crate::domain::injector::ArgumentInjector;
use crate::domain::operation::OperationSignature;
use crate::domain::registry::{ComponentKind, ComponentResolutionError, ComponentResolver, DEFAULT_COMPONENT};
use crate::infrastructure::error_handlers::{FailClosedHandler, FailOpenHandler};
use crate::infrastructure::fallbacks::{NullFallback, RejectFallback};
use crate::infrastructure::guards::{ConcurrencyGuard, MutexGuard, RateLimitGuard};

/// Produces a component instance on every resolution
pub type Factory<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

/// Names under which [`ComponentRegistry::with_builtins`] registers components
pub mod builtin {
    pub const RATE_LIMIT: &str = "rate-limit";
    pub const MUTEX: &str = "mutex";
    pub const CONCURRENCY: &str = "concurrency";
    pub const BYPASS: &str = "bypass";
    pub const DENY: &str = "deny";
    pub const NULL: &str = "null";
    pub const REJECT: &str = "reject";
}

/// Fallback scoped to one owning type, preferred over a global fallback of
/// the same name when its parameter types match the operation's.
struct LocalFallback {
    parameter_types: Vec<String>,
    resolver: Arc<dyn FallbackResolver>,
}

pub struct ComponentRegistry {
    guards: HashMap<String, Factory<dyn Guard>>,
    error_handlers: HashMap<String, Factory<dyn ErrorHandler>>,
    fallbacks: HashMap<String, Factory<dyn FallbackResolver>>,
    injectors: HashMap<String, Factory<dyn ArgumentInjector>>,
    local_fallbacks: HashMap<(String, String), Vec<LocalFallback>>,
}

impl ComponentRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            guards: HashMap::new(),
            error_handlers: HashMap::new(),
            fallbacks: HashMap::new(),
            injectors: HashMap::new(),
            local_fallbacks: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in guards, error handlers and
    /// fallbacks, including the `"default"` error handler (fail closed) and
    /// fallback (returns `null`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry
            .register_guard(builtin::RATE_LIMIT, Arc::new(RateLimitGuard::new()))
            .register_guard(builtin::MUTEX, Arc::new(MutexGuard::new()))
            .register_guard(builtin::CONCURRENCY, Arc::new(ConcurrencyGuard::new()));

        let fail_closed: Arc<dyn ErrorHandler> = Arc::new(FailClosedHandler);
        registry
            .register_error_handler(DEFAULT_COMPONENT, Arc::clone(&fail_closed))
            .register_error_handler(builtin::DENY, fail_closed)
            .register_error_handler(builtin::BYPASS, Arc::new(FailOpenHandler));

        let null: Arc<dyn FallbackResolver> = Arc::new(NullFallback);
        registry
            .register_fallback(DEFAULT_COMPONENT, Arc::clone(&null))
            .register_fallback(builtin::NULL, null)
            .register_fallback(builtin::REJECT, Arc::new(RejectFallback));

        info!(
            "Component registry initialized with {} guard(s), {} error handler(s), {} fallback(s)",
            registry.guards.len(),
            registry.error_handlers.len(),
            registry.fallbacks.len()
        );

        registry
    }

    /// Register a shared guard instance. Every descriptor naming it shares its state.
    pub fn register_guard(&mut self, name: impl Into<String>, guard: Arc<dyn Guard>) -> &mut Self {
        self.register_guard_factory(name, move || Arc::clone(&guard))
    }

    /// Register a guard factory. Each metadata resolution gets a fresh instance.
    pub fn register_guard_factory<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn Guard> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registering guard '{}'", name);
        self.guards.insert(name, Arc::new(factory));
        self
    }

    pub fn register_error_handler(&mut self, name: impl Into<String>, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        let name = name.into();
        debug!("Registering error handler '{}'", name);
        self.error_handlers.insert(name, Arc::new(move || Arc::clone(&handler)));
        self
    }

    pub fn register_fallback(&mut self, name: impl Into<String>, fallback: Arc<dyn FallbackResolver>) -> &mut Self {
        let name = name.into();
        debug!("Registering fallback '{}'", name);
        self.fallbacks.insert(name, Arc::new(move || Arc::clone(&fallback)));
        self
    }

    pub fn register_injector(&mut self, name: impl Into<String>, injector: Arc<dyn ArgumentInjector>) -> &mut Self {
        let name = name.into();
        debug!("Registering argument injector '{}'", name);
        self.injectors.insert(name, Arc::new(move || Arc::clone(&injector)));
        self
    }

    /// Register a fallback local to `owner`, applicable to operations whose
    /// parameter types equal `parameter_types`.
    pub fn register_local_fallback(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        parameter_types: Vec<String>,
        fallback: Arc<dyn FallbackResolver>,
    ) -> &mut Self {
        let key = (owner.into(), name.into());
        debug!("Registering local fallback '{}' on {}", key.1, key.0);
        let entries = self.local_fallbacks.entry(key).or_default();
        entries.retain(|existing| existing.parameter_types != parameter_types);
        entries.push(LocalFallback {
            parameter_types,
            resolver: fallback,
        });
        self
    }

    pub fn contains(&self, kind: ComponentKind, name: &str) -> bool {
        match kind {
            ComponentKind::Guard => self.guards.contains_key(name),
            ComponentKind::ErrorHandler => self.error_handlers.contains_key(name),
            ComponentKind::Fallback => self.fallbacks.contains_key(name),
            ComponentKind::Injector => self.injectors.contains_key(name),
        }
    }

    /// Registered names of one kind, sorted
    pub fn names(&self, kind: ComponentKind) -> Vec<String> {
        let mut names: Vec<String> = match kind {
            ComponentKind::Guard => self.guards.keys().cloned().collect(),
            ComponentKind::ErrorHandler => self.error_handlers.keys().cloned().collect(),
            ComponentKind::Fallback => self.fallbacks.keys().cloned().collect(),
            ComponentKind::Injector => self.injectors.keys().cloned().collect(),
        };
        names.sort();
        names
    }

    fn lookup<T: ?Sized>(
        map: &HashMap<String, Factory<T>>,
        kind: ComponentKind,
        name: &str,
    ) -> Result<Arc<T>, ComponentResolutionError> {
        map.get(name)
            .map(|factory| factory())
            .ok_or_else(|| ComponentResolutionError::NotFound {
                kind,
                name: name.to_string(),
            })
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ComponentResolver for ComponentRegistry {
    fn guard(&self, name: &str) -> Result<Arc<dyn Guard>, ComponentResolutionError> {
        Self::lookup(&self.guards, ComponentKind::Guard, name)
    }

    fn error_handler(&self, name: &str) -> Result<Arc<dyn ErrorHandler>, ComponentResolutionError> {
        Self::lookup(&self.error_handlers, ComponentKind::ErrorHandler, name)
    }

    fn fallback(
        &self,
        name: &str,
        signature: &OperationSignature,
    ) -> Result<Arc<dyn FallbackResolver>, ComponentResolutionError> {
        let local = self
            .local_fallbacks
            .get(&(signature.owner.clone(), name.to_string()))
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|entry| entry.parameter_types.iter().map(String::as_str).eq(signature.parameter_types()))
            });

        if let Some(entry) = local {
            debug!("Using local fallback '{}' declared on {}", name, signature.owner);
            return Ok(Arc::clone(&entry.resolver));
        }

        Self::lookup(&self.fallbacks, ComponentKind::Fallback, name)
    }

    fn injector(&self, name: &str) -> Result<Arc<dyn ArgumentInjector>, ComponentResolutionError> {
        Self::lookup(&self.injectors, ComponentKind::Injector, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fallbacks::StaticFallback;
    use serde_json::json;

    #[test]
    fn test_builtins_registered() {
        let registry = ComponentRegistry::with_builtins();

        assert_eq!(
            registry.names(ComponentKind::Guard),
            vec!["concurrency", "mutex", "rate-limit"]
        );
        assert!(registry.contains(ComponentKind::ErrorHandler, DEFAULT_COMPONENT));
        assert!(registry.contains(ComponentKind::Fallback, DEFAULT_COMPONENT));
        assert!(registry.names(ComponentKind::Injector).is_empty());
    }

    #[test]
    fn test_shared_instance_vs_factory() {
        let mut registry = ComponentRegistry::new();
        registry.register_guard("shared", Arc::new(MutexGuard::new()));
        registry.register_guard_factory("fresh", || Arc::new(MutexGuard::new()) as Arc<dyn Guard>);

        let a = registry.guard("shared").unwrap();
        let b = registry.guard("shared").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = registry.guard("fresh").unwrap();
        let d = registry.guard("fresh").unwrap();
        assert!(!Arc::ptr_eq(&c, &d));
    }

    #[test]
    fn test_unknown_name() {
        let registry = ComponentRegistry::new();
        let err = registry.injector("tenant").err().unwrap();
        assert!(matches!(
            err,
            ComponentResolutionError::NotFound { kind: ComponentKind::Injector, ref name } if name == "tenant"
        ));
    }

    #[tokio::test]
    async fn test_local_fallback_preferred_when_signature_matches() {
        use crate::domain::descriptor::ResourceDescriptor;
        use crate::domain::fallback::FallbackRequest;

        let mut registry = ComponentRegistry::with_builtins();
        registry.register_fallback("busy", Arc::new(StaticFallback::new(json!("global"))));
        registry.register_local_fallback(
            "Orders",
            "busy",
            vec!["string".to_string()],
            Arc::new(StaticFallback::new(json!("local"))),
        );

        let matching = OperationSignature::new("Orders", "place").with_parameter("user", "string");
        let other_params = OperationSignature::new("Orders", "place").with_parameter("user", "u64");
        let other_owner = OperationSignature::new("Billing", "place").with_parameter("user", "string");

        let descriptor = ResourceDescriptor::new("mutex");
        for (signature, expected) in [
            (&matching, "local"),
            (&other_params, "global"),
            (&other_owner, "global"),
        ] {
            let fallback = registry.fallback("busy", signature).unwrap();
            let request = FallbackRequest {
                signature,
                args: &[],
                descriptor: &descriptor,
                target: None,
                key: "k",
                guard_error: None,
            };
            assert_eq!(fallback.resolve(&request).await.unwrap(), json!(expected));
        }
    }
}
