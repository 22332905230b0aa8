// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Argument injectors shipped with the crate.

use serde_json::Value;

use crate::domain::injector::{ArgumentInjector, InjectedArgs};

/// Adapts a closure over the positional arguments.
pub struct FnInjector<F> {
    inject: F,
}

impl<F> FnInjector<F>
where
    F: Fn(&[Value]) -> InjectedArgs + Send + Sync,
{
    pub fn new(inject: F) -> Self {
        Self { inject }
    }
}

impl<F> ArgumentInjector for FnInjector<F>
where
    F: Fn(&[Value]) -> InjectedArgs + Send + Sync,
{
    fn inject(&self, args: &[Value]) -> InjectedArgs {
        (self.inject)(args)
    }
}

/// Copies a field of one positional argument into the injected map.
///
/// `pointer` is a JSON pointer into the argument (`/customer/tenant`); an
/// empty pointer copies the whole argument. Absent values inject nothing.
#[derive(Debug, Clone)]
pub struct ArgumentFieldInjector {
    name: String,
    position: usize,
    pointer: String,
}

impl ArgumentFieldInjector {
    pub fn new(name: impl Into<String>, position: usize, pointer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position,
            pointer: pointer.into(),
        }
    }
}

impl ArgumentInjector for ArgumentFieldInjector {
    fn inject(&self, args: &[Value]) -> InjectedArgs {
        let mut injected = InjectedArgs::new();
        let value = args
            .get(self.position)
            .and_then(|arg| arg.pointer(&self.pointer))
            .filter(|value| !value.is_null());
        if let Some(value) = value {
            injected.insert(self.name.clone(), value.clone());
        }
        injected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_injector() {
        let injector = ArgumentFieldInjector::new("tenant", 1, "/customer/tenant");
        let args = [json!("ignored"), json!({"customer": {"tenant": "acme"}})];

        assert_eq!(injector.inject(&args)["tenant"], json!("acme"));
        assert!(injector.inject(&args[..1]).is_empty());

        let whole = ArgumentFieldInjector::new("first", 0, "");
        assert_eq!(whole.inject(&args)["first"], json!("ignored"));
    }

    #[test]
    fn test_fn_injector() {
        let injector = FnInjector::new(|args: &[Value]| {
            let mut injected = InjectedArgs::new();
            injected.insert("count".to_string(), json!(args.len()));
            injected
        });
        assert_eq!(injector.inject(&[json!(1), json!(2)])["count"], json!(2));
    }
}
