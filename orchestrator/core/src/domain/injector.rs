// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Argument Injector Plugin Interface
//!
//! Injectors derive extra named values from the call arguments. Their outputs
//! are merged in declaration order, later injectors overwriting earlier ones on
//! key collision, and exposed to key expressions under `injected.<name>`.

use serde_json::{Map, Value};

/// Merged injected values
pub type InjectedArgs = Map<String, Value>;

pub trait ArgumentInjector: Send + Sync {
    fn inject(&self, args: &[Value]) -> InjectedArgs;
}

/// Merge injector outputs, last write wins.
pub fn merge_injected<'a, I>(injectors: I, args: &[Value]) -> InjectedArgs
where
    I: IntoIterator<Item = &'a dyn ArgumentInjector>,
{
    let mut merged = InjectedArgs::new();
    for injector in injectors {
        merged.extend(injector.inject(args));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Value);

    impl ArgumentInjector for Fixed {
        fn inject(&self, _args: &[Value]) -> InjectedArgs {
            self.0.as_object().cloned().unwrap_or_default()
        }
    }

    #[test]
    fn test_later_injector_overwrites() {
        let first = Fixed(json!({"tenant": "a", "region": "eu"}));
        let second = Fixed(json!({"tenant": "b"}));

        let merged = merge_injected([&first as &dyn ArgumentInjector, &second], &[]);

        assert_eq!(merged["tenant"], json!("b"));
        assert_eq!(merged["region"], json!("eu"));
    }
}
