// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Key Expression Evaluator
//!
//! Renders descriptor key expressions with Handlebars.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn `key` templates into the string a guard partitions on
//! - **Integration:** `ExecutionContext::build` → `Guard::admit` / `Guard::release`
//!
//! # Variables
//!
//! - `{{guard}}` - registry name of the guard
//! - `{{owner}}`, `{{operation}}` - the operation's owning type and name
//! - `{{target.<path>}}` - snapshot of the target instance
//! - `{{args.<name>}}` - argument by declared parameter name
//! - `{{arg0}}`, `{{p0}}` - argument by position
//! - `{{injected.<name>}}` - values produced by argument injectors
//!
//! An empty expression evaluates to `"<owner>.<operation>"`. Plain
//! `{{path}}` references to a missing or `null` value are rejected before
//! rendering, and a render producing the empty string is an error.

use handlebars::Handlebars;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

use crate::domain::key::{KeyContext, KeyEvaluationError, KeyEvaluator};

/// Plain variable references: `{{ path.to.value }}`. Helpers and blocks are
/// left to Handlebars' strict mode.
static VARIABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\{?\s*([A-Za-z_][A-Za-z0-9_\-]*(?:\.(?:[A-Za-z0-9_\-]+|\[[^\]]+\]))*)\s*\}?\}\}")
        .expect("variable reference pattern is valid")
});

pub struct HandlebarsKeyEvaluator {
    templates: RwLock<Handlebars<'static>>,
}

impl HandlebarsKeyEvaluator {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        Self {
            templates: RwLock::new(handlebars),
        }
    }

    /// Check that `expression` compiles, without rendering it.
    pub fn validate(&self, expression: &str) -> Result<(), KeyEvaluationError> {
        if expression.is_empty() {
            return Ok(());
        }
        self.ensure_compiled(expression)
    }

    /// Number of distinct expressions compiled so far
    pub fn compiled_count(&self) -> usize {
        self.templates.read().get_templates().len()
    }

    fn ensure_compiled(&self, expression: &str) -> Result<(), KeyEvaluationError> {
        if self.templates.read().has_template(expression) {
            return Ok(());
        }

        let mut templates = self.templates.write();
        if templates.has_template(expression) {
            return Ok(());
        }
        templates
            .register_template_string(expression, expression)
            .map_err(|e| KeyEvaluationError::Syntax {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Compiled key expression '{}'", expression);
        Ok(())
    }

    /// JSON view of a call that expressions render against
    pub fn context_value(context: &KeyContext<'_>) -> Value {
        let mut root = Map::new();
        root.insert("guard".to_string(), Value::from(context.guard_name));
        root.insert("owner".to_string(), Value::from(context.signature.owner.as_str()));
        root.insert(
            "operation".to_string(),
            Value::from(context.signature.operation.as_str()),
        );
        root.insert(
            "target".to_string(),
            context.target.cloned().unwrap_or(Value::Null),
        );

        let mut named = Map::new();
        for (position, value) in context.args.iter().enumerate() {
            root.insert(format!("arg{}", position), value.clone());
            root.insert(format!("p{}", position), value.clone());
            if let Some(parameter) = context.signature.parameters.get(position) {
                named.insert(parameter.name.clone(), value.clone());
            }
        }
        root.insert("args".to_string(), Value::Object(named));
        root.insert(
            "injected".to_string(),
            Value::Object(context.injected.clone()),
        );

        Value::Object(root)
    }

    fn check_references(expression: &str, data: &Value) -> Result<(), KeyEvaluationError> {
        for captures in VARIABLE_REFERENCE.captures_iter(expression) {
            let path = &captures[1];
            if path == "this" || path == "else" {
                continue;
            }
            match lookup(data, path) {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Err(KeyEvaluationError::Unresolved {
                        expression: expression.to_string(),
                        path: path.to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

impl Default for HandlebarsKeyEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEvaluator for HandlebarsKeyEvaluator {
    fn evaluate(&self, expression: &str, context: &KeyContext<'_>) -> Result<String, KeyEvaluationError> {
        if expression.is_empty() {
            return Ok(context.signature.canonical_id());
        }

        self.ensure_compiled(expression)?;

        let data = Self::context_value(context);
        Self::check_references(expression, &data)?;

        let key = self
            .templates
            .read()
            .render(expression, &data)
            .map_err(|e| KeyEvaluationError::Render {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        if key.is_empty() {
            return Err(KeyEvaluationError::Empty {
                expression: expression.to_string(),
            });
        }
        Ok(key)
    }
}

/// Walk a dotted path (`a.b.0`, `a.[weird key]`) through a JSON value.
fn lookup<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(root, |current, segment| {
        let segment = segment.trim_start_matches('[').trim_end_matches(']');
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::injector::InjectedArgs;
    use crate::domain::operation::OperationSignature;
    use serde_json::json;

    fn signature() -> OperationSignature {
        OperationSignature::new("OrderService", "place_order")
            .with_parameter("user_id", "string")
            .with_parameter("order", "Order")
    }

    fn evaluate(expression: &str, args: &[Value], injected: &InjectedArgs) -> Result<String, KeyEvaluationError> {
        let signature = signature();
        let target = json!({"region": "eu-west"});
        let context = KeyContext {
            guard_name: "rate-limit",
            signature: &signature,
            target: Some(&target),
            args,
            injected,
        };
        let evaluator = HandlebarsKeyEvaluator::new();
        evaluator.evaluate(expression, &context)
    }

    #[test]
    fn test_empty_expression_is_canonical_id() {
        let key = evaluate("", &[], &InjectedArgs::new()).unwrap();
        assert_eq!(key, "OrderService.place_order");
    }

    #[test]
    fn test_named_and_positional_arguments() {
        let args = [json!("u-42"), json!({"id": 7, "total": 12.5})];
        let injected = InjectedArgs::new();

        assert_eq!(evaluate("user:{{args.user_id}}", &args, &injected).unwrap(), "user:u-42");
        assert_eq!(evaluate("{{arg0}}/{{p1.id}}", &args, &injected).unwrap(), "u-42/7");
        assert_eq!(
            evaluate("{{owner}}.{{operation}}#{{guard}}", &args, &injected).unwrap(),
            "OrderService.place_order#rate-limit"
        );
    }

    #[test]
    fn test_target_and_injected_values() {
        let mut injected = InjectedArgs::new();
        injected.insert("tenant".to_string(), json!("acme"));

        let key = evaluate("{{injected.tenant}}@{{target.region}}", &[json!("u-1")], &injected).unwrap();
        assert_eq!(key, "acme@eu-west");
    }

    #[test]
    fn test_no_html_escaping() {
        let key = evaluate("{{arg0}}", &[json!("a&b<c>")], &InjectedArgs::new()).unwrap();
        assert_eq!(key, "a&b<c>");
    }

    #[test]
    fn test_missing_and_null_references_fail() {
        let injected = InjectedArgs::new();

        let err = evaluate("user:{{args.nickname}}", &[json!("u-1")], &injected).unwrap_err();
        assert!(matches!(err, KeyEvaluationError::Unresolved { ref path, .. } if path == "args.nickname"));

        let err = evaluate("user:{{args.user_id}}", &[Value::Null], &injected).unwrap_err();
        assert!(matches!(err, KeyEvaluationError::Unresolved { .. }));
    }

    #[test]
    fn test_empty_render_fails() {
        let err = evaluate("{{arg0}}", &[json!("")], &InjectedArgs::new()).unwrap_err();
        assert!(matches!(err, KeyEvaluationError::Empty { .. }));
    }

    #[test]
    fn test_syntax_error() {
        let err = evaluate("{{#if arg0}}", &[json!("x")], &InjectedArgs::new()).unwrap_err();
        assert!(matches!(err, KeyEvaluationError::Syntax { .. }));
    }

    #[test]
    fn test_compiled_templates_are_cached() {
        let signature = signature();
        let evaluator = HandlebarsKeyEvaluator::new();
        let injected = InjectedArgs::new();
        let context = KeyContext {
            guard_name: "mutex",
            signature: &signature,
            target: None,
            args: &[json!("a")],
            injected: &injected,
        };

        for _ in 0..3 {
            evaluator.evaluate("k:{{arg0}}", &context).unwrap();
        }
        assert_eq!(evaluator.compiled_count(), 1);
        assert!(evaluator.validate("{{unclosed").is_err());
        assert!(evaluator.validate("").is_ok());
    }
}
