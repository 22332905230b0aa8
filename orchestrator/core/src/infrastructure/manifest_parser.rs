// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Admission Manifest YAML Parser
//!
//! Parses Kubernetes-style admission manifests into descriptor handles,
//! manifest-declared fallbacks and orchestrator configuration.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Parse external YAML → Domain objects
//! - **Anti-Corruption:** Translates the manifest schema to descriptors and signatures
//!
//! # Manifest Format
//!
//! ```yaml
//! apiVersion: turnstile/v1
//! kind: AdmissionManifest
//! metadata:
//!   name: checkout
//! spec:
//!   orchestrator:
//!     release_order: forward
//!     admit_timeout_ms: 200
//!   fallbacks:
//!     busy: { status: "busy" }
//!   operations:
//!     - owner: OrderService
//!       operation: place_order
//!       parameters: [{ name: user_id, type: string }]
//!       resources:
//!         - guard: rate-limit
//!           key: "user:{{args.user_id}}"
//!           fallback: busy
//!           params: { rate: 10, capacity: 1 }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::orchestrator::Orchestrator;
use crate::domain::config::OrchestratorConfig;
use crate::domain::descriptor::{DescriptorHandle, ResourceDescriptor};
use crate::domain::key::KeyEvaluationError;
use crate::domain::operation::{OperationSignature, ParameterSpec};
use crate::domain::registry::ComponentResolutionError;
use crate::infrastructure::descriptor_source::InMemoryDescriptorSource;
use crate::infrastructure::fallbacks::StaticFallback;
use crate::infrastructure::key_evaluator::HandlebarsKeyEvaluator;
use crate::infrastructure::registry::ComponentRegistry;

pub const API_VERSION: &str = "turnstile/v1";
pub const KIND: &str = "AdmissionManifest";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid apiVersion '{0}', expected 'turnstile/v1'")]
    InvalidApiVersion(String),

    #[error("Invalid kind '{0}', expected 'AdmissionManifest'")]
    InvalidKind(String),

    #[error("Manifest validation failed: {0}")]
    Invalid(String),

    #[error(transparent)]
    KeyExpression(#[from] KeyEvaluationError),

    #[error(transparent)]
    Resolution(#[from] ComponentResolutionError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionManifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ManifestMetadata,
    pub spec: ManifestSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestSpec {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Fallback name → fixed result, registered as static fallbacks
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fallbacks: BTreeMap<String, Value>,

    #[serde(default)]
    pub operations: Vec<OperationManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationManifest {
    pub owner: String,
    pub operation: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
}

impl OperationManifest {
    pub fn signature(&self) -> OperationSignature {
        OperationSignature {
            owner: self.owner.clone(),
            operation: self.operation.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl AdmissionManifest {
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.api_version != API_VERSION {
            return Err(ManifestError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(ManifestError::InvalidKind(self.kind.clone()));
        }

        let evaluator = HandlebarsKeyEvaluator::new();
        let mut seen = HashSet::new();
        for op in &self.spec.operations {
            if op.owner.trim().is_empty() || op.operation.trim().is_empty() {
                return Err(ManifestError::Invalid(
                    "operation entries need both 'owner' and 'operation'".to_string(),
                ));
            }
            let signature = op.signature();
            if !seen.insert(signature.clone()) {
                return Err(ManifestError::Invalid(format!(
                    "operation {} is declared more than once",
                    signature
                )));
            }
            for (index, resource) in op.resources.iter().enumerate() {
                if resource.guard_name.trim().is_empty() {
                    return Err(ManifestError::Invalid(format!(
                        "resource #{} of {} has an empty guard name",
                        index,
                        signature.canonical_id()
                    )));
                }
                evaluator.validate(&resource.key_expression)?;
            }
        }
        Ok(())
    }

    /// Register every `spec.fallbacks` entry as a [`StaticFallback`].
    pub fn register_fallbacks(&self, registry: &mut ComponentRegistry) {
        for (name, value) in &self.spec.fallbacks {
            registry.register_fallback(name.clone(), Arc::new(StaticFallback::new(value.clone())));
        }
    }

    /// Attach each operation's resources, in declaration order.
    pub fn attach_descriptors(&self, source: &InMemoryDescriptorSource) -> Vec<(OperationSignature, Vec<Arc<DescriptorHandle>>)> {
        self.spec
            .operations
            .iter()
            .map(|op| {
                let signature = op.signature();
                let handles = op
                    .resources
                    .iter()
                    .map(|resource| source.register(&signature, resource.clone()))
                    .collect();
                (signature, handles)
            })
            .collect()
    }

    pub fn signatures(&self) -> Vec<OperationSignature> {
        self.spec.operations.iter().map(OperationManifest::signature).collect()
    }

    /// Build a ready orchestrator: manifest fallbacks on top of `registry`,
    /// descriptors in a fresh in-memory source and, when configured,
    /// metadata preloaded for every operation.
    pub fn build_orchestrator(&self, mut registry: ComponentRegistry) -> Result<Orchestrator, ManifestError> {
        self.register_fallbacks(&mut registry);

        let source = InMemoryDescriptorSource::new();
        let attached = self.attach_descriptors(&source);

        let orchestrator = Orchestrator::new(
            Arc::new(source),
            Arc::new(registry),
            Arc::new(HandlebarsKeyEvaluator::new()),
        )
        .with_config(self.spec.orchestrator.clone());

        if self.spec.orchestrator.preload {
            for (signature, _) in &attached {
                orchestrator.preload(signature)?;
            }
        }

        info!(
            "Loaded admission manifest '{}' with {} operation(s)",
            self.metadata.name,
            attached.len()
        );
        Ok(orchestrator)
    }
}

pub struct AdmissionManifestParser;

impl AdmissionManifestParser {
    /// Parse and validate a manifest from a YAML string
    pub fn parse_yaml(yaml: &str) -> Result<AdmissionManifest, ManifestError> {
        let manifest: AdmissionManifest = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        debug!(
            "Parsed manifest '{}' ({} operation(s))",
            manifest.metadata.name,
            manifest.spec.operations.len()
        );
        Ok(manifest)
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<AdmissionManifest, ManifestError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_yaml(&yaml)
    }

    pub fn to_yaml(manifest: &AdmissionManifest) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(manifest)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ReleaseOrder;
    use crate::domain::descriptor::DescriptorSource;

    const MANIFEST: &str = r#"
apiVersion: turnstile/v1
kind: AdmissionManifest
metadata:
  name: checkout
spec:
  orchestrator:
    release_order: reverse
  fallbacks:
    busy: "busy"
  operations:
    - owner: OrderService
      operation: place_order
      parameters:
        - name: user_id
          type: string
      resources:
        - guard: rate-limit
          key: "user:{{args.user_id}}"
          fallback: busy
          error_handler: bypass
          params: { rate: 10, capacity: 1 }
        - guard: mutex
          key: "{{owner}}"
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = AdmissionManifestParser::parse_yaml(MANIFEST).unwrap();

        assert_eq!(manifest.metadata.name, "checkout");
        assert_eq!(manifest.spec.orchestrator.release_order, ReleaseOrder::Reverse);
        assert!(manifest.spec.orchestrator.preload);
        assert_eq!(manifest.spec.fallbacks["busy"], Value::from("busy"));

        let op = &manifest.spec.operations[0];
        assert_eq!(op.signature().canonical_id(), "OrderService.place_order");
        assert_eq!(op.parameters[0].type_name, "string");
        assert_eq!(op.resources.len(), 2);
        assert_eq!(op.resources[0].error_handler_name, "bypass");
        assert!(op.resources[1].fallback_name.is_empty());
    }

    #[test]
    fn test_attach_keeps_declaration_order() {
        let manifest = AdmissionManifestParser::parse_yaml(MANIFEST).unwrap();
        let source = InMemoryDescriptorSource::new();
        manifest.attach_descriptors(&source);

        let handles = source.descriptors(&manifest.signatures()[0]);
        let guards: Vec<String> = handles
            .iter()
            .map(|h| h.snapshot().descriptor.guard_name.clone())
            .collect();
        assert_eq!(guards, vec!["rate-limit", "mutex"]);
    }

    #[test]
    fn test_build_orchestrator_preloads() {
        let manifest = AdmissionManifestParser::parse_yaml(MANIFEST).unwrap();
        let orchestrator = manifest.build_orchestrator(ComponentRegistry::with_builtins()).unwrap();
        assert_eq!(orchestrator.metadata_cache().len(), 2);
    }

    #[test]
    fn test_unknown_fallback_fails_preload() {
        let yaml = MANIFEST.replace("fallback: busy", "fallback: overloaded");
        let manifest = AdmissionManifestParser::parse_yaml(&yaml).unwrap();

        let err = manifest.build_orchestrator(ComponentRegistry::with_builtins()).err().unwrap();
        assert!(matches!(err, ManifestError::Resolution(_)));
    }

    #[test]
    fn test_validate_api_version_and_kind() {
        let err = AdmissionManifestParser::parse_yaml(&MANIFEST.replace("turnstile/v1", "turnstile/v0")).unwrap_err();
        assert!(err.to_string().contains("Invalid apiVersion"));

        let err = AdmissionManifestParser::parse_yaml(&MANIFEST.replace("kind: AdmissionManifest", "kind: Agent")).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidKind(_)));
    }

    #[test]
    fn test_validate_rejects_empty_guard_and_bad_key() {
        let err = AdmissionManifestParser::parse_yaml(&MANIFEST.replace("guard: mutex", "guard: \"\"")).unwrap_err();
        assert!(err.to_string().contains("empty guard name"));

        let err = AdmissionManifestParser::parse_yaml(&MANIFEST.replace("\"{{owner}}\"", "\"{{#if owner}}\"")).unwrap_err();
        assert!(matches!(err, ManifestError::KeyExpression(KeyEvaluationError::Syntax { .. })));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admission.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = AdmissionManifestParser::parse_file(&path).unwrap();
        assert_eq!(manifest.spec.operations.len(), 1);

        let err = AdmissionManifestParser::parse_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }
}
