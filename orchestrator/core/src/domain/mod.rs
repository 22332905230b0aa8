// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Admission Domain Layer
//!
//! Pure types and plugin contracts. No I/O.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`operation`] | `OperationSignature`, `ParameterSpec` |
//! | [`call`] | `Call`, `CallSite` |
//! | [`descriptor`] | `ResourceDescriptor`, `DescriptorHandle`, `DescriptorSource` |
//! | [`guard`] | `Guard`, `GuardError`, `GuardParams` |
//! | [`error_handler`] | `ErrorHandler`, `AdmissionAttempt` |
//! | [`fallback`] | `FallbackResolver`, `FallbackRequest`, `FallbackError` |
//! | [`injector`] | `ArgumentInjector`, `InjectedArgs` |
//! | [`key`] | `KeyEvaluator`, `KeyContext`, `KeyEvaluationError` |
//! | [`registry`] | `ComponentResolver`, `ComponentResolutionError` |
//! | [`config`] | `OrchestratorConfig`, `ReleaseOrder` |
//!
//! Plugin authors only ever implement `Guard`, `ErrorHandler`,
//! `FallbackResolver` and `ArgumentInjector`.

pub mod call;
pub mod config;
pub mod descriptor;
pub mod error_handler;
pub mod fallback;
pub mod guard;
pub mod injector;
pub mod key;
pub mod operation;
pub mod registry;

pub use call::{Call, CallSite};
pub use config::{OrchestratorConfig, ReleaseOrder};
pub use descriptor::{DescriptorHandle, DescriptorId, DescriptorSource, ResourceDescriptor, VersionedDescriptor};
pub use error_handler::{AdmissionAttempt, ErrorHandler};
pub use fallback::{FallbackError, FallbackRequest, FallbackResolver};
pub use guard::{Guard, GuardError, GuardParams};
pub use injector::{ArgumentInjector, InjectedArgs};
pub use key::{KeyContext, KeyEvaluationError, KeyEvaluator};
pub use operation::{OperationSignature, ParameterSpec};
pub use registry::{ComponentKind, ComponentResolutionError, ComponentResolver};
