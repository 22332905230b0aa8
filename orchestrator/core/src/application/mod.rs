// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod execution_context;
pub mod metadata;
pub mod orchestrator;
pub mod release;

pub use execution_context::{Admission, ExecutionContext};
pub use metadata::{MetadataCache, ResourceMetadata};
pub use orchestrator::{AdmissionError, Orchestrator};
pub use release::{Grant, GrantedGuards};
