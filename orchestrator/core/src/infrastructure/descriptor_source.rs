// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// In-Memory Descriptor Source
//
// Holds the ordered descriptor handles attached to each operation. Populated
// programmatically or from an admission manifest; lookups clone the handle
// list so attaching never blocks a running call for longer than the read.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::descriptor::{DescriptorHandle, DescriptorSource, ResourceDescriptor};
use crate::domain::operation::OperationSignature;

#[derive(Default)]
pub struct InMemoryDescriptorSource {
    attachments: RwLock<HashMap<OperationSignature, Vec<Arc<DescriptorHandle>>>>,
}

impl InMemoryDescriptorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handle` to the operation's admission order.
    pub fn attach(&self, signature: &OperationSignature, handle: Arc<DescriptorHandle>) {
        debug!("Attaching descriptor {} to {}", handle.id(), signature);
        self.attachments
            .write()
            .entry(signature.clone())
            .or_default()
            .push(handle);
    }

    /// Wrap `descriptor` in a new handle, attach it and return the handle.
    pub fn register(&self, signature: &OperationSignature, descriptor: ResourceDescriptor) -> Arc<DescriptorHandle> {
        let handle = DescriptorHandle::new(descriptor);
        self.attach(signature, Arc::clone(&handle));
        handle
    }

    /// Remove every descriptor of `signature`, returning the detached handles.
    pub fn detach_all(&self, signature: &OperationSignature) -> Vec<Arc<DescriptorHandle>> {
        self.attachments.write().remove(signature).unwrap_or_default()
    }

    /// Every operation with at least one descriptor
    pub fn operations(&self) -> Vec<OperationSignature> {
        self.attachments.read().keys().cloned().collect()
    }
}

impl DescriptorSource for InMemoryDescriptorSource {
    fn descriptors(&self, signature: &OperationSignature) -> Vec<Arc<DescriptorHandle>> {
        self.attachments
            .read()
            .get(signature)
            .cloned()
            .unwrap_or_default()
    }
}
