//! Process-wide descriptor registry keyed by type.

use core::any::TypeId;
use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::{DescriptorBuilder, Injectable, ProviderDescriptor};

static DESCRIPTORS: OnceLock<RwLock<HashMap<TypeId, Arc<ProviderDescriptor>>>> = OnceLock::new();

/// Returns the descriptor of `T`, building it on first use.
///
/// The descriptor is built at most once per process from the point of view
/// of callers: if two threads race, the first one to finish wins and both
/// observe the same descriptor. Ephemeral keyed-injection ids are therefore
/// stable for the lifetime of the process.
#[must_use]
pub fn descriptor_of<T: Injectable>() -> Arc<ProviderDescriptor> {
    let descriptors = DESCRIPTORS.get_or_init(|| RwLock::new(HashMap::new()));
    let key = TypeId::of::<T>();

    if let Some(descriptor) = descriptors.read().get(&key) {
        return Arc::clone(descriptor);
    }

    // Built without holding the lock; `describe` may look up other types.
    let built = Arc::new(T::describe(DescriptorBuilder::new()).finish());

    Arc::clone(descriptors.write().entry(key).or_insert(built))
}
