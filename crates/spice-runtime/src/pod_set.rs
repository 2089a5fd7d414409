use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::info;

use crate::error::PodError;
use crate::pod::Pod;

/// Loaded pods keyed by name. Names are unique within a process.
#[derive(Debug, Default)]
pub struct PodSet {
    pods: RwLock<IndexMap<String, Arc<Pod>>>,
}

impl PodSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, pod: Pod) -> Result<Arc<Pod>, PodError> {
        let mut pods = self.pods.write().unwrap_or_else(PoisonError::into_inner);
        if pods.contains_key(pod.name()) {
            return Err(PodError::DuplicatePod(pod.name().to_string()));
        }
        let pod = Arc::new(pod);
        pods.insert(pod.name().to_string(), Arc::clone(&pod));
        Ok(pod)
    }

    /// Swap in an instance under its own name, returning the previous one.
    pub fn replace(&self, pod: Pod) -> Option<Arc<Pod>> {
        let mut pods = self.pods.write().unwrap_or_else(PoisonError::into_inner);
        pods.insert(pod.name().to_string(), Arc::new(pod))
    }

    /// Reload `name` from disk and replace it. Readers holding the old
    /// `Arc` keep a consistent view until they drop it. A manifest renamed on
    /// disk moves the entry to its new name, unless that name is taken.
    pub fn reload(&self, name: &str, now: DateTime<Utc>) -> Result<Arc<Pod>, PodError> {
        let current = self
            .get(name)
            .ok_or_else(|| PodError::UnknownPod(name.to_string()))?;
        let next = Arc::new(current.reload(now)?);

        let mut pods = self.pods.write().unwrap_or_else(PoisonError::into_inner);
        if next.name() == name {
            pods.insert(name.to_string(), Arc::clone(&next));
        } else {
            if pods.contains_key(next.name()) {
                return Err(PodError::DuplicatePod(next.name().to_string()));
            }
            pods.shift_remove(name);
            pods.insert(next.name().to_string(), Arc::clone(&next));
            info!(old = %name, new = %next.name(), "pod renamed on reload");
        }
        info!(pod = %next.name(), hash = %next.hash(), "reloaded pod");
        Ok(next)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Pod>> {
        self.pods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn remove(&self, name: &str) -> Result<Arc<Pod>, PodError> {
        self.pods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(name)
            .ok_or_else(|| PodError::UnknownPod(name.to_string()))
    }

    /// Pod names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.pods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pods.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
