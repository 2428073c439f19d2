// Per-slug single-flight: overlapping runs for the same bucket never interleave writes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<Mutex<HashSet<String>>>);

impl InFlight {
    /// None when `slug` is already held.
    pub fn try_acquire(&self, slug: &str) -> Option<InFlightGuard> {
        let mut held = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(slug.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            held: self.0.clone(),
            slug: slug.to_string(),
        })
    }
}

/// Releases the slug on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    held: Arc<Mutex<HashSet<String>>>,
    slug: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.slug);
    }
}
