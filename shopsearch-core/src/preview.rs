//! Revocable local preview references for selected images.
//!
//! A `PreviewRegistry` hands out `blob:` style URLs that let a front end show
//! the selected image before it is uploaded. Each URL is owned by a
//! `PreviewHandle`; dropping the handle revokes the URL and frees the bytes it
//! pins. The registry keeps a log of the most recent revocations so callers
//! (and tests) can check that every handle was released exactly once.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::types::SelectedFile;

const PREVIEW_SCHEME: &str = "blob:shopsearch/";

/// Revocations remembered for `revocations`; older entries are forgotten.
const REVOCATION_LOG_LIMIT: usize = 64;

#[derive(Default)]
struct Inner {
    live: HashMap<String, Arc<SelectedFile>>,
    revoked: VecDeque<String>,
}

/// Allocator for preview URLs. Cheap to clone; clones share the same table.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a preview URL for `file`.
    pub fn acquire(&self, file: Arc<SelectedFile>) -> PreviewHandle {
        let url = format!("{PREVIEW_SCHEME}{}", uuid::Uuid::new_v4());
        self.lock().live.insert(url.clone(), file);
        log::debug!("preview acquired: {url}");
        PreviewHandle {
            url,
            registry: self.clone(),
        }
    }

    /// Look up the file behind a live preview URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<SelectedFile>> {
        self.lock().live.get(url).cloned()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.lock().live.contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// How many times `url` has been revoked, among recent revocations.
    pub fn revocations(&self, url: &str) -> usize {
        self.lock().revoked.iter().filter(|u| *u == url).count()
    }

    fn revoke(&self, url: &str) {
        let mut inner = self.lock();
        if inner.live.remove(url).is_none() {
            log::warn!("preview {url} revoked twice");
        }
        if inner.revoked.len() == REVOCATION_LOG_LIMIT {
            inner.revoked.pop_front();
        }
        inner.revoked.push_back(url.to_string());
        log::debug!("preview revoked: {url}");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive owner of one preview URL. Revokes it on drop.
pub struct PreviewHandle {
    url: String,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle").field("url", &self.url).finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}
