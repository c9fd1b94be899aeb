//! Local preview references
//!
//! A record selected while the owning entity does not exist yet gets a
//! locally generated url. Each such url is released exactly once: when its
//! record is deleted, displaced, reset, or torn down.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::SelectedFile;

/// Allocator for ephemeral preview urls
pub trait PreviewUrls: Send + Sync {
    /// Create a url that renders `file` until released
    fn allocate(&self, file: &SelectedFile) -> String;

    /// Give back a url obtained from `allocate`
    fn release(&self, url: &str);
}

/// In-process preview registry
///
/// Urls look like `blob:marketplace/<uuid>`. Counters make the release
/// discipline observable in tests.
#[derive(Debug, Default)]
pub struct MemoryPreviewUrls {
    live: Mutex<HashSet<String>>,
    allocated: AtomicUsize,
    released: AtomicUsize,
    invalid_releases: AtomicUsize,
}

impl MemoryPreviewUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Urls allocated and not yet released
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.lock().contains(url)
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Releases of urls that were unknown or already released
    pub fn invalid_releases(&self) -> usize {
        self.invalid_releases.load(Ordering::SeqCst)
    }
}

impl PreviewUrls for MemoryPreviewUrls {
    fn allocate(&self, file: &SelectedFile) -> String {
        let url = format!("blob:marketplace/{}", Uuid::new_v4());
        self.live.lock().insert(url.clone());
        self.allocated.fetch_add(1, Ordering::SeqCst);
        debug!(url = %url, file = %file.name, size = file.size(), "Preview allocated");
        url
    }

    fn release(&self, url: &str) {
        if self.live.lock().remove(url) {
            self.released.fetch_add(1, Ordering::SeqCst);
            debug!(url = %url, "Preview released");
        } else {
            self.invalid_releases.fetch_add(1, Ordering::SeqCst);
            warn!(url = %url, "Release of unknown preview url");
        }
    }
}
