//! The announcement source capability.

use std::future::Future;

use fleetcheck_core::Announcement;

use crate::error::DiscoveryError;

/// One fetch of the full announcement directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverySnapshot {
    pub announcements: Vec<Announcement>,
    /// Identity of the discovery backend that answered. Diagnostic only.
    pub backend: String,
}

impl DiscoverySnapshot {
    /// Announcements registered for `service_type` (exact match).
    pub fn matching(&self, service_type: &str) -> Vec<Announcement> {
        self.announcements
            .iter()
            .filter(|a| a.service_type == service_type)
            .cloned()
            .collect()
    }

    /// Whether an announcement with this id is registered.
    pub fn contains_id(&self, announcement_id: &str) -> bool {
        self.announcements
            .iter()
            .any(|a| a.announcement_id == announcement_id)
    }
}

/// Read-only source of current announcements.
///
/// Each call returns a fresh snapshot; implementations must not cache
/// between calls.
pub trait AnnouncementSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<DiscoverySnapshot, DiscoveryError>> + Send;
}
