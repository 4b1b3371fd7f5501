use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::blobs::BlobHandle;
use crate::resources::ResourcePool;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session";

struct ActivePreview {
    resource_id: u64,
    generation: u64,
    blob: Option<BlobHandle>,
}

/// The preview panel of one browser session
///
/// At most one file is previewed at a time. Every [`begin`](Self::begin)
/// starts a new generation; work started for an older generation is stale and
/// must be discarded. Replacing or closing the preview drops its blob handle,
/// which revokes the blob URL.
#[derive(Default)]
pub struct PreviewSession {
    generation: u64,
    active: Option<ActivePreview>,
}

impl PreviewSession {
    /// Start previewing a file, superseding any current preview
    ///
    /// # Returns
    /// * `u64` - Generation number of the new preview
    pub fn begin(&mut self, resource_id: u64) -> u64 {
        self.generation += 1;
        self.active = Some(ActivePreview {
            resource_id,
            generation: self.generation,
            blob: None,
        });
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        matches!(&self.active, Some(active) if active.generation == generation)
    }

    /// Attach the blob URL produced for a preview
    ///
    /// Returns false, and revokes the blob, when the preview was closed or
    /// replaced in the meantime.
    pub fn attach_blob(&mut self, generation: u64, handle: BlobHandle) -> bool {
        match self.active.as_mut() {
            Some(active) if active.generation == generation => {
                active.blob = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Close the preview, returning the id of the file that was shown
    pub fn close(&mut self) -> Option<u64> {
        self.active.take().map(|active| active.resource_id)
    }

    /// Close the preview only if it shows the given file
    pub fn close_if_showing(&mut self, resource_id: u64) -> bool {
        if self.current_resource() == Some(resource_id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn current_resource(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.resource_id)
    }

    pub fn blob_url(&self) -> Option<String> {
        self.active
            .as_ref()
            .and_then(|active| active.blob.as_ref())
            .map(BlobHandle::url)
    }
}

/// Per-browser state: uploaded files and the preview panel
pub struct Session {
    pub resources: ResourcePool,
    pub preview: PreviewSession,
    expires_at: DateTime<Utc>,
}

/// All live browser sessions, keyed by the id stored in the session cookie
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            sessions: HashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24)),
        }
    }

    /// Resolve the caller's session, creating one when needed
    ///
    /// Expired sessions are purged first. A known id has its expiry pushed
    /// forward; an unknown, expired or missing id gets a fresh session.
    ///
    /// # Arguments
    /// * `id` - Session id from the request cookie, if any
    ///
    /// # Returns
    /// * `String` - The id of the live session
    pub fn touch(&mut self, id: Option<&str>) -> String {
        let now = Utc::now();
        self.purge_expired(now);

        let id = match id {
            Some(id) if self.sessions.contains_key(id) => id.to_string(),
            _ => {
                let id = Uuid::new_v4().to_string();
                self.sessions.insert(
                    id.clone(),
                    Session {
                        resources: ResourcePool::new(),
                        preview: PreviewSession::default(),
                        expires_at: now,
                    },
                );
                log::debug!("Created session {}", id);
                id
            }
        };

        if let Some(session) = self.sessions.get_mut(&id) {
            session.expires_at = now + self.ttl;
        }
        id
    }

    /// Resolve the caller's session without creating one
    ///
    /// Expired sessions are purged first. A live session has its expiry
    /// pushed forward; an unknown, expired or missing id yields `None`.
    pub fn resume(&mut self, id: Option<&str>) -> Option<&mut Session> {
        let now = Utc::now();
        self.purge_expired(now);

        let expires_at = now + self.ttl;
        let session = self.sessions.get_mut(id?)?;
        session.expires_at = expires_at;
        Some(session)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Drop sessions whose expiry is at or before `now`
    ///
    /// Dropping a session revokes any blob URL its preview still holds.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        let purged = before - self.sessions.len();
        if purged > 0 {
            log::debug!("Purged {} expired sessions", purged);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
