use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use uuid::Uuid;

/// Content served from a blob URL
#[derive(Clone, Debug)]
pub struct Blob {
    pub content_type: String,
    pub bytes: Arc<[u8]>,
}

type BlobMap = Mutex<HashMap<String, Blob>>;

/// Registry of short-lived blob URLs
///
/// Registering content returns a [`BlobHandle`]; the URL stays valid exactly as
/// long as that handle is alive. Cloning the registry shares the same map.
#[derive(Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<BlobMap>,
}

/// Owner of one blob URL; dropping it revokes the URL
#[derive(Debug)]
pub struct BlobHandle {
    token: String,
    registry: Weak<BlobMap>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish content under a fresh random token
    ///
    /// # Arguments
    /// * `content_type` - MIME type to serve the content with
    /// * `bytes` - The content
    ///
    /// # Returns
    /// * `BlobHandle` - Keeps the URL alive until dropped
    pub fn register(&self, content_type: &str, bytes: Vec<u8>) -> BlobHandle {
        let token = Uuid::new_v4().simple().to_string();
        let blob = Blob {
            content_type: content_type.to_string(),
            bytes: bytes.into(),
        };

        match self.blobs.lock() {
            Ok(mut blobs) => {
                blobs.insert(token.clone(), blob);
            }
            Err(e) => log::error!("Blob registry lock poisoned: {}", e),
        }

        BlobHandle {
            token,
            registry: Arc::downgrade(&self.blobs),
        }
    }

    /// Content behind a token, if its handle is still alive
    pub fn get(&self, token: &str) -> Option<Blob> {
        self.blobs.lock().ok()?.get(token).cloned()
    }

    /// Number of live blob URLs
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobHandle {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Path under which the blob is served
    pub fn url(&self) -> String {
        format!("/blobs/{}", self.token)
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        if let Some(blobs) = self.registry.upgrade() {
            if let Ok(mut blobs) = blobs.lock() {
                blobs.remove(&self.token);
                log::debug!("Revoked blob {}", self.token);
            }
        }
    }
}
