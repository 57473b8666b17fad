//! Storage-backed attachment server
//!
//! Serves the purge and description endpoints straight from a storage backend,
//! for hosts that run without a form server (CLI, local development).

use std::sync::Arc;

use async_trait::async_trait;
use attach_core::models::{DescriptionMap, PurgeResponse};
use attach_core::{AttachError, AttachmentServer};

use crate::keys::{control_key, descriptions_key};
use crate::traits::Storage;

pub struct StorageAttachmentServer {
    storage: Arc<dyn Storage>,
    key_prefix: Option<String>,
}

impl StorageAttachmentServer {
    pub fn new(storage: Arc<dyn Storage>, key_prefix: Option<String>) -> Self {
        Self {
            storage,
            key_prefix,
        }
    }

    /// Whether files from an earlier submission are stored for the control.
    pub async fn has_prior_uploads(&self, usage_id: &str) -> Result<bool, AttachError> {
        let key = control_key(self.key_prefix.as_deref(), usage_id);
        Ok(self.storage.exists(&key).await?)
    }
}

#[async_trait]
impl AttachmentServer for StorageAttachmentServer {
    async fn render(&self, step: &str) -> Result<String, AttachError> {
        Ok(format!(r#"<div class="step--{}"></div>"#, step))
    }

    async fn purge_previous_uploads(&self, usage_id: &str) -> Result<PurgeResponse, AttachError> {
        let prefix = self.key_prefix.as_deref();

        let removed = match self.storage.delete_tree(&control_key(prefix, usage_id)).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(usage_id = %usage_id, error = %e, "Purge failed");
                return Ok(PurgeResponse::failed(e.to_string()));
            }
        };

        if let Err(e) = self.storage.delete(&descriptions_key(prefix, usage_id)).await {
            tracing::warn!(usage_id = %usage_id, error = %e, "Purge of descriptions failed");
            return Ok(PurgeResponse::failed(e.to_string()));
        }

        tracing::info!(usage_id = %usage_id, removed, "Previous uploads purged");
        Ok(PurgeResponse::ok())
    }

    async fn save_descriptions(
        &self,
        usage_id: &str,
        descriptions: &DescriptionMap,
    ) -> Result<(), AttachError> {
        let body = serde_json::to_vec(descriptions)?;
        let key = descriptions_key(self.key_prefix.as_deref(), usage_id);
        self.storage.put(&key, "application/json", body).await?;
        Ok(())
    }
}
