use serde::{Deserialize, Serialize};

use crate::models::TriggerAttributes;

/// Response of the "purge previous uploads" endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl PurgeResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            msg: None,
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: Some(msg.into()),
        }
    }
}

/// Upload-success payload for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub destination: String,
    pub storage_key: String,
    pub url: String,
}

/// Server-rendered state of one attachment control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState {
    pub attributes: TriggerAttributes,
    /// Files from an earlier submission are still stored for this control.
    pub has_prior_uploads: bool,
    /// `false` once a batch was submitted; only the server re-enables it.
    pub trigger_enabled: bool,
}
