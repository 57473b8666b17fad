//! Signed parameters for the transport assembly.
//!
//! The transport accepts a JSON parameter document plus an HMAC signature so
//! clients cannot tamper with the destination fields. The document carries an
//! `auth` block with the key and a short expiry. The signature is hex prefixed
//! with the digest name, e.g. `sha384:ab12..`.

use attach_core::{AttachError, SignatureDigest, TransportCredentials};
use chrono::{DateTime, Duration, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Sha256, Sha384};

const EXPIRY_FORMAT: &str = "%Y/%m/%d %H:%M:%S+00:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedParams {
    pub params: String,
    pub signature: String,
}

/// Sign `data` (e.g. `{"template_id": .., "fields": {..}}`) for the transport.
///
/// Any existing `auth` entry is replaced. Non-object input is treated as empty.
pub fn sign_params(
    credentials: &TransportCredentials,
    data: Value,
    ttl_secs: i64,
    now: DateTime<Utc>,
) -> Result<SignedParams, AttachError> {
    let mut document = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let expires = (now + Duration::seconds(ttl_secs)).format(EXPIRY_FORMAT).to_string();
    document.insert(
        "auth".to_string(),
        json!({ "key": credentials.key, "expires": expires }),
    );

    let params = serde_json::to_string(&Value::Object(document))?;

    let digest = match credentials.digest {
        SignatureDigest::Sha256 => hmac_hex::<Hmac<Sha256>>(&credentials.secret, &params)?,
        SignatureDigest::Sha384 => hmac_hex::<Hmac<Sha384>>(&credentials.secret, &params)?,
    };
    let signature = format!("{}:{}", credentials.digest.as_str(), digest);

    Ok(SignedParams { params, signature })
}

fn hmac_hex<M>(secret: &str, message: &str) -> Result<String, AttachError>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as KeyInit>::new_from_slice(secret.as_bytes())
        .map_err(|e| AttachError::Config(format!("Invalid transport secret: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
