//! Configuration module
//!
//! Limits, server endpoint, and storage settings for attachment upload sessions,
//! read from the environment (optionally seeded from a `.env` file).

use std::env;

use crate::models::UploadLimits;

// Common constants
const MAX_TOTAL_MB: u64 = 256;
const MIN_FILES: usize = 1;
const MAX_FILES: usize = 30;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const TRANSPORT_SIGNATURE_TTL_SECS: i64 = 60;

/// HMAC digest used to sign transport parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureDigest {
    Sha256,
    #[default]
    Sha384,
}

impl SignatureDigest {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureDigest::Sha256 => "sha256",
            SignatureDigest::Sha384 => "sha384",
        }
    }
}

impl std::str::FromStr for SignatureDigest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(SignatureDigest::Sha256),
            "sha384" => Ok(SignatureDigest::Sha384),
            other => Err(format!("unsupported digest: {}", other)),
        }
    }
}

/// Transport assembly credentials (key/secret pair used to sign parameters)
#[derive(Clone, Debug)]
pub struct TransportCredentials {
    pub key: String,
    pub secret: String,
    pub digest: SignatureDigest,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct AttachConfig {
    pub environment: String,
    pub limits: UploadLimits,
    /// Base URL of the form server; `None` means the storage-backed server is used.
    pub server_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub storage_path: String,
    pub storage_base_url: String,
    /// Optional prefix in front of every storage key (e.g. course/item scope).
    pub key_prefix: Option<String>,
    pub transport: Option<TransportCredentials>,
    pub transport_signature_ttl_secs: i64,
}

impl AttachConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let max_total_mb: u64 = parse_or(&lookup, "ATTACH_MAX_TOTAL_MB", MAX_TOTAL_MB)?;
        let max_total_bytes = max_total_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            anyhow::anyhow!("ATTACH_MAX_TOTAL_MB has an invalid value: {}", max_total_mb)
        })?;
        let min_file_count = parse_or(&lookup, "ATTACH_MIN_FILES", MIN_FILES)?;
        let max_file_count = parse_or(&lookup, "ATTACH_MAX_FILES", MAX_FILES)?;
        let request_timeout_secs =
            parse_or(&lookup, "ATTACH_REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS)?;

        let digest = parse_or(&lookup, "ATTACH_TRANSPORT_DIGEST", SignatureDigest::default())?;
        let transport = match (
            lookup("ATTACH_TRANSPORT_KEY"),
            lookup("ATTACH_TRANSPORT_SECRET"),
        ) {
            (Some(key), Some(secret)) => Some(TransportCredentials {
                key,
                secret,
                digest,
            }),
            _ => None,
        };

        let config = Self {
            environment,
            limits: UploadLimits {
                max_total_bytes,
                min_file_count,
                max_file_count,
            },
            server_url: lookup("ATTACH_SERVER_URL").filter(|s| !s.trim().is_empty()),
            api_token: lookup("ATTACH_API_TOKEN"),
            request_timeout_secs,
            storage_path: lookup("ATTACH_STORAGE_PATH")
                .unwrap_or_else(|| "./attachments".to_string()),
            storage_base_url: lookup("ATTACH_STORAGE_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8000/attachments".to_string()),
            key_prefix: lookup("ATTACH_KEY_PREFIX").filter(|s| !s.trim().is_empty()),
            transport,
            transport_signature_ttl_secs: TRANSPORT_SIGNATURE_TTL_SECS,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.limits.max_total_bytes == 0 {
            return Err(anyhow::anyhow!("ATTACH_MAX_TOTAL_MB must be greater than 0"));
        }

        if self.limits.min_file_count < 1 {
            return Err(anyhow::anyhow!("ATTACH_MIN_FILES must be at least 1"));
        }

        if self.limits.max_file_count < self.limits.min_file_count {
            return Err(anyhow::anyhow!(
                "ATTACH_MAX_FILES ({}) must be >= ATTACH_MIN_FILES ({})",
                self.limits.max_file_count,
                self.limits.min_file_count
            ));
        }

        if let Some(url) = &self.server_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "ATTACH_SERVER_URL must be an http(s) URL"
                ));
            }
            if self.is_production() && self.api_token.is_none() {
                return Err(anyhow::anyhow!(
                    "ATTACH_API_TOKEN must be set in production"
                ));
            }
        }

        if let Some(prefix) = &self.key_prefix {
            if prefix.contains("..") || prefix.starts_with('/') {
                return Err(anyhow::anyhow!(
                    "ATTACH_KEY_PREFIX must be a relative path without '..'"
                ));
            }
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AttachConfig, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AttachConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.limits.max_total_bytes, 256 * 1024 * 1024);
        assert_eq!(config.limits.min_file_count, 1);
        assert_eq!(config.limits.max_file_count, 30);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.server_url.is_none());
        assert!(config.transport.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn reads_limits_and_credentials() {
        let config = config_from(&[
            ("ATTACH_MAX_TOTAL_MB", "10"),
            ("ATTACH_MAX_FILES", "3"),
            ("ATTACH_TRANSPORT_KEY", "key"),
            ("ATTACH_TRANSPORT_SECRET", "secret"),
        ])
        .unwrap();
        assert_eq!(config.limits.max_total_bytes, 10 * 1024 * 1024);
        assert_eq!(config.limits.max_file_count, 3);
        let transport = config.transport.unwrap();
        assert_eq!(transport.key, "key");
        assert_eq!(transport.digest, SignatureDigest::Sha384);
    }

    #[test]
    fn reads_transport_digest() {
        let config = config_from(&[
            ("ATTACH_TRANSPORT_KEY", "key"),
            ("ATTACH_TRANSPORT_SECRET", "secret"),
            ("ATTACH_TRANSPORT_DIGEST", "SHA256"),
        ])
        .unwrap();
        assert_eq!(config.transport.unwrap().digest, SignatureDigest::Sha256);
        assert!(config_from(&[("ATTACH_TRANSPORT_DIGEST", "md5")]).is_err());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config_from(&[("ATTACH_MAX_FILES", "many")]).is_err());
        assert!(config_from(&[("ATTACH_MIN_FILES", "4"), ("ATTACH_MAX_FILES", "2")]).is_err());
        assert!(config_from(&[("ATTACH_SERVER_URL", "ftp://host")]).is_err());
        assert!(config_from(&[("ATTACH_KEY_PREFIX", "../escape")]).is_err());
    }

    #[test]
    fn rejects_total_size_that_overflows_bytes() {
        let too_large = u64::MAX.to_string();
        let err = config_from(&[("ATTACH_MAX_TOTAL_MB", too_large.as_str())]).unwrap_err();
        assert!(err.to_string().contains("ATTACH_MAX_TOTAL_MB"));

        let largest = u64::MAX / (1024 * 1024);
        let raw = largest.to_string();
        let config = config_from(&[("ATTACH_MAX_TOTAL_MB", raw.as_str())]).unwrap();
        assert_eq!(config.limits.max_total_bytes, largest * 1024 * 1024);
    }

    #[test]
    fn production_requires_token_for_remote_server() {
        let result = config_from(&[
            ("ENVIRONMENT", "production"),
            ("ATTACH_SERVER_URL", "https://lms.example.com"),
        ]);
        assert!(result.is_err());
    }
}
