//! Admission checks for files entering an upload batch
//!
//! The widget's own restriction object enforces file counts; [`Validator::admit`]
//! double-checks the aggregate size and MIME type of each file as it is added.

use std::path::Path;

use crate::models::{CandidateFile, UploadPolicy};

/// Reasons a candidate file (or a whole selection) breaks the policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Total size too large: {attempted} bytes (max: {max} bytes)")]
    TotalSizeExceeded { attempted: u64, max: u64 },

    #[error("File type not allowed: {mime_type} (allowed: {allowed:?})")]
    TypeNotAllowed {
        mime_type: String,
        allowed: Vec<String>,
    },

    #[error("Select between {min} and {max} files ({count} selected)")]
    FileCountOutOfRange { count: usize, min: usize, max: usize },

    #[error("File already selected: {name}")]
    DuplicateFile { name: String },
}

/// Outcome of the "before file added" check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Reject(PolicyViolation),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accept)
    }
}

/// Policy checks for one session.
#[derive(Debug, Clone)]
pub struct Validator {
    policy: UploadPolicy,
}

impl Validator {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Decide whether `candidate` may join the files already queued.
    ///
    /// The size check is cumulative: once the running total would cross the
    /// ceiling the candidate is rejected, files queued before it stay queued.
    /// A file whose id is already queued is rejected as a duplicate.
    pub fn admit(&self, candidate: &CandidateFile, already_queued: &[CandidateFile]) -> Admission {
        let queued_bytes: u64 = already_queued.iter().map(|f| f.size_bytes).sum();

        let result = validate_unique(candidate, already_queued)
            .and_then(|_| self.validate_total_size(queued_bytes, candidate.size_bytes))
            .and_then(|_| self.validate_type(candidate));

        match result {
            Ok(()) => Admission::Accept,
            Err(violation) => {
                tracing::debug!(
                    file = %candidate.name,
                    size_bytes = candidate.size_bytes,
                    mime_type = %candidate.mime_type,
                    reason = %violation,
                    "Candidate file rejected"
                );
                Admission::Reject(violation)
            }
        }
    }

    /// Validate that adding `candidate_bytes` keeps the batch within the ceiling
    pub fn validate_total_size(
        &self,
        queued_bytes: u64,
        candidate_bytes: u64,
    ) -> Result<(), PolicyViolation> {
        let attempted = queued_bytes.saturating_add(candidate_bytes);
        if attempted > self.policy.max_total_bytes() {
            return Err(PolicyViolation::TotalSizeExceeded {
                attempted,
                max: self.policy.max_total_bytes(),
            });
        }
        Ok(())
    }

    /// Validate the MIME type against the allowed patterns
    pub fn validate_type(&self, candidate: &CandidateFile) -> Result<(), PolicyViolation> {
        let allowed = self
            .policy
            .allowed_types()
            .iter()
            .any(|pattern| type_matches(pattern, &candidate.mime_type, &candidate.name));

        if !allowed {
            return Err(PolicyViolation::TypeNotAllowed {
                mime_type: candidate.mime_type.clone(),
                allowed: self.policy.allowed_types().to_vec(),
            });
        }
        Ok(())
    }

    /// Validate the number of files in a finalized selection
    pub fn validate_count(&self, count: usize) -> Result<(), PolicyViolation> {
        if !self.policy.count_in_bounds(count) {
            return Err(PolicyViolation::FileCountOutOfRange {
                count,
                min: self.policy.min_file_count(),
                max: self.policy.max_file_count(),
            });
        }
        Ok(())
    }
}

fn validate_unique(
    candidate: &CandidateFile,
    already_queued: &[CandidateFile],
) -> Result<(), PolicyViolation> {
    if already_queued.iter().any(|f| f.id == candidate.id) {
        return Err(PolicyViolation::DuplicateFile {
            name: candidate.name.clone(),
        });
    }
    Ok(())
}

/// Match a MIME pattern (`type/subtype`, `type/*` or `.ext`) against a file.
pub fn type_matches(pattern: &str, mime_type: &str, file_name: &str) -> bool {
    let pattern = pattern.trim().to_lowercase();

    if let Some(wanted) = pattern.strip_prefix('.') {
        return Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(wanted))
            .unwrap_or(false);
    }

    // Drop parameters such as "; charset=utf-8"
    let mime = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    match pattern.strip_suffix("/*") {
        Some(top_level) => mime
            .split_once('/')
            .map(|(t, _)| t == top_level)
            .unwrap_or(false),
        None => mime == pattern,
    }
}
