use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_FILE_COUNT, DEFAULT_MAX_TOTAL_BYTES, DEFAULT_MIN_FILE_COUNT, IMAGE_MIME_TYPES,
    PDF_MIME_TYPE, UPLOAD_TYPE_ATTRIBUTE, WHITELIST_ATTRIBUTE,
};
use crate::AttachError;

/// Upload category declared by the trigger element's `upload-type` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadCategory {
    Image,
    PdfAndImage,
    /// Extension whitelist, stored lowercase without the leading dot.
    Custom(Vec<String>),
}

impl UploadCategory {
    /// Resolve the category from trigger attributes.
    ///
    /// Returns `None` when the control is not accepting uploads: the attribute
    /// is absent, unknown, or `custom` with an empty whitelist.
    pub fn resolve(attributes: &TriggerAttributes) -> Option<Self> {
        match attributes.upload_type.as_deref()?.trim() {
            "image" => Some(Self::Image),
            "pdf-and-image" => Some(Self::PdfAndImage),
            "custom" => {
                let extensions: Vec<String> = attributes
                    .white_listed_file_types
                    .iter()
                    .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect();
                if extensions.is_empty() {
                    None
                } else {
                    Some(Self::Custom(extensions))
                }
            }
            _ => None,
        }
    }

    /// MIME patterns accepted by this category.
    pub fn allowed_types(&self) -> Vec<String> {
        match self {
            Self::Image => IMAGE_MIME_TYPES.iter().map(|t| t.to_string()).collect(),
            Self::PdfAndImage => IMAGE_MIME_TYPES
                .iter()
                .copied()
                .chain(std::iter::once(PDF_MIME_TYPE))
                .map(str::to_string)
                .collect(),
            Self::Custom(extensions) => extensions.iter().map(|ext| format!(".{}", ext)).collect(),
        }
    }

    /// Note shown in the upload widget.
    pub fn note(&self, max_total_bytes: u64) -> String {
        let limit = format_megabytes(max_total_bytes);
        match self {
            Self::Image => format!(
                "You may upload images (gif, png, jpg). The maximum total file size is {}.",
                limit
            ),
            Self::PdfAndImage => format!(
                "You may upload images (gif, png, jpg) or PDFs. The maximum total file size is {}.",
                limit
            ),
            Self::Custom(extensions) => format!(
                "You may upload files of these types: {}. The maximum total file size is {}.",
                extensions.join(", "),
                limit
            ),
        }
    }
}

fn format_megabytes(bytes: u64) -> String {
    format!("{}MB", bytes / (1024 * 1024))
}

/// Data attributes read from the trigger element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerAttributes {
    pub upload_type: Option<String>,
    pub white_listed_file_types: Vec<String>,
}

impl TriggerAttributes {
    pub fn new(upload_type: impl Into<String>) -> Self {
        Self {
            upload_type: Some(upload_type.into()),
            white_listed_file_types: Vec::new(),
        }
    }

    pub fn with_whitelist(mut self, extensions: &[&str]) -> Self {
        self.white_listed_file_types = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Build from the element's `data-*` attributes (keys without the `data-` prefix).
    pub fn from_data_attributes(attributes: &HashMap<String, String>) -> Self {
        let white_listed_file_types = attributes
            .get(WHITELIST_ATTRIBUTE)
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            upload_type: attributes.get(UPLOAD_TYPE_ATTRIBUTE).cloned(),
            white_listed_file_types,
        }
    }
}

/// Size and count limits applied to every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_total_bytes: u64,
    pub min_file_count: usize,
    pub max_file_count: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            min_file_count: DEFAULT_MIN_FILE_COUNT,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
        }
    }
}

/// Resolved size/count/type policy for one session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    max_total_bytes: u64,
    min_file_count: usize,
    max_file_count: usize,
    allowed_types: Vec<String>,
    note: String,
}

impl UploadPolicy {
    pub fn new(
        max_total_bytes: u64,
        min_file_count: usize,
        max_file_count: usize,
        allowed_types: Vec<String>,
    ) -> Result<Self, AttachError> {
        if max_total_bytes == 0 {
            return Err(AttachError::Config(
                "max_total_bytes must be greater than zero".to_string(),
            ));
        }
        if min_file_count < 1 {
            return Err(AttachError::Config(
                "min_file_count must be at least 1".to_string(),
            ));
        }
        if max_file_count < min_file_count {
            return Err(AttachError::Config(format!(
                "max_file_count ({}) must be >= min_file_count ({})",
                max_file_count, min_file_count
            )));
        }
        if allowed_types.is_empty() {
            return Err(AttachError::Config(
                "at least one allowed type is required".to_string(),
            ));
        }

        let allowed_types = allowed_types
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .collect();

        Ok(Self {
            max_total_bytes,
            min_file_count,
            max_file_count,
            allowed_types,
            note: String::new(),
        })
    }

    /// Derive the policy from the trigger's declared category.
    ///
    /// `Ok(None)` means the control is not currently accepting uploads.
    pub fn from_trigger(
        attributes: &TriggerAttributes,
        limits: &UploadLimits,
    ) -> Result<Option<Self>, AttachError> {
        let Some(category) = UploadCategory::resolve(attributes) else {
            return Ok(None);
        };

        let mut policy = Self::new(
            limits.max_total_bytes,
            limits.min_file_count,
            limits.max_file_count,
            category.allowed_types(),
        )?;
        policy.note = category.note(limits.max_total_bytes);
        Ok(Some(policy))
    }

    pub fn max_total_bytes(&self) -> u64 {
        self.max_total_bytes
    }

    pub fn min_file_count(&self) -> usize {
        self.min_file_count
    }

    pub fn max_file_count(&self) -> usize {
        self.max_file_count
    }

    pub fn allowed_types(&self) -> &[String] {
        &self.allowed_types
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn count_in_bounds(&self, count: usize) -> bool {
        (self.min_file_count..=self.max_file_count).contains(&count)
    }

    /// Restriction object handed to the upload widget.
    pub fn restrictions(&self) -> UploadRestrictions {
        UploadRestrictions {
            max_file_count: self.max_file_count,
            min_file_count: self.min_file_count,
            allowed_types: self.allowed_types.clone(),
            note: self.note.clone(),
        }
    }
}

/// Restriction object consumed by the uploader widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRestrictions {
    pub max_file_count: usize,
    pub min_file_count: usize,
    pub allowed_types: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
}
