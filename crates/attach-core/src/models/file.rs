use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle for a file queued in the upload widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FileId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A file the user picked, waiting for an admit/reject decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    pub id: FileId,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub proposed_description: String,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, size_bytes: u64, mime_type: impl Into<String>) -> Self {
        Self {
            id: FileId::new(),
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            proposed_description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.proposed_description = description.into();
        self
    }

    pub fn has_description(&self) -> bool {
        !self.proposed_description.trim().is_empty()
    }
}

/// Ordered set of admitted files. Order drives destination naming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBatch {
    files: Vec<CandidateFile>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: CandidateFile) {
        self.files.push(file);
    }

    pub fn remove(&mut self, id: FileId) -> Option<CandidateFile> {
        let index = self.files.iter().position(|f| f.id == id)?;
        Some(self.files.remove(index))
    }

    pub fn get(&self, id: FileId) -> Option<&CandidateFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn get_mut(&mut self, id: FileId) -> Option<&mut CandidateFile> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    pub fn files(&self) -> &[CandidateFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    /// Names of admitted files whose description is still blank.
    pub fn undescribed(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| !f.has_description())
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

impl<'a> IntoIterator for &'a UploadBatch {
    type Item = &'a CandidateFile;
    type IntoIter = std::slice::Iter<'a, CandidateFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
