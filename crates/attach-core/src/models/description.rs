use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::AttachError;

/// Stable per-file key in the [`DescriptionMap`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DescriptionKey {
    /// Single-file upload: keyed by the control's usage identifier.
    Control(String),
    /// Multi-file upload: 1-based position in the batch.
    Index(u32),
}

impl DescriptionKey {
    /// Recover the key from a destination name produced by the naming assigner.
    pub fn from_destination(usage_id: &str, destination: &str) -> Result<Self, AttachError> {
        if destination == usage_id {
            return Ok(Self::Control(usage_id.to_string()));
        }
        match destination.parse::<u32>() {
            Ok(index) if index >= 1 => Ok(Self::Index(index)),
            _ => Err(AttachError::InvalidDestination(destination.to_string())),
        }
    }
}

impl fmt::Display for DescriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control(usage_id) => f.write_str(usage_id),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

impl Serialize for DescriptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Descriptions of uploaded files, persisted once the batch completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DescriptionMap {
    entries: BTreeMap<DescriptionKey, String>,
}

impl DescriptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: DescriptionKey, description: &str) -> Result<(), AttachError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AttachError::MissingDescription {
                files: vec![key.to_string()],
            });
        }
        self.entries.insert(key, description.to_string());
        Ok(())
    }

    pub fn get(&self, key: &DescriptionKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DescriptionKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_destination_maps_to_control_key() {
        let key = DescriptionKey::from_destination("block-7", "block-7").unwrap();
        assert_eq!(key, DescriptionKey::Control("block-7".into()));
    }

    #[test]
    fn numbered_destination_maps_to_index() {
        assert_eq!(
            DescriptionKey::from_destination("block-7", "2").unwrap(),
            DescriptionKey::Index(2)
        );
        assert!(DescriptionKey::from_destination("block-7", "0").is_err());
        assert!(DescriptionKey::from_destination("block-7", "other").is_err());
    }

    #[test]
    fn serializes_as_string_keyed_object() {
        let mut map = DescriptionMap::new();
        map.insert(DescriptionKey::Index(2), "second").unwrap();
        map.insert(DescriptionKey::Index(1), "first").unwrap();
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"1": "first", "2": "second"}));
    }

    #[test]
    fn blank_descriptions_are_rejected() {
        let mut map = DescriptionMap::new();
        assert!(map.insert(DescriptionKey::Index(1), "  ").is_err());
        assert!(map.is_empty());
    }
}
