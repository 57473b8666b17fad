//! Destination naming for an upload batch.
//!
//! The storage backend keeps one object per control for a single upload and a
//! numbered group under the control for several. The two layouts must stay
//! distinguishable from the names alone:
//!
//! - one file: destination `{usage_id}`
//! - N files: destinations `1`..`N` in submission order

use crate::models::{CandidateFile, FileId};

/// Destination assigned to one file of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub file_id: FileId,
    pub destination: String,
}

/// Ordered file → destination mapping for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignments {
    entries: Vec<Assignment>,
}

impl Assignments {
    pub fn destination_of(&self, file_id: FileId) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.file_id == file_id)
            .map(|a| a.destination.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn destinations(&self) -> Vec<&str> {
        self.entries.iter().map(|a| a.destination.as_str()).collect()
    }
}

/// Assign destination names to `batch` in order.
pub fn assign(usage_id: &str, batch: &[CandidateFile]) -> Assignments {
    let entries = match batch {
        [only] => vec![Assignment {
            file_id: only.id,
            destination: usage_id.to_string(),
        }],
        files => files
            .iter()
            .enumerate()
            .map(|(position, file)| Assignment {
                file_id: file.id,
                destination: (position + 1).to_string(),
            })
            .collect(),
    };

    Assignments { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<CandidateFile> {
        (0..n)
            .map(|i| CandidateFile::new(format!("f{}.png", i), 10, "image/png"))
            .collect()
    }

    #[test]
    fn single_file_uses_usage_id() {
        let batch = files(1);
        let assignments = assign("block-v1:demo", &batch);
        assert_eq!(assignments.destinations(), vec!["block-v1:demo"]);
        assert_eq!(
            assignments.destination_of(batch[0].id),
            Some("block-v1:demo")
        );
    }

    #[test]
    fn multiple_files_are_numbered_in_order() {
        let batch = files(3);
        let assignments = assign("block", &batch);
        assert_eq!(assignments.destinations(), vec!["1", "2", "3"]);
        assert_eq!(assignments.destination_of(batch[2].id), Some("3"));
    }

    #[test]
    fn assignment_is_deterministic() {
        let batch = files(4);
        assert_eq!(assign("block", &batch), assign("block", &batch));
    }

    #[test]
    fn empty_batch_has_no_assignments() {
        assert!(assign("block", &[]).is_empty());
    }
}
