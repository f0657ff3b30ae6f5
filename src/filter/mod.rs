//! Class filtering.
//!
//! Resolves decoded class indices against the label table and keeps only
//! labels in the configured allow-list.

use crate::decode::Candidate;
use crate::labels::LabelTable;
use crate::observe::Rejection;
use crate::util::{DetDecodeError, DetDecodeResult};
use crate::Detection;
use std::collections::BTreeSet;

/// Labels retained by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowList {
    /// Every label in the table is retained.
    Any,
    /// Only the listed labels are retained.
    Only(BTreeSet<String>),
}

impl Default for AllowList {
    fn default() -> Self {
        AllowList::only(["person", "cup", "apple", "banana"])
    }
}

impl AllowList {
    /// Builds an allow-list from label names.
    pub fn only<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList::Only(labels.into_iter().map(Into::into).collect())
    }

    /// Returns true when `label` is retained.
    pub fn allows(&self, label: &str) -> bool {
        match self {
            AllowList::Any => true,
            AllowList::Only(set) => set.contains(label),
        }
    }

    /// Rejects empty label names.
    pub fn validate(&self) -> DetDecodeResult<()> {
        if let AllowList::Only(set) = self {
            if set.iter().any(String::is_empty) {
                return Err(DetDecodeError::InvalidConfig {
                    reason: "allow_list labels must be non-empty",
                });
            }
        }
        Ok(())
    }
}

/// Label lookup plus allow-list check over decoded candidates.
#[derive(Clone, Copy, Debug)]
pub struct ClassFilter<'a> {
    labels: &'a LabelTable,
    allow: &'a AllowList,
}

impl<'a> ClassFilter<'a> {
    /// Creates a filter over a label table and allow-list.
    pub fn new(labels: &'a LabelTable, allow: &'a AllowList) -> Self {
        Self { labels, allow }
    }

    /// Converts a candidate into a detection, or returns why it was dropped.
    pub fn accept(&self, candidate: &Candidate) -> Result<Detection, Rejection> {
        let class_index = candidate.class_index;
        let label = self
            .labels
            .get(class_index)
            .ok_or(Rejection::OutOfRangeClassIndex { class_index })?;
        if !self.allow.allows(label) {
            return Err(Rejection::NotAllowed { class_index });
        }
        Ok(Detection {
            label: label.to_owned(),
            confidence: candidate.confidence,
            left: candidate.left,
            top: candidate.top,
            right: candidate.right,
            bottom: candidate.bottom,
        })
    }

    /// Filters candidates, discarding rejection reasons.
    pub fn apply(&self, candidates: &[Candidate]) -> Vec<Detection> {
        candidates
            .iter()
            .filter_map(|c| self.accept(c).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{AllowList, ClassFilter};
    use crate::decode::Candidate;
    use crate::labels::LabelTable;
    use crate::observe::Rejection;

    fn candidate(class_index: i64) -> Candidate {
        Candidate {
            index: 0,
            class_index,
            confidence: 0.8,
            left: 1.0,
            top: 2.0,
            right: 3.0,
            bottom: 4.0,
        }
    }

    #[test]
    fn default_allow_list_matches_household_classes() {
        let allow = AllowList::default();
        for label in ["person", "cup", "apple", "banana"] {
            assert!(allow.allows(label));
        }
        assert!(!allow.allows("car"));
    }

    #[test]
    fn filter_reports_each_rejection_kind() {
        let labels = LabelTable::from_text("person\ncar\ncup").unwrap();
        let allow = AllowList::default();
        let filter = ClassFilter::new(&labels, &allow);

        let det = filter.accept(&candidate(2)).unwrap();
        assert_eq!(det.label, "cup");
        assert_eq!(det.rect(), [1.0, 2.0, 3.0, 4.0]);

        assert_eq!(
            filter.accept(&candidate(1)).unwrap_err(),
            Rejection::NotAllowed { class_index: 1 }
        );
        assert_eq!(
            filter.accept(&candidate(3)).unwrap_err(),
            Rejection::OutOfRangeClassIndex { class_index: 3 }
        );
        assert_eq!(
            filter.accept(&candidate(-1)).unwrap_err(),
            Rejection::OutOfRangeClassIndex { class_index: -1 }
        );
    }

    #[test]
    fn any_allows_every_table_label() {
        let labels = LabelTable::from_text("person\ncar").unwrap();
        let allow = AllowList::Any;
        let filter = ClassFilter::new(&labels, &allow);
        let kept = filter.apply(&[candidate(0), candidate(1), candidate(2)]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn empty_label_in_allow_list_is_invalid() {
        assert!(AllowList::only([""]).validate().is_err());
        assert!(AllowList::Any.validate().is_ok());
    }
}
