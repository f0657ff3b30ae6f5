//! Label table loaded once per pipeline.
//!
//! The label resource is plain text with one class name per line; the class
//! index of a label is its zero-based line number.

use crate::util::{DetDecodeError, DetDecodeResult};
use std::io::BufRead;
use std::path::Path;

/// Immutable, index-addressed list of class names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Creates a table from owned labels.
    pub fn new(labels: Vec<String>) -> DetDecodeResult<Self> {
        if labels.is_empty() {
            return Err(DetDecodeError::EmptyLabelTable);
        }
        Ok(Self { labels })
    }

    /// Parses one label per line. A trailing `\r` is stripped from each line.
    pub fn from_text(text: &str) -> DetDecodeResult<Self> {
        let labels = text
            .lines()
            .map(|line| line.trim_end_matches('\r').to_owned())
            .collect();
        Self::new(labels)
    }

    /// Reads one label per line from a buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> DetDecodeResult<Self> {
        let mut labels = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|err| DetDecodeError::LabelIo {
                reason: err.to_string(),
            })?;
            labels.push(line.trim_end_matches('\r').to_owned());
        }
        Self::new(labels)
    }

    /// Loads a label file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> DetDecodeResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|err| DetDecodeError::LabelIo {
            reason: format!("{}: {err}", path.as_ref().display()),
        })?;
        Self::from_text(&text)
    }

    /// Returns the number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true when the table holds no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the label for a class index, or `None` when out of range.
    ///
    /// Negative indices are out of range.
    pub fn get(&self, class_index: i64) -> Option<&str> {
        let idx = usize::try_from(class_index).ok()?;
        self.labels.get(idx).map(String::as_str)
    }

    /// Returns the class index of `label`, if present.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Iterates labels in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::LabelTable;
    use crate::DetDecodeError;

    #[test]
    fn parses_crlf_lines() {
        let table = LabelTable::from_text("person\r\nbicycle\r\ncar\r\n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1), Some("bicycle"));
        assert_eq!(table.get(2), Some("car"));
    }

    #[test]
    fn out_of_range_indices_resolve_to_none() {
        let table = LabelTable::from_text("person\ncup").unwrap();
        assert_eq!(table.get(-1), None);
        assert_eq!(table.get(2), None);
        assert_eq!(table.position("cup"), Some(1));
    }

    #[test]
    fn empty_text_is_rejected() {
        assert_eq!(
            LabelTable::from_text("").unwrap_err(),
            DetDecodeError::EmptyLabelTable
        );
    }

    #[test]
    fn reader_and_text_agree() {
        let text = "person\ncup\napple\n";
        let a = LabelTable::from_text(text).unwrap();
        let b = LabelTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(a, b);
    }
}
