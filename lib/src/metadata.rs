use std::collections::HashMap;
use std::fs;
use std::iter::FromIterator;
use std::path::Path;

use crate::errors::{PhashError, PhashResult};

/// Per-id annotations (e.g. host phylum) attached to records at build time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    values: HashMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Metadata::default()
    }

    pub fn insert(&mut self, id: &str, value: &str) {
        self.values.insert(id.to_string(), value.to_string());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn from_path(path: &Path) -> PhashResult<Self> {
        let content = fs::read_to_string(path)?;
        Metadata::parse(&content)
    }

    /// Parse `id,value` lines. Extra columns are ignored; blank lines and
    /// `#` comments are skipped. A later line for the same id wins.
    pub fn parse(text: &str) -> PhashResult<Self> {
        let mut metadata = Metadata::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.splitn(3, ',');
            let id = fields.next().unwrap_or_default().trim();
            let value = match fields.next() {
                Some(v) => v.trim(),
                None => {
                    return Err(PhashError::Metadata {
                        line: i + 1,
                        message: "expected at least 2 comma-separated fields".to_string(),
                    })
                }
            };
            if id.is_empty() {
                return Err(PhashError::Metadata {
                    line: i + 1,
                    message: "empty id".to_string(),
                });
            }
            metadata.insert(id, value);
        }
        Ok(metadata)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (id, value) in iter {
            metadata.insert(id, value);
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let metadata = Metadata::parse(
            "# accession,phylum\nNZ_CP000001.1,Proteobacteria\n\nNZ_CP000002.1, Firmicutes ,extra\n",
        )
        .unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("NZ_CP000001.1"), Some("Proteobacteria"));
        assert_eq!(metadata.get("NZ_CP000002.1"), Some("Firmicutes"));
        assert_eq!(metadata.get("missing"), None);
    }

    #[test]
    fn test_parse_errors() {
        match Metadata::parse("a,b\nno_comma\n") {
            Err(PhashError::Metadata { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a metadata error, got {:?}", other),
        }
        assert!(Metadata::parse(",value").is_err());
    }

    #[test]
    fn test_collect() {
        let metadata: Metadata = vec![("a", "x"), ("b", "")].into_iter().collect();
        assert_eq!(metadata.get("a"), Some("x"));
        assert_eq!(metadata.get("b"), Some(""));
    }
}
