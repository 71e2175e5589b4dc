//! Notion object identifiers.
//!
//! Notion accepts ids both as 32 bare hex characters (as they appear in share
//! URLs) and in the hyphenated UUID layout returned by the API. Everything in
//! this crate keys on the hyphenated lowercase form so cache entries, view
//! counters and comment hashes agree no matter which form a link used.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

const SIMPLE_LEN: usize = 32;
const HYPHENATED_LEN: usize = 36;
const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NotionId(String);

impl NotionId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let simple: String = match trimmed.len() {
            SIMPLE_LEN => trimmed.to_string(),
            HYPHENATED_LEN if has_uuid_hyphens(trimmed) => trimmed.replace('-', ""),
            _ => return Err(DomainError::invalid_id(raw)),
        };

        if simple.len() != SIMPLE_LEN || !simple.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::invalid_id(raw));
        }

        let simple = simple.to_ascii_lowercase();
        let mut hyphenated = String::with_capacity(HYPHENATED_LEN);
        let mut offset = 0;
        for (index, width) in GROUPS.iter().enumerate() {
            if index > 0 {
                hyphenated.push('-');
            }
            hyphenated.push_str(&simple[offset..offset + width]);
            offset += width;
        }

        Ok(Self(hyphenated))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 32-character form without hyphens.
    pub fn simple(&self) -> String {
        self.0.replace('-', "")
    }
}

fn has_uuid_hyphens(value: &str) -> bool {
    let bytes = value.as_bytes();
    [8, 13, 18, 23].iter().all(|&index| bytes[index] == b'-')
}

impl fmt::Display for NotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NotionId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NotionId> for String {
    fn from(value: NotionId) -> Self {
        value.0
    }
}

impl AsRef<str> for NotionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_ids_gain_hyphens() {
        let id = NotionId::parse("1429989fe8ac4effbc8f57f56486db54").expect("valid id");
        assert_eq!(id.as_str(), "1429989f-e8ac-4eff-bc8f-57f56486db54");
        assert_eq!(id.simple(), "1429989fe8ac4effbc8f57f56486db54");
    }

    #[test]
    fn hyphenated_ids_are_lowercased() {
        let id = NotionId::parse("1429989F-E8AC-4EFF-BC8F-57F56486DB54").expect("valid id");
        assert_eq!(id.as_str(), "1429989f-e8ac-4eff-bc8f-57f56486db54");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(NotionId::parse("").is_err());
        assert!(NotionId::parse("not-an-id").is_err());
        assert!(NotionId::parse("1429989fe8ac4effbc8f57f56486dbzz").is_err());
        assert!(NotionId::parse("1429989fe-8ac-4eff-bc8f-57f56486db54").is_err());
    }

    #[test]
    fn deserializes_through_parse() {
        let id: NotionId =
            serde_json::from_str("\"1429989fe8ac4effbc8f57f56486db54\"").expect("valid json");
        assert_eq!(id.as_str(), "1429989f-e8ac-4eff-bc8f-57f56486db54");
    }
}
