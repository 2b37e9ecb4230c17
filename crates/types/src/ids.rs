//! Newtype wrappers for element and container identifiers
//!
//! Templates reference elements by numeric id and containers by string id
//! (`"0_content"`, or the linked container id of a frame/section band).
//! Keeping them apart prevents passing one where the other is expected.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;

/// The template id of a document element, carried by every error the
/// layout engine reports.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl ElementId {
    pub const DOCUMENT: ElementId = ElementId(0);
}

impl From<u64> for ElementId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The id of a container that elements are placed into.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct ContainerId(Arc<str>);

impl ContainerId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for ContainerId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Container ids are written either as strings or as plain numbers.
impl<'de> Deserialize<'de> for ContainerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => ContainerId::from(s),
            Raw::Num(n) => ContainerId::from(n.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_id_from_number_or_string() {
        let a: ContainerId = serde_json::from_str("\"0_content\"").unwrap();
        let b: ContainerId = serde_json::from_str("12").unwrap();
        assert_eq!(a.as_str(), "0_content");
        assert_eq!(b, ContainerId::from("12"));
    }

    #[test]
    fn test_container_id_serializes_as_string() {
        let id = ContainerId::from("7_band".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7_band\"");
    }

    #[test]
    fn test_element_id_display() {
        assert_eq!(ElementId(42).to_string(), "42");
    }
}
