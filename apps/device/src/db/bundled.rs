//! Bundled reference dataset.
//!
//! A static snapshot of catalog items shipped with the app, versioned
//! alongside the schema. Used to seed a fresh store and to merge-update a
//! stale one without a network round trip.

use serde::{Deserialize, Serialize};

use quiz_core::Item;

/// Snapshot of catalog items shipped alongside a schema version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundledDataset {
    /// Schema version this snapshot was built for.
    pub schema_version: i64,
    pub items: Vec<Item>,
}

impl BundledDataset {
    /// An empty dataset, for deployments that rely on network sync only.
    pub fn empty() -> Self {
        Self {
            schema_version: super::schema::SCHEMA_VERSION,
            items: Vec::new(),
        }
    }

    /// Parse a bundled snapshot from its JSON representation.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_json() {
        let raw = r#"{
            "schema_version": 2,
            "items": [{
                "id": "q-001",
                "kind": "single_choice",
                "categories": ["networking"],
                "tags": [],
                "prompt": "What does TCP stand for?",
                "options": ["Transmission Control Protocol", "Transfer Control Program"],
                "correct_answers": [0],
                "explanation": "",
                "references": [],
                "pack": "core",
                "locked": false,
                "updated_at": "2024-01-01T00:00:00Z"
            }]
        }"#;

        let dataset = BundledDataset::from_json(raw).unwrap();
        assert_eq!(dataset.schema_version, 2);
        assert_eq!(dataset.items.len(), 1);
        assert_eq!(dataset.items[0].id, "q-001");
    }
}
