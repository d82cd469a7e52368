//! Shared fixtures for integration tests.

use chrono::{DateTime, TimeZone, Utc};

use quiz_core::{Item, ItemKind};
use quiz_device::{BundledDataset, SqliteStore};

pub fn catalog_item(id: &str, updated_at: DateTime<Utc>) -> Item {
    Item {
        id: id.to_string(),
        kind: ItemKind::SingleChoice,
        categories: vec!["networking".to_string()],
        tags: vec![],
        difficulty: None,
        prompt: format!("prompt for {id}"),
        options: vec!["a".to_string(), "b".to_string()],
        correct_answers: vec![0],
        explanation: String::new(),
        references: vec![],
        pack: "core".to_string(),
        locked: false,
        updated_at,
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub fn mem_store_with(items: Vec<Item>) -> SqliteStore {
    let bundled = BundledDataset {
        schema_version: 1,
        items,
    };
    SqliteStore::open_in_memory(&bundled).unwrap()
}
