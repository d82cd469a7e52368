//! Ordered, versioned schema migrations.
//!
//! Each step runs in its own transaction and is idempotent, so a crash
//! between steps leaves the store resumable at the recorded version.
//! Migrations only ever add: per-learner state is never deleted or
//! overwritten here.

use rusqlite::{Connection, Transaction};

use super::bundled::BundledDataset;
use super::error::StoreError;
use super::repository::insert_item_if_absent;
use super::schema::{CREATE_TABLES, INIT_SYNC_STATE, SCHEMA_VERSION};

/// One schema migration step.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    run: fn(&Transaction, &BundledDataset) -> Result<(), StoreError>,
}

/// All migrations, ascending by version. `SCHEMA_VERSION` must equal the
/// last entry's version.
pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create tables",
        run: create_tables,
    },
    Migration {
        version: 2,
        name: "merge bundled catalog",
        run: merge_bundled_catalog,
    },
];

fn create_tables(tx: &Transaction, _bundled: &BundledDataset) -> Result<(), StoreError> {
    tx.execute_batch(CREATE_TABLES)?;
    tx.execute_batch(INIT_SYNC_STATE)?;
    Ok(())
}

/// Insert bundled catalog rows that are not already present by primary key.
///
/// Existing rows are left untouched even when the bundled content differs;
/// only the network sync engine replaces changed catalog content.
fn merge_bundled_catalog(tx: &Transaction, bundled: &BundledDataset) -> Result<(), StoreError> {
    let mut inserted = 0usize;
    for item in &bundled.items {
        if insert_item_if_absent(tx, item)? {
            inserted += 1;
        }
    }
    tracing::debug!(inserted, total = bundled.items.len(), "bundled catalog merged");
    Ok(())
}

/// Read the stored schema version marker.
pub fn stored_version(conn: &Connection) -> Result<i64, StoreError> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring the store up to `SCHEMA_VERSION`. Idempotent, safe on every open.
pub fn migrate(conn: &mut Connection, bundled: &BundledDataset) -> Result<(), StoreError> {
    let current = stored_version(conn)?;

    if current > SCHEMA_VERSION {
        return Err(StoreError::VersionFromFuture {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        return Ok(());
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        (migration.run)(&tx, bundled)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
        tracing::info!(version = migration.version, name = migration.name, "applied migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fresh_store_lands_on_current_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, &BundledDataset::empty()).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), SCHEMA_VERSION);

        // A second pass is a no-op.
        migrate(&mut conn, &BundledDataset::empty()).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn newer_store_version_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, &BundledDataset::empty()).unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1).unwrap();

        let err = migrate(&mut conn, &BundledDataset::empty()).unwrap_err();
        assert!(matches!(err, StoreError::VersionFromFuture { .. }));
    }

    #[test]
    fn migration_versions_ascend_to_current() {
        let mut last = 0;
        for m in MIGRATIONS {
            assert!(m.version > last);
            last = m.version;
        }
        assert_eq!(last, SCHEMA_VERSION);
    }
}
