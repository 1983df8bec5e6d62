//! Schema steps for the blob database.
//!
//! Steps are listed oldest first and run together in one transaction, each
//! one stamping its version into `PRAGMA user_version` as it lands.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    label: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    label: "blobs",
    sql: include_str!("0001_blobs.sql"),
}];

/// Schema version written by this build.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Schema version stamped in the open database (`0` for a fresh file).
pub fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// What `apply_migrations` did to one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaUpgrade {
    pub from: u32,
    pub to: u32,
    /// Labels of the steps that ran, oldest first.
    pub applied: Vec<&'static str>,
}

/// Brings the database up to `latest_version()`.
///
/// # Errors
/// - `SchemaTooNew` when the stored version is ahead of this build.
/// - `Migration` when a step fails; nothing from this call is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<SchemaUpgrade> {
    let from = stored_version(conn)?;
    let supported = latest_version();
    if from > supported {
        return Err(DbError::SchemaTooNew {
            found: from,
            supported,
        });
    }

    let pending: Vec<&SchemaStep> = STEPS.iter().filter(|step| step.version > from).collect();
    if pending.is_empty() {
        return Ok(SchemaUpgrade {
            from,
            to: from,
            applied: Vec::new(),
        });
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)
            .map_err(|source| DbError::Migration {
                version: step.version,
                label: step.label,
                source,
            })?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    let applied: Vec<&'static str> = pending.iter().map(|step| step.label).collect();
    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        from,
        supported,
        applied.join(",")
    );
    Ok(SchemaUpgrade {
        from,
        to: supported,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, stored_version};
    use rusqlite::Connection;

    #[test]
    fn fresh_database_runs_every_step_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 0);

        let first = apply_migrations(&mut conn).unwrap();
        assert_eq!(first.from, 0);
        assert_eq!(first.to, latest_version());
        assert_eq!(first.applied, vec!["blobs"]);

        let second = apply_migrations(&mut conn).unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.to, latest_version());
    }
}
