//! Database schema migrations for SQLite.
//!
//! Each migration transforms the schema from version N to N+1 and is applied
//! inside one transaction together with its `schema_migrations` row.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: calling it on an up-to-date database does nothing.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
///
/// Cascades are carried out by the store itself, so no foreign keys are
/// declared. Action and object id 0 means "unspecified".
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            parent_id INTEGER                 -- nullable, roles.id
        );

        CREATE TABLE actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE objects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE permissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            object_id INTEGER NOT NULL DEFAULT 0,
            action_id INTEGER NOT NULL DEFAULT 0
        );

        -- Role <-> permission attachments
        CREATE TABLE role_has_permissions (
            role_id INTEGER NOT NULL,
            permission_id INTEGER NOT NULL,
            PRIMARY KEY (role_id, permission_id)
        );

        -- Subject memberships
        CREATE TABLE subject_has_roles (
            subject_id INTEGER NOT NULL,
            role_id INTEGER NOT NULL,
            PRIMARY KEY (subject_id, role_id)
        );

        -- Direct grants; rowid keeps grant order
        CREATE TABLE subject_has_permissions (
            subject_id INTEGER NOT NULL,
            permission_id INTEGER NOT NULL,
            PRIMARY KEY (subject_id, permission_id)
        );

        CREATE INDEX idx_roles_parent ON roles(parent_id);
        CREATE INDEX idx_permissions_action ON permissions(action_id);
        CREATE INDEX idx_permissions_object ON permissions(object_id);
        CREATE INDEX idx_role_has_permissions_permission ON role_has_permissions(permission_id);
        CREATE INDEX idx_subject_has_roles_role ON subject_has_roles(role_id);
        "#,
    )?;

    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
