//! SQLite implementation of the EntityStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};

use rolegate_core::{
    validate_name, Action, ActionId, Catalogue, EntityKind, Object, ObjectId, Permission,
    PermissionId, Role, RoleId, SubjectId,
};

use crate::error::{Result, StoreError};
use crate::events::{ChangeEvent, Notifier};
use crate::migration;
use crate::traits::EntityStore;

/// How long a write waits for another connection's lock on the file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All database work runs on the blocking
/// pool so the async runtime is never stalled.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
    notifier: Arc<Notifier>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            notifier: Arc::new(Notifier::new()),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(StoreError::poisoned)?;
            f(&mut conn)
        })
        .await?
    }

    /// Run a write on the blocking pool and publish the event it returns.
    ///
    /// Publishing happens on the blocking thread once `f` has committed, so
    /// observers hear about every committed write even if the caller stops
    /// polling the returned future.
    async fn run_write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<(T, Option<ChangeEvent>)> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let notifier = Arc::clone(&self.notifier);
        tokio::task::spawn_blocking(move || {
            let (value, event) = {
                let mut conn = conn.lock().map_err(StoreError::poisoned)?;
                f(&mut conn)?
            };
            if let Some(event) = event {
                notifier.publish(event);
            }
            Ok(value)
        })
        .await?
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Ids are stored as SQLite integers, which are signed.
fn sql_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| StoreError::InvalidData(format!("id {} exceeds i64", id)))
}

fn from_sql_id(raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| StoreError::InvalidData(format!("negative id {}", raw)))
}

/// Read an id column, rejecting negative values.
fn id_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}

fn role_from_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    let parent_id = row
        .get::<_, Option<i64>>(2)?
        .map(|raw| {
            u64::try_from(raw)
                .map(RoleId::new)
                .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(2, raw))
        })
        .transpose()?;
    Ok(Role {
        id: RoleId::new(id_at(row, 0)?),
        name: row.get(1)?,
        parent_id,
    })
}

fn permission_from_row(row: &Row<'_>) -> rusqlite::Result<Permission> {
    Ok(Permission {
        id: PermissionId::new(id_at(row, 0)?),
        name: row.get(1)?,
        object_id: ObjectId::new(id_at(row, 2)?),
        action_id: ActionId::new(id_at(row, 3)?),
    })
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action::new(
        ActionId::new(id_at(row, 0)?),
        row.get::<_, String>(1)?,
    ))
}

fn object_from_row(row: &Row<'_>) -> rusqlite::Result<Object> {
    Ok(Object::new(
        ObjectId::new(id_at(row, 0)?),
        row.get::<_, String>(1)?,
    ))
}

fn query_all<T, F>(conn: &Connection, sql: &str, f: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], f)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Ids from the first column of a query keyed by one id.
fn query_ids(conn: &Connection, sql: &str, key: u64) -> Result<Vec<u64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([sql_id(key)?], |row| id_at(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Writes take the file lock up front rather than upgrading a read lock.
fn write_tx(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

fn require(conn: &Connection, table: &str, kind: &str, id: u64) -> Result<()> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table);
    match conn.query_row(&sql, [sql_id(id)?], |_| Ok(())).optional()? {
        Some(()) => Ok(()),
        None => Err(StoreError::NotFound(format!("{} {}", kind, id))),
    }
}

fn require_classifiers(conn: &Connection, action: ActionId, object: ObjectId) -> Result<()> {
    if !action.is_none() {
        require(conn, "actions", "action", action.get())?;
    }
    if !object.is_none() {
        require(conn, "objects", "object", object.get())?;
    }
    Ok(())
}

/// Reject `name` if another row of `table` already carries it.
fn ensure_unique(
    conn: &Connection,
    table: &str,
    kind: &str,
    name: &str,
    except: Option<u64>,
) -> Result<()> {
    let except = except.map(sql_id).transpose()?;
    let sql = format!("SELECT id FROM {} WHERE name = ?1", table);
    let existing: Option<i64> = conn.query_row(&sql, [name], |row| row.get(0)).optional()?;
    match existing {
        Some(id) if Some(id) != except => {
            Err(StoreError::Duplicate(format!("{} `{}`", kind, name)))
        }
        _ => Ok(()),
    }
}

/// Insert a name-only classifier row and return its id.
fn insert_named(conn: &mut Connection, table: &str, kind: &str, name: &str) -> Result<u64> {
    let tx = write_tx(conn)?;
    ensure_unique(&tx, table, kind, name, None)?;
    tx.execute(&format!("INSERT INTO {} (name) VALUES (?1)", table), [name])?;
    let id = from_sql_id(tx.last_insert_rowid())?;
    tx.commit()?;
    Ok(id)
}

fn rename(conn: &mut Connection, table: &str, kind: &str, id: u64, name: &str) -> Result<()> {
    let tx = write_tx(conn)?;
    require(&tx, table, kind, id)?;
    ensure_unique(&tx, table, kind, name, Some(id))?;
    tx.execute(
        &format!("UPDATE {} SET name = ?1 WHERE id = ?2", table),
        params![name, sql_id(id)?],
    )?;
    tx.commit()?;
    Ok(())
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let name = name.to_owned();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name, parent_id FROM roles WHERE name = ?1",
                [&name],
                role_from_row,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>> {
        let name = name.to_owned();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name, object_id, action_id FROM permissions WHERE name = ?1",
                [&name],
                permission_from_row,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn find_action_by_name(&self, name: &str) -> Result<Option<Action>> {
        let name = name.to_owned();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name FROM actions WHERE name = ?1",
                [&name],
                action_from_row,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn find_object_by_name(&self, name: &str) -> Result<Option<Object>> {
        let name = name.to_owned();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name FROM objects WHERE name = ?1",
                [&name],
                object_from_row,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name, parent_id FROM roles WHERE id = ?1",
                [sql_id(id.get())?],
                role_from_row,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name, object_id, action_id FROM permissions WHERE id = ?1",
                [sql_id(id.get())?],
                permission_from_row,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn role_parent(&self, id: RoleId) -> Result<Option<Role>> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT p.id, p.name, p.parent_id
                 FROM roles r JOIN roles p ON p.id = r.parent_id
                 WHERE r.id = ?1",
                [sql_id(id.get())?],
                role_from_row,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn role_permissions(&self, role: RoleId) -> Result<Vec<PermissionId>> {
        let ids = self
            .run(move |conn| {
                query_ids(
                    conn,
                    "SELECT permission_id FROM role_has_permissions
                     WHERE role_id = ?1 ORDER BY permission_id",
                    role.get(),
                )
            })
            .await?;
        Ok(ids.into_iter().map(PermissionId::new).collect())
    }

    async fn permission_roles(&self, permission: PermissionId) -> Result<Vec<RoleId>> {
        let ids = self
            .run(move |conn| {
                query_ids(
                    conn,
                    "SELECT role_id FROM role_has_permissions
                     WHERE permission_id = ?1 ORDER BY role_id",
                    permission.get(),
                )
            })
            .await?;
        Ok(ids.into_iter().map(RoleId::new).collect())
    }

    async fn role_subjects(&self, role: RoleId) -> Result<Vec<SubjectId>> {
        let ids = self
            .run(move |conn| {
                query_ids(
                    conn,
                    "SELECT subject_id FROM subject_has_roles
                     WHERE role_id = ?1 ORDER BY subject_id",
                    role.get(),
                )
            })
            .await?;
        Ok(ids.into_iter().map(SubjectId::new).collect())
    }

    async fn subject_roles(&self, subject: SubjectId) -> Result<Vec<RoleId>> {
        let ids = self
            .run(move |conn| {
                query_ids(
                    conn,
                    "SELECT role_id FROM subject_has_roles
                     WHERE subject_id = ?1 ORDER BY role_id",
                    subject.get(),
                )
            })
            .await?;
        Ok(ids.into_iter().map(RoleId::new).collect())
    }

    async fn subject_permissions(&self, subject: SubjectId) -> Result<Vec<PermissionId>> {
        let ids = self
            .run(move |conn| {
                query_ids(
                    conn,
                    "SELECT permission_id FROM subject_has_permissions
                     WHERE subject_id = ?1 ORDER BY rowid",
                    subject.get(),
                )
            })
            .await?;
        Ok(ids.into_iter().map(PermissionId::new).collect())
    }

    async fn subjects_with_roles(&self, roles: &[RoleId]) -> Result<Vec<SubjectId>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let keys = roles
            .iter()
            .map(|r| sql_id(r.get()))
            .collect::<Result<Vec<_>>>()?;
        let ids = self
            .run(move |conn| {
                let sql = format!(
                    "SELECT DISTINCT subject_id FROM subject_has_roles
                     WHERE role_id IN ({}) ORDER BY subject_id",
                    vec!["?"; keys.len()].join(", ")
                );
                let mut stmt = conn.prepare(&sql)?;
                let ids = stmt
                    .query_map(params_from_iter(keys.iter()), |row| id_at(row, 0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids.into_iter().map(SubjectId::new).collect())
    }

    async fn load_catalogue(&self) -> Result<Catalogue> {
        self.run(|conn| {
            let roles = query_all(
                conn,
                "SELECT id, name, parent_id FROM roles ORDER BY id",
                role_from_row,
            )?;
            let permissions = query_all(
                conn,
                "SELECT id, name, object_id, action_id FROM permissions ORDER BY id",
                permission_from_row,
            )?;
            let actions = query_all(conn, "SELECT id, name FROM actions", action_from_row)?;
            let objects = query_all(conn, "SELECT id, name FROM objects", object_from_row)?;
            let attachments = query_all(
                conn,
                "SELECT role_id, permission_id FROM role_has_permissions",
                |row| {
                    Ok((
                        RoleId::new(id_at(row, 0)?),
                        PermissionId::new(id_at(row, 1)?),
                    ))
                },
            )?;

            Ok(Catalogue::builder()
                .roles(roles)
                .permissions(permissions)
                .actions(actions)
                .objects(objects)
                .attachments(attachments)
                .build())
        })
        .await
    }

    async fn create_role(&self, name: &str, parent: Option<RoleId>) -> Result<Role> {
        validate_name(name)?;
        let name = name.to_owned();

        let role = self
            .run_write(move |conn| {
                let tx = write_tx(conn)?;
                ensure_unique(&tx, "roles", "role", &name, None)?;
                if let Some(parent) = parent {
                    require(&tx, "roles", "role", parent.get())?;
                }
                tx.execute(
                    "INSERT INTO roles (name, parent_id) VALUES (?1, ?2)",
                    params![name, parent.map(|p| sql_id(p.get())).transpose()?],
                )?;
                let id = RoleId::new(from_sql_id(tx.last_insert_rowid())?);
                tx.commit()?;
                let event = ChangeEvent::created(EntityKind::Role, id.get());
                Ok((
                    Role {
                        id,
                        name,
                        parent_id: parent,
                    },
                    Some(event),
                ))
            })
            .await?;

        tracing::debug!(role = %role.name, id = %role.id, "created role");
        Ok(role)
    }

    async fn update_role(&self, role: &Role) -> Result<()> {
        validate_name(&role.name)?;
        let updated = role.clone();

        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            let id = updated.id.get();
            require(&tx, "roles", "role", id)?;
            ensure_unique(&tx, "roles", "role", &updated.name, Some(id))?;
            if let Some(parent) = updated.parent_id {
                require(&tx, "roles", "role", parent.get())?;
            }
            tx.execute(
                "UPDATE roles SET name = ?1, parent_id = ?2 WHERE id = ?3",
                params![
                    updated.name,
                    updated.parent_id.map(|p| sql_id(p.get())).transpose()?,
                    sql_id(id)?
                ],
            )?;
            tx.commit()?;
            Ok(((), Some(ChangeEvent::updated(EntityKind::Role, id))))
        })
        .await?;

        tracing::debug!(role = %role.name, id = %role.id, "updated role");
        Ok(())
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            let key = sql_id(id.get())?;
            if tx.execute("DELETE FROM roles WHERE id = ?1", [key])? == 0 {
                return Err(StoreError::NotFound(format!("role {}", id)));
            }
            tx.execute("UPDATE roles SET parent_id = NULL WHERE parent_id = ?1", [key])?;
            tx.execute("DELETE FROM role_has_permissions WHERE role_id = ?1", [key])?;
            tx.execute("DELETE FROM subject_has_roles WHERE role_id = ?1", [key])?;
            tx.commit()?;
            Ok(((), Some(ChangeEvent::deleted(EntityKind::Role, id.get()))))
        })
        .await?;

        tracing::debug!(id = %id, "deleted role");
        Ok(())
    }

    async fn create_permission(
        &self,
        name: &str,
        action: ActionId,
        object: ObjectId,
    ) -> Result<Permission> {
        validate_name(name)?;
        let name = name.to_owned();

        let permission = self
            .run_write(move |conn| {
                let tx = write_tx(conn)?;
                ensure_unique(&tx, "permissions", "permission", &name, None)?;
                require_classifiers(&tx, action, object)?;
                tx.execute(
                    "INSERT INTO permissions (name, object_id, action_id) VALUES (?1, ?2, ?3)",
                    params![name, sql_id(object.get())?, sql_id(action.get())?],
                )?;
                let id = PermissionId::new(from_sql_id(tx.last_insert_rowid())?);
                tx.commit()?;
                let event = ChangeEvent::created(EntityKind::Permission, id.get());
                Ok((
                    Permission {
                        id,
                        name,
                        object_id: object,
                        action_id: action,
                    },
                    Some(event),
                ))
            })
            .await?;

        tracing::debug!(permission = %permission.name, id = %permission.id, "created permission");
        Ok(permission)
    }

    async fn update_permission(&self, permission: &Permission) -> Result<()> {
        validate_name(&permission.name)?;
        let updated = permission.clone();

        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            let id = updated.id.get();
            require(&tx, "permissions", "permission", id)?;
            ensure_unique(&tx, "permissions", "permission", &updated.name, Some(id))?;
            require_classifiers(&tx, updated.action_id, updated.object_id)?;
            tx.execute(
                "UPDATE permissions SET name = ?1, object_id = ?2, action_id = ?3 WHERE id = ?4",
                params![
                    updated.name,
                    sql_id(updated.object_id.get())?,
                    sql_id(updated.action_id.get())?,
                    sql_id(id)?
                ],
            )?;
            tx.commit()?;
            Ok(((), Some(ChangeEvent::updated(EntityKind::Permission, id))))
        })
        .await?;

        tracing::debug!(permission = %permission.name, id = %permission.id, "updated permission");
        Ok(())
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            let key = sql_id(id.get())?;
            if tx.execute("DELETE FROM permissions WHERE id = ?1", [key])? == 0 {
                return Err(StoreError::NotFound(format!("permission {}", id)));
            }
            tx.execute(
                "DELETE FROM role_has_permissions WHERE permission_id = ?1",
                [key],
            )?;
            tx.execute(
                "DELETE FROM subject_has_permissions WHERE permission_id = ?1",
                [key],
            )?;
            tx.commit()?;
            Ok((
                (),
                Some(ChangeEvent::deleted(EntityKind::Permission, id.get())),
            ))
        })
        .await?;

        tracing::debug!(id = %id, "deleted permission");
        Ok(())
    }

    async fn create_action(&self, name: &str) -> Result<Action> {
        validate_name(name)?;
        let name = name.to_owned();

        let action = self
            .run_write(move |conn| {
                let id = insert_named(conn, "actions", "action", &name)?;
                Ok((
                    Action::new(ActionId::new(id), name),
                    Some(ChangeEvent::created(EntityKind::Action, id)),
                ))
            })
            .await?;

        tracing::debug!(action = %action.name, id = %action.id, "created action");
        Ok(action)
    }

    async fn update_action(&self, action: &Action) -> Result<()> {
        validate_name(&action.name)?;
        let (id, name) = (action.id.get(), action.name.clone());

        self.run_write(move |conn| {
            rename(conn, "actions", "action", id, &name)?;
            Ok(((), Some(ChangeEvent::updated(EntityKind::Action, id))))
        })
        .await
    }

    async fn delete_action(&self, id: ActionId) -> Result<()> {
        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            let key = sql_id(id.get())?;
            if tx.execute("DELETE FROM actions WHERE id = ?1", [key])? == 0 {
                return Err(StoreError::NotFound(format!("action {}", id)));
            }
            tx.execute(
                "UPDATE permissions SET action_id = 0 WHERE action_id = ?1",
                [key],
            )?;
            tx.commit()?;
            Ok(((), Some(ChangeEvent::deleted(EntityKind::Action, id.get()))))
        })
        .await?;

        tracing::debug!(id = %id, "deleted action");
        Ok(())
    }

    async fn create_object(&self, name: &str) -> Result<Object> {
        validate_name(name)?;
        let name = name.to_owned();

        let object = self
            .run_write(move |conn| {
                let id = insert_named(conn, "objects", "object", &name)?;
                Ok((
                    Object::new(ObjectId::new(id), name),
                    Some(ChangeEvent::created(EntityKind::Object, id)),
                ))
            })
            .await?;

        tracing::debug!(object = %object.name, id = %object.id, "created object");
        Ok(object)
    }

    async fn update_object(&self, object: &Object) -> Result<()> {
        validate_name(&object.name)?;
        let (id, name) = (object.id.get(), object.name.clone());

        self.run_write(move |conn| {
            rename(conn, "objects", "object", id, &name)?;
            Ok(((), Some(ChangeEvent::updated(EntityKind::Object, id))))
        })
        .await
    }

    async fn delete_object(&self, id: ObjectId) -> Result<()> {
        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            let key = sql_id(id.get())?;
            if tx.execute("DELETE FROM objects WHERE id = ?1", [key])? == 0 {
                return Err(StoreError::NotFound(format!("object {}", id)));
            }
            tx.execute(
                "UPDATE permissions SET object_id = 0 WHERE object_id = ?1",
                [key],
            )?;
            tx.commit()?;
            Ok(((), Some(ChangeEvent::deleted(EntityKind::Object, id.get()))))
        })
        .await?;

        tracing::debug!(id = %id, "deleted object");
        Ok(())
    }

    async fn attach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            require(&tx, "roles", "role", role.get())?;
            require(&tx, "permissions", "permission", permission.get())?;
            let changed = tx.execute(
                "INSERT OR IGNORE INTO role_has_permissions (role_id, permission_id)
                 VALUES (?1, ?2)",
                [sql_id(role.get())?, sql_id(permission.get())?],
            )?;
            tx.commit()?;
            let attached = changed > 0;
            let event = attached.then(|| ChangeEvent::updated(EntityKind::Role, role.get()));
            Ok((attached, event))
        })
        .await
    }

    async fn detach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        self.run_write(move |conn| {
            let changed = conn.execute(
                "DELETE FROM role_has_permissions WHERE role_id = ?1 AND permission_id = ?2",
                [sql_id(role.get())?, sql_id(permission.get())?],
            )?;
            let detached = changed > 0;
            let event = detached.then(|| ChangeEvent::updated(EntityKind::Role, role.get()));
            Ok((detached, event))
        })
        .await
    }

    async fn assign_roles(&self, subject: SubjectId, roles: &[RoleId]) -> Result<()> {
        let roles = roles.to_vec();

        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            for role in &roles {
                require(&tx, "roles", "role", role.get())?;
            }
            let key = sql_id(subject.get())?;
            let mut changed = 0;
            for role in &roles {
                changed += tx.execute(
                    "INSERT OR IGNORE INTO subject_has_roles (subject_id, role_id)
                     VALUES (?1, ?2)",
                    [key, sql_id(role.get())?],
                )?;
            }
            tx.commit()?;
            let event =
                (changed > 0).then(|| ChangeEvent::updated(EntityKind::Subject, subject.get()));
            Ok(((), event))
        })
        .await
    }

    async fn remove_role(&self, subject: SubjectId, role: RoleId) -> Result<bool> {
        self.run_write(move |conn| {
            let changed = conn.execute(
                "DELETE FROM subject_has_roles WHERE subject_id = ?1 AND role_id = ?2",
                [sql_id(subject.get())?, sql_id(role.get())?],
            )?;
            let removed = changed > 0;
            let event = removed.then(|| ChangeEvent::updated(EntityKind::Subject, subject.get()));
            Ok((removed, event))
        })
        .await
    }

    async fn clear_roles(&self, subject: SubjectId) -> Result<()> {
        self.run_write(move |conn| {
            let changed = conn.execute(
                "DELETE FROM subject_has_roles WHERE subject_id = ?1",
                [sql_id(subject.get())?],
            )?;
            let event =
                (changed > 0).then(|| ChangeEvent::updated(EntityKind::Subject, subject.get()));
            Ok(((), event))
        })
        .await
    }

    async fn grant_permission(
        &self,
        subject: SubjectId,
        permission: PermissionId,
    ) -> Result<bool> {
        self.run_write(move |conn| {
            let tx = write_tx(conn)?;
            require(&tx, "permissions", "permission", permission.get())?;
            let changed = tx.execute(
                "INSERT OR IGNORE INTO subject_has_permissions (subject_id, permission_id)
                 VALUES (?1, ?2)",
                [sql_id(subject.get())?, sql_id(permission.get())?],
            )?;
            tx.commit()?;
            let granted = changed > 0;
            let event = granted.then(|| ChangeEvent::updated(EntityKind::Subject, subject.get()));
            Ok((granted, event))
        })
        .await
    }

    async fn revoke_permission(
        &self,
        subject: SubjectId,
        permission: PermissionId,
    ) -> Result<bool> {
        self.run_write(move |conn| {
            let changed = conn.execute(
                "DELETE FROM subject_has_permissions
                 WHERE subject_id = ?1 AND permission_id = ?2",
                [sql_id(subject.get())?, sql_id(permission.get())?],
            )?;
            let revoked = changed > 0;
            let event = revoked.then(|| ChangeEvent::updated(EntityKind::Subject, subject.get()));
            Ok((revoked, event))
        })
        .await
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_role() {
        let store = SqliteStore::open_memory().unwrap();

        let admin = store.create_role("admin", None).await.unwrap();
        let editor = store.create_role("editor", Some(admin.id)).await.unwrap();
        assert_eq!(admin.id, RoleId::new(1));

        let found = store.find_role_by_name("editor").await.unwrap().unwrap();
        assert_eq!(found, editor);
        assert_eq!(store.role_parent(editor.id).await.unwrap(), Some(admin));
        assert!(store.find_role_by_name("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_action("read").await.unwrap();

        let err = store.create_action("read").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_grant_order_is_preserved() {
        let store = SqliteStore::open_memory().unwrap();
        let b = store
            .create_permission("b", ActionId::NONE, ObjectId::NONE)
            .await
            .unwrap();
        let a = store
            .create_permission("a", ActionId::NONE, ObjectId::NONE)
            .await
            .unwrap();

        let subject = SubjectId::new(5);
        store.grant_permission(subject, a.id).await.unwrap();
        store.grant_permission(subject, b.id).await.unwrap();
        assert!(!store.grant_permission(subject, a.id).await.unwrap());

        assert_eq!(
            store.subject_permissions(subject).await.unwrap(),
            vec![a.id, b.id]
        );
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rolegate.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let role = store.create_role("admin", None).await.unwrap();
            let permission = store
                .create_permission("manage", ActionId::NONE, ObjectId::NONE)
                .await
                .unwrap();
            store.attach_permission(role.id, permission.id).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let catalogue = store.load_catalogue().await.unwrap();
        let admin = catalogue.find_role_by_name("admin").unwrap();
        let manage = catalogue.find_permission_by_name("manage").unwrap();
        assert!(catalogue.role_has_permission(admin.id, manage.id));
    }

    #[tokio::test]
    async fn test_ids_outside_sqlite_range_are_invalid_data() {
        let store = SqliteStore::open_memory().unwrap();

        let err = store.get_role(RoleId::new(u64::MAX)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
        let err = store
            .subjects_with_roles(&[RoleId::new(1), RoleId::new(u64::MAX)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));

        store
            .conn
            .lock()
            .unwrap()
            .execute("INSERT INTO roles (id, name) VALUES (-4, 'ghost')", [])
            .unwrap();
        let err = store.find_role_by_name("ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
        assert!(matches!(
            store.load_catalogue().await,
            Err(StoreError::InvalidData(_))
        ));
    }
}
