//! # User Store
//!
//! SQLite-backed persistence for users and their pending continuation
//! templates. Connections are opened per call; the consume operation runs
//! inside an immediate transaction so two rapid messages can never both
//! resolve against the same template.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::domain::errors::StoreError;
use crate::domain::traits::UserStore;
use crate::domain::types::User;

pub struct SqliteUserStore {
    path: PathBuf,
}

impl SqliteUserStore {
    /// Open the database, creating parent directories and the schema when
    /// missing.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = Self {
            path: path.to_path_buf(),
        };
        store.connect()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                api_key TEXT NOT NULL,
                secret_key TEXT NOT NULL,
                ca_path TEXT NOT NULL,
                ca_passwd TEXT NOT NULL,
                person_id TEXT NOT NULL,
                pending_template TEXT
            );
            ",
        )?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let connection = Connection::open(&self.path)?;
        connection.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        Ok(connection)
    }
}

impl UserStore for SqliteUserStore {
    fn user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let connection = self.connect()?;
        let user = connection
            .query_row(
                "SELECT id, api_key, secret_key, ca_path, ca_passwd, person_id, pending_template
                 FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        api_key: row.get(1)?,
                        secret_key: row.get(2)?,
                        ca_path: row.get(3)?,
                        ca_passwd: row.get(4)?,
                        person_id: row.get(5)?,
                        pending_template: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Insert or update a user's credentials. An update leaves any pending
    /// template untouched so re-registering mid-conversation does not reset
    /// the walk.
    fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO users (id, api_key, secret_key, ca_path, ca_passwd, person_id, pending_template)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 api_key=excluded.api_key,
                 secret_key=excluded.secret_key,
                 ca_path=excluded.ca_path,
                 ca_passwd=excluded.ca_passwd,
                 person_id=excluded.person_id",
            params![
                user.id,
                user.api_key,
                user.secret_key,
                user.ca_path,
                user.ca_passwd,
                user.person_id,
                user.pending_template,
            ],
        )?;
        Ok(())
    }

    fn pending_template(&self, id: &str) -> Result<Option<String>, StoreError> {
        let connection = self.connect()?;
        let template = connection
            .query_row(
                "SELECT pending_template FROM users WHERE id = ?1",
                params![id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(template.flatten())
    }

    fn set_pending_template(&self, id: &str, template: Option<&str>) -> Result<(), StoreError> {
        let connection = self.connect()?;
        connection.execute(
            "UPDATE users SET pending_template = ?2 WHERE id = ?1",
            params![id, template],
        )?;
        Ok(())
    }

    fn take_pending_template(&self, id: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connect()?;
        let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let template = tx
            .query_row(
                "SELECT pending_template FROM users WHERE id = ?1",
                params![id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
        if template.is_some() {
            tx.execute(
                "UPDATE users SET pending_template = NULL WHERE id = ?1",
                params![id],
            )?;
        }
        tx.commit()?;
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::test_user;

    fn open_store(dir: &tempfile::TempDir) -> SqliteUserStore {
        SqliteUserStore::open(&dir.path().join("users.sqlite3")).unwrap()
    }

    #[test]
    fn test_upsert_and_fetch_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let user = test_user("U1");
        store.upsert_user(&user).unwrap();
        assert_eq!(store.user("U1").unwrap(), Some(user));
        assert_eq!(store.user("U2").unwrap(), None);
    }

    #[test]
    fn test_upsert_updates_credentials_but_keeps_pending_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store.upsert_user(&test_user("U1")).unwrap();
        store
            .set_pending_template("U1", Some("cmd=place_order&order_lot={text}&stock_id=None&price=None&quantity=None&action=None&confirm=False"))
            .unwrap();

        let mut updated = test_user("U1");
        updated.api_key = "rotated".to_string();
        store.upsert_user(&updated).unwrap();

        let fetched = store.user("U1").unwrap().unwrap();
        assert_eq!(fetched.api_key, "rotated");
        assert!(fetched.pending_template.is_some());
    }

    #[test]
    fn test_set_and_take_pending_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store.upsert_user(&test_user("U1")).unwrap();
        store.set_pending_template("U1", Some("cmd=stock")).unwrap();
        assert_eq!(
            store.pending_template("U1").unwrap().as_deref(),
            Some("cmd=stock")
        );

        assert_eq!(
            store.take_pending_template("U1").unwrap().as_deref(),
            Some("cmd=stock")
        );
        assert_eq!(store.take_pending_template("U1").unwrap(), None);
        assert_eq!(store.pending_template("U1").unwrap(), None);
    }

    #[test]
    fn test_clear_pending_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store.upsert_user(&test_user("U1")).unwrap();
        store.set_pending_template("U1", Some("cmd=stock")).unwrap();
        store.set_pending_template("U1", None).unwrap();
        assert_eq!(store.pending_template("U1").unwrap(), None);
    }

    #[test]
    fn test_take_for_unknown_user_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert_eq!(store.take_pending_template("ghost").unwrap(), None);
    }

    #[test]
    fn test_users_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.sqlite3");

        let store = SqliteUserStore::open(&path).unwrap();
        store.upsert_user(&test_user("U1")).unwrap();
        drop(store);

        let reopened = SqliteUserStore::open(&path).unwrap();
        assert!(reopened.user("U1").unwrap().is_some());
    }
}
