//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! - `users` — profiles; `handle` unique case-insensitively, `email` unique.
//! - `follows` — (follower_id, followee_id) edges. `seq` records creation
//!   order. The unique pair, the no-self-follow check, and the foreign keys
//!   are all enforced by SQLite, so `follow` is a single `INSERT` with no
//!   read-then-write window.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, OptionalExtension};
use socialgraph::{check_not_self, Edge, Page, PageParams, UserId, UserRef};
use socialgraph_api::{UpdateProfileRequest, UserProfile};

use super::{NewUser, Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name TEXT NOT NULL,
    handle       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email        TEXT NOT NULL UNIQUE,
    public_key   TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS follows (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    follower_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    followee_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at   TEXT NOT NULL,
    UNIQUE (follower_id, followee_id),
    CHECK (follower_id <> followee_id)
);
CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id);
";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` on the connection inside `spawn_blocking`.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|p| p.into_inner());
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::internal("task", format!("task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Error conversions
// ---------------------------------------------------------------------------

/// Classify a SQLite error into an [`StorageError::Internal`] kind.
fn map_err(e: rusqlite::Error) -> StorageError {
    let kind = match &e {
        rusqlite::Error::SqliteFailure(err, _) => match err.code {
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => "busy",
            rusqlite::ErrorCode::ConstraintViolation => "constraint",
            _ => "query",
        },
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..) => "decode",
        _ => "query",
    };
    StorageError::internal(kind, e.to_string())
}

/// Extended result code of a constraint violation, if `e` is one.
fn constraint_code(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(err.extended_code)
        }
        _ => None,
    }
}

/// Map a unique violation on `users` to a conflict naming the column.
fn map_user_err(e: rusqlite::Error) -> StorageError {
    if constraint_code(&e) == Some(ffi::SQLITE_CONSTRAINT_UNIQUE) {
        let field = if e.to_string().contains("users.email") {
            "email"
        } else {
            "handle"
        };
        return StorageError::Conflict(format!("{field} already registered"));
    }
    map_err(e)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StorageError::internal("decode", format!("bad timestamp {raw:?}: {e}")))
}

fn row_to_ref(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRef> {
    Ok(UserRef {
        id: UserId(row.get(0)?),
        display_name: row.get(1)?,
        handle: row.get(2)?,
    })
}

fn fetch_user(conn: &Connection, id: UserId) -> Result<Option<UserProfile>, StorageError> {
    let row = conn
        .query_row(
            "SELECT id, display_name, handle, email, public_key, created_at
             FROM users WHERE id = ?1",
            params![id.get()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()
        .map_err(map_err)?;

    match row {
        None => Ok(None),
        Some((id, display_name, handle, email, public_key, created_at)) => Ok(Some(UserProfile {
            id: UserId(id),
            display_name,
            handle,
            email,
            public_key,
            created_at: parse_ts(&created_at)?,
        })),
    }
}

/// Count plus one page of a neighbor listing, under the same lock.
fn neighbor_page(
    conn: &Connection,
    count_sql: &str,
    page_sql: &str,
    user: UserId,
    page: PageParams,
) -> Result<Page<UserRef>, StorageError> {
    let total: i64 = conn
        .query_row(count_sql, params![user.get()], |row| row.get(0))
        .map_err(map_err)?;

    let limit = i64::from(page.limit);
    let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(page_sql).map_err(map_err)?;
    let items = stmt
        .query_map(params![user.get(), limit, offset], row_to_ref)
        .map_err(map_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_err)?;

    Ok(Page {
        items,
        total: u64::try_from(total).unwrap_or(0),
        page: page.page,
        limit: page.limit,
    })
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    // --- Users ---------------------------------------------------------------

    async fn create_user(&self, user: &NewUser) -> Result<UserProfile, StorageError> {
        let user = user.clone();
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO users (display_name, handle, email, public_key, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.display_name,
                    user.handle,
                    user.email,
                    user.public_key,
                    created_at.to_rfc3339(),
                ],
            )
            .map_err(map_user_err)?;

            Ok(UserProfile {
                id: UserId(conn.last_insert_rowid()),
                display_name: user.display_name,
                handle: user.handle,
                email: user.email,
                public_key: user.public_key,
                created_at,
            })
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        self.with_conn(move |conn| fetch_user(conn, id)).await
    }

    async fn update_user(
        &self,
        id: UserId,
        update: &UpdateProfileRequest,
    ) -> Result<UserProfile, StorageError> {
        let update = update.clone();
        self.with_conn(move |conn| {
            // Absent fields keep their column value.
            let changed = conn
                .execute(
                    "UPDATE users
                     SET display_name = COALESCE(?2, display_name),
                         handle       = COALESCE(?3, handle),
                         email        = COALESCE(?4, email),
                         public_key   = COALESCE(?5, public_key)
                     WHERE id = ?1",
                    params![
                        id.get(),
                        update.display_name,
                        update.handle,
                        update.email,
                        update.public_key,
                    ],
                )
                .map_err(map_user_err)?;
            if changed == 0 {
                return Err(StorageError::NotFound);
            }
            fetch_user(conn, id)?.ok_or(StorageError::NotFound)
        })
        .await
    }

    // --- Follows -------------------------------------------------------------

    async fn follow(&self, follower: UserId, followee: UserId) -> Result<Edge, StorageError> {
        check_not_self(follower, followee)?;

        self.with_conn(move |conn| {
            let edge = Edge::new(follower, followee);
            conn.execute(
                "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
                params![follower.get(), followee.get(), edge.created_at.to_rfc3339()],
            )
            .map_err(|e| match constraint_code(&e) {
                Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                    StorageError::DuplicateEdge { follower, followee }
                }
                Some(ffi::SQLITE_CONSTRAINT_CHECK) => StorageError::SelfFollow(follower),
                Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => StorageError::NotFound,
                _ => map_err(e),
            })?;
            Ok(edge)
        })
        .await
    }

    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    params![follower.get(), followee.get()],
                )
                .map_err(map_err)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_following(
        &self,
        user: UserId,
        page: &PageParams,
    ) -> Result<Page<UserRef>, StorageError> {
        let page = *page;
        self.with_conn(move |conn| {
            neighbor_page(
                conn,
                "SELECT COUNT(*) FROM follows f
                 JOIN users u ON u.id = f.followee_id
                 WHERE f.follower_id = ?1",
                "SELECT u.id, u.display_name, u.handle FROM follows f
                 JOIN users u ON u.id = f.followee_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.seq ASC
                 LIMIT ?2 OFFSET ?3",
                user,
                page,
            )
        })
        .await
    }

    async fn list_followers(
        &self,
        user: UserId,
        page: &PageParams,
    ) -> Result<Page<UserRef>, StorageError> {
        let page = *page;
        self.with_conn(move |conn| {
            neighbor_page(
                conn,
                "SELECT COUNT(*) FROM follows f
                 JOIN users u ON u.id = f.follower_id
                 WHERE f.followee_id = ?1",
                "SELECT u.id, u.display_name, u.handle FROM follows f
                 JOIN users u ON u.id = f.follower_id
                 WHERE f.followee_id = ?1
                 ORDER BY f.seq ASC
                 LIMIT ?2 OFFSET ?3",
                user,
                page,
            )
        })
        .await
    }

    async fn list_mutual(&self, user: UserId) -> Result<Vec<UserRef>, StorageError> {
        self.with_conn(move |conn| {
            // Single self-join: f1 is user → x, f2 is x → user.
            let mut stmt = conn
                .prepare(
                    "SELECT u.id, u.display_name, u.handle
                     FROM follows f1
                     JOIN follows f2
                       ON f2.follower_id = f1.followee_id
                      AND f2.followee_id = f1.follower_id
                     JOIN users u ON u.id = f1.followee_id
                     WHERE f1.follower_id = ?1
                     ORDER BY f1.seq ASC",
                )
                .map_err(map_err)?;
            let result = stmt
                .query_map(params![user.get()], row_to_ref)
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(result)
        })
        .await
    }

    async fn is_following(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    params![follower.get(), followee.get()],
                    |row| row.get(0),
                )
                .map_err(map_err)?;
            Ok(count > 0)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::conformance as suite;

    fn store() -> SqliteStorage {
        SqliteStorage::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn create_and_get_user() {
        suite::create_and_get_user(&store()).await;
    }

    #[tokio::test]
    async fn duplicate_handle_conflicts() {
        suite::duplicate_handle_conflicts(&store()).await;
    }

    #[tokio::test]
    async fn update_user() {
        suite::update_user(&store()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_partial_updates_all_apply() {
        suite::concurrent_partial_updates_all_apply(Arc::new(store())).await;
    }

    #[tokio::test]
    async fn self_follow_rejected() {
        suite::self_follow_rejected(&store()).await;
    }

    #[tokio::test]
    async fn duplicate_follow_rejected() {
        suite::duplicate_follow_rejected(&store()).await;
    }

    #[tokio::test]
    async fn unfollow_roundtrip() {
        suite::unfollow_roundtrip(&store()).await;
    }

    #[tokio::test]
    async fn following_is_a_set() {
        suite::following_is_a_set(&store()).await;
    }

    #[tokio::test]
    async fn mutual_requires_both_edges() {
        suite::mutual_requires_both_edges(&store()).await;
    }

    #[tokio::test]
    async fn scenario() {
        suite::scenario(&store()).await;
    }

    #[tokio::test]
    async fn pagination() {
        suite::pagination(&store()).await;
    }

    #[tokio::test]
    async fn empty_lists_are_not_errors() {
        suite::empty_lists_are_not_errors(&store()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_follow_yields_one_edge() {
        suite::concurrent_follow_yields_one_edge(Arc::new(store())).await;
    }

    #[tokio::test]
    async fn follow_unknown_user_is_not_found() {
        let s = store();
        let ana = s.create_user(&suite::new_user("ana")).await.unwrap();
        let err = s.follow(ana.id, UserId(42)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound), "{err:?}");
    }

    #[tokio::test]
    async fn check_constraint_backs_up_self_follow() {
        let s = store();
        let ana = s.create_user(&suite::new_user("ana")).await.unwrap();
        // Bypass the pre-write check to prove the schema rejects it too.
        let err = s
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO follows (follower_id, followee_id, created_at)
                     VALUES (?1, ?1, '2026-01-01T00:00:00Z')",
                    params![ana.id.get()],
                )
                .map_err(map_err)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Internal { kind: "constraint", .. }), "{err:?}");
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("sgraph-test-{}.db", std::process::id()));
        let path = dir.to_str().unwrap().to_string();
        let _ = std::fs::remove_file(&path);

        {
            let s = SqliteStorage::open(&path).unwrap();
            let a = s.create_user(&suite::new_user("ana")).await.unwrap();
            let b = s.create_user(&suite::new_user("bruno")).await.unwrap();
            s.follow(a.id, b.id).await.unwrap();
        }

        let s = SqliteStorage::open(&path).unwrap();
        assert!(s.is_following(UserId(1), UserId(2)).await.unwrap());
        let _ = std::fs::remove_file(&path);
    }
}
