//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and ephemeral servers.
//!
//! Edges live in a [`FollowGraph`]; every mutation takes the write lock once,
//! so the duplicate check and the insert cannot interleave with another
//! request for the same pair.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use socialgraph::{Edge, FollowGraph, Page, PageParams, UserId, UserRef};
use socialgraph_api::{UpdateProfileRequest, UserProfile};

use super::{NewUser, Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Inner {
    users: BTreeMap<UserId, UserProfile>,
    next_id: i64,
    graph: FollowGraph,
}

impl Inner {
    fn new() -> Self {
        Self {
            users: BTreeMap::new(),
            next_id: 1,
            graph: FollowGraph::new(),
        }
    }

    /// Find a user other than `except` holding `handle` (case-insensitive) or `email`.
    fn taken(&self, handle: &str, email: &str, except: Option<UserId>) -> Option<&'static str> {
        for u in self.users.values() {
            if Some(u.id) == except {
                continue;
            }
            if u.handle.eq_ignore_ascii_case(handle) {
                return Some("handle");
            }
            if u.email == email {
                return Some("email");
            }
        }
        None
    }

    /// Project ids to [`UserRef`]s, skipping ids with no profile.
    fn refs(&self, ids: Vec<UserId>) -> Vec<UserRef> {
        ids.into_iter()
            .filter_map(|id| self.users.get(&id).map(UserProfile::to_ref))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    // --- Users ---------------------------------------------------------------

    async fn create_user(&self, user: &NewUser) -> Result<UserProfile, StorageError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(field) = inner.taken(&user.handle, &user.email, None) {
            return Err(StorageError::Conflict(format!("{field} already registered")));
        }

        let id = UserId(inner.next_id);
        inner.next_id += 1;
        let profile = UserProfile {
            id,
            display_name: user.display_name.clone(),
            handle: user.handle.clone(),
            email: user.email.clone(),
            public_key: user.public_key.clone(),
            created_at: Utc::now(),
        };
        inner.users.insert(id, profile.clone());
        Ok(profile)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.users.get(&id).cloned())
    }

    async fn update_user(
        &self,
        id: UserId,
        update: &UpdateProfileRequest,
    ) -> Result<UserProfile, StorageError> {
        let mut inner = self.inner.write().unwrap();
        let mut profile = inner.users.get(&id).cloned().ok_or(StorageError::NotFound)?;
        profile.apply(update.clone());
        if let Some(field) = inner.taken(&profile.handle, &profile.email, Some(id)) {
            return Err(StorageError::Conflict(format!("{field} already registered")));
        }
        inner.users.insert(id, profile.clone());
        Ok(profile)
    }

    // --- Follows -------------------------------------------------------------

    async fn follow(&self, follower: UserId, followee: UserId) -> Result<Edge, StorageError> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.graph.follow(follower, followee)?)
    }

    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.graph.unfollow(follower, followee))
    }

    async fn list_following(
        &self,
        user: UserId,
        page: &PageParams,
    ) -> Result<Page<UserRef>, StorageError> {
        let inner = self.inner.read().unwrap();
        let refs = inner.refs(inner.graph.following(user));
        Ok(page.slice(&refs))
    }

    async fn list_followers(
        &self,
        user: UserId,
        page: &PageParams,
    ) -> Result<Page<UserRef>, StorageError> {
        let inner = self.inner.read().unwrap();
        let refs = inner.refs(inner.graph.followers(user));
        Ok(page.slice(&refs))
    }

    async fn list_mutual(&self, user: UserId) -> Result<Vec<UserRef>, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.refs(inner.graph.mutual(user)))
    }

    async fn is_following(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, StorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.graph.contains(follower, followee))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
