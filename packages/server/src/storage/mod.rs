//! Storage abstraction layer for the socialgraph server.
//!
//! The [`Storage`] trait defines the contract between the HTTP handler layer
//! and persistence. Authorization lives in the handlers; storage enforces
//! only the data invariants (no self-follow, one edge per ordered pair,
//! unique handles and emails).
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, ephemeral servers |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use socialgraph::{Edge, FollowError, Page, PageParams, UserId, UserRef};
use socialgraph_api::{UpdateProfileRequest, UserProfile};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The edge would have equal endpoints. Nothing was written.
    #[error("user {0} cannot follow themselves")]
    SelfFollow(UserId),

    /// The ordered pair already has an edge. Nothing was written.
    #[error("user {follower} already follows user {followee}")]
    DuplicateEdge { follower: UserId, followee: UserId },

    /// The requested item does not exist.
    #[error("not found")]
    NotFound,

    /// A unique user attribute (handle, email) is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unexpected error in the underlying storage backend.
    ///
    /// `kind` is a short classifier (`busy`, `constraint`, `query`, `decode`,
    /// `task`) suitable for logs and metrics labels.
    #[error("internal storage error ({kind}): {message}")]
    Internal { kind: &'static str, message: String },
}

impl StorageError {
    pub fn internal(kind: &'static str, message: impl Into<String>) -> Self {
        StorageError::Internal {
            kind,
            message: message.into(),
        }
    }
}

impl From<FollowError> for StorageError {
    fn from(e: FollowError) -> Self {
        match e {
            FollowError::SelfFollow(id) => StorageError::SelfFollow(id),
            FollowError::DuplicateEdge { follower, followee } => {
                StorageError::DuplicateEdge { follower, followee }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NewUser
// ---------------------------------------------------------------------------

/// A validated registration, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub display_name: String,
    pub handle: String,
    pub email: String,
    pub public_key: String,
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for the socialgraph server.
///
/// All methods are `async` and return `Result<_, StorageError>`. Implementations
/// must be `Send + Sync + 'static` so they can be held in an `Arc<dyn Storage>`.
///
/// Every mutation is a single atomic step against the backend: either the
/// whole change lands or nothing does. Failures are never retried here.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    // --- Users ---------------------------------------------------------------

    /// Persist a new user and return it with its assigned id.
    ///
    /// Returns [`StorageError::Conflict`] if the handle (case-insensitive) or
    /// email is already registered.
    async fn create_user(&self, user: &NewUser) -> Result<UserProfile, StorageError>;

    /// Retrieve a user by id. Returns `None` if not registered.
    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError>;

    /// Overwrite the fields present in `update` and return the new profile.
    ///
    /// The read and the write are one atomic step, so concurrent partial
    /// updates of different fields all land. Returns
    /// [`StorageError::NotFound`] if no such user exists and
    /// [`StorageError::Conflict`] if the new handle or email is taken.
    async fn update_user(
        &self,
        id: UserId,
        update: &UpdateProfileRequest,
    ) -> Result<UserProfile, StorageError>;

    // --- Follows -------------------------------------------------------------

    /// Create the edge `follower → followee`.
    ///
    /// The uniqueness check and the insert are one atomic step, so two
    /// concurrent calls for the same pair yield one edge and one
    /// [`StorageError::DuplicateEdge`]. Returns [`StorageError::SelfFollow`]
    /// when the endpoints are equal.
    async fn follow(&self, follower: UserId, followee: UserId) -> Result<Edge, StorageError>;

    /// Delete the edge matching the ordered pair exactly.
    ///
    /// Returns `false` (not an error) when no such edge exists.
    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<bool, StorageError>;

    /// One page of the users that `user` follows, in edge creation order.
    async fn list_following(
        &self,
        user: UserId,
        page: &PageParams,
    ) -> Result<Page<UserRef>, StorageError>;

    /// One page of the users that follow `user`, in edge creation order.
    async fn list_followers(
        &self,
        user: UserId,
        page: &PageParams,
    ) -> Result<Page<UserRef>, StorageError>;

    /// Users that `user` follows and who follow `user` back.
    ///
    /// Ordered by the creation of `user`'s outgoing edge.
    async fn list_mutual(&self, user: UserId) -> Result<Vec<UserRef>, StorageError>;

    /// Return `true` if `follower` follows `followee`.
    async fn is_following(&self, follower: UserId, followee: UserId)
        -> Result<bool, StorageError>;
}
