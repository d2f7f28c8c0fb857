//! User profile types — `POST /v1/users`, `GET/PATCH /v1/users/{id}`.
//!
//! Profiles belong to the profile collaborator, not the follow graph. The
//! graph only needs an existence check and the [`UserRef`] projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use socialgraph::{UserId, UserRef};

/// Request body for `POST /v1/users`.
///
/// # Example
///
/// ```json
/// {
///   "display_name": "Ana Gómez",
///   "handle": "ana_g",
///   "email": "ana@example.com",
///   "public_key": "z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    pub display_name: String,
    pub handle: String,
    pub email: String,

    /// Multibase Ed25519 public key used to verify this user's request
    /// signatures.
    pub public_key: String,
}

/// A stored user profile.
///
/// Returned by `POST /v1/users`, `GET /v1/users/{id}`, and
/// `PATCH /v1/users/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Assigned by the store on registration. Never changes.
    pub id: UserId,
    pub display_name: String,
    pub handle: String,
    pub email: String,
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// The minimal projection used in follow listings.
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            display_name: self.display_name.clone(),
            handle: self.handle.clone(),
        }
    }

    /// Overwrite the fields present in `update`. Absent fields are kept.
    ///
    /// This is the only way a profile changes after registration; nothing
    /// else is recomputed as a side effect.
    pub fn apply(&mut self, update: UpdateProfileRequest) {
        if let Some(name) = update.display_name {
            self.display_name = name;
        }
        if let Some(handle) = update.handle {
            self.handle = handle;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(key) = update.public_key {
            self.public_key = key;
        }
    }
}

/// Request body for `PATCH /v1/users/{id}`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.handle.is_none()
            && self.email.is_none()
            && self.public_key.is_none()
    }
}
