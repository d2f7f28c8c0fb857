//! Request and response types for the socialgraph HTTP API.
//!
//! Shared by the server, the `sgraph` CLI, and the conformance suite so
//! all three agree on the wire format.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | POST | `/v1/users` | [`RegisterRequest`] → [`UserProfile`] |
//! | GET | `/v1/users/{id}` | → [`UserProfile`] |
//! | PATCH | `/v1/users/{id}` | [`UpdateProfileRequest`] → [`UserProfile`] |
//! | POST | `/v1/users/{id}/following` | [`FollowRequest`] → [`socialgraph::Edge`] |
//! | DELETE | `/v1/users/{id}/following/{followee_id}` | → `204` |
//! | GET | `/v1/users/{id}/following` | [`socialgraph::PageParams`] → [`UserRefPage`] |
//! | GET | `/v1/users/{id}/followers` | [`socialgraph::PageParams`] → [`UserRefPage`] |
//! | GET | `/v1/users/{id}/mutual` | → [`UserRefList`] |
//! | GET | `/v1/health` | → [`HealthResponse`] |

pub mod error;
pub mod follow;
pub mod health;
pub mod user;

pub use error::ErrorResponse;
pub use follow::{FollowRequest, UserRefList, UserRefPage};
pub use health::HealthResponse;
pub use user::{RegisterRequest, UpdateProfileRequest, UserProfile};
