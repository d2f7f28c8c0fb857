//! Core follow-graph model for the socialgraph service.
//!
//! This crate holds the pure logic shared by the HTTP server, the `sgraph`
//! CLI, and the `socialgraph-api` wire types. It performs no I/O.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | [`UserId`], [`Edge`], [`UserRef`], [`PageParams`], [`Page`] |
//! | [`graph`] | In-memory [`FollowGraph`]: edge invariants, neighbor and mutual queries |
//! | [`validation`] | Profile field and paging checks via [`ValidationError`] |
//! | [`keys`] | Ed25519 public key encoding and request signing |
//! | [`render`] | Plain-text rendering of user lists and edges |
//!
//! # Quick start
//!
//! ```rust
//! use socialgraph::{FollowGraph, UserId};
//!
//! let mut g = FollowGraph::new();
//! g.follow(UserId(1), UserId(2)).unwrap();
//! g.follow(UserId(2), UserId(1)).unwrap();
//! g.follow(UserId(1), UserId(3)).unwrap();
//!
//! assert_eq!(g.mutual(UserId(1)), vec![UserId(2)]);
//! assert!(g.follow(UserId(1), UserId(1)).is_err());
//! ```

pub mod graph;
pub mod keys;
pub mod render;
pub mod types;
pub mod validation;

pub use graph::{check_not_self, FollowError, FollowGraph};
pub use keys::{decode_public_key, encode_public_key, sign_request, KeyError};
pub use types::{Edge, Page, PageParams, UserId, UserRef, DEFAULT_PAGE_LIMIT};
pub use validation::{validate_page, validate_profile, ValidationError};
