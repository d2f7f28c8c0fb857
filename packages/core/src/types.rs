//! Core data types for the follow graph.
//!
//! This module defines the records the rest of the workspace passes around:
//! [`UserId`], [`Edge`], [`UserRef`], and the page types [`PageParams`] and
//! [`Page`]. All types serialise to and from JSON exactly as they appear on
//! the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size when the caller does not pass `limit`.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Integer identifier of a user.
///
/// Serialises as a bare JSON number (e.g. `42`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(v: i64) -> Self {
        UserId(v)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a [`UserId`] from its decimal form.
///
/// Returns `Err` with a descriptive message if the string is not an integer.
impl std::str::FromStr for UserId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| format!("invalid user id {s:?}; expected an integer"))
    }
}

/// A directed follow relationship: `follower_id` follows `followee_id`.
///
/// Edges are immutable once created. The only transitions are create
/// (follow) and delete (unfollow).
///
/// # Example
///
/// ```json
/// {
///   "follower_id": 1,
///   "followee_id": 2,
///   "created_at": "2026-03-01T12:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    /// The user who initiated the follow.
    pub follower_id: UserId,

    /// The user being followed.
    pub followee_id: UserId,

    /// When the edge was created. Used for ordering only.
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Create an edge stamped with the current UTC time.
    pub fn new(follower_id: UserId, followee_id: UserId) -> Self {
        Self {
            follower_id,
            followee_id,
            created_at: Utc::now(),
        }
    }

    /// The `(follower, followee)` pair that uniquely identifies this edge.
    pub fn key(&self) -> (UserId, UserId) {
        (self.follower_id, self.followee_id)
    }
}

/// Minimal projection of a user used to render graph query results.
///
/// Carries no credential or contact data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    pub display_name: String,
    pub handle: String,
}

/// 1-based page selector for neighbor listings.
///
/// Deserialises from query parameters `?page=2&limit=20`; both fields are
/// optional and fall back to page `1` and [`DEFAULT_PAGE_LIMIT`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Number of items to skip. Pages below `1` are treated as `1`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit)
    }

    /// Number of pages needed to hold `total` items (rounded up).
    pub fn total_pages(&self, total: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total.div_ceil(u64::from(self.limit))
    }

    /// Take this page out of an already-ordered slice.
    pub fn slice<T: Clone>(&self, all: &[T]) -> Page<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let items = all
            .iter()
            .skip(start)
            .take(self.limit as usize)
            .cloned()
            .collect();
        Page {
            items,
            total: all.len() as u64,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// One page of an ordered result plus the total size of the full result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        PageParams::new(self.page, self.limit).total_pages(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_is_a_bare_number_on_the_wire() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
        let back: UserId = serde_json::from_str("7").unwrap();
        assert_eq!(back, UserId(7));
    }

    #[test]
    fn user_id_from_str() {
        assert_eq!(" 12 ".parse::<UserId>().unwrap(), UserId(12));
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn page_params_default_when_query_is_empty() {
        let p: PageParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p, PageParams::default());
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn offset_and_total_pages() {
        let p = PageParams::new(3, 10);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(21), 3);
    }

    #[test]
    fn slice_takes_the_requested_window() {
        let all: Vec<u32> = (1..=25).collect();
        let page = PageParams::new(3, 10).slice(&all);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages(), 3);

        let past_end = PageParams::new(9, 10).slice(&all);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 25);
    }

    #[test]
    fn edge_serialises_with_rfc3339_timestamp() {
        let edge = Edge::new(UserId(1), UserId(2));
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["follower_id"], 1);
        assert_eq!(json["followee_id"], 2);
        assert!(json["created_at"].as_str().unwrap().contains('T'));
    }
}
