//! Follow-graph types — `POST/DELETE/GET /v1/users/{id}/following` and the
//! follower and mutual listings.

use serde::{Deserialize, Serialize};
use socialgraph::{Page, UserId, UserRef};

/// Request body for `POST /v1/users/{id}/following`.
///
/// The follower is the authenticated `{id}`; only the target travels in the
/// body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowRequest {
    pub followee_id: UserId,
}

/// One page of users, returned by the following and followers listings.
///
/// # Example
///
/// ```json
/// {
///   "items": [{ "id": 2, "display_name": "Bruno", "handle": "bruno" }],
///   "total": 11,
///   "page": 2,
///   "limit": 10,
///   "total_pages": 2
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRefPage {
    pub items: Vec<UserRef>,

    /// Size of the full listing, across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<Page<UserRef>> for UserRefPage {
    fn from(page: Page<UserRef>) -> Self {
        let total_pages = page.total_pages();
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages,
        }
    }
}

impl From<UserRefPage> for Page<UserRef> {
    fn from(page: UserRefPage) -> Self {
        Page {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

/// Unpaged list of users, returned by `GET /v1/users/{id}/mutual`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRefList {
    pub items: Vec<UserRef>,
}

impl UserRefList {
    pub fn empty() -> Self {
        Self { items: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialgraph::PageParams;

    fn user(id: i64) -> UserRef {
        UserRef {
            id: UserId(id),
            display_name: format!("User {id}"),
            handle: format!("user{id}"),
        }
    }

    #[test]
    fn follow_request_parses_numeric_id() {
        let req: FollowRequest = serde_json::from_str(r#"{ "followee_id": 5 }"#).unwrap();
        assert_eq!(req.followee_id, UserId(5));
    }

    #[test]
    fn page_conversion_fills_total_pages() {
        let all: Vec<UserRef> = (1..=11).map(user).collect();
        let page: UserRefPage = PageParams::new(2, 10).slice(&all).into();
        assert_eq!(page.items, vec![user(11)]);
        assert_eq!(page.total, 11);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn empty_mutual_list_serialises_as_empty_array() {
        let json = serde_json::to_value(UserRefList::empty()).unwrap();
        assert_eq!(json["items"].as_array().unwrap().len(), 0);
    }
}
