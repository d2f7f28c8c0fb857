//! Human-readable text rendering of graph query results.
//!
//! The output is stable plain text for terminals and logs. Only the JSON
//! wire format is normative.

use crate::types::{Edge, Page, UserRef};

/// Render a list of users, one per line, under a title.
///
/// ```text
/// following (2)
///   #2     @bruno          Bruno Díaz
///   #3     @carla          Carla
/// ```
pub fn render_user_refs(title: &str, users: &[UserRef]) -> String {
    let mut out = format!("{title} ({})\n", users.len());
    if users.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    for u in users {
        out.push_str(&render_line(u));
    }
    out
}

/// Render one page of users with a `page x/y` footer.
pub fn render_page(title: &str, page: &Page<UserRef>) -> String {
    let mut out = format!("{title} ({} total)\n", page.total);
    if page.items.is_empty() {
        out.push_str("  (none)\n");
    }
    for u in &page.items {
        out.push_str(&render_line(u));
    }
    out.push_str(&format!("page {}/{}\n", page.page, page.total_pages().max(1)));
    out
}

/// Render a single edge.
///
/// ```text
/// #1 -> #2  since 2026-03-01T12:00:00+00:00
/// ```
pub fn render_edge(edge: &Edge) -> String {
    format!(
        "#{} -> #{}  since {}\n",
        edge.follower_id,
        edge.followee_id,
        edge.created_at.to_rfc3339()
    )
}

fn render_line(u: &UserRef) -> String {
    let handle = format!("@{}", u.handle);
    format!("  {:<6} {:<15} {}\n", format!("#{}", u.id), handle, u.display_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PageParams, UserId};

    fn user(id: i64, handle: &str) -> UserRef {
        UserRef {
            id: UserId(id),
            display_name: handle.to_uppercase(),
            handle: handle.into(),
        }
    }

    #[test]
    fn renders_each_user_on_its_own_line() {
        let text = render_user_refs("mutual", &[user(2, "bruno"), user(3, "carla")]);
        assert!(text.starts_with("mutual (2)\n"));
        assert!(text.contains("#2"));
        assert!(text.contains("@carla"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn empty_list_is_marked() {
        assert!(render_user_refs("followers", &[]).contains("(none)"));
    }

    #[test]
    fn page_footer() {
        let all = vec![user(1, "ana"), user(2, "bruno"), user(3, "carla")];
        let page = PageParams::new(2, 2).slice(&all);
        let text = render_page("following", &page);
        assert!(text.contains("3 total"));
        assert!(text.contains("@carla"));
        assert!(text.ends_with("page 2/2\n"));
    }
}
