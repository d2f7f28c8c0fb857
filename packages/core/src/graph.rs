use std::collections::HashSet;

use thiserror::Error;

use crate::types::{Edge, UserId};

/// Reasons a follow can be refused before anything is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FollowError {
    #[error("user {0} cannot follow themselves")]
    SelfFollow(UserId),

    #[error("user {follower} already follows user {followee}")]
    DuplicateEdge { follower: UserId, followee: UserId },
}

/// Reject an edge whose endpoints are equal.
///
/// Every store calls this before touching persistent state.
pub fn check_not_self(follower: UserId, followee: UserId) -> Result<(), FollowError> {
    if follower == followee {
        return Err(FollowError::SelfFollow(follower));
    }
    Ok(())
}

/// An in-memory set of directed follow edges.
///
/// The graph is not a storage engine; it holds edges in creation order and
/// answers neighbor and mutual-follow queries over them. The in-memory store
/// wraps one behind a lock, and tests use it directly.
///
/// At most one edge exists per ordered `(follower, followee)` pair.
#[derive(Debug, Default, Clone)]
pub struct FollowGraph {
    edges: Vec<Edge>,
    index: HashSet<(UserId, UserId)>,
}

impl FollowGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(follower, followee)` pairs, skipping invalid ones.
    pub fn from_pairs(iter: impl IntoIterator<Item = (UserId, UserId)>) -> Self {
        let mut g = Self::new();
        for (follower, followee) in iter {
            let _ = g.follow(follower, followee);
        }
        g
    }

    /// Record that `follower` follows `followee`.
    ///
    /// Fails with [`FollowError::SelfFollow`] or [`FollowError::DuplicateEdge`]
    /// and leaves the graph untouched in either case.
    pub fn follow(&mut self, follower: UserId, followee: UserId) -> Result<Edge, FollowError> {
        let edge = Edge::new(follower, followee);
        self.insert(edge.clone())?;
        Ok(edge)
    }

    /// Insert a pre-built edge, enforcing the same invariants as [`follow`].
    ///
    /// [`follow`]: FollowGraph::follow
    pub fn insert(&mut self, edge: Edge) -> Result<(), FollowError> {
        check_not_self(edge.follower_id, edge.followee_id)?;
        if !self.index.insert(edge.key()) {
            return Err(FollowError::DuplicateEdge {
                follower: edge.follower_id,
                followee: edge.followee_id,
            });
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Remove the edge matching the ordered pair exactly.
    ///
    /// Returns `false` when no such edge exists.
    pub fn unfollow(&mut self, follower: UserId, followee: UserId) -> bool {
        if !self.index.remove(&(follower, followee)) {
            return false;
        }
        self.edges
            .retain(|e| !(e.follower_id == follower && e.followee_id == followee));
        true
    }

    /// Whether `follower` follows `followee`. Direction matters.
    ///
    /// ```
    /// use socialgraph::{FollowGraph, UserId};
    ///
    /// let mut g = FollowGraph::new();
    /// g.follow(UserId(1), UserId(2)).unwrap();
    /// assert!(g.contains(UserId(1), UserId(2)));
    /// assert!(!g.contains(UserId(2), UserId(1)));
    /// ```
    pub fn contains(&self, follower: UserId, followee: UserId) -> bool {
        self.index.contains(&(follower, followee))
    }

    /// Users that `user` follows, in edge creation order.
    pub fn following(&self, user: UserId) -> Vec<UserId> {
        self.edges
            .iter()
            .filter(|e| e.follower_id == user)
            .map(|e| e.followee_id)
            .collect()
    }

    /// Users that follow `user`, in edge creation order.
    pub fn followers(&self, user: UserId) -> Vec<UserId> {
        self.edges
            .iter()
            .filter(|e| e.followee_id == user)
            .map(|e| e.follower_id)
            .collect()
    }

    /// Users `x` such that both `(user, x)` and `(x, user)` exist.
    ///
    /// Intersects the following list with the follower set; the result keeps
    /// the order of `user`'s outgoing edges.
    pub fn mutual(&self, user: UserId) -> Vec<UserId> {
        let followers: HashSet<UserId> = self.followers(user).into_iter().collect();
        self.following(user)
            .into_iter()
            .filter(|x| followers.contains(x))
            .collect()
    }

    /// All edges in creation order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of edges in the graph.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True when no edges have been recorded.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(id: i64) -> UserId {
        UserId(id)
    }

    fn sorted(mut v: Vec<UserId>) -> Vec<UserId> {
        v.sort();
        v
    }

    #[test]
    fn self_follow_is_rejected_and_writes_nothing() {
        let mut g = FollowGraph::new();
        assert_eq!(g.follow(u(1), u(1)), Err(FollowError::SelfFollow(u(1))));
        assert!(g.is_empty());
    }

    #[test]
    fn duplicate_follow_is_rejected_and_keeps_one_edge() {
        let mut g = FollowGraph::new();
        g.follow(u(1), u(2)).unwrap();
        let err = g.follow(u(1), u(2)).unwrap_err();
        assert_eq!(
            err,
            FollowError::DuplicateEdge {
                follower: u(1),
                followee: u(2)
            }
        );
        assert_eq!(g.len(), 1);
        // The reverse direction is a different edge.
        assert!(g.follow(u(2), u(1)).is_ok());
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn unfollow_removes_exactly_once() {
        let mut g = FollowGraph::new();
        g.follow(u(1), u(2)).unwrap();
        assert!(g.unfollow(u(1), u(2)));
        assert!(!g.contains(u(1), u(2)));
        assert!(!g.unfollow(u(1), u(2)));
    }

    #[test]
    fn unfollow_only_matches_the_ordered_pair() {
        let mut g = FollowGraph::new();
        g.follow(u(1), u(2)).unwrap();
        assert!(!g.unfollow(u(2), u(1)));
        assert!(g.contains(u(1), u(2)));
    }

    #[test]
    fn following_is_order_independent_as_a_set() {
        let mut a = FollowGraph::new();
        a.follow(u(1), u(2)).unwrap();
        a.follow(u(1), u(3)).unwrap();

        let mut b = FollowGraph::new();
        b.follow(u(1), u(3)).unwrap();
        b.follow(u(1), u(2)).unwrap();

        assert_eq!(sorted(a.following(u(1))), vec![u(2), u(3)]);
        assert_eq!(sorted(b.following(u(1))), vec![u(2), u(3)]);
    }

    #[test]
    fn following_preserves_creation_order() {
        let mut g = FollowGraph::new();
        g.follow(u(1), u(9)).unwrap();
        g.follow(u(1), u(4)).unwrap();
        g.follow(u(1), u(6)).unwrap();
        assert_eq!(g.following(u(1)), vec![u(9), u(4), u(6)]);
    }

    #[test]
    fn mutual_requires_both_directions() {
        let mut g = FollowGraph::new();
        g.follow(u(1), u(2)).unwrap();
        assert!(g.mutual(u(1)).is_empty());
        g.follow(u(2), u(1)).unwrap();
        assert_eq!(g.mutual(u(1)), vec![u(2)]);
        assert_eq!(g.mutual(u(2)), vec![u(1)]);
    }

    #[test]
    fn scenario_one_two_three() {
        let g = FollowGraph::from_pairs([(u(1), u(2)), (u(2), u(1)), (u(1), u(3))]);
        assert_eq!(g.mutual(u(1)), vec![u(2)]);
        assert_eq!(sorted(g.following(u(1))), vec![u(2), u(3)]);
        assert_eq!(g.followers(u(1)), vec![u(2)]);
        assert!(g.mutual(u(3)).is_empty());
        assert_eq!(g.followers(u(3)), vec![u(1)]);
    }

    #[test]
    fn from_pairs_skips_invalid_edges() {
        let g = FollowGraph::from_pairs([(u(1), u(1)), (u(1), u(2)), (u(1), u(2))]);
        assert_eq!(g.len(), 1);
    }
}
