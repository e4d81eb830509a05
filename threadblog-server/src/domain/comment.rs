use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A single stored comment. `parent_id = None` means top-level; the
/// nested reply tree is never stored, only materialized on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, text: String, parent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            parent_id,
            text,
            created_at: Utc::now(),
        }
    }
}

/// One node of the assembled reply tree, nested to arbitrary depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub children: Vec<CommentNode>,
}

/// Assembles the reply tree from a flat row set ordered by creation
/// time. Single grouping pass by `parent_id`, then depth-first
/// assembly starting from the top-level bucket; sibling order is the
/// input (creation) order.
///
/// Parent pointers are client-supplied at some point in their history,
/// so the assembly defends against corrupt data instead of trusting
/// it: a comment seen twice on a descent terminates that branch, and
/// rows whose parent chain never reaches a top-level comment are
/// dropped. Both cases are logged as data-integrity warnings; the
/// response itself still succeeds.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let total = comments.len();
    let mut groups: HashMap<Option<Uuid>, Vec<Comment>> = HashMap::new();
    for comment in comments {
        groups.entry(comment.parent_id).or_default().push(comment);
    }

    let mut emitted = HashSet::with_capacity(total);
    let roots = assemble(None, &mut groups, &mut emitted);

    if emitted.len() < total {
        warn!(
            dropped = total - emitted.len(),
            "comments unreachable from any top-level comment (missing or cyclic parent)"
        );
    }

    roots
}

fn assemble(
    parent: Option<Uuid>,
    groups: &mut HashMap<Option<Uuid>, Vec<Comment>>,
    emitted: &mut HashSet<Uuid>,
) -> Vec<CommentNode> {
    let Some(group) = groups.remove(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(group.len());
    for comment in group {
        if !emitted.insert(comment.id) {
            warn!(comment_id = %comment.id, "cycle in comment parent chain, truncating branch");
            continue;
        }
        let children = assemble(Some(comment.id), groups, emitted);
        nodes.push(CommentNode {
            id: comment.id,
            text: comment.text,
            created_at: comment.created_at,
            children,
        });
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(post_id: Uuid, text: &str, parent_id: Option<Uuid>) -> Comment {
        Comment::new(post_id, text.to_string(), parent_id)
    }

    #[test]
    fn siblings_keep_creation_order() {
        let post_id = Uuid::new_v4();
        let first = comment(post_id, "first", None);
        let second = comment(post_id, "second", None);
        let reply_b = comment(post_id, "reply b", Some(first.id));
        let reply_a = comment(post_id, "reply a", Some(first.id));

        let tree = build_comment_tree(vec![
            first.clone(),
            second.clone(),
            reply_b.clone(),
            reply_a.clone(),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, first.id);
        assert_eq!(tree[1].id, second.id);
        assert_eq!(tree[1].children, vec![]);

        let replies: Vec<&str> = tree[0].children.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(replies, vec!["reply b", "reply a"]);
    }

    #[test]
    fn chain_reconstructs_as_single_path() {
        let post_id = Uuid::new_v4();
        let mut comments = vec![comment(post_id, "depth 0", None)];
        for depth in 1..10 {
            let parent = comments.last().unwrap().id;
            comments.push(comment(post_id, &format!("depth {depth}"), Some(parent)));
        }

        let tree = build_comment_tree(comments.clone());

        assert_eq!(tree.len(), 1);
        let mut node = &tree[0];
        for expected in &comments[1..] {
            assert_eq!(node.children.len(), 1);
            node = &node.children[0];
            assert_eq!(node.id, expected.id);
        }
        assert!(node.children.is_empty());
    }

    #[test]
    fn self_parent_terminates_instead_of_looping() {
        let post_id = Uuid::new_v4();
        let top = comment(post_id, "ok", None);
        let mut looped = comment(post_id, "I am my own parent", None);
        looped.parent_id = Some(looped.id);

        let tree = build_comment_tree(vec![top.clone(), looped]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, top.id);
    }

    #[test]
    fn mutual_cycle_is_dropped_not_fatal() {
        let post_id = Uuid::new_v4();
        let top = comment(post_id, "ok", None);
        let mut a = comment(post_id, "a", None);
        let mut b = comment(post_id, "b", None);
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);

        let tree = build_comment_tree(vec![top.clone(), a, b]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, top.id);
    }

    #[test]
    fn missing_parent_drops_only_that_branch() {
        let post_id = Uuid::new_v4();
        let top = comment(post_id, "ok", None);
        let orphan = comment(post_id, "orphan", Some(Uuid::new_v4()));

        let tree = build_comment_tree(vec![top.clone(), orphan]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, top.id);
    }

    #[test]
    fn empty_input_builds_empty_tree() {
        assert!(build_comment_tree(Vec::new()).is_empty());
    }
}
