use std::{
    collections::{HashMap, HashSet},
    fmt,
    ops::Deref,
    slice,
};

use crate::api::{Comment, CommentId, Time};

/// A comment with its replies.
///
/// Reply chains can be arbitrarily deep, so nothing here recurses over the
/// tree: cloning, comparing, formatting and dropping all go through `walk`
/// or an explicit stack.
pub struct CommentNode {
    pub comment: Comment,

    /// Direct replies, oldest first
    pub replies: Vec<CommentNode>,
}

impl Deref for CommentNode {
    type Target = Comment;

    fn deref(&self) -> &Comment {
        &self.comment
    }
}

impl CommentNode {
    /// Number of comments below this one, at any depth
    pub fn descendant_count(&self) -> usize {
        count_nodes(&self.replies)
    }

    fn preorder(&self) -> impl Iterator<Item = (usize, &Comment)> {
        walk(slice::from_ref(self)).map(|(depth, n)| (depth, &n.comment))
    }
}

impl Clone for CommentNode {
    fn clone(&self) -> CommentNode {
        let mut res = assemble(self.preorder().map(|(depth, c)| (depth, c.clone())));
        match res.pop() {
            Some(node) => node,
            None => unreachable!("a node always assembles back into one tree"),
        }
    }
}

impl PartialEq for CommentNode {
    fn eq(&self, other: &CommentNode) -> bool {
        self.preorder().eq(other.preorder())
    }
}

impl Eq for CommentNode {}

impl fmt::Debug for CommentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.preorder()).finish()
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut n) = pending.pop() {
            pending.append(&mut n.replies);
        }
    }
}

fn sort_key(c: &Comment) -> (Time, CommentId) {
    (c.created_at, c.id)
}

/// Rebuild the comment forest out of the flat list the server returns.
///
/// Comments whose parent is not part of `comments` end up at the top level. If
/// the same id shows up multiple times, the last occurrence wins. Siblings are
/// sorted by creation date, so the result does not depend on the input order.
pub fn build_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let mut by_id = HashMap::with_capacity(comments.len());
    for c in comments {
        by_id.insert(c.id, c);
    }
    let known = by_id.keys().copied().collect::<HashSet<CommentId>>();

    let mut roots = Vec::new();
    let mut children = HashMap::<CommentId, Vec<Comment>>::new();
    for (id, c) in by_id {
        match c.parent_id.filter(|p| *p != id && known.contains(p)) {
            Some(parent) => children.entry(parent).or_default().push(c),
            None => {
                if let Some(parent) = c.parent_id.filter(|p| *p != id) {
                    tracing::debug!(comment=?id, ?parent, "parent not found, showing comment at top level");
                }
                roots.push(c)
            }
        }
    }
    roots.sort_by_key(sort_key);
    for siblings in children.values_mut() {
        siblings.sort_by_key(sort_key);
    }

    let mut preorder = Vec::with_capacity(known.len());
    push_subtrees(roots, &mut children, &mut preorder);

    // Anything left can only be reached through a parent cycle
    while let Some(c) = take_earliest(&mut children) {
        tracing::warn!(comment=?c.id, parent=?c.parent_id, "comment is part of a parent cycle, showing it at top level");
        push_subtrees(vec![c], &mut children, &mut preorder);
    }

    let mut forest = assemble(preorder);
    // only the comments promoted out of a cycle can be out of place
    forest.sort_by_key(|n| sort_key(&n.comment));
    forest
}

/// Append `tops` and everything reachable from them to `preorder`, depth first
fn push_subtrees(
    tops: Vec<Comment>,
    children: &mut HashMap<CommentId, Vec<Comment>>,
    preorder: &mut Vec<(usize, Comment)>,
) {
    let mut stack = tops.into_iter().rev().map(|c| (0, c)).collect::<Vec<_>>();
    while let Some((depth, c)) = stack.pop() {
        if let Some(replies) = children.remove(&c.id) {
            stack.extend(replies.into_iter().rev().map(|r| (depth + 1, r)));
        }
        preorder.push((depth, c));
    }
}

/// Turn a depth-first, pre-order listing back into a forest.
///
/// The nodes currently being filled are kept on `open`, the node at index `i`
/// having depth `i`.
fn assemble(preorder: impl IntoIterator<Item = (usize, Comment)>) -> Vec<CommentNode> {
    fn close(open: &mut Vec<CommentNode>, forest: &mut Vec<CommentNode>) {
        if let Some(node) = open.pop() {
            match open.last_mut() {
                Some(parent) => parent.replies.push(node),
                None => forest.push(node),
            }
        }
    }

    let mut forest = Vec::new();
    let mut open = Vec::new();
    for (depth, comment) in preorder {
        while open.len() > depth {
            close(&mut open, &mut forest);
        }
        open.push(CommentNode {
            comment,
            replies: Vec::new(),
        });
    }
    while !open.is_empty() {
        close(&mut open, &mut forest);
    }
    forest
}

fn take_earliest(children: &mut HashMap<CommentId, Vec<Comment>>) -> Option<Comment> {
    let (parent, idx) = children
        .iter()
        .flat_map(|(p, cs)| cs.iter().enumerate().map(move |(i, c)| (*p, i, c)))
        .min_by_key(|(_, _, c)| sort_key(c))
        .map(|(p, i, _)| (p, i))?;
    let siblings = children.get_mut(&parent)?;
    let res = siblings.remove(idx);
    if siblings.is_empty() {
        children.remove(&parent);
    }
    Some(res)
}

/// Depth-first, pre-order iteration over a forest, along with each node's depth
pub fn walk<'a>(forest: &'a [CommentNode]) -> impl Iterator<Item = (usize, &'a CommentNode)> {
    let mut stack = forest.iter().rev().map(|n| (0, n)).collect::<Vec<_>>();
    std::iter::from_fn(move || {
        let (depth, node) = stack.pop()?;
        stack.extend(node.replies.iter().rev().map(|n| (depth + 1, n)));
        Some((depth, node))
    })
}

pub fn count_nodes(forest: &[CommentNode]) -> usize {
    walk(forest).count()
}

pub fn find_node<'a>(forest: &'a [CommentNode], id: &CommentId) -> Option<&'a CommentNode> {
    walk(forest).map(|(_, n)| n).find(|n| n.id == *id)
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::api::{AuthorRef, PostId, UserId, Uuid};

    pub fn id(n: u128) -> CommentId {
        CommentId(Uuid::from_u128(n))
    }

    pub fn at(minutes: i64) -> Time {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    pub fn comment(n: u128, parent: Option<u128>, minutes: i64) -> Comment {
        Comment {
            id: id(n),
            parent_id: parent.map(id),
            post_id: PostId::stub(),
            author_ref: AuthorRef {
                id: UserId::stub(),
                name: String::from("someone"),
                avatar_url: None,
            },
            body: format!("comment {n}"),
            created_at: at(minutes),
        }
    }

    fn ids(forest: &[CommentNode]) -> Vec<CommentId> {
        forest.iter().map(|n| n.id).collect()
    }

    fn assert_sorted(forest: &[CommentNode]) {
        for w in forest.windows(2) {
            assert!(
                w[0].created_at <= w[1].created_at,
                "{:?} listed before {:?}",
                w[0].id,
                w[1].id
            );
        }
        for n in forest {
            assert_sorted(&n.replies);
        }
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        assert_eq!(build_tree(Vec::new()), Vec::new());
    }

    #[test]
    fn replies_sorted_by_date_not_input_order() {
        let forest = build_tree(vec![
            comment(1, None, 1),
            comment(2, Some(1), 2),
            comment(3, Some(1), 0),
        ]);
        assert_eq!(ids(&forest), vec![id(1)]);
        assert_eq!(ids(&forest[0].replies), vec![id(3), id(2)]);
        assert_eq!(forest[0].descendant_count(), 2);
    }

    #[test]
    fn orphaned_reply_becomes_root() {
        let mut orphan = comment(5, None, 1);
        orphan.parent_id = Some(CommentId(Uuid::new_v4()));
        let forest = build_tree(vec![orphan.clone()]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].comment, orphan);
        assert!(forest[0].replies.is_empty());
    }

    #[test]
    fn nested_replies() {
        let forest = build_tree(vec![
            comment(4, Some(2), 4),
            comment(2, Some(1), 2),
            comment(1, None, 1),
            comment(3, Some(2), 3),
            comment(6, None, 0),
        ]);
        assert_eq!(ids(&forest), vec![id(6), id(1)]);
        let one = &forest[1];
        assert_eq!(ids(&one.replies), vec![id(2)]);
        assert_eq!(ids(&one.replies[0].replies), vec![id(3), id(4)]);
        assert_eq!(
            walk(&forest).map(|(d, n)| (d, n.id)).collect::<Vec<_>>(),
            vec![(0, id(6)), (0, id(1)), (1, id(2)), (2, id(3)), (2, id(4))]
        );
        assert_eq!(find_node(&forest, &id(3)).map(|n| n.id), Some(id(3)));
        assert!(find_node(&forest, &id(42)).is_none());
    }

    #[test]
    fn duplicated_id_keeps_last_occurrence() {
        let mut second = comment(3, Some(2), 5);
        second.body = String::from("second version");
        let forest = build_tree(vec![
            comment(1, None, 0),
            comment(2, None, 1),
            comment(3, Some(1), 2),
            second,
        ]);
        assert_eq!(count_nodes(&forest), 3);
        assert!(forest[0].replies.is_empty());
        assert_eq!(forest[1].replies[0].body, "second version");
    }

    #[test]
    fn self_parent_and_cycles_still_show_every_comment() {
        let forest = build_tree(vec![
            comment(1, Some(1), 0),
            comment(2, Some(3), 5),
            comment(3, Some(2), 3),
            comment(4, Some(2), 4),
        ]);
        assert_eq!(count_nodes(&forest), 4);
        assert_eq!(ids(&forest), vec![id(1), id(3)]);
        assert_eq!(ids(&forest[1].replies), vec![id(2)]);
        assert_eq!(ids(&forest[1].replies[0].replies), vec![id(4)]);
    }

    #[test]
    fn very_deep_reply_chain() {
        const DEPTH: u128 = 100_000;
        let mut comments = (1..DEPTH)
            .map(|i| comment(i, Some(i - 1), i as i64))
            .collect::<Vec<_>>();
        comments.push(comment(0, None, 0));
        comments.reverse();

        let forest = build_tree(comments);
        assert_eq!(ids(&forest), vec![id(0)]);
        assert_eq!(forest[0].descendant_count(), DEPTH as usize - 1);
        let (depth, deepest) = walk(&forest).last().expect("forest is not empty");
        assert_eq!((depth, deepest.id), (DEPTH as usize - 1, id(DEPTH - 1)));

        let copy = forest.clone();
        assert_eq!(copy, forest);
        drop(copy);
        drop(forest);
    }

    /// Fuzz input: (id, parent id, creation minute)
    type FlatSpec = Vec<(u8, Option<u8>, u16)>;

    fn from_spec(spec: &FlatSpec) -> Vec<Comment> {
        spec.iter()
            .map(|&(i, p, m)| comment(i as u128, p.map(|p| p as u128), m as i64))
            .collect()
    }

    #[test]
    fn fuzz_node_count_and_ordering() {
        bolero::check!().with_type::<FlatSpec>().for_each(|spec| {
            let comments = from_spec(spec);
            let distinct = comments.iter().map(|c| c.id).collect::<HashSet<_>>();
            let forest = build_tree(comments.clone());

            assert_eq!(count_nodes(&forest), distinct.len());
            let seen = walk(&forest).map(|(_, n)| n.id).collect::<HashSet<_>>();
            assert_eq!(seen, distinct);
            assert_sorted(&forest);
            assert_eq!(build_tree(comments), forest);
        })
    }

    #[test]
    fn fuzz_input_order_does_not_matter() {
        bolero::check!().with_type::<FlatSpec>().for_each(|spec| {
            let mut seen = HashSet::new();
            let mut comments = from_spec(spec);
            comments.retain(|c| seen.insert(c.id));
            let forest = build_tree(comments.clone());
            comments.reverse();
            assert_eq!(build_tree(comments), forest);
        })
    }
}
