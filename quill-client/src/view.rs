use std::{collections::HashMap, fmt};

use crate::{
    api::{Actor, CommentId, Time},
    walk, CommentNode,
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Expansion {
    #[default]
    Collapsed,
    Expanded,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Viewing,
    Editing {
        draft: String,
    },
    /// Waiting for the user to confirm the deletion of the comment and its replies
    ConfirmingDelete,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ReplyBox {
    #[default]
    Closed,
    Open {
        draft: String,
    },
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NodeState {
    pub expansion: Expansion,
    pub mode: Mode,
    pub reply: ReplyBox,
}

static DEFAULT_STATE: NodeState = NodeState {
    expansion: Expansion::Collapsed,
    mode: Mode::Viewing,
    reply: ReplyBox::Closed,
};

/// UI state of every comment of a thread, keyed by comment id.
///
/// Nothing here is persisted or sent to the server. Comments without an entry
/// are in the default state: collapsed, not being edited, no reply box.
#[derive(Clone, Debug, Default)]
pub struct ThreadView {
    states: HashMap<CommentId, NodeState>,
}

impl ThreadView {
    pub fn new() -> ThreadView {
        ThreadView::default()
    }

    pub fn state(&self, id: &CommentId) -> &NodeState {
        self.states.get(id).unwrap_or(&DEFAULT_STATE)
    }

    fn state_mut(&mut self, id: CommentId) -> &mut NodeState {
        self.states.entry(id).or_default()
    }

    pub fn is_expanded(&self, id: &CommentId) -> bool {
        self.state(id).expansion == Expansion::Expanded
    }

    pub fn toggle(&mut self, id: CommentId) {
        let s = self.state_mut(id);
        s.expansion = match s.expansion {
            Expansion::Collapsed => Expansion::Expanded,
            Expansion::Expanded => Expansion::Collapsed,
        };
    }

    pub fn expand(&mut self, id: CommentId) {
        self.state_mut(id).expansion = Expansion::Expanded;
    }

    pub fn collapse(&mut self, id: CommentId) {
        self.state_mut(id).expansion = Expansion::Collapsed;
    }

    pub fn expand_all(&mut self, forest: &[CommentNode]) {
        for (_, n) in walk(forest) {
            self.expand(n.id);
        }
    }

    pub fn collapse_all(&mut self) {
        for s in self.states.values_mut() {
            s.expansion = Expansion::Collapsed;
        }
    }

    pub fn start_edit(&mut self, id: CommentId, current_body: &str) {
        self.state_mut(id).mode = Mode::Editing {
            draft: String::from(current_body),
        };
    }

    /// Returns false if the comment is not being edited
    pub fn set_edit_draft(&mut self, id: CommentId, text: &str) -> bool {
        match &mut self.state_mut(id).mode {
            Mode::Editing { draft } => {
                *draft = String::from(text);
                true
            }
            _ => false,
        }
    }

    pub fn edit_draft(&self, id: &CommentId) -> Option<&str> {
        match &self.state(id).mode {
            Mode::Editing { draft } => Some(draft),
            _ => None,
        }
    }

    pub fn cancel_edit(&mut self, id: CommentId) {
        let s = self.state_mut(id);
        if matches!(s.mode, Mode::Editing { .. }) {
            s.mode = Mode::Viewing;
        }
    }

    pub fn open_reply(&mut self, id: CommentId) {
        let s = self.state_mut(id);
        if s.reply == ReplyBox::Closed {
            s.reply = ReplyBox::Open {
                draft: String::new(),
            };
        }
    }

    /// Returns false if the reply box is not open
    pub fn set_reply_draft(&mut self, id: CommentId, text: &str) -> bool {
        match &mut self.state_mut(id).reply {
            ReplyBox::Open { draft } => {
                *draft = String::from(text);
                true
            }
            ReplyBox::Closed => false,
        }
    }

    pub fn reply_draft(&self, id: &CommentId) -> Option<&str> {
        match &self.state(id).reply {
            ReplyBox::Open { draft } => Some(draft),
            ReplyBox::Closed => None,
        }
    }

    pub fn close_reply(&mut self, id: CommentId) {
        self.state_mut(id).reply = ReplyBox::Closed;
    }

    pub fn request_delete(&mut self, id: CommentId) {
        self.state_mut(id).mode = Mode::ConfirmingDelete;
    }

    pub fn is_confirming_delete(&self, id: &CommentId) -> bool {
        self.state(id).mode == Mode::ConfirmingDelete
    }

    pub fn cancel_delete(&mut self, id: CommentId) {
        let s = self.state_mut(id);
        if s.mode == Mode::ConfirmingDelete {
            s.mode = Mode::Viewing;
        }
    }

    /// Forget the state of comments that are no longer part of `forest`
    pub fn retain(&mut self, forest: &[CommentNode]) {
        let present = walk(forest)
            .map(|(_, n)| n.id)
            .collect::<std::collections::HashSet<_>>();
        self.states.retain(|id, _| present.contains(id));
    }

    /// Lay out the visible part of `forest`, in display order.
    ///
    /// Replies of a collapsed comment are hidden. Available actions are computed
    /// for `actor`, with `None` meaning nobody is logged in.
    pub fn render(&self, forest: &[CommentNode], actor: Option<&Actor>) -> Vec<RenderedLine> {
        let mut res = Vec::new();
        let mut stack = forest.iter().rev().map(|n| (0, n)).collect::<Vec<_>>();
        while let Some((depth, n)) = stack.pop() {
            let state = self.state(&n.id);
            let can_modify = actor.map(|a| a.can_modify(n)).unwrap_or(false);
            res.push(RenderedLine {
                depth,
                id: n.id,
                author: n.author_ref.name.clone(),
                body: n.body.clone(),
                created_at: n.created_at,
                replies: n.replies.len(),
                expansion: state.expansion,
                mode: state.mode.clone(),
                reply: state.reply.clone(),
                actions: Actions {
                    reply: actor.is_some(),
                    edit: can_modify,
                    delete: can_modify,
                },
            });
            if state.expansion == Expansion::Expanded {
                stack.extend(n.replies.iter().rev().map(|r| (depth + 1, r)));
            }
        }
        res
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Actions {
    pub reply: bool,
    pub edit: bool,
    pub delete: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderedLine {
    pub depth: usize,
    pub id: CommentId,
    pub author: String,
    pub body: String,
    pub created_at: Time,

    /// Number of direct replies, whether they are shown or not
    pub replies: usize,

    pub expansion: Expansion,
    pub mode: Mode,
    pub reply: ReplyBox,
    pub actions: Actions,
}

const INDENT: &str = "    ";

impl fmt::Display for RenderedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = INDENT.repeat(self.depth);
        let marker = match (self.replies, self.expansion) {
            (0, _) => "*",
            (_, Expansion::Collapsed) => "+",
            (_, Expansion::Expanded) => "-",
        };
        write!(
            f,
            "{indent}{marker} {} on {} [{}]",
            self.author,
            self.created_at.format("%Y-%m-%d %H:%M"),
            self.id.0
        )?;
        if self.replies > 0 && self.expansion == Expansion::Collapsed {
            let plural = if self.replies == 1 { "reply" } else { "replies" };
            write!(f, " ({} {plural} hidden)", self.replies)?;
        }
        let body = match &self.mode {
            Mode::Editing { draft } => draft,
            _ => &self.body,
        };
        for line in body.lines() {
            write!(f, "\n{indent}  {line}")?;
        }
        match &self.mode {
            Mode::Viewing => (),
            Mode::Editing { .. } => write!(f, "\n{indent}  (editing)")?,
            Mode::ConfirmingDelete => write!(
                f,
                "\n{indent}  (delete this comment and all its replies?)"
            )?,
        }
        if let ReplyBox::Open { draft } = &self.reply {
            write!(f, "\n{indent}{INDENT}> {draft}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{Role, UserId},
        build_tree,
        thread::tests::{comment, id},
    };

    fn forest() -> Vec<CommentNode> {
        build_tree(vec![
            comment(1, None, 0),
            comment(2, Some(1), 1),
            comment(3, Some(2), 2),
            comment(4, None, 3),
        ])
    }

    fn ids(lines: &[RenderedLine]) -> Vec<(usize, CommentId)> {
        lines.iter().map(|l| (l.depth, l.id)).collect()
    }

    #[test]
    fn collapsed_by_default() {
        let view = ThreadView::new();
        let f = forest();
        assert_eq!(ids(&view.render(&f, None)), vec![(0, id(1)), (0, id(4))]);
        assert!(!view.is_expanded(&id(1)));
    }

    #[test]
    fn toggles_are_independent_per_comment() {
        let mut view = ThreadView::new();
        let f = forest();

        view.toggle(id(1));
        assert_eq!(
            ids(&view.render(&f, None)),
            vec![(0, id(1)), (1, id(2)), (0, id(4))]
        );

        view.toggle(id(2));
        assert_eq!(
            ids(&view.render(&f, None)),
            vec![(0, id(1)), (1, id(2)), (2, id(3)), (0, id(4))]
        );

        // collapsing the parent hides the whole subtree, but remembers the child's state
        view.toggle(id(1));
        assert_eq!(ids(&view.render(&f, None)), vec![(0, id(1)), (0, id(4))]);
        view.toggle(id(1));
        assert_eq!(view.render(&f, None).len(), 4);

        view.collapse_all();
        assert_eq!(view.render(&f, None).len(), 2);
        view.expand_all(&f);
        assert_eq!(view.render(&f, None).len(), 4);
    }

    #[test]
    fn actions_depend_on_the_actor() {
        let mut view = ThreadView::new();
        view.expand_all(&forest());
        let f = forest();

        let anonymous = view.render(&f, None);
        assert!(anonymous.iter().all(|l| l.actions == Actions::default()));

        let author = Actor {
            id: UserId::stub(),
            role: Role::Member,
        };
        assert!(view.render(&f, Some(&author)).iter().all(|l| l.actions
            == Actions {
                reply: true,
                edit: true,
                delete: true,
            }));

        let stranger = Actor {
            id: UserId(crate::api::Uuid::new_v4()),
            role: Role::Member,
        };
        assert!(view.render(&f, Some(&stranger)).iter().all(|l| l.actions
            == Actions {
                reply: true,
                edit: false,
                delete: false,
            }));

        let moderator = Actor {
            role: Role::Moderator,
            ..stranger
        };
        assert!(view
            .render(&f, Some(&moderator))
            .iter()
            .all(|l| l.actions.edit && l.actions.delete));
    }

    #[test]
    fn edit_and_reply_drafts() {
        let mut view = ThreadView::new();
        assert!(!view.set_edit_draft(id(1), "nope"));
        view.start_edit(id(1), "comment 1");
        assert_eq!(view.edit_draft(&id(1)), Some("comment 1"));
        assert!(view.set_edit_draft(id(1), "changed"));
        assert_eq!(view.edit_draft(&id(1)), Some("changed"));
        view.cancel_edit(id(1));
        assert_eq!(view.state(&id(1)).mode, Mode::Viewing);

        assert!(!view.set_reply_draft(id(2), "nope"));
        view.open_reply(id(2));
        assert!(view.set_reply_draft(id(2), "hello"));
        view.open_reply(id(2));
        assert_eq!(view.reply_draft(&id(2)), Some("hello"));
        view.close_reply(id(2));
        assert_eq!(view.reply_draft(&id(2)), None);

        view.request_delete(id(3));
        assert!(view.is_confirming_delete(&id(3)));
        view.cancel_edit(id(3));
        assert!(view.is_confirming_delete(&id(3)));
        view.cancel_delete(id(3));
        assert_eq!(view.state(&id(3)), &NodeState::default());
    }

    #[test]
    fn retain_drops_vanished_comments() {
        let mut view = ThreadView::new();
        view.expand(id(1));
        view.expand(id(42));
        view.retain(&forest());
        assert!(view.is_expanded(&id(1)));
        assert_eq!(view.state(&id(42)), &NodeState::default());
        assert_eq!(view.states.len(), 1);
    }

    #[test]
    fn very_deep_chain_renders_fully_once_expanded() {
        let mut comments = (1..100_000u128)
            .map(|i| comment(i, Some(i - 1), i as i64))
            .collect::<Vec<_>>();
        comments.push(comment(0, None, 0));
        let f = build_tree(comments);

        let mut view = ThreadView::new();
        assert_eq!(view.render(&f, None).len(), 1);
        view.expand_all(&f);
        let lines = view.render(&f, None);
        assert_eq!(lines.len(), 100_000);
        assert_eq!(lines.last().map(|l| (l.depth, l.id)), Some((99_999, id(99_999))));
    }

    #[test]
    fn text_rendering_indents_by_depth() {
        let mut view = ThreadView::new();
        let f = forest();
        let collapsed = view.render(&f, None)[0].to_string();
        assert!(collapsed.starts_with("+ someone on 2023-01-01 00:00"));
        assert!(collapsed.ends_with("(1 reply hidden)\n  comment 1"));

        view.expand_all(&f);
        view.open_reply(id(3));
        let lines = view.render(&f, None);
        assert_eq!(
            lines[2].to_string(),
            format!(
                "        * someone on 2023-01-01 00:02 [{}]\n          comment 3\n            > ",
                id(3).0
            )
        );
    }
}
