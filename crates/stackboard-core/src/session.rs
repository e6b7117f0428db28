//! Client-side reconciliation for an optimistic board.
//!
//! A [`BoardSession`] keeps the last tree the server confirmed and, once the
//! user starts dragging, a speculative working copy. Moves edit only the
//! working copy and yield the [`ReorderRequest`] to send. If the request
//! fails, [`BoardSession::rollback`] restores the whole snapshot, since a
//! reparent touches two sibling lists at once. If it succeeds,
//! [`BoardSession::commit`] adopts a freshly fetched tree: the server's rank
//! is authoritative and the local guess is display-only.
//!
//! Lookups go through a [`TreeIndex`] built once per tree rather than a
//! recursive search per drag event.

use crate::hierarchy::TreeNode;
use crate::model::{Patch, State};
use crate::rank::Rank;
use crate::reorder::{ReorderRequest, resolve_rank};
use std::collections::HashMap;

/// Errors from applying a move to the local tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("item '{0}' is not in the current tree")]
    UnknownItem(String),
    #[error("parent '{0}' is not in the current tree")]
    UnknownParent(String),
    #[error("cannot move '{item}' under its own subtree ('{parent}')")]
    Cycle { item: String, parent: String },
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Where a node sits in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Child indices from the root list down to the node itself.
    pub path: Vec<usize>,
    /// `None` for nodes in the root list.
    pub parent_id: Option<String>,
    /// Position within the sibling list.
    pub index: usize,
    /// 0 for roots.
    pub depth: usize,
}

/// `id → Location` for every node of one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeIndex {
    locations: HashMap<String, Location>,
}

impl TreeIndex {
    /// Index every node of `roots` in one pass.
    #[must_use]
    pub fn build(roots: &[TreeNode]) -> Self {
        let mut locations = HashMap::new();
        let mut stack: Vec<(&TreeNode, Vec<usize>, Option<&str>)> = roots
            .iter()
            .enumerate()
            .rev()
            .map(|(i, node)| (node, vec![i], None))
            .collect();

        while let Some((node, path, parent_id)) = stack.pop() {
            for (i, child) in node.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(i);
                stack.push((child, child_path, Some(node.id.as_str())));
            }
            let index = path.last().copied().unwrap_or_default();
            let depth = path.len() - 1;
            locations.insert(
                node.id.clone(),
                Location {
                    path,
                    parent_id: parent_id.map(str::to_string),
                    index,
                    depth,
                },
            );
        }

        Self { locations }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.locations.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Borrow the node at `id` from the tree this index was built for.
    #[must_use]
    pub fn node<'t>(&self, roots: &'t [TreeNode], id: &str) -> Option<&'t TreeNode> {
        let (first, rest) = self.get(id)?.path.split_first()?;
        let mut node = roots.get(*first)?;
        for i in rest {
            node = node.children.get(*i)?;
        }
        Some(node)
    }

    /// Whether `id` is `ancestor` or lies beneath it.
    #[must_use]
    pub fn is_within(&self, ancestor: &str, id: &str) -> bool {
        let mut current = Some(id);
        while let Some(at) = current {
            if at == ancestor {
                return true;
            }
            current = self.get(at).and_then(|loc| loc.parent_id.as_deref());
        }
        false
    }
}

fn siblings_mut<'t>(roots: &'t mut Vec<TreeNode>, parent_path: &[usize]) -> Option<&'t mut Vec<TreeNode>> {
    let mut list = roots;
    for i in parent_path {
        list = &mut list.get_mut(*i)?.children;
    }
    Some(list)
}

fn node_mut<'t>(roots: &'t mut [TreeNode], path: &[usize]) -> Option<&'t mut TreeNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get_mut(*first)?;
    for i in rest {
        node = node.children.get_mut(*i)?;
    }
    Some(node)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A drag-and-drop gesture expressed against the displayed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveIntent {
    pub item_id: String,
    /// Destination parent; `None` is the root list.
    pub new_parent: Option<String>,
    /// Destination position, clamped to the destination list length.
    pub index: usize,
    /// New column, when the gesture crossed one.
    pub state: Option<State>,
}

/// Confirmed snapshot plus speculative working copy.
#[derive(Debug, Clone)]
pub struct BoardSession {
    project: String,
    repo: String,
    snapshot: Vec<TreeNode>,
    working: Option<Vec<TreeNode>>,
    index: TreeIndex,
}

impl BoardSession {
    #[must_use]
    pub fn new(project: impl Into<String>, repo: impl Into<String>, tree: Vec<TreeNode>) -> Self {
        let index = TreeIndex::build(&tree);
        Self {
            project: project.into(),
            repo: repo.into(),
            snapshot: tree,
            working: None,
            index,
        }
    }

    /// The tree to display: the working copy when one exists.
    #[must_use]
    pub fn view(&self) -> &[TreeNode] {
        self.working.as_deref().unwrap_or(&self.snapshot)
    }

    /// The last server-confirmed tree.
    #[must_use]
    pub fn snapshot(&self) -> &[TreeNode] {
        &self.snapshot
    }

    /// Whether speculative edits are pending.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.working.is_some()
    }

    /// Index over [`BoardSession::view`].
    #[must_use]
    pub const fn index(&self) -> &TreeIndex {
        &self.index
    }

    /// Apply `intent` to the working copy and return the request to send.
    ///
    /// Neighbour ranks come from the destination list after the move. On
    /// error the working copy is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the item or parent is unknown, or the
    /// parent lies within the moved item's subtree.
    pub fn apply_move(&mut self, intent: &MoveIntent) -> Result<ReorderRequest, SessionError> {
        let origin = self
            .index
            .get(&intent.item_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownItem(intent.item_id.clone()))?;

        if let Some(parent) = intent.new_parent.as_deref() {
            if !self.index.contains(parent) {
                return Err(SessionError::UnknownParent(parent.to_string()));
            }
            if self.index.is_within(&intent.item_id, parent) {
                return Err(SessionError::Cycle {
                    item: intent.item_id.clone(),
                    parent: parent.to_string(),
                });
            }
        }

        let mut tree = self.view().to_vec();
        let (parent_path, _) = origin.path.split_at(origin.path.len() - 1);
        let mut node = siblings_mut(&mut tree, parent_path)
            .filter(|list| origin.index < list.len())
            .map(|list| list.remove(origin.index))
            .ok_or_else(|| SessionError::UnknownItem(intent.item_id.clone()))?;
        if let Some(old_parent) = node_mut(&mut tree, parent_path) {
            old_parent.children_count = old_parent.children_count.saturating_sub(1);
        }

        // The removal may shift the destination's path, so re-index.
        let interim = TreeIndex::build(&tree);
        let dest_path: Vec<usize> = match intent.new_parent.as_deref() {
            Some(parent) => interim
                .get(parent)
                .map(|loc| loc.path.clone())
                .ok_or_else(|| SessionError::UnknownParent(parent.to_string()))?,
            None => Vec::new(),
        };

        if let Some(state) = intent.state {
            node.state = state;
        }

        let dest = siblings_mut(&mut tree, &dest_path)
            .ok_or_else(|| SessionError::UnknownParent(intent.new_parent.clone().unwrap_or_default()))?;
        let at = intent.index.min(dest.len());
        let prev_rank = at.checked_sub(1).map(|i| dest[i].stack_rank.clone());
        let next_rank = dest.get(at).map(|n| n.stack_rank.clone());

        let guess = (
            prev_rank.as_deref().map(Rank::parse).transpose(),
            next_rank.as_deref().map(Rank::parse).transpose(),
        );
        if let (Ok(prev), Ok(next)) = guess {
            node.stack_rank = resolve_rank(prev.as_ref(), next.as_ref()).into();
        }
        let moved_state = node.state;
        dest.insert(at, node);

        if let Some(new_parent) = node_mut(&mut tree, &dest_path) {
            new_parent.children_count += 1;
        }

        let parent_id = if intent.new_parent == origin.parent_id {
            Patch::Absent
        } else {
            intent.new_parent.clone().into()
        };
        let state = intent.state.filter(|_| {
            self.index
                .node(self.view(), &intent.item_id)
                .is_none_or(|before| before.state != moved_state)
        });

        self.index = TreeIndex::build(&tree);
        self.working = Some(tree);

        Ok(ReorderRequest {
            item_id: intent.item_id.clone(),
            project: self.project.clone(),
            repo: self.repo.clone(),
            prev_rank,
            next_rank,
            parent_id,
            state,
        })
    }

    /// Discard every speculative edit.
    pub fn rollback(&mut self) {
        if self.working.take().is_some() {
            tracing::debug!("rolled back speculative tree");
        }
        self.index = TreeIndex::build(&self.snapshot);
    }

    /// Adopt a freshly fetched tree as the confirmed snapshot.
    pub fn commit(&mut self, fresh: Vec<TreeNode>) {
        self.working = None;
        self.index = TreeIndex::build(&fresh);
        self.snapshot = fresh;
    }
}
