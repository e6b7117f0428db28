//! Read-side tree assembly for the board and backlog views.
//!
//! Both views rebuild a parent/child tree from the flat `items` table, but
//! they filter the levels differently:
//!
//! - **Board**: the top level takes the full [`TreeQuery`] predicate; its
//!   direct children are attached unconditionally.
//! - **Backlog**: the top level takes the query predicate with a defaulted
//!   state list; every descendant level applies its own state filter,
//!   `{To Do, Doing}` plus `Done` when completed children are requested.
//!
//! Each level is loaded with one query per batch of parent ids, so a read
//! costs a handful of statements regardless of tree width. The assembler
//! never writes.

use crate::db::query::{self, ItemFilter, TreeRow};
use crate::error::{BoardError, ErrorCode};
use crate::model::{Kind, State, TagOperator, UserRef};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Sentinel in `assignedUsers` standing for the requesting user.
pub const ME: &str = "@me";

/// Kind shown at the top of the board when the query names none.
pub const DEFAULT_BOARD_KIND: Kind = Kind::Issue;

/// Kind shown at the top of the backlog when the query names none.
pub const DEFAULT_BACKLOG_KIND: Kind = Kind::Epic;

/// Tree read request shared by both views.
///
/// Empty lists mean "no constraint".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeQuery {
    pub project: String,
    pub repo: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    /// `None` lets the backlog apply its default top-level states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Vec<State>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub area: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tag_operator: TagOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_users: Vec<String>,
    /// Backlog only: default top-level states become `{To Do, Doing}`.
    #[serde(default)]
    pub include_in_progress: bool,
    /// Backlog only: descendant levels also show `Done` items.
    #[serde(default)]
    pub show_completed_child_items: bool,
}

/// One node of an assembled tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub state: State,
    pub stack_rank: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user: Option<UserRef>,
    #[serde(default)]
    pub children: Vec<Self>,
    #[serde(default)]
    pub children_count: usize,
}

impl TreeNode {
    fn leaf(row: TreeRow) -> Self {
        Self {
            id: row.item_id,
            title: row.title,
            kind: row.kind,
            state: row.state,
            stack_rank: row.stack_rank,
            assigned_user: row.assigned_user,
            children: Vec::new(),
            children_count: 0,
        }
    }

    /// Replace the children and keep `children_count` in step.
    pub fn set_children(&mut self, children: Vec<Self>) {
        self.children_count = children.len();
        self.children = children;
    }
}

/// Result of a tree read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    pub work_items: Vec<TreeNode>,
    /// Every distinct tag in the repo, independent of the filters.
    pub all_tags: Vec<String>,
}

/// Builds board and backlog trees from one store connection.
pub struct HierarchyAssembler<'c> {
    conn: &'c Connection,
}

impl<'c> HierarchyAssembler<'c> {
    #[must_use]
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Two-level board tree: filtered top items plus all their children.
    ///
    /// `viewer` resolves the `@me` sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for a malformed query and
    /// [`BoardError::Database`] when the store fails.
    pub fn board(&self, viewer: Option<&str>, query: &TreeQuery) -> Result<TreeResponse, BoardError> {
        let mut filter = base_filter(viewer, query)?;
        filter.kind = Some(query.kind.unwrap_or(DEFAULT_BOARD_KIND));
        filter.states = query.state.clone().unwrap_or_default();

        let top = query::list_tree_rows(self.conn, &filter)?;
        let work_items = self.attach_levels(&filter, top, 1, &[])?;
        debug!(
            project = %query.project,
            repo = %query.repo,
            top = work_items.len(),
            "assembled board"
        );

        Ok(TreeResponse {
            work_items,
            all_tags: self.all_tags(&query.project, &query.repo)?,
        })
    }

    /// Backlog outline: Epic → Issue → Task, Issue → Task, or bare Tasks,
    /// depending on the top-level kind.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for a malformed query and
    /// [`BoardError::Database`] when the store fails.
    pub fn backlog(&self, viewer: Option<&str>, query: &TreeQuery) -> Result<TreeResponse, BoardError> {
        let kind = query.kind.unwrap_or(DEFAULT_BACKLOG_KIND);

        let mut filter = base_filter(viewer, query)?;
        filter.kind = Some(kind);
        filter.states = match &query.state {
            Some(states) if !states.is_empty() => states.clone(),
            _ if query.include_in_progress => vec![State::ToDo, State::Doing],
            _ => vec![State::ToDo],
        };
        filter.parentless = kind == Kind::Epic;

        let child_states: &[State] = if query.show_completed_child_items {
            &State::ALL
        } else {
            &[State::ToDo, State::Doing]
        };

        let top = query::list_tree_rows(self.conn, &filter)?;
        let work_items = self.attach_levels(&filter, top, kind.backlog_depth(), child_states)?;
        debug!(
            project = %query.project,
            repo = %query.repo,
            kind = %kind,
            top = work_items.len(),
            "assembled backlog"
        );

        Ok(TreeResponse {
            work_items,
            all_tags: self.all_tags(&query.project, &query.repo)?,
        })
    }

    /// Distinct non-empty tags across live items of the repo, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Database`] when the store fails.
    pub fn all_tags(&self, project: &str, repo: &str) -> Result<Vec<String>, BoardError> {
        Ok(query::distinct_tags(self.conn, project, repo)?)
    }

    /// Load `depth` descendant levels below `top` and fold them into nodes.
    ///
    /// `child_states` filters every descendant level; empty means any state.
    fn attach_levels(
        &self,
        filter: &ItemFilter,
        top: Vec<TreeRow>,
        depth: usize,
        child_states: &[State],
    ) -> Result<Vec<TreeNode>, BoardError> {
        let mut levels: Vec<HashMap<String, Vec<TreeRow>>> = Vec::with_capacity(depth);
        let mut parent_ids: Vec<String> = top.iter().map(|row| row.item_id.clone()).collect();

        for _ in 0..depth {
            if parent_ids.is_empty() {
                break;
            }
            let rows = query::list_child_rows(
                self.conn,
                &filter.project,
                &filter.repo,
                &parent_ids,
                child_states,
            )?;
            parent_ids = rows.iter().map(|row| row.item_id.clone()).collect();

            let mut by_parent: HashMap<String, Vec<TreeRow>> = HashMap::new();
            for row in rows {
                let parent = row.parent_id.clone().unwrap_or_default();
                by_parent.entry(parent).or_default().push(row);
            }
            levels.push(by_parent);
        }

        Ok(top
            .into_iter()
            .map(|row| build_node(row, &mut levels, 0))
            .collect())
    }
}

fn build_node(row: TreeRow, levels: &mut [HashMap<String, Vec<TreeRow>>], level: usize) -> TreeNode {
    let children = levels
        .get_mut(level)
        .and_then(|by_parent| by_parent.remove(&row.item_id))
        .unwrap_or_default();

    let mut node = TreeNode::leaf(row);
    let children = children
        .into_iter()
        .map(|child| build_node(child, levels, level + 1))
        .collect();
    node.set_children(children);
    node
}

/// Project/repo scope plus the filters both views share.
fn base_filter(viewer: Option<&str>, query: &TreeQuery) -> Result<ItemFilter, BoardError> {
    for (field, value) in [("project", &query.project), ("repo", &query.repo)] {
        if value.trim().is_empty() {
            return Err(BoardError::validation(
                ErrorCode::InvalidPayload,
                field,
                "must not be empty",
            ));
        }
    }

    Ok(ItemFilter {
        project: query.project.clone(),
        repo: query.repo.clone(),
        areas: query.area.clone(),
        tags: query.tags.clone(),
        tag_operator: query.tag_operator,
        search: query.search.clone(),
        assignees: resolve_assignees(viewer, &query.assigned_users)?,
        ..ItemFilter::default()
    })
}

/// Replace every `@me` with the viewer's id.
fn resolve_assignees(viewer: Option<&str>, requested: &[String]) -> Result<Vec<String>, BoardError> {
    let mut resolved = Vec::with_capacity(requested.len());
    for user in requested {
        if user == ME {
            let viewer = viewer.ok_or_else(|| {
                BoardError::validation(
                    ErrorCode::InvalidPayload,
                    "assignedUsers",
                    "'@me' needs a requesting user",
                )
            })?;
            resolved.push(viewer.to_string());
        } else {
            resolved.push(user.clone());
        }
    }
    Ok(resolved)
}
