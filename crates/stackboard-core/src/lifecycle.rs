//! Item creation and soft deletion.

use crate::db::{query, write};
use crate::error::{BoardError, ErrorCode};
use crate::model::{Kind, State, WorkItem};
use crate::rank::Rank;
use rand::Rng;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Prefix shared by every generated item id.
pub const ID_PREFIX: &str = "sb-";

/// Hex digits of the digest used in a fresh id.
const ID_HEX_LEN: usize = 8;

/// Fields supplied when creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub project: String,
    pub repo: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Kind,
    #[serde(default = "default_state")]
    pub state: State,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

const fn default_state() -> State {
    State::ToDo
}

impl NewItem {
    /// A new item with only the required fields set.
    pub fn new(
        project: impl Into<String>,
        repo: impl Into<String>,
        title: impl Into<String>,
        kind: Kind,
    ) -> Self {
        Self {
            project: project.into(),
            repo: repo.into(),
            title: title.into(),
            description: None,
            kind,
            state: State::ToDo,
            parent_id: None,
            area: String::new(),
            assigned_to: None,
            tags: Vec::new(),
        }
    }
}

/// What a soft delete changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub item_id: String,
    /// Live former children, now parentless.
    pub detached_children: Vec<String>,
}

/// Create an item ranked after the last live sibling of its partition.
///
/// # Errors
///
/// - [`BoardError::Validation`] for a blank title/scope or an illegal parent
/// - [`BoardError::NotFound`] when the parent does not exist in the repo
/// - [`BoardError::Database`] when the store fails
pub fn create_item(conn: &mut Connection, new: NewItem) -> Result<WorkItem, BoardError> {
    for (field, value) in [
        ("project", &new.project),
        ("repo", &new.repo),
        ("title", &new.title),
    ] {
        if value.trim().is_empty() {
            return Err(BoardError::validation(
                ErrorCode::InvalidPayload,
                field,
                "must not be empty",
            ));
        }
    }

    let parent_id = new.parent_id.filter(|id| !id.trim().is_empty());
    if let Some(parent_id) = parent_id.as_deref() {
        let parent = query::get_item(conn, parent_id, false)?
            .filter(|parent| parent.project == new.project && parent.repo == new.repo)
            .ok_or_else(|| BoardError::not_found("parent", parent_id))?;
        if !new.kind.accepts_parent(parent.kind) {
            return Err(BoardError::validation(
                ErrorCode::InvalidParentKind,
                "parentId",
                format!("a {} cannot be placed under a {}", new.kind, parent.kind),
            ));
        }
    }

    let stack_rank = match query::last_sibling_rank(conn, &new.project, &new.repo, parent_id.as_deref())? {
        Some(last) => match Rank::parse(&last) {
            Ok(last) => last.after(),
            Err(err) => {
                warn!(rank = %last, %err, "unparseable sibling rank, restarting at initial");
                Rank::initial()
            }
        },
        None => Rank::initial(),
    };

    let mut tags: Vec<String> = new
        .tags
        .iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.sort();
    tags.dedup();

    let now = write::now_us();
    let item = WorkItem {
        id: generate_item_id(conn, &new.project, &new.repo, &new.title, now)?,
        project: new.project,
        repo: new.repo,
        title: new.title.trim().to_string(),
        description: new.description.filter(|d| !d.trim().is_empty()),
        kind: new.kind,
        state: new.state,
        parent_id,
        stack_rank: stack_rank.into(),
        area: new.area,
        assigned_to: new.assigned_to.filter(|a| !a.trim().is_empty()),
        tags,
        is_deleted: false,
        deleted_at_us: None,
        created_at_us: now,
        updated_at_us: now,
    };

    write::insert_item(conn, &item)?;
    info!(
        item_id = %item.id,
        kind = %item.kind,
        parent_id = ?item.parent_id,
        stack_rank = %item.stack_rank,
        "created item"
    );
    Ok(item)
}

/// Soft-delete an item and clear the parent reference of its children.
///
/// Children keep their kind and state; nothing cascades.
///
/// # Errors
///
/// Returns [`BoardError::NotFound`] when no live item matches in the given
/// project/repo, or [`BoardError::Database`] when the store fails.
pub fn soft_delete_item(
    conn: &mut Connection,
    project: &str,
    repo: &str,
    item_id: &str,
) -> Result<DeleteOutcome, BoardError> {
    let detached = write::soft_delete(conn, project, repo, item_id, write::now_us())?
        .ok_or_else(|| BoardError::not_found("item", item_id))?;

    info!(item_id, detached = detached.len(), "soft-deleted item");
    Ok(DeleteOutcome {
        item_id: item_id.to_string(),
        detached_children: detached,
    })
}

/// `sb-` followed by a short BLAKE3 digest of the item's identity and a nonce.
///
/// Grows the digest by one hex digit per collision, deleted rows included.
fn generate_item_id(
    conn: &Connection,
    project: &str,
    repo: &str,
    title: &str,
    now_us: i64,
) -> Result<String, BoardError> {
    let nonce: u64 = rand::thread_rng().r#gen();
    let hash_input = format!("{now_us}\t{project}\t{repo}\t{title}\t{nonce}\n");
    let hex = blake3::hash(hash_input.as_bytes()).to_hex().to_string();

    for len in ID_HEX_LEN..hex.len() {
        let candidate = format!("{ID_PREFIX}{}", &hex[..len]);
        if query::get_item(conn, &candidate, true)?.is_none() {
            return Ok(candidate);
        }
    }

    Err(BoardError::Database(anyhow::anyhow!(
        "could not allocate a unique item id"
    )))
}
