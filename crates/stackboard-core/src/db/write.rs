//! Single-statement and single-transaction writes against the store.
//!
//! Every function here is one atomic unit: either a lone `UPDATE`/`INSERT`,
//! or a short transaction that commits or rolls back as a whole.

use crate::model::{Patch, State, WorkItem};
use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params, params_from_iter, types::ToSql};

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// Insert a new item and its tags in one transaction.
///
/// # Errors
///
/// Returns an error if the id already exists or a constraint fails.
pub fn insert_item(conn: &mut Connection, item: &WorkItem) -> Result<()> {
    let tx = conn.transaction().context("begin insert_item transaction")?;

    tx.execute(
        "INSERT INTO items (item_id, project, repo, title, description, kind, state, \
         parent_id, stack_rank, area, assigned_to, is_deleted, deleted_at_us, \
         created_at_us, updated_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, NULL, ?12, ?13)",
        params![
            item.id,
            item.project,
            item.repo,
            item.title,
            item.description,
            item.kind.as_str(),
            item.state.as_str(),
            item.parent_id,
            item.stack_rank,
            item.area,
            item.assigned_to,
            item.created_at_us,
            item.updated_at_us,
        ],
    )
    .with_context(|| format!("insert item '{}'", item.id))?;

    for tag in &item.tags {
        tx.execute(
            "INSERT OR IGNORE INTO item_tags (item_id, tag) VALUES (?1, ?2)",
            params![item.id, tag],
        )
        .with_context(|| format!("insert tag '{tag}' for '{}'", item.id))?;
    }

    tx.commit().context("commit insert_item")?;
    tracing::debug!(item_id = %item.id, tags = item.tags.len(), "inserted item");
    Ok(())
}

/// Write the outcome of a reorder as one `UPDATE` on one row.
///
/// `stack_rank` and `updated_at_us` are always written. `parent_id` is
/// written only when the patch is not [`Patch::Absent`], and `state` only
/// when supplied.
///
/// # Errors
///
/// Returns an error if the statement fails or no live row matched.
pub fn apply_reorder(
    conn: &Connection,
    item_id: &str,
    stack_rank: &str,
    parent_id: &Patch<String>,
    state: Option<State>,
    updated_at_us: i64,
) -> Result<()> {
    let mut assignments: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();

    param_values.push(Box::new(stack_rank.to_string()));
    assignments.push(format!("stack_rank = ?{}", param_values.len()));

    param_values.push(Box::new(updated_at_us));
    assignments.push(format!("updated_at_us = ?{}", param_values.len()));

    if let Some(parent) = parent_id.as_update() {
        param_values.push(Box::new(parent.cloned()));
        assignments.push(format!("parent_id = ?{}", param_values.len()));
    }

    if let Some(state) = state {
        param_values.push(Box::new(state.as_str()));
        assignments.push(format!("state = ?{}", param_values.len()));
    }

    param_values.push(Box::new(item_id.to_string()));
    let sql = format!(
        "UPDATE items SET {} WHERE item_id = ?{} AND is_deleted = 0",
        assignments.join(", "),
        param_values.len()
    );

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(AsRef::as_ref).collect();
    let changed = conn
        .execute(&sql, params_from_iter(params_ref))
        .with_context(|| format!("apply reorder to '{item_id}'"))?;

    if changed != 1 {
        bail!("reorder of '{item_id}' matched {changed} rows");
    }
    Ok(())
}

/// Soft-delete an item and detach its children in one transaction.
///
/// Every child loses its `parent_id`. The returned ids are the live children
/// among them, or `None` when no live item matched.
///
/// # Errors
///
/// Returns an error if either statement fails.
pub fn soft_delete(
    conn: &mut Connection,
    project: &str,
    repo: &str,
    item_id: &str,
    deleted_at_us: i64,
) -> Result<Option<Vec<String>>> {
    let tx = conn.transaction().context("begin soft_delete transaction")?;

    let marked = tx
        .execute(
            "UPDATE items SET is_deleted = 1, deleted_at_us = ?1, updated_at_us = ?1 \
             WHERE item_id = ?2 AND project = ?3 AND repo = ?4 AND is_deleted = 0",
            params![deleted_at_us, item_id, project, repo],
        )
        .with_context(|| format!("mark '{item_id}' deleted"))?;

    if marked == 0 {
        return Ok(None);
    }

    let detached = {
        let mut stmt = tx
            .prepare(
                "SELECT item_id FROM items \
                 WHERE parent_id = ?1 AND is_deleted = 0 ORDER BY item_id",
            )
            .context("prepare child lookup")?;
        let rows = stmt
            .query_map(params![item_id], |row| row.get::<_, String>(0))
            .context("execute child lookup")?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.context("read child id")?);
        }
        ids
    };

    tx.execute(
        "UPDATE items SET parent_id = NULL, updated_at_us = ?1 WHERE parent_id = ?2",
        params![deleted_at_us, item_id],
    )
    .with_context(|| format!("detach children of '{item_id}'"))?;

    tx.commit().context("commit soft_delete")?;
    Ok(Some(detached))
}

/// Insert or rename a user.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub fn upsert_user(conn: &Connection, user_id: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO users (user_id, name, created_at_us) VALUES (?1, ?2, ?3) \
         ON CONFLICT(user_id) DO UPDATE SET name = excluded.name",
        params![user_id, name, now_us()],
    )
    .with_context(|| format!("upsert user '{user_id}'"))?;
    Ok(())
}

/// Grant repository-administrator privilege. Granting twice is a no-op.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub fn grant_repo_admin(conn: &Connection, repo: &str, user_id: &str) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO repo_admins (repo, user_id, granted_at_us) VALUES (?1, ?2, ?3)",
            params![repo, user_id, now_us()],
        )
        .with_context(|| format!("grant '{user_id}' admin on '{repo}'"))?;
    Ok(inserted == 1)
}
