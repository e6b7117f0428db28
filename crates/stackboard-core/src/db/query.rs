//! `SQLite` query helpers for the store database.
//!
//! Provides typed Rust structs and composable query functions for the read
//! paths: fetch an item, list filtered top-level rows, load children for a
//! batch of parents, walk a subtree, and inventory tags.
//!
//! All functions take a shared `&Connection` reference and return
//! `anyhow::Result<T>` with typed structs (never raw rows).

use crate::model::{Kind, State, TagOperator, UserRef, WorkItem};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter, types::ToSql};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Upper bound on bound parameters per `IN (...)` list.
const PARENT_CHUNK: usize = 500;

const ITEM_COLUMNS: &str = "i.item_id, i.project, i.repo, i.title, i.description, i.kind, \
     i.state, i.parent_id, i.stack_rank, i.area, i.assigned_to, i.is_deleted, \
     i.deleted_at_us, i.created_at_us, i.updated_at_us";

const TREE_COLUMNS: &str = "i.item_id, i.parent_id, i.title, i.kind, i.state, i.stack_rank, \
     i.assigned_to, u.name";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One row of a tree read: the node fields plus the resolved assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub item_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub kind: Kind,
    pub state: State,
    pub stack_rank: String,
    /// `None` when unassigned or when the assignee has no `users` row.
    pub assigned_user: Option<UserRef>,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Predicate for the top level of a tree read.
///
/// Empty lists mean "no constraint". When multiple fields are set they are
/// combined with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub project: String,
    pub repo: String,
    pub kind: Option<Kind>,
    pub states: Vec<State>,
    pub areas: Vec<String>,
    pub tags: Vec<String>,
    pub tag_operator: TagOperator,
    /// Case-insensitive substring over title and description.
    pub search: Option<String>,
    /// Literal user ids; any `@me` sentinel is resolved by the caller.
    pub assignees: Vec<String>,
    /// Require `parent_id` to be null or empty.
    pub parentless: bool,
}

/// Append `?n, ?n+1, ...` placeholders for `values`, returning the list text.
fn push_in_list<T: ToSql + Clone + 'static>(
    param_values: &mut Vec<Box<dyn ToSql>>,
    values: &[T],
) -> String {
    let mut placeholders = String::new();
    for (offset, value) in values.iter().enumerate() {
        param_values.push(Box::new(value.clone()));
        if offset > 0 {
            placeholders.push_str(", ");
        }
        let _ = write!(placeholders, "?{}", param_values.len());
    }
    placeholders
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn dedup_preserving_order(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|value| seen.insert(value.as_str()))
        .cloned()
        .collect()
}

impl ItemFilter {
    /// Render the WHERE conditions and bound parameters for this filter.
    fn conditions(&self, param_values: &mut Vec<Box<dyn ToSql>>) -> Vec<String> {
        let mut conditions = vec!["i.is_deleted = 0".to_string()];

        param_values.push(Box::new(self.project.clone()));
        conditions.push(format!("i.project = ?{}", param_values.len()));
        param_values.push(Box::new(self.repo.clone()));
        conditions.push(format!("i.repo = ?{}", param_values.len()));

        if let Some(kind) = self.kind {
            param_values.push(Box::new(kind.as_str()));
            conditions.push(format!("i.kind = ?{}", param_values.len()));
        }

        if !self.states.is_empty() {
            let tokens: Vec<&'static str> = self.states.iter().copied().map(State::as_str).collect();
            let list = push_in_list(param_values, &tokens);
            conditions.push(format!("i.state IN ({list})"));
        }

        if !self.areas.is_empty() {
            let list = push_in_list(param_values, &self.areas);
            conditions.push(format!("i.area IN ({list})"));
        }

        let tags = dedup_preserving_order(&self.tags);
        if !tags.is_empty() {
            let list = push_in_list(param_values, &tags);
            match self.tag_operator {
                TagOperator::Or => conditions.push(format!(
                    "EXISTS (SELECT 1 FROM item_tags t \
                     WHERE t.item_id = i.item_id AND t.tag IN ({list}))"
                )),
                TagOperator::And => conditions.push(format!(
                    "(SELECT COUNT(DISTINCT t.tag) FROM item_tags t \
                     WHERE t.item_id = i.item_id AND t.tag IN ({list})) = {}",
                    tags.len()
                )),
            }
        }

        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            param_values.push(Box::new(format!("%{}%", escape_like(search))));
            let n = param_values.len();
            conditions.push(format!(
                "(i.title LIKE ?{n} ESCAPE '\\' \
                 OR COALESCE(i.description, '') LIKE ?{n} ESCAPE '\\')"
            ));
        }

        if !self.assignees.is_empty() {
            let list = push_in_list(param_values, &self.assignees);
            conditions.push(format!("i.assigned_to IN ({list})"));
        }

        if self.parentless {
            conditions.push("(i.parent_id IS NULL OR i.parent_id = '')".to_string());
        }

        conditions
    }
}

// ---------------------------------------------------------------------------
// Core query functions
// ---------------------------------------------------------------------------

/// Fetch a single item by exact `item_id`, including its tags.
///
/// Returns `None` if the item does not exist (or is soft-deleted unless
/// `include_deleted` is true).
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_item(conn: &Connection, item_id: &str, include_deleted: bool) -> Result<Option<WorkItem>> {
    let deleted_clause = if include_deleted {
        ""
    } else {
        " AND i.is_deleted = 0"
    };
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.item_id = ?1{deleted_clause}");

    let mut stmt = conn.prepare(&sql).context("prepare get_item query")?;
    let item = stmt
        .query_row(params![item_id], row_to_work_item)
        .optional()
        .with_context(|| format!("get_item for '{item_id}'"))?;

    match item {
        Some(mut item) => {
            item.tags = get_tags(conn, item_id)?;
            Ok(Some(item))
        }
        None => Ok(None),
    }
}

/// List top-level tree rows matching `filter`, ordered by rank then id.
///
/// The assignee is resolved with a `LEFT JOIN`, so an unknown or missing
/// assignee never drops or duplicates a row.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_tree_rows(conn: &Connection, filter: &ItemFilter) -> Result<Vec<TreeRow>> {
    let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();
    let conditions = filter.conditions(&mut param_values);

    let sql = format!(
        "SELECT {TREE_COLUMNS} FROM items i \
         LEFT JOIN users u ON u.user_id = i.assigned_to \
         WHERE {} ORDER BY i.stack_rank ASC, i.item_id ASC",
        conditions.join(" AND ")
    );

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("prepare list_tree_rows query: {sql}"))?;

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(AsRef::as_ref).collect();
    let rows = stmt
        .query_map(params_from_iter(params_ref), row_to_tree_row)
        .context("execute list_tree_rows query")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.context("read list_tree_rows row")?);
    }
    Ok(items)
}

/// Load the live children of every id in `parent_ids`.
///
/// `states` restricts the children's state; an empty slice means any state.
/// Rows come back ordered by parent, then rank, then id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_child_rows(
    conn: &Connection,
    project: &str,
    repo: &str,
    parent_ids: &[String],
    states: &[State],
) -> Result<Vec<TreeRow>> {
    let mut children = Vec::new();

    for chunk in parent_ids.chunks(PARENT_CHUNK) {
        let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();
        param_values.push(Box::new(project.to_string()));
        param_values.push(Box::new(repo.to_string()));
        let parent_list = push_in_list(&mut param_values, chunk);

        let mut state_clause = String::new();
        if !states.is_empty() {
            let tokens: Vec<&'static str> = states.iter().copied().map(State::as_str).collect();
            let list = push_in_list(&mut param_values, &tokens);
            let _ = write!(state_clause, " AND i.state IN ({list})");
        }

        let sql = format!(
            "SELECT {TREE_COLUMNS} FROM items i \
             LEFT JOIN users u ON u.user_id = i.assigned_to \
             WHERE i.is_deleted = 0 AND i.project = ?1 AND i.repo = ?2 \
             AND i.parent_id IN ({parent_list}){state_clause} \
             ORDER BY i.parent_id ASC, i.stack_rank ASC, i.item_id ASC"
        );

        let mut stmt = conn.prepare(&sql).context("prepare list_child_rows")?;
        let params_ref: Vec<&dyn ToSql> = param_values.iter().map(AsRef::as_ref).collect();
        let rows = stmt
            .query_map(params_from_iter(params_ref), row_to_tree_row)
            .context("execute list_child_rows")?;

        for row in rows {
            children.push(row.context("read child row")?);
        }
    }

    Ok(children)
}

/// Whether `candidate` is `root` itself or one of its live descendants.
///
/// One recursive query, limited to `root`'s project and repo. `UNION`
/// drops rows already seen, so malformed data containing a cycle still
/// terminates.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn is_in_subtree(conn: &Connection, root: &str, candidate: &str) -> Result<bool> {
    if root == candidate {
        return Ok(true);
    }

    let sql = "WITH RECURSIVE subtree(item_id, project, repo) AS (
                   SELECT item_id, project, repo FROM items WHERE item_id = ?1
                   UNION
                   SELECT c.item_id, c.project, c.repo
                   FROM items c
                   JOIN subtree s
                     ON c.parent_id = s.item_id AND c.project = s.project AND c.repo = s.repo
                   WHERE c.is_deleted = 0
               )
               SELECT EXISTS(SELECT 1 FROM subtree WHERE item_id = ?2)";

    let found: bool = conn
        .query_row(sql, params![root, candidate], |row| row.get(0))
        .context("query is_in_subtree")?;
    Ok(found)
}

/// Highest live sibling rank in the `(project, repo, parent)` partition.
///
/// A `None` parent addresses the parentless partition, where a null and an
/// empty `parent_id` are equivalent.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn last_sibling_rank(
    conn: &Connection,
    project: &str,
    repo: &str,
    parent_id: Option<&str>,
) -> Result<Option<String>> {
    let rank: Option<String> = match parent_id.filter(|p| !p.is_empty()) {
        Some(parent) => conn.query_row(
            "SELECT MAX(stack_rank) FROM items \
             WHERE project = ?1 AND repo = ?2 AND parent_id = ?3 AND is_deleted = 0",
            params![project, repo, parent],
            |row| row.get(0),
        ),
        None => conn.query_row(
            "SELECT MAX(stack_rank) FROM items \
             WHERE project = ?1 AND repo = ?2 \
             AND (parent_id IS NULL OR parent_id = '') AND is_deleted = 0",
            params![project, repo],
            |row| row.get(0),
        ),
    }
    .context("query last sibling rank")?;
    Ok(rank)
}

/// Get the tags of an item in sorted order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_tags(conn: &Connection, item_id: &str) -> Result<Vec<String>> {
    let sql = "SELECT tag FROM item_tags WHERE item_id = ?1 ORDER BY tag";

    let mut stmt = conn.prepare(sql).context("prepare get_tags")?;
    let rows = stmt
        .query_map(params![item_id], |row| row.get::<_, String>(0))
        .context("execute get_tags")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row.context("read tag row")?);
    }
    Ok(tags)
}

/// Distinct non-empty tags across live items of one project/repo, sorted.
///
/// # Errors
///
/// Returns an error if the aggregate query fails.
pub fn distinct_tags(conn: &Connection, project: &str, repo: &str) -> Result<Vec<String>> {
    let sql = "SELECT DISTINCT t.tag FROM item_tags t \
               INNER JOIN items i ON i.item_id = t.item_id \
               WHERE i.project = ?1 AND i.repo = ?2 AND i.is_deleted = 0 \
               AND length(trim(t.tag)) > 0 \
               ORDER BY t.tag ASC";

    let mut stmt = conn.prepare(sql).context("prepare distinct_tags")?;
    let rows = stmt
        .query_map(params![project, repo], |row| row.get::<_, String>(0))
        .context("execute distinct_tags")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row.context("read distinct tag")?);
    }
    Ok(tags)
}

/// Look up a user by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<UserRef>> {
    conn.query_row(
        "SELECT user_id, name FROM users WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(UserRef {
                user_id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
    .with_context(|| format!("get_user for '{user_id}'"))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn parse_column<T: std::str::FromStr>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(error))
    })
}

pub(crate) fn row_to_work_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkItem> {
    Ok(WorkItem {
        id: row.get(0)?,
        project: row.get(1)?,
        repo: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        kind: parse_column(row, 5)?,
        state: parse_column(row, 6)?,
        parent_id: row.get(7)?,
        stack_rank: row.get(8)?,
        area: row.get(9)?,
        assigned_to: row.get(10)?,
        tags: Vec::new(),
        is_deleted: row.get::<_, i64>(11)? != 0,
        deleted_at_us: row.get(12)?,
        created_at_us: row.get(13)?,
        updated_at_us: row.get(14)?,
    })
}

fn row_to_tree_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TreeRow> {
    let assigned_to: Option<String> = row.get(6)?;
    let user_name: Option<String> = row.get(7)?;
    let assigned_user = match (assigned_to, user_name) {
        (Some(user_id), Some(name)) => Some(UserRef { user_id, name }),
        _ => None,
    };

    Ok(TreeRow {
        item_id: row.get(0)?,
        parent_id: row.get(1)?,
        title: row.get(2)?,
        kind: parse_column(row, 3)?,
        state: parse_column(row, 4)?,
        stack_rank: row.get(5)?,
        assigned_user,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use rusqlite::{Connection, params};

    fn test_db() -> Connection {
        open_in_memory().expect("open in-memory db")
    }

    /// Insert a test item in project `web`, repo `core`.
    fn insert_item(
        conn: &Connection,
        id: &str,
        kind: &str,
        state: &str,
        parent_id: Option<&str>,
        rank: &str,
    ) {
        conn.execute(
            "INSERT INTO items (item_id, project, repo, title, kind, state, parent_id, \
             stack_rank, created_at_us, updated_at_us) \
             VALUES (?1, 'web', 'core', ?2, ?3, ?4, ?5, ?6, 1000, 2000)",
            params![id, format!("Item {id}"), kind, state, parent_id, rank],
        )
        .expect("insert item");
    }

    fn insert_tag(conn: &Connection, item_id: &str, tag: &str) {
        conn.execute(
            "INSERT INTO item_tags (item_id, tag) VALUES (?1, ?2)",
            params![item_id, tag],
        )
        .expect("insert tag");
    }

    fn filter() -> ItemFilter {
        ItemFilter {
            project: "web".into(),
            repo: "core".into(),
            ..ItemFilter::default()
        }
    }

    fn ids(rows: &[TreeRow]) -> Vec<&str> {
        rows.iter().map(|r| r.item_id.as_str()).collect()
    }

    #[test]
    fn get_item_found_with_tags() {
        let conn = test_db();
        insert_item(&conn, "sb-1", "issue", "doing", None, "V");
        insert_tag(&conn, "sb-1", "ui");
        insert_tag(&conn, "sb-1", "api");

        let item = get_item(&conn, "sb-1", false).unwrap().unwrap();
        assert_eq!(item.kind, Kind::Issue);
        assert_eq!(item.state, State::Doing);
        assert_eq!(item.tags, vec!["api", "ui"]);
    }

    #[test]
    fn get_item_hides_deleted_unless_asked() {
        let conn = test_db();
        insert_item(&conn, "sb-1", "issue", "todo", None, "V");
        conn.execute("UPDATE items SET is_deleted = 1 WHERE item_id = 'sb-1'", [])
            .unwrap();

        assert!(get_item(&conn, "sb-1", false).unwrap().is_none());
        assert!(get_item(&conn, "sb-1", true).unwrap().unwrap().is_deleted);
    }

    #[test]
    fn list_orders_by_rank_then_id() {
        let conn = test_db();
        insert_item(&conn, "sb-b", "issue", "todo", None, "k");
        insert_item(&conn, "sb-a", "issue", "todo", None, "k");
        insert_item(&conn, "sb-c", "issue", "todo", None, "G");

        let rows = list_tree_rows(&conn, &filter()).unwrap();
        assert_eq!(ids(&rows), vec!["sb-c", "sb-a", "sb-b"]);
    }

    #[test]
    fn list_filters_kind_state_and_scope() {
        let conn = test_db();
        insert_item(&conn, "sb-1", "issue", "todo", None, "V");
        insert_item(&conn, "sb-2", "issue", "done", None, "k");
        insert_item(&conn, "sb-3", "epic", "todo", None, "z");
        conn.execute(
            "INSERT INTO items (item_id, project, repo, title, kind, state, stack_rank, \
             created_at_us, updated_at_us) \
             VALUES ('sb-x', 'web', 'other', 'Elsewhere', 'issue', 'todo', 'V', 1, 1)",
            [],
        )
        .unwrap();

        let rows = list_tree_rows(
            &conn,
            &ItemFilter {
                kind: Some(Kind::Issue),
                states: vec![State::ToDo],
                ..filter()
            },
        )
        .unwrap();
        assert_eq!(ids(&rows), vec!["sb-1"]);
    }

    #[test]
    fn tag_operators() {
        let conn = test_db();
        insert_item(&conn, "sb-1", "issue", "todo", None, "1");
        insert_item(&conn, "sb-2", "issue", "todo", None, "2");
        insert_item(&conn, "sb-3", "issue", "todo", None, "3");
        insert_tag(&conn, "sb-1", "ui");
        insert_tag(&conn, "sb-1", "api");
        insert_tag(&conn, "sb-2", "ui");

        let or_rows = list_tree_rows(
            &conn,
            &ItemFilter {
                tags: vec!["ui".into(), "api".into()],
                ..filter()
            },
        )
        .unwrap();
        assert_eq!(ids(&or_rows), vec!["sb-1", "sb-2"]);

        let and_rows = list_tree_rows(
            &conn,
            &ItemFilter {
                tags: vec!["ui".into(), "api".into(), "ui".into()],
                tag_operator: TagOperator::And,
                ..filter()
            },
        )
        .unwrap();
        assert_eq!(ids(&and_rows), vec!["sb-1"]);
    }

    #[test]
    fn search_is_case_insensitive_and_escapes_wildcards() {
        let conn = test_db();
        insert_item(&conn, "sb-1", "issue", "todo", None, "1");
        insert_item(&conn, "sb-2", "issue", "todo", None, "2");
        conn.execute(
            "UPDATE items SET title = 'Checkout flow', description = '100% done' \
             WHERE item_id = 'sb-1'",
            [],
        )
        .unwrap();

        let by_title = list_tree_rows(
            &conn,
            &ItemFilter {
                search: Some("CHECKOUT".into()),
                ..filter()
            },
        )
        .unwrap();
        assert_eq!(ids(&by_title), vec!["sb-1"]);

        let by_percent = list_tree_rows(
            &conn,
            &ItemFilter {
                search: Some("0%".into()),
                ..filter()
            },
        )
        .unwrap();
        assert_eq!(ids(&by_percent), vec!["sb-1"]);
    }

    #[test]
    fn unknown_assignee_is_outer_joined() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO users (user_id, name, created_at_us) VALUES ('ada', 'Ada', 1)",
            [],
        )
        .unwrap();
        insert_item(&conn, "sb-1", "issue", "todo", None, "1");
        insert_item(&conn, "sb-2", "issue", "todo", None, "2");
        insert_item(&conn, "sb-3", "issue", "todo", None, "3");
        conn.execute("UPDATE items SET assigned_to = 'ada' WHERE item_id = 'sb-1'", [])
            .unwrap();
        conn.execute("UPDATE items SET assigned_to = 'ghost' WHERE item_id = 'sb-2'", [])
            .unwrap();

        let rows = list_tree_rows(&conn, &filter()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].assigned_user.as_ref().unwrap().name, "Ada");
        assert!(rows[1].assigned_user.is_none());
        assert!(rows[2].assigned_user.is_none());

        let mine = list_tree_rows(
            &conn,
            &ItemFilter {
                assignees: vec!["ada".into()],
                ..filter()
            },
        )
        .unwrap();
        assert_eq!(ids(&mine), vec!["sb-1"]);
    }

    #[test]
    fn parentless_treats_empty_as_null() {
        let conn = test_db();
        insert_item(&conn, "sb-e1", "epic", "todo", None, "1");
        insert_item(&conn, "sb-e2", "epic", "todo", Some(""), "2");
        insert_item(&conn, "sb-e3", "epic", "todo", Some("sb-e1"), "3");

        let rows = list_tree_rows(
            &conn,
            &ItemFilter {
                parentless: true,
                ..filter()
            },
        )
        .unwrap();
        assert_eq!(ids(&rows), vec!["sb-e1", "sb-e2"]);
    }

    #[test]
    fn child_rows_respect_state_list() {
        let conn = test_db();
        insert_item(&conn, "sb-e", "epic", "todo", None, "V");
        insert_item(&conn, "sb-i1", "issue", "todo", Some("sb-e"), "k");
        insert_item(&conn, "sb-i2", "issue", "done", Some("sb-e"), "G");

        let parents = vec!["sb-e".to_string()];
        let all = list_child_rows(&conn, "web", "core", &parents, &[]).unwrap();
        assert_eq!(ids(&all), vec!["sb-i2", "sb-i1"]);

        let open = list_child_rows(&conn, "web", "core", &parents, &[State::ToDo, State::Doing])
            .unwrap();
        assert_eq!(ids(&open), vec!["sb-i1"]);
    }

    #[test]
    fn subtree_membership() {
        let conn = test_db();
        insert_item(&conn, "sb-e", "epic", "todo", None, "V");
        insert_item(&conn, "sb-i", "issue", "todo", Some("sb-e"), "V");
        insert_item(&conn, "sb-t", "task", "todo", Some("sb-i"), "V");
        insert_item(&conn, "sb-o", "issue", "todo", None, "k");

        assert!(is_in_subtree(&conn, "sb-e", "sb-t").unwrap());
        assert!(is_in_subtree(&conn, "sb-i", "sb-i").unwrap());
        assert!(!is_in_subtree(&conn, "sb-i", "sb-e").unwrap());
        assert!(!is_in_subtree(&conn, "sb-e", "sb-o").unwrap());
    }

    #[test]
    fn subtree_stays_in_scope_and_survives_cycles() {
        let conn = test_db();
        insert_item(&conn, "sb-e", "epic", "todo", None, "V");
        conn.execute(
            "INSERT INTO items (item_id, project, repo, title, kind, state, parent_id, \
             stack_rank, created_at_us, updated_at_us) \
             VALUES ('sb-x', 'web', 'other', 'X', 'issue', 'todo', 'sb-e', 'V', 1, 1)",
            [],
        )
        .unwrap();
        assert!(!is_in_subtree(&conn, "sb-e", "sb-x").unwrap());

        insert_item(&conn, "sb-a", "issue", "todo", Some("sb-b"), "V");
        insert_item(&conn, "sb-b", "issue", "todo", Some("sb-a"), "k");
        assert!(is_in_subtree(&conn, "sb-a", "sb-b").unwrap());
        assert!(!is_in_subtree(&conn, "sb-a", "sb-e").unwrap());
    }

    #[test]
    fn last_sibling_rank_per_partition() {
        let conn = test_db();
        assert_eq!(last_sibling_rank(&conn, "web", "core", None).unwrap(), None);

        insert_item(&conn, "sb-e", "epic", "todo", None, "V");
        insert_item(&conn, "sb-f", "epic", "todo", Some(""), "k");
        insert_item(&conn, "sb-i", "issue", "todo", Some("sb-e"), "z");

        assert_eq!(
            last_sibling_rank(&conn, "web", "core", None).unwrap().as_deref(),
            Some("k")
        );
        assert_eq!(
            last_sibling_rank(&conn, "web", "core", Some("sb-e"))
                .unwrap()
                .as_deref(),
            Some("z")
        );
    }

    #[test]
    fn distinct_tags_skip_deleted_and_blank() {
        let conn = test_db();
        insert_item(&conn, "sb-1", "issue", "todo", None, "1");
        insert_item(&conn, "sb-2", "issue", "todo", None, "2");
        insert_tag(&conn, "sb-1", "ui");
        insert_tag(&conn, "sb-1", "");
        insert_tag(&conn, "sb-2", "api");
        insert_tag(&conn, "sb-2", "ui");
        insert_item(&conn, "sb-3", "issue", "todo", None, "3");
        insert_tag(&conn, "sb-3", "legacy");
        conn.execute("UPDATE items SET is_deleted = 1 WHERE item_id = 'sb-3'", [])
            .unwrap();

        assert_eq!(distinct_tags(&conn, "web", "core").unwrap(), vec!["api", "ui"]);
        assert!(distinct_tags(&conn, "web", "nope").unwrap().is_empty());
    }

    #[test]
    fn corrupt_enum_column_is_an_error() {
        let conn = test_db();
        conn.execute_batch("PRAGMA ignore_check_constraints = ON").unwrap();
        insert_item(&conn, "sb-1", "story", "todo", None, "V");
        assert!(get_item(&conn, "sb-1", false).is_err());
    }
}
