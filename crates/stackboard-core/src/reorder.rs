//! Reorder and reparent protocol.
//!
//! A drag-and-drop gesture arrives as a [`ReorderRequest`] carrying the ranks
//! of the item's neighbours *after* the move. [`ReorderCoordinator`] turns it
//! into exactly one row update: a freshly allocated `stack_rank`, plus the
//! `parent_id` and `state` fields only when the caller supplied them.
//!
//! # Processing order
//!
//! 1. payload validation (ids present, neighbour ranks well-formed)
//! 2. `require_repo_admin(actor, repo)`
//! 3. item lookup in the requested project/repo
//! 4. parent checks when a new parent is supplied
//! 5. rank resolution
//! 6. the single `UPDATE`
//!
//! A rejection at any step leaves the store untouched. Two reorders of the
//! same item race as last-write-wins; there is no version check.

use crate::authz::Authorizer;
use crate::db::{query, write};
use crate::error::{BoardError, ErrorCode};
use crate::model::{Kind, Patch, State, WorkItem};
use crate::rank::Rank;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A move intent as sent by a board or backlog client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub item_id: String,
    pub project: String,
    pub repo: String,
    /// Rank of the neighbour that will sit immediately before the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_rank: Option<String>,
    /// Rank of the neighbour that will sit immediately after the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_rank: Option<String>,
    /// Omitted leaves the parent alone; `null` detaches.
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub parent_id: Patch<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
}

/// Pick the new rank from the post-move neighbours.
///
/// | prev | next | result                |
/// |------|------|-----------------------|
/// | a    | b    | `between(a, b)`       |
/// | a    | a    | `a.after()`           |
/// | a    | -    | `a.after()`           |
/// | -    | b    | `b.before()`          |
/// | -    | -    | `initial()`           |
///
/// Reversed neighbours are normalized by [`Rank::between`]; equal or
/// reversed input never fails.
#[must_use]
pub fn resolve_rank(prev: Option<&Rank>, next: Option<&Rank>) -> Rank {
    match (prev, next) {
        (Some(prev), Some(next)) => Rank::between(prev, next),
        (Some(prev), None) => prev.after(),
        (None, Some(next)) => next.before(),
        (None, None) => Rank::initial(),
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), BoardError> {
    if value.trim().is_empty() {
        return Err(BoardError::validation(
            ErrorCode::InvalidPayload,
            field,
            "must not be empty",
        ));
    }
    Ok(())
}

fn parse_neighbour(field: &'static str, raw: Option<&str>) -> Result<Option<Rank>, BoardError> {
    raw.map(|raw| {
        Rank::parse(raw)
            .map_err(|err| BoardError::validation(ErrorCode::InvalidRank, field, err.to_string()))
    })
    .transpose()
}

/// Validated view of a request, produced before any store access.
struct ValidRequest {
    prev: Option<Rank>,
    next: Option<Rank>,
    parent: Patch<String>,
}

impl ReorderRequest {
    fn validate(&self) -> Result<ValidRequest, BoardError> {
        require_non_empty("itemId", &self.item_id)?;
        require_non_empty("project", &self.project)?;
        require_non_empty("repo", &self.repo)?;

        let prev = parse_neighbour("prevRank", self.prev_rank.as_deref())?;
        let next = parse_neighbour("nextRank", self.next_rank.as_deref())?;

        // An empty parent id is stored and read as "no parent".
        let parent = match &self.parent_id {
            Patch::Value(id) if id.trim().is_empty() => Patch::Null,
            Patch::Value(id) if id == &self.item_id => {
                return Err(BoardError::validation(
                    ErrorCode::CycleDetected,
                    "parentId",
                    "an item cannot be its own parent",
                ));
            }
            other => other.clone(),
        };

        Ok(ValidRequest { prev, next, parent })
    }
}

/// Applies [`ReorderRequest`]s against one store connection.
pub struct ReorderCoordinator<'c, A: Authorizer> {
    conn: &'c Connection,
    authz: A,
}

impl<'c, A: Authorizer> ReorderCoordinator<'c, A> {
    pub const fn new(conn: &'c Connection, authz: A) -> Self {
        Self { conn, authz }
    }

    /// Apply one move on behalf of `actor` and return the updated item.
    ///
    /// # Errors
    ///
    /// - [`BoardError::Validation`] for a malformed payload or an illegal parent
    /// - [`BoardError::Forbidden`] when `actor` does not administer the repo
    /// - [`BoardError::NotFound`] when the item or new parent is missing
    /// - [`BoardError::Database`] when the store fails
    pub fn reorder(&self, actor: &str, request: &ReorderRequest) -> Result<WorkItem, BoardError> {
        let valid = request.validate()?;

        self.authz.require_repo_admin(actor, &request.repo)?;

        let mut item = query::get_item(self.conn, &request.item_id, false)?
            .filter(|item| item.project == request.project && item.repo == request.repo)
            .ok_or_else(|| BoardError::not_found("item", &request.item_id))?;

        if let Some(parent_id) = valid.parent.value() {
            self.check_parent(&item, parent_id)?;
        }

        let rank = resolve_rank(valid.prev.as_ref(), valid.next.as_ref());
        debug!(
            item_id = %item.id,
            prev = ?request.prev_rank,
            next = ?request.next_rank,
            rank = %rank,
            "resolved stack rank"
        );

        let now = write::now_us();
        write::apply_reorder(
            self.conn,
            &item.id,
            rank.as_str(),
            &valid.parent,
            request.state,
            now,
        )?;

        item.stack_rank = rank.into();
        item.updated_at_us = now;
        if let Some(parent) = valid.parent.into_update() {
            item.parent_id = parent;
        }
        if let Some(state) = request.state {
            item.state = state;
        }

        info!(
            item_id = %item.id,
            actor,
            stack_rank = %item.stack_rank,
            parent_id = ?item.parent_id,
            state = %item.state,
            "reordered item"
        );
        Ok(item)
    }

    fn check_parent(&self, item: &WorkItem, parent_id: &str) -> Result<(), BoardError> {
        let parent = query::get_item(self.conn, parent_id, false)?
            .filter(|parent| parent.project == item.project && parent.repo == item.repo)
            .ok_or_else(|| BoardError::not_found("parent", parent_id))?;

        if item.kind == Kind::Epic {
            return Err(BoardError::validation(
                ErrorCode::InvalidParentKind,
                "parentId",
                "an Epic cannot have a parent",
            ));
        }

        if !item.kind.accepts_parent(parent.kind) {
            return Err(BoardError::validation(
                ErrorCode::InvalidParentKind,
                "parentId",
                format!("a {} cannot be placed under a {}", item.kind, parent.kind),
            ));
        }

        if query::is_in_subtree(self.conn, &item.id, parent_id)? {
            return Err(BoardError::validation(
                ErrorCode::CycleDetected,
                "parentId",
                format!("'{parent_id}' is a descendant of '{}'", item.id),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::SqliteAuthorizer;
    use crate::db::{open_in_memory, query::ItemFilter};
    use rusqlite::params;

    const ADMIN: &str = "ada";

    fn test_db() -> Connection {
        let conn = open_in_memory().expect("open db");
        write::grant_repo_admin(&conn, "core", ADMIN).expect("grant");
        conn
    }

    fn insert_item(conn: &Connection, id: &str, kind: &str, parent: Option<&str>, rank: &str) {
        conn.execute(
            "INSERT INTO items (item_id, project, repo, title, kind, state, parent_id, \
             stack_rank, created_at_us, updated_at_us) \
             VALUES (?1, 'web', 'core', ?1, ?2, 'todo', ?3, ?4, 1, 1)",
            params![id, kind, parent, rank],
        )
        .expect("insert item");
    }

    fn request(item_id: &str) -> ReorderRequest {
        ReorderRequest {
            item_id: item_id.into(),
            project: "web".into(),
            repo: "core".into(),
            ..ReorderRequest::default()
        }
    }

    fn reorder(conn: &Connection, req: &ReorderRequest) -> Result<WorkItem, BoardError> {
        ReorderCoordinator::new(conn, SqliteAuthorizer::new(conn)).reorder(ADMIN, req)
    }

    fn sibling_order(conn: &Connection, parent: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(
                "SELECT item_id FROM items WHERE parent_id = ?1 AND is_deleted = 0 \
                 ORDER BY stack_rank, item_id",
            )
            .expect("prepare");
        stmt.query_map([parent], |row| row.get(0))
            .expect("query")
            .collect::<rusqlite::Result<_>>()
            .expect("children")
    }

    fn stored(conn: &Connection, id: &str) -> WorkItem {
        query::get_item(conn, id, false)
            .expect("query")
            .expect("item exists")
    }

    #[test]
    fn resolution_table() {
        let a = Rank::parse("m").unwrap();
        let b = Rank::parse("n").unwrap();

        let mid = resolve_rank(Some(&a), Some(&b));
        assert!(a < mid && mid < b);

        let reversed = resolve_rank(Some(&b), Some(&a));
        assert!(a < reversed && reversed < b);

        assert!(resolve_rank(Some(&a), Some(&a)) > a);
        assert!(resolve_rank(Some(&a), None) > a);
        assert!(resolve_rank(None, Some(&a)) < a);
        assert_eq!(resolve_rank(None, None), Rank::initial());
    }

    #[test]
    fn initial_then_append_scenario() {
        let conn = test_db();
        insert_item(&conn, "sb-1", "issue", None, "Z");

        let r0 = reorder(&conn, &request("sb-1")).unwrap().stack_rank;
        assert_eq!(r0, Rank::initial().as_str());

        insert_item(&conn, "sb-2", "issue", None, "Z");
        let r1 = reorder(
            &conn,
            &ReorderRequest {
                prev_rank: Some(r0.clone()),
                ..request("sb-2")
            },
        )
        .unwrap()
        .stack_rank;
        assert!(r1 > r0);
    }

    #[test]
    fn move_to_front_sorts_first_on_next_read() {
        let conn = test_db();
        insert_item(&conn, "sb-e", "epic", None, "V");
        insert_item(&conn, "sb-m", "issue", Some("sb-e"), "m");
        insert_item(&conn, "sb-n", "issue", Some("sb-e"), "n");

        let moved = reorder(
            &conn,
            &ReorderRequest {
                next_rank: Some("m".into()),
                ..request("sb-n")
            },
        )
        .unwrap();
        assert!(moved.stack_rank.as_str() < "m");
        assert_eq!(sibling_order(&conn, "sb-e"), vec!["sb-n", "sb-m"]);
    }

    #[test]
    fn move_to_bottom_sorts_after_prev() {
        let conn = test_db();
        insert_item(&conn, "sb-a", "issue", None, "V");
        insert_item(&conn, "sb-b", "issue", None, "k");

        let moved = reorder(
            &conn,
            &ReorderRequest {
                prev_rank: Some("k".into()),
                ..request("sb-a")
            },
        )
        .unwrap();
        assert!(moved.stack_rank.as_str() > "k");
    }

    #[test]
    fn very_long_neighbour_rank_is_placed_after() {
        let conn = test_db();
        insert_item(&conn, "sb-a", "issue", None, "V");
        let long = "z".repeat(20_000);

        let moved = reorder(
            &conn,
            &ReorderRequest {
                prev_rank: Some(long.clone()),
                ..request("sb-a")
            },
        )
        .unwrap();
        assert!(moved.stack_rank > long);
        assert_eq!(stored(&conn, "sb-a").stack_rank, moved.stack_rank);
    }

    #[test]
    fn equal_neighbours_never_fail() {
        let conn = test_db();
        insert_item(&conn, "sb-a", "issue", None, "V");

        let moved = reorder(
            &conn,
            &ReorderRequest {
                prev_rank: Some("k".into()),
                next_rank: Some("k".into()),
                ..request("sb-a")
            },
        )
        .unwrap();
        assert!(moved.stack_rank.as_str() > "k");
    }

    #[test]
    fn reparent_moves_between_sibling_lists() {
        let conn = test_db();
        insert_item(&conn, "sb-p1", "epic", None, "V");
        insert_item(&conn, "sb-p2", "epic", None, "k");
        insert_item(&conn, "sb-x", "issue", Some("sb-p1"), "V");
        insert_item(&conn, "sb-y", "issue", Some("sb-p2"), "G");
        insert_item(&conn, "sb-z", "issue", Some("sb-p2"), "k");

        let moved = reorder(
            &conn,
            &ReorderRequest {
                prev_rank: Some("G".into()),
                next_rank: Some("k".into()),
                parent_id: Patch::Value("sb-p2".into()),
                ..request("sb-x")
            },
        )
        .unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some("sb-p2"));

        assert!(sibling_order(&conn, "sb-p1").is_empty());
        assert_eq!(sibling_order(&conn, "sb-p2"), vec!["sb-y", "sb-x", "sb-z"]);
    }

    #[test]
    fn absent_parent_is_left_alone_and_null_detaches() {
        let conn = test_db();
        insert_item(&conn, "sb-e", "epic", None, "V");
        insert_item(&conn, "sb-i", "issue", Some("sb-e"), "V");

        reorder(&conn, &request("sb-i")).unwrap();
        assert_eq!(stored(&conn, "sb-i").parent_id.as_deref(), Some("sb-e"));

        let detached = reorder(
            &conn,
            &ReorderRequest {
                parent_id: Patch::Null,
                ..request("sb-i")
            },
        )
        .unwrap();
        assert_eq!(detached.parent_id, None);
        assert_eq!(stored(&conn, "sb-i").parent_id, None);
    }

    #[test]
    fn state_change_moves_between_columns() {
        let conn = test_db();
        insert_item(&conn, "sb-a", "issue", None, "V");

        let moved = reorder(
            &conn,
            &ReorderRequest {
                state: Some(State::Doing),
                ..request("sb-a")
            },
        )
        .unwrap();
        assert_eq!(moved.state, State::Doing);

        let doing = query::list_tree_rows(
            &conn,
            &ItemFilter {
                project: "web".into(),
                repo: "core".into(),
                states: vec![State::Doing],
                ..ItemFilter::default()
            },
        )
        .unwrap();
        assert_eq!(doing.len(), 1);
    }

    #[test]
    fn forbidden_before_anything_else() {
        let conn = test_db();
        insert_item(&conn, "sb-a", "issue", None, "V");

        let err = ReorderCoordinator::new(&conn, SqliteAuthorizer::new(&conn))
            .reorder("mallory", &request("sb-a"))
            .unwrap_err();
        assert!(matches!(err, BoardError::Forbidden { .. }));

        // Missing items are not revealed to non-admins.
        let err = ReorderCoordinator::new(&conn, SqliteAuthorizer::new(&conn))
            .reorder("mallory", &request("sb-missing"))
            .unwrap_err();
        assert!(matches!(err, BoardError::Forbidden { .. }));
        assert_eq!(stored(&conn, "sb-a").stack_rank, "V");
    }

    #[test]
    fn malformed_payload_is_validation() {
        let conn = test_db();
        insert_item(&conn, "sb-a", "issue", None, "V");

        for req in [
            ReorderRequest {
                prev_rank: Some("k!".into()),
                ..request("sb-a")
            },
            ReorderRequest {
                next_rank: Some("V0".into()),
                ..request("sb-a")
            },
            ReorderRequest {
                repo: " ".into(),
                ..request("sb-a")
            },
        ] {
            let err = reorder(&conn, &req).unwrap_err();
            assert!(matches!(err, BoardError::Validation { .. }), "{err}");
        }
    }

    #[test]
    fn missing_or_foreign_item_is_not_found() {
        let conn = test_db();
        insert_item(&conn, "sb-a", "issue", None, "V");

        let err = reorder(&conn, &request("sb-missing")).unwrap_err();
        assert!(matches!(err, BoardError::NotFound { what: "item", .. }));

        let err = reorder(
            &conn,
            &ReorderRequest {
                project: "other".into(),
                ..request("sb-a")
            },
        )
        .unwrap_err();
        assert!(matches!(err, BoardError::NotFound { .. }));
    }

    #[test]
    fn parent_rules() {
        let conn = test_db();
        insert_item(&conn, "sb-e", "epic", None, "V");
        insert_item(&conn, "sb-f", "epic", None, "k");
        insert_item(&conn, "sb-i", "issue", Some("sb-e"), "V");
        insert_item(&conn, "sb-t", "task", Some("sb-i"), "V");

        let parent = |item: &str, parent: &str| {
            reorder(
                &conn,
                &ReorderRequest {
                    parent_id: Patch::Value(parent.into()),
                    ..request(item)
                },
            )
        };

        let err = parent("sb-e", "sb-f").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParentKind);

        let err = parent("sb-i", "sb-t").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParentKind);

        let err = parent("sb-i", "sb-i").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CycleDetected);

        let err = parent("sb-i", "sb-ghost").unwrap_err();
        assert!(matches!(err, BoardError::NotFound { what: "parent", .. }));

        let moved = parent("sb-t", "sb-f").unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some("sb-f"));
    }

    #[test]
    fn empty_parent_id_detaches() {
        let conn = test_db();
        insert_item(&conn, "sb-e", "epic", None, "V");
        insert_item(&conn, "sb-i", "issue", Some("sb-e"), "V");

        let moved = reorder(
            &conn,
            &ReorderRequest {
                parent_id: Patch::Value(String::new()),
                ..request("sb-i")
            },
        )
        .unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[test]
    fn request_json_distinguishes_absent_and_null_parent() {
        let absent: ReorderRequest =
            serde_json::from_str(r#"{"itemId":"sb-1","project":"web","repo":"core"}"#).unwrap();
        assert!(absent.parent_id.is_absent());

        let null: ReorderRequest = serde_json::from_str(
            r#"{"itemId":"sb-1","project":"web","repo":"core","parentId":null,"state":"Doing"}"#,
        )
        .unwrap();
        assert_eq!(null.parent_id, Patch::Null);
        assert_eq!(null.state, Some(State::Doing));

        let json = serde_json::to_value(&absent).unwrap();
        assert!(json.get("parentId").is_none());
    }
}
