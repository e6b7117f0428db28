//! Repository-administrator checks.
//!
//! The reorder path only needs one question answered: may this user
//! administer this repository? [`Authorizer`] is that seam; policy beyond it
//! lives elsewhere.

use crate::error::BoardError;
use anyhow::Context;
use rusqlite::{Connection, params};

/// Authorization seam consulted before any mutation.
pub trait Authorizer {
    /// Succeeds when `user_id` administers `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Forbidden`] when the privilege is missing, or
    /// [`BoardError::Database`] when the lookup itself fails.
    fn require_repo_admin(&self, user_id: &str, repo: &str) -> Result<(), BoardError>;
}

/// [`Authorizer`] backed by the `repo_admins` table.
#[derive(Debug, Clone, Copy)]
pub struct SqliteAuthorizer<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteAuthorizer<'c> {
    #[must_use]
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl Authorizer for SqliteAuthorizer<'_> {
    fn require_repo_admin(&self, user_id: &str, repo: &str) -> Result<(), BoardError> {
        let is_admin: bool = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM repo_admins WHERE repo = ?1 AND user_id = ?2)",
                params![repo, user_id],
                |row| row.get(0),
            )
            .context("check repo admin")?;

        if is_admin {
            Ok(())
        } else {
            tracing::debug!(user_id, repo, "repo admin check denied");
            Err(BoardError::Forbidden {
                user: user_id.to_string(),
                repo: repo.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Authorizer, SqliteAuthorizer};
    use crate::db::{open_in_memory, write};
    use crate::error::{BoardError, ErrorCode};

    #[test]
    fn admin_rows_grant_access_per_repo() {
        let conn = open_in_memory().expect("db");
        write::grant_repo_admin(&conn, "core", "ada").expect("grant");

        let authz = SqliteAuthorizer::new(&conn);
        assert!(authz.require_repo_admin("ada", "core").is_ok());

        let err = authz
            .require_repo_admin("ada", "docs")
            .expect_err("other repo denied");
        assert!(matches!(err, BoardError::Forbidden { .. }));
        assert_eq!(err.code(), ErrorCode::Forbidden);

        assert!(authz.require_repo_admin("bob", "core").is_err());
    }
}
