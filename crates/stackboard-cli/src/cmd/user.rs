//! `sb user add` and `sb admin grant`: the identities reorders are checked against.

use super::CmdContext;
use crate::output::render;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stackboard_core::db::{query, write};
use stackboard_core::error::{BoardError, ErrorCode};

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Stable user id (what `--user` and `STACKBOARD_USER` name).
    pub user_id: String,

    /// Display name returned alongside assigned items.
    #[arg(long)]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct AdminGrantArgs {
    /// User to promote.
    pub user_id: String,

    /// Repository the privilege applies to.
    #[arg(long)]
    pub repo: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserReport<'a> {
    ok: bool,
    user_id: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GrantReport<'a> {
    ok: bool,
    user_id: &'a str,
    repo: &'a str,
    already_admin: bool,
    known_user: bool,
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

pub fn run_user_add(args: &UserAddArgs, ctx: &CmdContext<'_>) -> Result<()> {
    require_non_empty("userId", &args.user_id)?;
    require_non_empty("name", &args.name)?;

    let conn = ctx.open_store()?;
    write::upsert_user(&conn, args.user_id.trim(), args.name.trim())?;
    tracing::info!(user_id = %args.user_id, "user saved");

    let report = UserReport {
        ok: true,
        user_id: args.user_id.trim(),
        name: args.name.trim(),
    };
    render(ctx.output, &report, |r, w| {
        writeln!(w, "✓ Saved user {} ({})", r.user_id, r.name)
    })
}

pub fn run_admin_grant(args: &AdminGrantArgs, ctx: &CmdContext<'_>) -> Result<()> {
    require_non_empty("userId", &args.user_id)?;
    require_non_empty("repo", &args.repo)?;

    let conn = ctx.open_store()?;
    let known_user = query::get_user(&conn, args.user_id.trim())?.is_some();
    if !known_user {
        tracing::warn!(user_id = %args.user_id, "granting admin to an unregistered user");
    }
    let granted = write::grant_repo_admin(&conn, args.repo.trim(), args.user_id.trim())?;
    tracing::info!(user_id = %args.user_id, repo = %args.repo, granted, "admin grant");

    let report = GrantReport {
        ok: true,
        user_id: args.user_id.trim(),
        repo: args.repo.trim(),
        already_admin: !granted,
        known_user,
    };
    render(ctx.output, &report, |r, w| {
        if r.already_admin {
            writeln!(w, "{} already administers {}", r.user_id, r.repo)?;
        } else {
            writeln!(w, "✓ {} now administers {}", r.user_id, r.repo)?;
        }
        if !r.known_user {
            writeln!(w, "note: {} has no user record; add one with `sb user add`", r.user_id)?;
        }
        Ok(())
    })
}
