//! `sb reorder`: move an item among its siblings, optionally reparenting it.

use super::{CmdContext, parse_payload, read_json_source, write_item_pretty, write_item_row};
use crate::actor;
use crate::output::render_mode;
use anyhow::Result;
use clap::Args;
use stackboard_core::authz::SqliteAuthorizer;
use stackboard_core::model::{Patch, State};
use stackboard_core::reorder::{ReorderCoordinator, ReorderRequest};
use std::path::PathBuf;

/// Literal `--parent` value that detaches an item.
const NO_PARENT: &str = "none";

#[derive(Args, Debug)]
pub struct ReorderArgs {
    /// Item to move.
    #[arg(required_unless_present = "request")]
    pub item: Option<String>,

    #[arg(long, required_unless_present = "request")]
    pub project: Option<String>,

    #[arg(long, required_unless_present = "request")]
    pub repo: Option<String>,

    /// Rank of the sibling that will sit directly above the item.
    #[arg(long)]
    pub prev: Option<String>,

    /// Rank of the sibling that will sit directly below the item.
    #[arg(long)]
    pub next: Option<String>,

    /// New parent id, or "none" to make the item top-level. Omit to keep it.
    #[arg(long)]
    pub parent: Option<String>,

    #[arg(long)]
    pub state: Option<State>,

    /// Read the whole JSON request from a file, or stdin with "-".
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["item", "project", "repo", "prev", "next", "parent", "state"]
    )]
    pub request: Option<PathBuf>,
}

impl ReorderArgs {
    fn to_request(&self) -> Result<ReorderRequest> {
        if let Some(ref source) = self.request {
            return parse_payload(&read_json_source(source)?);
        }

        let parent_id = match self.parent.as_deref() {
            None => Patch::Absent,
            Some(p) if p.eq_ignore_ascii_case(NO_PARENT) => Patch::Null,
            Some(p) => Patch::Value(p.to_string()),
        };

        Ok(ReorderRequest {
            item_id: self.item.clone().unwrap_or_default(),
            project: self.project.clone().unwrap_or_default(),
            repo: self.repo.clone().unwrap_or_default(),
            prev_rank: self.prev.clone(),
            next_rank: self.next.clone(),
            parent_id,
            state: self.state,
        })
    }
}

pub fn run_reorder(args: &ReorderArgs, ctx: &CmdContext<'_>) -> Result<()> {
    let actor = actor::require_actor(ctx.user_flag)?;
    let request = args.to_request()?;

    let conn = ctx.open_store()?;
    let coordinator = ReorderCoordinator::new(&conn, SqliteAuthorizer::new(&conn));
    let item = coordinator
        .reorder(&actor, &request)
        .inspect_err(|err| {
            let code = err.code();
            tracing::debug!(
                item_id = %request.item_id,
                code = %code,
                summary = code.message(),
                "reorder rejected"
            );
        })?;

    render_mode(
        ctx.output,
        &item,
        |item, w| write_item_row(w, item),
        |item, w| {
            writeln!(w, "✓ Moved {}", item.id)?;
            write_item_pretty(w, item)
        },
    )
}
