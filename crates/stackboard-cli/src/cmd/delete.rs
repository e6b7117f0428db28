//! `sb delete`: soft-delete an item and detach its children.

use super::CmdContext;
use crate::output::render_mode;
use anyhow::Result;
use clap::Args;
use stackboard_core::lifecycle;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Item to delete.
    pub item: String,

    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub repo: String,
}

pub fn run_delete(args: &DeleteArgs, ctx: &CmdContext<'_>) -> Result<()> {
    let mut conn = ctx.open_store()?;
    let outcome = lifecycle::soft_delete_item(&mut conn, &args.project, &args.repo, &args.item)?;

    render_mode(
        ctx.output,
        &outcome,
        |o, w| {
            writeln!(w, "{}", o.item_id)?;
            for child in &o.detached_children {
                writeln!(w, "{child}")?;
            }
            Ok(())
        },
        |o, w| {
            writeln!(w, "✓ Deleted {}", o.item_id)?;
            if !o.detached_children.is_empty() {
                writeln!(
                    w,
                    "  {} child item(s) are now top-level: {}",
                    o.detached_children.len(),
                    o.detached_children.join(", ")
                )?;
            }
            Ok(())
        },
    )
}
