use super::CmdContext;
use crate::output::render_mode;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stackboard_core::hierarchy::HierarchyAssembler;

#[derive(Args, Debug)]
pub struct TagsArgs {
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub repo: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TagsReport {
    all_tags: Vec<String>,
}

/// Every distinct tag on live items in the project/repo, unfiltered.
pub fn run_tags(args: &TagsArgs, ctx: &CmdContext<'_>) -> Result<()> {
    let conn = ctx.open_store()?;
    let all_tags = HierarchyAssembler::new(&conn).all_tags(&args.project, &args.repo)?;

    render_mode(
        ctx.output,
        &TagsReport { all_tags },
        |r, w| {
            for tag in &r.all_tags {
                writeln!(w, "{tag}")?;
            }
            Ok(())
        },
        |r, w| {
            if r.all_tags.is_empty() {
                return writeln!(w, "(no tags)");
            }
            writeln!(w, "{}", r.all_tags.join(", "))
        },
    )
}
