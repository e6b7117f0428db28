//! `sb board` and `sb backlog`: read the assembled work-item trees.

use super::{CmdContext, parse_payload, read_json_source};
use crate::actor;
use crate::output::{pretty_rule, pretty_section, render_mode};
use anyhow::Result;
use clap::{Args, ValueEnum};
use stackboard_core::hierarchy::{HierarchyAssembler, TreeNode, TreeQuery, TreeResponse};
use stackboard_core::model::{Kind, State, TagOperator};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TagMatch {
    /// Items carrying any of the tags.
    #[default]
    Or,
    /// Items carrying every tag.
    And,
}

impl From<TagMatch> for TagOperator {
    fn from(value: TagMatch) -> Self {
        match value {
            TagMatch::Or => Self::Or,
            TagMatch::And => Self::And,
        }
    }
}

/// Filters shared by both views. Repeated list flags are OR-ed within a field.
#[derive(Args, Debug, Clone)]
pub struct TreeFilterArgs {
    #[arg(long, required_unless_present = "query")]
    pub project: Option<String>,

    #[arg(long, required_unless_present = "query")]
    pub repo: Option<String>,

    /// Top-level type. Defaults come from `.stackboard/config.toml`.
    #[arg(long = "type", visible_alias = "kind")]
    pub kind: Option<Kind>,

    /// Top-level state; repeat for several.
    #[arg(long = "state")]
    pub states: Vec<State>,

    #[arg(long = "area")]
    pub areas: Vec<String>,

    #[arg(long = "tag")]
    pub tags: Vec<String>,

    #[arg(long, value_enum, default_value_t = TagMatch::Or)]
    pub tag_operator: TagMatch,

    /// Case-insensitive substring over title and description.
    #[arg(long)]
    pub search: Option<String>,

    /// Assignee user id, or "@me"; repeat for several.
    #[arg(long = "assignee")]
    pub assignees: Vec<String>,

    /// Read the whole JSON query from a file, or stdin with "-".
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["project", "repo", "kind", "states", "areas", "tags", "search", "assignees"]
    )]
    pub query: Option<PathBuf>,
}

impl TreeFilterArgs {
    fn to_query(&self, default_kind: Kind) -> Result<TreeQuery> {
        let mut query = match self.query {
            Some(ref source) => parse_payload::<TreeQuery>(&read_json_source(source)?)?,
            None => TreeQuery {
                project: self.project.clone().unwrap_or_default(),
                repo: self.repo.clone().unwrap_or_default(),
                kind: self.kind,
                state: (!self.states.is_empty()).then(|| self.states.clone()),
                area: self.areas.clone(),
                tags: self.tags.clone(),
                tag_operator: self.tag_operator.into(),
                search: self.search.clone(),
                assigned_users: self.assignees.clone(),
                ..TreeQuery::default()
            },
        };
        query.kind = Some(query.kind.unwrap_or(default_kind));
        Ok(query)
    }
}

#[derive(Args, Debug)]
pub struct BoardArgs {
    #[command(flatten)]
    pub filter: TreeFilterArgs,
}

#[derive(Args, Debug)]
pub struct BacklogArgs {
    #[command(flatten)]
    pub filter: TreeFilterArgs,

    /// Show Doing items at the top level alongside To Do.
    #[arg(long)]
    pub include_in_progress: bool,

    /// Show Done items below the top level.
    #[arg(long)]
    pub show_completed: bool,
}

pub fn run_board(args: &BoardArgs, ctx: &CmdContext<'_>) -> Result<()> {
    let query = args.filter.to_query(ctx.config.board.default_kind)?;
    let viewer = actor::resolve_actor(ctx.user_flag);

    let conn = ctx.open_store()?;
    let response = HierarchyAssembler::new(&conn).board(viewer.as_deref(), &query)?;
    render_tree(ctx, "Board", &query, &response)
}

pub fn run_backlog(args: &BacklogArgs, ctx: &CmdContext<'_>) -> Result<()> {
    let defaults = &ctx.config.backlog;
    let mut query = args.filter.to_query(defaults.default_kind)?;
    query.include_in_progress |= args.include_in_progress || defaults.include_in_progress;
    query.show_completed_child_items |= args.show_completed || defaults.show_completed_children;
    let viewer = actor::resolve_actor(ctx.user_flag);

    let conn = ctx.open_store()?;
    let response = HierarchyAssembler::new(&conn).backlog(viewer.as_deref(), &query)?;
    render_tree(ctx, "Backlog", &query, &response)
}

fn render_tree(
    ctx: &CmdContext<'_>,
    view: &str,
    query: &TreeQuery,
    response: &TreeResponse,
) -> Result<()> {
    render_mode(
        ctx.output,
        response,
        |r, w| {
            for node in &r.work_items {
                write_rows(w, node, None, 0)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &format!("{view}: {}/{}", query.project, query.repo))?;
            if r.work_items.is_empty() {
                writeln!(w, "(no items)")?;
            }
            for node in &r.work_items {
                write_pretty(w, node, 0)?;
            }
            pretty_rule(w)?;
            writeln!(w, "tags: {}", r.all_tags.join(", "))
        },
    )
}

/// Depth-first tab-separated rows: depth, id, parent, type, state, rank, assignee, title.
fn write_rows(
    w: &mut dyn Write,
    node: &TreeNode,
    parent: Option<&str>,
    depth: usize,
) -> io::Result<()> {
    writeln!(
        w,
        "{depth}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        node.id,
        parent.unwrap_or("-"),
        node.kind.as_str(),
        node.state.as_str(),
        node.stack_rank,
        node.assigned_user.as_ref().map_or("-", |u| u.user_id.as_str()),
        node.title
    )?;
    for child in &node.children {
        write_rows(w, child, Some(node.id.as_str()), depth + 1)?;
    }
    Ok(())
}

fn write_pretty(w: &mut dyn Write, node: &TreeNode, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    write!(
        w,
        "{indent}{:<12} {:<6} {:<6} {}",
        node.id,
        node.kind.label(),
        node.state.label(),
        node.title
    )?;
    if let Some(ref user) = node.assigned_user {
        write!(w, "  @{}", user.name)?;
    }
    writeln!(w, "  [{}]", node.stack_rank)?;
    for child in &node.children {
        write_pretty(w, child, depth + 1)?;
    }
    Ok(())
}
