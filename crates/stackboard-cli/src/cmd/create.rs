use super::{CmdContext, write_item_pretty, write_item_row};
use crate::output::render_mode;
use anyhow::Result;
use clap::Args;
use stackboard_core::lifecycle::{self, NewItem};
use stackboard_core::model::{Kind, State};

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub repo: String,

    #[arg(long)]
    pub title: String,

    /// Epic, Issue, or Task.
    #[arg(long, visible_alias = "type", default_value = "issue")]
    pub kind: Kind,

    /// Parent item id. Epics cannot have one.
    #[arg(long)]
    pub parent: Option<String>,

    /// Initial state (To Do, Doing, Done).
    #[arg(long, default_value = "todo")]
    pub state: State,

    /// Tag to attach; repeat for several.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    #[arg(long, default_value = "")]
    pub area: String,

    /// User id of the assignee. Unknown users are stored as given.
    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

impl CreateArgs {
    fn to_new_item(&self) -> NewItem {
        let mut new = NewItem::new(&*self.project, &*self.repo, &*self.title, self.kind);
        new.parent_id = self.parent.clone();
        new.state = self.state;
        new.tags.clone_from(&self.tags);
        new.area.clone_from(&self.area);
        new.assigned_to = self.assignee.clone();
        new.description = self.description.clone();
        new
    }
}

pub fn run_create(args: &CreateArgs, ctx: &CmdContext<'_>) -> Result<()> {
    let mut conn = ctx.open_store()?;
    let item = lifecycle::create_item(&mut conn, args.to_new_item())?;

    render_mode(
        ctx.output,
        &item,
        |item, w| write_item_row(w, item),
        |item, w| {
            writeln!(w, "✓ Created {} {}", item.kind.label().to_lowercase(), item.id)?;
            write_item_pretty(w, item)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CreateArgs,
    }

    #[test]
    fn defaults_to_issue_in_todo() {
        let w = Wrapper::parse_from(["test", "--project", "web", "--repo", "core", "--title", "x"]);
        assert_eq!(w.args.kind, Kind::Issue);
        assert_eq!(w.args.state, State::ToDo);
        assert!(w.args.tags.is_empty());
    }

    #[test]
    fn type_alias_and_labels_parse() {
        let w = Wrapper::parse_from([
            "test", "--project", "web", "--repo", "core", "--title", "x", "--type", "Epic",
            "--state", "Doing", "--tag", "ui", "--tag", "bug",
        ]);
        assert_eq!(w.args.kind, Kind::Epic);
        assert_eq!(w.args.state, State::Doing);
        assert_eq!(w.args.tags, vec!["ui", "bug"]);
        let new = w.args.to_new_item();
        assert_eq!(new.kind, Kind::Epic);
        assert_eq!(new.tags, vec!["ui", "bug"]);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result = Wrapper::try_parse_from([
            "test", "--project", "web", "--repo", "core", "--title", "x", "--kind", "story",
        ]);
        assert!(result.is_err());
    }
}
