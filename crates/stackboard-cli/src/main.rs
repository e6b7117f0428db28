#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::CmdContext;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use stackboard_core::config;
use stackboard_core::error::ErrorCode;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "sb: ranked work-item board",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for stackboard crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json, STACKBOARD_FORMAT and config).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Acting user (skips STACKBOARD_USER / USER resolution).
    #[arg(long, global = true)]
    user: Option<String>,

    /// Database file to use instead of `.stackboard/stackboard.db`.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Output mode before config is available.
    fn fallback_output_mode(&self) -> OutputMode {
        self.format
            .unwrap_or(if self.json { OutputMode::Json } else { OutputMode::Text })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a board",
        long_about = "Create .stackboard/ with a migrated database and the default config.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    sb init\n\n    # Reset config.toml to defaults\n    sb init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(next_help_heading = "Setup", about = "Manage users")]
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    #[command(next_help_heading = "Setup", about = "Manage repository administrators")]
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },

    #[command(
        next_help_heading = "Setup",
        about = "Show the effective configuration",
        after_help = "EXAMPLES:\n    sb config\n    sb config --json"
    )]
    Config,

    #[command(
        next_help_heading = "Items",
        about = "Create a work item",
        long_about = "Create a work item ranked after its last sibling.",
        after_help = "EXAMPLES:\n    # Top-level epic\n    sb create --project web --repo core --kind epic --title \"Checkout\"\n\n    # Issue under it, tagged\n    sb create --project web --repo core --title \"Pay button\" --parent sb-1a2b3c4d --tag ui"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Items",
        about = "Move an item to a new position or parent",
        long_about = "Give an item a rank strictly between two neighbours, optionally \
                      reparenting it or changing its state. Requires repository admin.",
        after_help = "EXAMPLES:\n    # Put sb-2 between ranks V and k\n    sb reorder sb-2 --project web --repo core --prev V --next k\n\n    # Move to the front and detach from its parent\n    sb reorder sb-2 --project web --repo core --next V --parent none\n\n    # Send a wire request\n    echo '{\"itemId\":\"sb-2\",\"project\":\"web\",\"repo\":\"core\"}' | sb reorder --request -"
    )]
    Reorder(cmd::reorder::ReorderArgs),

    #[command(
        next_help_heading = "Items",
        about = "Soft-delete an item",
        long_about = "Soft-delete an item. Its children stay and become top-level."
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Views",
        about = "Show the board",
        long_about = "Two-level tree: filtered top-level items with all their children.",
        after_help = "EXAMPLES:\n    sb board --project web --repo core\n    sb board --project web --repo core --state doing --assignee @me --json"
    )]
    Board(cmd::tree::BoardArgs),

    #[command(
        next_help_heading = "Views",
        about = "Show the backlog",
        long_about = "Up to three levels. Descendants hide Done items unless --show-completed.",
        after_help = "EXAMPLES:\n    sb backlog --project web --repo core\n    sb backlog --project web --repo core --include-in-progress --show-completed"
    )]
    Backlog(cmd::tree::BacklogArgs),

    #[command(next_help_heading = "Views", about = "List every tag in a project/repo")]
    Tags(cmd::tags::TagsArgs),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Add a user or rename an existing one.
    Add(cmd::user::UserAddArgs),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Make a user administrator of a repository.
    Grant(cmd::user::AdminGrantArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("STACKBOARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "stackboard=debug,info"
        } else {
            "stackboard=info,warn"
        })
    });

    let format = env::var("STACKBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, ctx: &CmdContext<'_>, effective: &config::EffectiveConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, ctx),
        Commands::User {
            command: UserCommand::Add(ref args),
        } => cmd::user::run_user_add(args, ctx),
        Commands::Admin {
            command: AdminCommand::Grant(ref args),
        } => cmd::user::run_admin_grant(args, ctx),
        Commands::Config => cmd::config::run_config(effective, ctx),
        Commands::Create(ref args) => cmd::create::run_create(args, ctx),
        Commands::Reorder(ref args) => cmd::reorder::run_reorder(args, ctx),
        Commands::Delete(ref args) => cmd::delete::run_delete(args, ctx),
        Commands::Board(ref args) => cmd::tree::run_board(args, ctx),
        Commands::Backlog(ref args) => cmd::tree::run_backlog(args, ctx),
        Commands::Tags(ref args) => cmd::tags::run_tags(args, ctx),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;

    let effective = match config::resolve_config(&project_root, cli.json) {
        Ok(effective) => effective,
        Err(err) => {
            let error = CliError::coded(ErrorCode::ConfigParseError, format!("{err:#}"));
            render_error(cli.fallback_output_mode(), &error)?;
            return Ok(ExitCode::FAILURE);
        }
    };
    let output = resolve_output_mode(cli.format, &effective.resolved_output);

    let ctx = CmdContext {
        project_root: &project_root,
        db_override: cli.db.as_deref(),
        user_flag: cli.user.as_deref(),
        output,
        config: &effective.project,
    };

    match run(&cli, &ctx, &effective) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "command failed");
            render_error(output, &CliError::from_anyhow(&err))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let cli = Cli::parse_from(["sb", "--json", "tags", "--project", "p", "--repo", "r"]);
        assert!(cli.json);
        let cli = Cli::parse_from(["sb", "tags", "--project", "p", "--repo", "r", "--json"]);
        assert!(cli.json);
        assert!(cli.fallback_output_mode().is_json());
    }

    #[test]
    fn format_flag_wins_over_json() {
        let cli = Cli::parse_from(["sb", "--json", "--format", "pretty", "config"]);
        assert_eq!(cli.fallback_output_mode(), OutputMode::Pretty);
    }

    #[test]
    fn default_fallback_is_text() {
        let cli = Cli::parse_from(["sb", "config"]);
        assert_eq!(cli.fallback_output_mode(), OutputMode::Text);
    }

    #[test]
    fn user_and_db_flags_are_global() {
        let cli = Cli::parse_from([
            "sb", "reorder", "sb-1", "--project", "p", "--repo", "r", "--user", "alice", "--db",
            "/tmp/x.db",
        ]);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/x.db")));
        assert!(matches!(cli.command, Commands::Reorder(_)));
    }

    #[test]
    fn nested_subcommands_parse() {
        let cli = Cli::parse_from(["sb", "user", "add", "alice", "--name", "Alice"]);
        assert!(matches!(
            cli.command,
            Commands::User {
                command: UserCommand::Add(_)
            }
        ));
        let cli = Cli::parse_from(["sb", "admin", "grant", "alice", "--repo", "core"]);
        assert!(matches!(
            cli.command,
            Commands::Admin {
                command: AdminCommand::Grant(_)
            }
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["sb", "init"],
            vec!["sb", "config"],
            vec!["sb", "user", "add", "u", "--name", "U"],
            vec!["sb", "admin", "grant", "u", "--repo", "r"],
            vec!["sb", "create", "--project", "p", "--repo", "r", "--title", "t"],
            vec!["sb", "reorder", "x", "--project", "p", "--repo", "r"],
            vec!["sb", "reorder", "--request", "-"],
            vec!["sb", "delete", "x", "--project", "p", "--repo", "r"],
            vec!["sb", "board", "--project", "p", "--repo", "r"],
            vec!["sb", "backlog", "--project", "p", "--repo", "r"],
            vec!["sb", "backlog", "--query", "q.json"],
            vec!["sb", "tags", "--project", "p", "--repo", "r"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "Failed to parse: {args:?}: {:?}", result.err());
        }
    }
}
