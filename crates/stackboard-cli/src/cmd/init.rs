use super::CmdContext;
use crate::output::render_mode;
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use stackboard_core::config;
use stackboard_core::db;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the default config even if `.stackboard/` already exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitReport {
    ok: bool,
    store: String,
    database: String,
    config: String,
    config_written: bool,
}

/// Execute `sb init`. Creates the board skeleton:
///
/// ```text
/// .stackboard/
///   stackboard.db   (schema migrated to the latest version)
///   config.toml     (every default spelled out)
/// ```
///
/// Re-running is harmless: the database is migrated in place and the config
/// is left alone unless `--force` is set.
///
/// # Errors
///
/// Returns an error if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, ctx: &CmdContext<'_>) -> Result<()> {
    let store_dir = config::store_dir(ctx.project_root);
    std::fs::create_dir_all(&store_dir)
        .with_context(|| format!("Failed to create {}", store_dir.display()))?;

    let db_path = ctx.db_path();
    db::open_store(&db_path)?;

    let config_path = config::config_path(ctx.project_root);
    let config_written = args.force || !config_path.exists();
    if config_written {
        std::fs::write(&config_path, config::default_config_toml()?)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    }

    tracing::info!(db = %db_path.display(), config_written, "board initialized");

    let report = InitReport {
        ok: true,
        store: store_dir.display().to_string(),
        database: db_path.display().to_string(),
        config: config_path.display().to_string(),
        config_written,
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| writeln!(w, "{}\t{}", r.database, r.config),
        |r, w| {
            writeln!(w, "✓ Initialized {}", r.store)?;
            writeln!(w)?;
            writeln!(w, "  Database: {}", r.database)?;
            writeln!(w, "  Config:   {}", r.config)?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  sb user add alice --name \"Alice\"")?;
            writeln!(w, "  sb admin grant alice --repo <repo>")?;
            writeln!(w, "  sb create --project <p> --repo <r> --kind epic --title \"First epic\"")
        },
    )
}
