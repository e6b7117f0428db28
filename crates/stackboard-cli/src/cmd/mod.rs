pub mod config;
pub mod create;
pub mod delete;
pub mod init;
pub mod reorder;
pub mod tags;
pub mod tree;
pub mod user;

use crate::output::{CliError, OutputMode, pretty_kv};
use anyhow::{Context as _, Result};
use rusqlite::Connection;
use stackboard_core::config::{self as core_config, ProjectConfig};
use stackboard_core::db;
use stackboard_core::error::ErrorCode;
use stackboard_core::model::WorkItem;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Everything a command handler needs besides its own arguments.
pub struct CmdContext<'a> {
    pub project_root: &'a Path,
    pub db_override: Option<&'a Path>,
    pub user_flag: Option<&'a str>,
    pub output: OutputMode,
    pub config: &'a ProjectConfig,
}

impl CmdContext<'_> {
    /// Database file: `--db` when given, else `.stackboard/stackboard.db`.
    pub fn db_path(&self) -> PathBuf {
        self.db_override
            .map_or_else(|| core_config::db_path(self.project_root), Path::to_path_buf)
    }

    /// Open the store of an initialized board.
    pub fn open_store(&self) -> Result<Connection> {
        let path = self.db_path();
        db::try_open_store(&path)?.ok_or_else(|| {
            CliError::coded(
                ErrorCode::NotInitialized,
                format!("no board database at {}", path.display()),
            )
            .into()
        })
    }
}

/// Read a JSON document from a file path, or from stdin when `source` is `-`.
pub fn read_json_source(source: &Path) -> Result<String> {
    if source.as_os_str() == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("read JSON from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(source).with_context(|| format!("read {}", source.display()))
}

/// Parse a JSON payload, reporting failures as malformed-payload errors.
pub fn parse_payload<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|err| {
        CliError::coded(ErrorCode::InvalidPayload, format!("invalid JSON payload: {err}")).into()
    })
}

/// One tab-separated row per item: id, type, state, rank, parent, title.
pub fn write_item_row(w: &mut dyn Write, item: &WorkItem) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}",
        item.id,
        item.kind.as_str(),
        item.state.as_str(),
        item.stack_rank,
        item.parent_id.as_deref().unwrap_or("-"),
        item.title
    )
}

pub fn write_item_pretty(w: &mut dyn Write, item: &WorkItem) -> io::Result<()> {
    pretty_kv(w, "id", &item.id)?;
    pretty_kv(w, "title", &item.title)?;
    pretty_kv(w, "type", item.kind.label())?;
    pretty_kv(w, "state", item.state.label())?;
    pretty_kv(w, "rank", &item.stack_rank)?;
    pretty_kv(w, "parent", item.parent_id.as_deref().unwrap_or("(none)"))?;
    if !item.tags.is_empty() {
        pretty_kv(w, "tags", item.tags.join(", "))?;
    }
    if let Some(ref assignee) = item.assigned_to {
        pretty_kv(w, "assignee", assignee)?;
    }
    Ok(())
}
