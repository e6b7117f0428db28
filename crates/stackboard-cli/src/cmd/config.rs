use super::CmdContext;
use crate::output::{pretty_kv, pretty_section, render_mode};
use anyhow::Result;
use stackboard_core::config::{self, EffectiveConfig};
use std::io::{self, Write};

/// Print the configuration commands actually run with: file values merged
/// over defaults, plus the resolved output mode.
pub fn run_config(effective: &EffectiveConfig, ctx: &CmdContext<'_>) -> Result<()> {
    let rendered = toml::to_string_pretty(&effective.project)?;
    let source = config::config_path(ctx.project_root);
    let from_file = source.exists();

    render_mode(
        ctx.output,
        effective,
        |_, w| w.write_all(rendered.as_bytes()),
        |e, w| {
            pretty_section(w, "Effective config")?;
            pretty_kv(
                w,
                "source",
                if from_file {
                    source.display().to_string()
                } else {
                    "(defaults)".to_string()
                },
            )?;
            pretty_kv(w, "output", &e.resolved_output)?;
            writeln!(w)?;
            write_indented(w, &rendered)
        },
    )
}

fn write_indented(w: &mut dyn Write, text: &str) -> io::Result<()> {
    for line in text.lines() {
        if line.is_empty() {
            writeln!(w)?;
        } else {
            writeln!(w, "  {line}")?;
        }
    }
    Ok(())
}
