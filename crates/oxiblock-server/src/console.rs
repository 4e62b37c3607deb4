//! Admin console commands.

use std::path::Path;

use oxiblock_config::reload_blocks;
use oxiblock_core::BlockManager;

/// What the console loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleAction {
    Continue(String),
    Stop,
}

/// Run one console line against the manager.
pub fn handle_command(manager: &mut BlockManager, blocks_dir: &Path, line: &str) -> ConsoleAction {
    let mut parts = line.split_whitespace();
    let reply = match parts.next() {
        Some("stop") => return ConsoleAction::Stop,
        Some("stats") => {
            let stats = manager.stats();
            format!(
                "{} blocks, {} states, {} published, {} dropped, table length {}",
                stats.blocks, stats.states, stats.published, stats.dropped, stats.table_len
            )
        }
        Some("blocks") => {
            let names = manager.registry().block_names();
            if names.is_empty() {
                "No blocks registered".to_string()
            } else {
                names.join(", ")
            }
        }
        Some("state") => match parts.next().map(str::parse::<i64>) {
            Some(Ok(id)) => match manager.get_state_by_id(id) {
                Ok(entry) => format!(
                    "{} -> {} (visual {}, material {})",
                    id,
                    entry.state(),
                    entry.visual_id(),
                    entry.settings().visual_material
                ),
                Err(e) => format!("Error: {e}"),
            },
            _ => "Usage: state <internal id>".to_string(),
        },
        Some("reload") => match reload_blocks(manager, blocks_dir) {
            Ok(report) => format!(
                "Reloaded {} blocks ({} skipped)",
                report.registered, report.skipped
            ),
            Err(e) => format!("Reload failed: {e}"),
        },
        Some(other) => format!("Unknown command: {other}"),
        None => String::new(),
    };
    ConsoleAction::Continue(reply)
}
