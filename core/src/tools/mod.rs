//! Filesystem and communication tools the engine dispatches to.
//!
//! Handlers only touch their own domain (the filesystem, the whitelist, the
//! user-facing notifier) and never the conversation state.

use crate::agent::ToolRegistry;
use crate::config::Config;
use crate::error::ToolError;
use std::path::PathBuf;
use std::sync::Arc;

pub mod classify;
pub mod communication;
pub mod delete;
pub mod disk_usage;
pub mod scan;
pub mod whitelist;

pub use classify::{ClassifyPathTool, FileCategory, classify_name};
pub use communication::{AskUserTool, Notifier, NotifyUserTool};
pub use delete::DeletePathTool;
pub use disk_usage::DiskUsageTool;
pub use scan::ScanDirectoryTool;
pub use whitelist::{CheckWhitelistTool, Whitelist};

/// Registers every built-in tool. `notifier` receives `notify_user` messages.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    config: &Config,
    notifier: Notifier,
) -> Result<(), ToolError> {
    let whitelist = Arc::new(Whitelist::new(config.whitelist.iter().cloned()));

    registry.register_tool(NotifyUserTool::new(notifier))?;
    registry.register_tool(AskUserTool)?;
    registry.register_tool(ScanDirectoryTool::new(whitelist.clone(), config.scan_limit))?;
    registry.register_tool(DiskUsageTool)?;
    registry.register_tool(ClassifyPathTool)?;
    registry.register_tool(CheckWhitelistTool::new(whitelist.clone()))?;
    registry.register_tool(DeletePathTool::new(whitelist))?;
    Ok(())
}

/// Expands a leading `~` to the home directory.
pub fn resolve_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if (raw == "~" || raw.starts_with("~/"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(raw.trim_start_matches('~').trim_start_matches('/'));
    }
    PathBuf::from(raw)
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_path("~/Downloads"), home.join("Downloads"));
            assert_eq!(resolve_path("~"), home);
        }
    }

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(resolve_path(" /tmp/x "), PathBuf::from("/tmp/x"));
        assert_eq!(resolve_path("relative"), PathBuf::from("relative"));
    }

    #[test]
    fn builtin_tools_register_once() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, &Config::default(), Notifier::silent()).unwrap();
        assert_eq!(registry.len(), 7);
        assert_eq!(
            registry.category("ask_user"),
            Some(crate::traits::ToolCategory::ConfirmationRequired)
        );
        assert_eq!(
            register_builtin_tools(&mut registry, &Config::default(), Notifier::silent()),
            Err(ToolError::DuplicateTool("notify_user".into()))
        );
    }
}
