use crate::tools::{Whitelist, format_size, resolve_path};
use crate::traits::{ParamType, Parameter, Tool, ToolArgs, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

pub struct ScanDirectoryTool {
    whitelist: Arc<Whitelist>,
    limit: usize,
}

impl ScanDirectoryTool {
    pub fn new(whitelist: Arc<Whitelist>, limit: usize) -> Self {
        Self {
            whitelist,
            limit: limit.max(1),
        }
    }
}

#[derive(Debug, Default)]
struct Listing {
    /// Path, directory flag and file size of each listed entry.
    entries: Vec<(String, bool, Option<u64>)>,
    total: usize,
    skipped: usize,
    unreadable: usize,
}

fn walk(root: &Path, whitelist: &Whitelist, max_depth: usize, limit: usize) -> Listing {
    let mut listing = Listing::default();
    let mut skipped = 0usize;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if whitelist.is_protected(entry.path()) {
                skipped += 1;
                false
            } else {
                true
            }
        });

    for entry in walker {
        let Ok(entry) = entry else {
            listing.unreadable += 1;
            continue;
        };
        listing.total += 1;
        if listing.entries.len() >= limit {
            continue;
        }

        let is_dir = entry.file_type().is_dir();
        let size = if is_dir {
            None
        } else {
            entry.metadata().ok().map(|m| m.len())
        };
        listing
            .entries
            .push((entry.path().display().to_string(), is_dir, size));
    }

    listing.skipped = skipped;
    listing
}

#[async_trait]
impl ToolHandler for ScanDirectoryTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let root = resolve_path(args.str("path")?);
        let max_depth = args.i64_or("max_depth", 1).clamp(1, 32) as usize;
        let limit = args.i64_or("limit", self.limit as i64).max(1) as usize;

        anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());

        let whitelist = self.whitelist.clone();
        let walk_root = root.clone();
        let listing =
            tokio::task::spawn_blocking(move || walk(&walk_root, &whitelist, max_depth, limit))
                .await?;

        let mut out = format!(
            "{} entries under {} (max depth {})",
            listing.total,
            root.display(),
            max_depth
        );
        for (path, is_dir, size) in &listing.entries {
            match (is_dir, size) {
                (true, _) => {
                    let _ = write!(out, "\n[dir]  {path}");
                }
                (false, Some(size)) => {
                    let _ = write!(out, "\n[file] {path} ({})", format_size(*size));
                }
                (false, None) => {
                    let _ = write!(out, "\n[file] {path}");
                }
            }
        }
        if listing.total > listing.entries.len() {
            let _ = write!(out, "\n... {} more not shown", listing.total - listing.entries.len());
        }
        if listing.skipped > 0 {
            let _ = write!(out, "\n{} whitelisted entries skipped", listing.skipped);
        }
        if listing.unreadable > 0 {
            let _ = write!(out, "\n{} entries could not be read", listing.unreadable);
        }
        Ok(out)
    }
}

impl Tool for ScanDirectoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "scan_directory",
            "List files and folders under a directory with their sizes. Whitelisted paths are skipped",
        )
        .param(Parameter::required("path", ParamType::String, "Directory to scan"))
        .param(
            Parameter::optional("max_depth", ParamType::Int, "How many levels to descend")
                .with_default(1),
        )
        .param(
            Parameter::optional("limit", ParamType::Int, "Maximum number of entries to list")
                .with_default(self.limit),
        )
    }
}
