use crate::tools::{format_size, resolve_path};
use crate::traits::{ParamType, Parameter, Tool, ToolArgs, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub bytes: u64,
    pub files: u64,
    pub dirs: u64,
}

/// Totals everything below `root` without following symlinks.
pub fn measure(root: &Path) -> Usage {
    let mut usage = Usage::default();
    for entry in WalkDir::new(root).min_depth(1).into_iter().flatten() {
        if entry.file_type().is_dir() {
            usage.dirs += 1;
        } else {
            usage.files += 1;
            usage.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    usage
}

pub struct DiskUsageTool;

#[async_trait]
impl ToolHandler for DiskUsageTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let root = resolve_path(args.str("path").unwrap_or("."));
        anyhow::ensure!(root.exists(), "{} does not exist", root.display());

        if root.is_file() {
            let len = std::fs::metadata(&root)?.len();
            return Ok(format!("{} uses {}", root.display(), format_size(len)));
        }

        let walk_root = root.clone();
        let usage = tokio::task::spawn_blocking(move || measure(&walk_root)).await?;
        Ok(format!(
            "{} uses {} in {} file(s) and {} folder(s)",
            root.display(),
            format_size(usage.bytes),
            usage.files,
            usage.dirs
        ))
    }
}

impl Tool for DiskUsageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "disk_usage",
            "Total size, file count and folder count of a directory",
        )
        .param(
            Parameter::optional("path", ParamType::String, "Directory to measure")
                .with_default("."),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ParamValue;
    use tempfile::TempDir;

    #[test]
    fn counts_files_and_dirs() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        std::fs::write(tmp.path().join("a/one"), vec![0u8; 100]).unwrap();
        std::fs::write(tmp.path().join("a/b/two"), vec![0u8; 24]).unwrap();

        assert_eq!(
            measure(tmp.path()),
            Usage {
                bytes: 124,
                files: 2,
                dirs: 2
            }
        );
    }

    #[tokio::test]
    async fn reports_directory_totals() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("big"), vec![0u8; 2048]).unwrap();

        let args = ToolArgs::new(vec![(
            "path".into(),
            Some(ParamValue::String(tmp.path().display().to_string())),
        )]);
        let out = DiskUsageTool.call(args).await.unwrap();
        assert!(out.ends_with("uses 2.0 KB in 1 file(s) and 0 folder(s)"));
    }

    #[tokio::test]
    async fn missing_path_is_an_error() {
        let args = ToolArgs::new(vec![(
            "path".into(),
            Some(ParamValue::String("/definitely/not/here".into())),
        )]);
        assert!(DiskUsageTool.call(args).await.is_err());
    }
}
