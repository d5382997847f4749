use crate::tools::{Whitelist, format_size, resolve_path};
use crate::tools::disk_usage::measure;
use crate::traits::{ParamType, Parameter, Tool, ToolArgs, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Removes files and directories, refusing anything the whitelist protects,
/// filesystem roots and the home directory.
pub struct DeletePathTool {
    whitelist: Arc<Whitelist>,
}

impl DeletePathTool {
    pub fn new(whitelist: Arc<Whitelist>) -> Self {
        Self { whitelist }
    }

    /// Refuses relative paths and `..` components, then applies the root,
    /// home and whitelist guards to the path as given and to the path with
    /// its parent resolved through symlinks.
    fn check(&self, path: &Path) -> anyhow::Result<()> {
        anyhow::ensure!(path.is_absolute(), "path must be absolute, got {}", path.display());
        anyhow::ensure!(
            !path.components().any(|c| c == Component::ParentDir),
            "refusing path with '..' components: {}",
            path.display()
        );

        self.guard(path)?;
        let resolved = resolve_parent(path);
        if resolved != path {
            self.guard(&resolved)?;
        }
        Ok(())
    }

    fn guard(&self, path: &Path) -> anyhow::Result<()> {
        anyhow::ensure!(
            path.parent().is_some() && path.components().count() > 1,
            "refusing to delete filesystem root {}",
            path.display()
        );
        if let Some(home) = dirs::home_dir() {
            let canonical_home = home.canonicalize().unwrap_or_else(|_| home.clone());
            anyhow::ensure!(
                path != home && path != canonical_home,
                "refusing to delete the home directory"
            );
        }
        if let Some(pattern) = self.whitelist.matching_pattern(path) {
            anyhow::bail!(
                "{} is protected by whitelist pattern '{}'",
                path.display(),
                pattern
            );
        }
        Ok(())
    }
}

fn resolve_parent(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

#[async_trait]
impl ToolHandler for DeletePathTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let path = resolve_path(args.str("path")?);
        let recursive = args.bool_or("recursive", false);

        self.check(&path)?;

        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(|e| anyhow::anyhow!("cannot delete {}: {}", path.display(), e))?;

        if metadata.is_dir() {
            let walk_root = path.clone();
            let freed = tokio::task::spawn_blocking(move || measure(&walk_root).bytes).await?;
            if recursive {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_dir(&path).await.map_err(|e| {
                    anyhow::anyhow!(
                        "cannot delete directory {} without recursive=true: {}",
                        path.display(),
                        e
                    )
                })?;
            }
            info!(path = %path.display(), freed, "deleted directory");
            Ok(format!("Deleted directory {} ({} freed)", path.display(), format_size(freed)))
        } else {
            tokio::fs::remove_file(&path).await.inspect_err(|e| {
                warn!(path = %path.display(), error = %e, "delete failed");
            })?;
            info!(path = %path.display(), freed = metadata.len(), "deleted file");
            Ok(format!(
                "Deleted {} ({} freed)",
                path.display(),
                format_size(metadata.len())
            ))
        }
    }
}

impl Tool for DeletePathTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "delete_path",
            "Delete a file or directory. Only call this after the user has confirmed. Whitelisted paths are refused",
        )
        .param(Parameter::required("path", ParamType::String, "Absolute path to delete"))
        .param(
            Parameter::optional(
                "recursive",
                ParamType::Bool,
                "Required to delete a non-empty directory",
            )
            .with_default(false),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ParamValue;
    use tempfile::TempDir;

    fn args(path: &Path, recursive: bool) -> ToolArgs {
        ToolArgs::new(vec![
            ("path".into(), Some(ParamValue::String(path.display().to_string()))),
            ("recursive".into(), Some(ParamValue::Bool(recursive))),
        ])
    }

    fn tool(patterns: &[String]) -> DeletePathTool {
        DeletePathTool::new(Arc::new(Whitelist::new(patterns.iter().cloned())))
    }

    #[tokio::test]
    async fn deletes_a_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("old.tmp");
        std::fs::write(&file, "abc").unwrap();

        let out = tool(&[]).call(args(&file, false)).await.unwrap();
        assert!(out.contains("(3 B freed)"));
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn non_empty_directory_needs_recursive() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cache");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("x"), "12").unwrap();

        let err = tool(&[]).call(args(&dir, false)).await.unwrap_err();
        assert!(err.to_string().contains("recursive=true"));
        assert!(dir.exists());

        let out = tool(&[]).call(args(&dir, true)).await.unwrap();
        assert!(out.starts_with("Deleted directory"));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn whitelisted_paths_are_refused() {
        let tmp = TempDir::new().unwrap();
        let keep = tmp.path().join("keep");
        std::fs::create_dir(&keep).unwrap();
        let file = keep.join("important.txt");
        std::fs::write(&file, "x").unwrap();

        let err = tool(&[keep.display().to_string()])
            .call(args(&file, false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("protected by whitelist"));
        assert!(file.exists());
    }

    #[tokio::test]
    async fn roots_and_relative_paths_are_refused() {
        let err = tool(&[]).call(args(Path::new("/"), true)).await.unwrap_err();
        assert!(err.to_string().contains("root"));

        let err = tool(&[]).call(args(Path::new("relative/file"), false)).await.unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn parent_components_are_refused() {
        let err = tool(&[]).check(Path::new("/usr/..")).unwrap_err();
        assert!(err.to_string().contains("'..'"));

        let err = tool(&["/etc".to_string()])
            .check(Path::new("/tmp/../etc"))
            .unwrap_err();
        assert!(err.to_string().contains("'..'"));
    }

    #[tokio::test]
    async fn parent_components_cannot_reach_a_whitelisted_directory() {
        let tmp = TempDir::new().unwrap();
        let keep = tmp.path().join("keep");
        std::fs::create_dir_all(&keep).unwrap();
        std::fs::create_dir_all(tmp.path().join("other")).unwrap();
        std::fs::write(keep.join("x"), "1").unwrap();

        let sneaky = tmp.path().join("other/../keep");
        let err = tool(&[keep.display().to_string()])
            .call(args(&sneaky, true))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'..'"));
        assert!(keep.join("x").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_parents_are_resolved_before_the_whitelist_check() {
        let tmp = TempDir::new().unwrap();
        let keep = tmp.path().join("keep");
        std::fs::create_dir_all(&keep).unwrap();
        std::fs::write(keep.join("photo.jpg"), "1").unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&keep, &link).unwrap();

        let protected = keep.canonicalize().unwrap().display().to_string();
        let err = tool(&[protected])
            .call(args(&link.join("photo.jpg"), false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("protected by whitelist"));
        assert!(keep.join("photo.jpg").exists());
    }

    #[tokio::test]
    async fn missing_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = tool(&[]).call(args(&tmp.path().join("gone"), false)).await.unwrap_err();
        assert!(err.to_string().contains("cannot delete"));
    }
}
