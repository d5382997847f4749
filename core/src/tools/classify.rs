use crate::tools::{format_size, resolve_path};
use crate::traits::{ParamType, Parameter, Tool, ToolArgs, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Cache,
    Temp,
    Log,
    Archive,
    Media,
    Document,
    Source,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Temp => "temp",
            Self::Log => "log",
            Self::Archive => "archive",
            Self::Media => "media",
            Self::Document => "document",
            Self::Source => "source",
            Self::Other => "other",
        }
    }

    /// Whether files of this kind are usually safe to regenerate or drop.
    pub fn is_disposable(&self) -> bool {
        matches!(self, Self::Cache | Self::Temp | Self::Log)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CACHE_DIRS: &[&str] = &[
    ".cache",
    "cache",
    "caches",
    "__pycache__",
    "node_modules",
    ".gradle",
    ".npm",
    "target",
];
const TEMP_EXTS: &[&str] = &["tmp", "temp", "swp", "bak", "part", "crdownload", "old"];
const LOG_EXTS: &[&str] = &["log", "out", "trace"];
const ARCHIVE_EXTS: &[&str] = &["zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "dmg", "iso"];
const MEDIA_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "mp3", "wav", "flac", "mp4", "mov", "mkv", "avi",
];
const DOCUMENT_EXTS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "txt", "md", "csv", "rtf",
];
const SOURCE_EXTS: &[&str] = &[
    "rs", "py", "js", "ts", "go", "java", "c", "h", "cpp", "rb", "sh", "toml", "json", "yaml", "yml",
];

/// Categorizes a file or directory by its name alone.
pub fn classify_name(name: &str) -> FileCategory {
    let lower = name.to_lowercase();
    if CACHE_DIRS.contains(&lower.as_str()) || lower.ends_with(".cache") {
        return FileCategory::Cache;
    }
    if lower.starts_with('~') || lower.ends_with('~') || lower.starts_with(".~") {
        return FileCategory::Temp;
    }

    let Some((_, ext)) = lower.rsplit_once('.') else {
        return FileCategory::Other;
    };
    if TEMP_EXTS.contains(&ext) {
        FileCategory::Temp
    } else if LOG_EXTS.contains(&ext) || lower.contains(".log.") {
        FileCategory::Log
    } else if ARCHIVE_EXTS.contains(&ext) {
        FileCategory::Archive
    } else if MEDIA_EXTS.contains(&ext) {
        FileCategory::Media
    } else if DOCUMENT_EXTS.contains(&ext) {
        FileCategory::Document
    } else if SOURCE_EXTS.contains(&ext) {
        FileCategory::Source
    } else {
        FileCategory::Other
    }
}

fn classify_path(path: &Path) -> FileCategory {
    // Anything below a cache directory is cache, whatever its own name.
    let in_cache = path
        .ancestors()
        .skip(1)
        .filter_map(|p| p.file_name())
        .any(|name| classify_name(&name.to_string_lossy()) == FileCategory::Cache);
    if in_cache {
        return FileCategory::Cache;
    }
    path.file_name()
        .map(|name| classify_name(&name.to_string_lossy()))
        .unwrap_or(FileCategory::Other)
}

pub struct ClassifyPathTool;

#[async_trait]
impl ToolHandler for ClassifyPathTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let path = resolve_path(args.str("path")?);
        let metadata = std::fs::symlink_metadata(&path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;

        let category = classify_path(&path);
        let kind = if metadata.is_dir() { "directory" } else { "file" };
        let mut out = format!("{} is a {} {}", path.display(), category, kind);

        if !metadata.is_dir() {
            out.push_str(&format!(", {}", format_size(metadata.len())));
        }
        if let Ok(modified) = metadata.modified() {
            let modified: DateTime<Local> = modified.into();
            let days = (Local::now() - modified).num_days().max(0);
            out.push_str(&format!(", last modified {days} day(s) ago"));
        }
        if category.is_disposable() {
            out.push_str(" (usually safe to remove)");
        }
        Ok(out)
    }
}

impl Tool for ClassifyPathTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "classify_path",
            "Report what kind of file a path is (cache, temp, log, archive, media, document, source or other), its size and age",
        )
        .param(Parameter::required("path", ParamType::String, "File or directory to classify"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ParamValue;
    use tempfile::TempDir;

    #[test]
    fn names_map_to_categories() {
        assert_eq!(classify_name("build.log"), FileCategory::Log);
        assert_eq!(classify_name("server.log.1"), FileCategory::Log);
        assert_eq!(classify_name("download.crdownload"), FileCategory::Temp);
        assert_eq!(classify_name("notes.txt~"), FileCategory::Temp);
        assert_eq!(classify_name("__pycache__"), FileCategory::Cache);
        assert_eq!(classify_name("Backup.ZIP"), FileCategory::Archive);
        assert_eq!(classify_name("IMG_0001.HEIC"), FileCategory::Media);
        assert_eq!(classify_name("report.pdf"), FileCategory::Document);
        assert_eq!(classify_name("main.rs"), FileCategory::Source);
        assert_eq!(classify_name("Makefile"), FileCategory::Other);
    }

    #[test]
    fn files_inside_cache_dirs_are_cache() {
        assert_eq!(
            classify_path(Path::new("/home/me/.cache/thumbnails/a.png")),
            FileCategory::Cache
        );
        assert_eq!(classify_path(Path::new("/home/me/a.png")), FileCategory::Media);
    }

    #[tokio::test]
    async fn reports_category_size_and_age() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("debug.log");
        std::fs::write(&file, "hello").unwrap();

        let args = ToolArgs::new(vec![(
            "path".into(),
            Some(ParamValue::String(file.display().to_string())),
        )]);
        let out = ClassifyPathTool.call(args).await.unwrap();
        assert!(out.contains("is a log file, 5 B"));
        assert!(out.contains("0 day(s) ago"));
        assert!(out.ends_with("(usually safe to remove)"));
    }

    #[tokio::test]
    async fn missing_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let args = ToolArgs::new(vec![(
            "path".into(),
            Some(ParamValue::String(tmp.path().join("gone").display().to_string())),
        )]);
        assert!(ClassifyPathTool.call(args).await.is_err());
    }
}
