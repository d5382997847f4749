use crate::tools::resolve_path;
use crate::traits::{ParamType, Parameter, Tool, ToolArgs, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Paths the cleanup tools must leave alone.
///
/// A plain pattern protects itself and everything below it. A pattern with
/// `*` or `?` is matched against the whole path and against each of its
/// ancestors, so `*.git` protects `/src/app/.git/config` too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    patterns: Vec<String>,
}

impl Whitelist {
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| {
                    let p: String = p.into();
                    p.trim().to_string()
                })
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns the first pattern protecting `path`. `.` and `..` are
    /// resolved first, so `/tmp/../etc` is checked as `/etc`.
    pub fn matching_pattern(&self, path: &Path) -> Option<&str> {
        let path = normalize(path);
        self.patterns
            .iter()
            .find(|pattern| pattern_matches(pattern, &path))
            .map(String::as_str)
    }

    pub fn is_protected(&self, path: &Path) -> bool {
        self.matching_pattern(path).is_some()
    }
}

/// Resolves `.` and `..` components lexically, without touching the
/// filesystem. `..` never climbs above the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn pattern_matches(pattern: &str, path: &Path) -> bool {
    if pattern.contains(['*', '?']) {
        path.ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| wildcard_match(pattern, &p.to_string_lossy()))
    } else {
        path.starts_with(normalize(Path::new(pattern)))
    }
}

/// `*` matches any run of characters (including separators), `?` exactly one.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

pub struct CheckWhitelistTool {
    whitelist: Arc<Whitelist>,
}

impl CheckWhitelistTool {
    pub fn new(whitelist: Arc<Whitelist>) -> Self {
        Self { whitelist }
    }
}

#[async_trait]
impl ToolHandler for CheckWhitelistTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let path = resolve_path(args.str("path")?);
        Ok(match self.whitelist.matching_pattern(&path) {
            Some(pattern) => format!("{} is protected by whitelist pattern '{}'", path.display(), pattern),
            None => format!("{} is not whitelisted", path.display()),
        })
    }
}

impl Tool for CheckWhitelistTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "check_whitelist",
            "Check whether a path is protected by the user's whitelist",
        )
        .param(Parameter::required("path", ParamType::String, "Path to check"))
    }
}
