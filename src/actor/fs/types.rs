use std::path::{Path, PathBuf};

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Paths a watch event may never trigger a rebuild for.
pub(super) struct IgnoreRules {
    output: PathBuf,
}

/// Directory names skipped anywhere in the tree.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules"];

impl IgnoreRules {
    pub(super) fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
        }
    }

    pub(super) fn is_ignored(&self, path: &Path) -> bool {
        path.starts_with(&self.output)
            || path
                .components()
                .any(|c| IGNORED_DIRS.iter().any(|dir| c.as_os_str() == *dir))
    }
}
