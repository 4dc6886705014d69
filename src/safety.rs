use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory names never patched, at any depth below the workspace.
const VENDORED_DIRS: &[&str] = &["node_modules", ".git"];

/// Confines patch targets to one workspace, away from vendored code.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("target is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("target is inside {dir}/: {path}")]
    ForbiddenPath { path: PathBuf, dir: String },

    #[error("target has no file name: {0}")]
    NoFileName(PathBuf),

    #[error("failed to resolve path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    /// The workspace root must exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` (relative paths start at the workspace root) to a
    /// canonical target inside the workspace.
    ///
    /// A missing target still resolves so that reading it reports
    /// `NotFound`; its parent directory must exist.
    pub fn resolve_target(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let joined = self.root.join(path.as_ref());
        let canonical = match joined.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => {
                let name = joined
                    .file_name()
                    .ok_or_else(|| SafetyError::NoFileName(joined.clone()))?;
                let parent = joined.parent().unwrap_or(Path::new("/"));
                parent.canonicalize()?.join(name)
            }
        };

        let relative = canonical
            .strip_prefix(&self.root)
            .map_err(|_| SafetyError::OutsideWorkspace {
                path: canonical.clone(),
                workspace: self.root.clone(),
            })?;

        let vendored = relative.parent().and_then(|dirs| {
            dirs.components().find_map(|component| match component {
                Component::Normal(name) => VENDORED_DIRS
                    .iter()
                    .find(|dir| name == **dir)
                    .map(|dir| dir.to_string()),
                _ => None,
            })
        });
        if let Some(dir) = vendored {
            return Err(SafetyError::ForbiddenPath { path: canonical, dir });
        }

        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Scratch workspace containing `files` (empty contents).
    fn workspace(files: &[&str]) -> (TempDir, WorkspaceGuard) {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        let guard = WorkspaceGuard::new(dir.path()).unwrap();
        (dir, guard)
    }

    #[test]
    fn test_relative_and_absolute_targets_agree() {
        let (dir, guard) = workspace(&["routes/customers.js"]);

        let relative = guard.resolve_target("routes/customers.js").unwrap();
        let absolute = guard.resolve_target(dir.path().join("routes/customers.js")).unwrap();
        assert_eq!(relative, absolute);
        assert!(relative.starts_with(guard.workspace_root()));
    }

    #[test]
    fn test_missing_target_resolves_but_parent_must_exist() {
        let (_dir, guard) = workspace(&[]);
        let resolved = guard.resolve_target("models/customer.js");
        assert!(matches!(resolved, Err(SafetyError::Canonicalize(_))));

        let resolved = guard.resolve_target("customer.js").unwrap();
        assert_eq!(resolved, guard.workspace_root().join("customer.js"));
    }

    #[test]
    fn test_parent_escape_rejected() {
        let (dir, _) = workspace(&[]);
        let inner = dir.path().join("app");
        fs::create_dir(&inner).unwrap();
        let guard = WorkspaceGuard::new(&inner).unwrap();

        assert!(matches!(
            guard.resolve_target("../server.js"),
            Err(SafetyError::OutsideWorkspace { .. })
        ));
    }

    #[test]
    fn test_vendored_dirs_rejected_at_any_depth() {
        let (_dir, guard) = workspace(&[
            "node_modules/express/index.js",
            "packages/api/node_modules/mongoose/index.js",
            ".git/hooks/pre-commit",
        ]);

        for target in [
            "node_modules/express/index.js",
            "packages/api/node_modules/mongoose/index.js",
            ".git/hooks/pre-commit",
        ] {
            assert!(
                matches!(
                    guard.resolve_target(target),
                    Err(SafetyError::ForbiddenPath { .. })
                ),
                "{target} should be rejected"
            );
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_out_of_workspace_rejected() {
        let (outer, _) = workspace(&["secrets.js"]);
        let (dir, guard) = workspace(&[]);
        let secrets = outer.path().join("secrets.js");
        std::os::unix::fs::symlink(secrets, dir.path().join("link.js")).unwrap();

        assert!(matches!(
            guard.resolve_target("link.js"),
            Err(SafetyError::OutsideWorkspace { .. })
        ));
    }
}
