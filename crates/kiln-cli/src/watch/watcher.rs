//! File system watcher with debouncing for watch mode.
//!
//! Watches the image and template source trees and forwards changes through
//! a channel. The bundler adapter watches its own sources separately.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::ui;

/// File change event type.
#[derive(Debug, Clone)]
pub enum FileChange {
    /// File was modified
    Modified(PathBuf),
    /// File was created
    Created(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Watcher over the source trees, with per-file debouncing.
///
/// Rapid successive events for the same file (editors often write several
/// times per save) collapse into one change.
pub struct FileWatcher {
    /// Underlying notify watcher, kept alive for the watch duration
    _watcher: RecommendedWatcher,
    /// Directories being watched
    roots: Vec<PathBuf>,
}

impl FileWatcher {
    /// Watch every existing directory in `roots` recursively.
    ///
    /// Missing directories are skipped with a warning so a project without,
    /// say, an image tree still gets template watching.
    pub fn new(
        roots: Vec<PathBuf>,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let (tx, rx) = mpsc::channel(100);

        let mut last_event: Option<(PathBuf, Instant)> = None;
        let filter_roots = roots.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };
            for path in &event.paths {
                if Self::should_ignore(path, &filter_roots) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                let _ = tx.blocking_send(change);
            }
        })?;

        let mut watched = Vec::new();
        for root in roots {
            if root.is_dir() {
                watcher.watch(&root, RecursiveMode::Recursive)?;
                watched.push(root);
            } else {
                ui::warning(&format!("Not watching '{}': not a directory", root.display()));
            }
        }

        Ok((
            Self {
                _watcher: watcher,
                roots: watched,
            },
            rx,
        ))
    }

    /// Whether a reported path falls outside the watched trees or is hidden.
    fn should_ignore(path: &Path, roots: &[PathBuf]) -> bool {
        let Some(root) = roots.iter().find(|root| path.starts_with(root)) else {
            return true;
        };
        let Ok(rel) = path.strip_prefix(root) else {
            return true;
        };

        // Editor swap files and the like.
        rel.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.'))
        })
    }

    /// Directories actually being watched.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_paths_outside_the_watched_roots() {
        let roots = vec![PathBuf::from("/project/src/img")];
        assert!(FileWatcher::should_ignore(
            Path::new("/project/src/js/main.js"),
            &roots
        ));
        assert!(!FileWatcher::should_ignore(
            Path::new("/project/src/img/logo.png"),
            &roots
        ));
    }

    #[test]
    fn ignores_hidden_files() {
        let roots = vec![PathBuf::from("/project/src/templates")];
        assert!(FileWatcher::should_ignore(
            Path::new("/project/src/templates/.index.j2.swp"),
            &roots
        ));
        assert!(FileWatcher::should_ignore(
            Path::new("/project/src/templates/.cache/index.j2"),
            &roots
        ));
        assert!(!FileWatcher::should_ignore(
            Path::new("/project/src/templates/index.j2"),
            &roots
        ));
    }

    #[test]
    fn nested_paths_under_a_root_are_watched() {
        let roots = vec![
            PathBuf::from("/project/src/img"),
            PathBuf::from("/project/src/templates"),
        ];
        assert!(!FileWatcher::should_ignore(
            Path::new("/project/src/templates/partials/head.j2"),
            &roots
        ));
    }

    #[test]
    fn file_change_exposes_its_path() {
        let path = PathBuf::from("/project/src/img/logo.png");
        assert_eq!(FileChange::Modified(path.clone()).path(), path.as_path());
        assert_eq!(FileChange::Created(path.clone()).path(), path.as_path());
        assert_eq!(FileChange::Removed(path.clone()).path(), path.as_path());
    }

    #[tokio::test]
    async fn missing_roots_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("img");
        std::fs::create_dir_all(&existing).unwrap();

        let (watcher, _rx) = FileWatcher::new(
            vec![existing.clone(), dir.path().join("absent")],
            Duration::from_millis(50),
        )
        .unwrap();

        assert_eq!(watcher.roots(), &[existing]);
    }
}
