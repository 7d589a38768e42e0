use git2::build::CheckoutBuilder;
use git2::{
    Commit, DiffOptions, ErrorCode, IndexAddOption, Repository, RepositoryInitOptions, ResetType,
    Signature, StatusOptions,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::WorkspaceStatus;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const COMMITTER_NAME: &str = "redgreen";
const COMMITTER_EMAIL: &str = "redgreen@localhost";

/// Snapshot store over a git repository at the workspace root.
///
/// Commits mark verified green states; reverts restore the tree to the last
/// commit after a failed refactor attempt. The store never creates commits
/// on its own initiative: `commit` with a clean index is a benign no-op
/// returning `false`.
pub struct SnapshotStore {
    work_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn repo(&self) -> Result<Repository, GitError> {
        Ok(Repository::open(&self.work_dir)?)
    }

    fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>, GitError> {
        match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Initialize a repository at the workspace root. Idempotent.
    pub fn init(&self) -> Result<(), GitError> {
        if Repository::open(&self.work_dir).is_ok() {
            debug!(work_dir = %self.work_dir.display(), "Repository already initialized");
            return Ok(());
        }

        info!(work_dir = %self.work_dir.display(), "Initializing git repository");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        Repository::init_opts(&self.work_dir, &opts)?;
        Ok(())
    }

    /// Stage the given pathspecs (additions, modifications and deletions).
    pub fn stage(&self, pathspecs: &[&str]) -> Result<(), GitError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        index.add_all(pathspecs.iter().copied(), IndexAddOption::DEFAULT, None)?;
        index.update_all(pathspecs.iter().copied(), None)?;
        index.write()?;
        debug!(?pathspecs, "Staged paths");
        Ok(())
    }

    /// Stage every change in the workspace.
    pub fn stage_all(&self) -> Result<(), GitError> {
        self.stage(&["*"])
    }

    /// Commit the staged tree.
    ///
    /// Returns `false` without committing when the staged tree equals HEAD
    /// (nothing to commit); any other failure is an error.
    pub fn commit(&self, message: &str) -> Result<bool, GitError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let parent = Self::head_commit(&repo)?;

        let has_staged = match &parent {
            Some(commit) => commit.tree_id() != tree_id,
            None => !index.is_empty(),
        };
        if !has_staged {
            debug!("Nothing to commit; skipping");
            return Ok(false);
        }

        let tree = repo.find_tree(tree_id)?;
        let sig = Signature::now(COMMITTER_NAME, COMMITTER_EMAIL)?;
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        info!(commit_message = %message, "Created commit");
        Ok(true)
    }

    /// Discard staged and unstaged changes to the given pathspecs, restoring
    /// them to their content at HEAD.
    pub fn revert(&self, pathspecs: &[&str]) -> Result<(), GitError> {
        let repo = self.repo()?;
        let Some(head) = Self::head_commit(&repo)? else {
            // No commit to restore to yet
            return Ok(());
        };

        let target = head.as_object().clone();
        repo.reset_default(Some(&target), pathspecs.iter().copied())?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        for path in pathspecs {
            checkout.path(*path);
        }
        repo.checkout_head(Some(&mut checkout))?;
        info!(?pathspecs, "Reverted paths to HEAD");
        Ok(())
    }

    /// Discard every change in the workspace, including untracked files the
    /// attempt introduced, restoring the tree at the last commit.
    pub fn revert_all(&self) -> Result<(), GitError> {
        let repo = self.repo()?;
        let Some(head) = Self::head_commit(&repo)? else {
            return Ok(());
        };

        repo.reset(head.as_object(), ResetType::Mixed, None)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        repo.checkout_head(Some(&mut checkout))?;
        info!("Reverted working tree to HEAD");
        Ok(())
    }

    /// Whether the index differs from HEAD.
    pub fn has_staged_changes(&self) -> Result<bool, GitError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let changed = match Self::head_commit(&repo)? {
            Some(commit) => commit.tree_id() != tree_id,
            None => !index.is_empty(),
        };
        Ok(changed)
    }

    /// Unified diff of all uncommitted changes (staged and unstaged).
    pub fn diff(&self) -> Result<String, GitError> {
        let repo = self.repo()?;
        let head_tree = match Self::head_commit(&repo)? {
            Some(commit) => Some(commit.tree()?),
            None => None,
        };

        let mut opts = DiffOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let diff = repo.diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))?;

        let mut diff_text = String::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            let prefix = match line.origin() {
                '+' => "+",
                '-' => "-",
                ' ' => " ",
                _ => "",
            };
            diff_text.push_str(prefix);
            if let Ok(content) = std::str::from_utf8(line.content()) {
                diff_text.push_str(content);
            }
            true
        })?;

        Ok(diff_text)
    }

    /// Working-directory status buckets.
    pub fn status(&self) -> Result<WorkspaceStatus, GitError> {
        let repo = self.repo()?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = repo.statuses(Some(&mut opts))?;

        let mut status = WorkspaceStatus::default();
        for entry in statuses.iter() {
            let path = entry.path().unwrap_or("").to_string();
            let st = entry.status();

            if st.is_wt_modified() || st.is_index_modified() {
                status.modified.push(path.clone());
            }
            if st.is_wt_new() {
                status.untracked.push(path.clone());
            }
            if st.is_index_new() {
                status.added.push(path.clone());
            }
            if st.is_wt_deleted() || st.is_index_deleted() {
                status.deleted.push(path);
            }
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SnapshotStore {
        let store = SnapshotStore::new(dir.path().to_path_buf());
        store.init().unwrap();
        store
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        std::fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    #[test]
    fn init_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path().to_path_buf());
        store.init().unwrap();
        store.init().unwrap();
        assert!(tmp.path().join(".git").exists());
    }

    #[test]
    fn commit_returns_false_with_nothing_staged() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert!(!store.commit("empty").unwrap());

        write(&tmp, "a.txt", "one");
        store.stage_all().unwrap();
        assert!(store.commit("first").unwrap());
        // Second commit with a clean index is a no-op
        assert!(!store.commit("again").unwrap());
    }

    #[test]
    fn stage_specific_path_only() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        write(&tmp, "tests/test_a.rs", "#[test] fn a() {}");
        write(&tmp, "src/lib.rs", "pub fn a() {}");

        store.stage(&["tests/test_a.rs"]).unwrap();
        assert!(store.has_staged_changes().unwrap());

        let status = store.status().unwrap();
        assert!(status.added.contains(&"tests/test_a.rs".to_string()));
        assert!(status.untracked.contains(&"src/lib.rs".to_string()));
    }

    #[test]
    fn revert_all_restores_last_commit() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        write(&tmp, "src/lib.rs", "pub fn keep() {}\n");
        store.stage_all().unwrap();
        assert!(store.commit("baseline").unwrap());

        // A failed attempt: modify a tracked file, stage part of it, and
        // drop a brand-new file.
        write(&tmp, "src/lib.rs", "pub fn broken() {}\n");
        write(&tmp, "src/extra.rs", "pub fn extra() {}\n");
        store.stage(&["src/lib.rs"]).unwrap();

        store.revert_all().unwrap();

        assert_eq!(read(&tmp, "src/lib.rs"), "pub fn keep() {}\n");
        assert!(!tmp.path().join("src/extra.rs").exists());
        assert!(store.status().unwrap().is_clean());
    }

    #[test]
    fn revert_specific_paths() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        write(&tmp, "a.txt", "a1");
        write(&tmp, "b.txt", "b1");
        store.stage_all().unwrap();
        store.commit("both").unwrap();

        write(&tmp, "a.txt", "a2");
        write(&tmp, "b.txt", "b2");
        store.revert(&["a.txt"]).unwrap();

        assert_eq!(read(&tmp, "a.txt"), "a1");
        assert_eq!(read(&tmp, "b.txt"), "b2");
    }

    #[test]
    fn diff_reports_uncommitted_changes() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        write(&tmp, "a.txt", "old\n");
        store.stage_all().unwrap();
        store.commit("seed").unwrap();

        write(&tmp, "a.txt", "new\n");
        let diff = store.diff().unwrap();
        assert!(diff.contains("-old"));
        assert!(diff.contains("+new"));
    }
}
