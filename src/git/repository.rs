//! Git repository operations.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{DiffFormat, DiffOptions, Repository, Status, StatusOptions, Tree};
use tracing::warn;

use crate::git::ignore::ScribeIgnore;

/// File name fragments excluded from the staged diff.
///
/// Lock files and binary images inflate the diff without carrying
/// information a commit message needs.
const EXCLUDED_LOCK_PATTERNS: &[&str] = &[".lock", "-lock."];
const EXCLUDED_IMAGE_EXTENSIONS: &[&str] = &[".svg", ".png", ".jpg", ".jpeg", ".webp", ".gif"];

/// Git repository wrapper.
pub struct Repo {
    repo: Repository,
}

impl Repo {
    /// Opens the repository at the current directory.
    pub fn open() -> Result<Self> {
        let repo = Repository::discover(".").context("Not in a git repository")?;
        Ok(Self { repo })
    }

    /// Opens the repository at the given path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;
        Ok(Self { repo })
    }

    /// HEAD's tree, or `None` on an unborn branch.
    fn head_tree(&self) -> Result<Option<Tree<'_>>> {
        match self.repo.head() {
            Ok(head) => {
                let tree = head
                    .peel_to_tree()
                    .context("Failed to resolve HEAD to a tree")?;
                Ok(Some(tree))
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(e).context("Failed to read HEAD"),
        }
    }

    /// Lists staged file paths, sorted and `.gitscribeignore`-filtered.
    pub fn staged_files(&self) -> Result<Vec<String>> {
        let head = self.head_tree()?;
        let diff = self
            .repo
            .diff_tree_to_index(head.as_ref(), None, None)
            .context("Failed to diff HEAD against the index")?;

        let ignore = match self.repo.workdir() {
            Some(workdir) => ScribeIgnore::load(workdir),
            None => ScribeIgnore::from_patterns([]),
        };

        let mut files: Vec<String> = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|path| path.to_string_lossy().into_owned())
            })
            .filter(|path| !ignore.is_ignored(path))
            .collect();

        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Lists changed file paths: worktree modifications plus untracked
    /// files that are not gitignored, sorted.
    pub fn changed_files(&self) -> Result<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .context("Failed to get repository status")?;

        let worktree_changes = Status::WT_NEW
            | Status::WT_MODIFIED
            | Status::WT_DELETED
            | Status::WT_RENAMED
            | Status::WT_TYPECHANGE;

        let mut files: Vec<String> = statuses
            .iter()
            .filter(|entry| entry.status().intersects(worktree_changes))
            .filter_map(|entry| entry.path().map(ToOwned::to_owned))
            .collect();

        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Stages the given paths into the index.
    pub fn add(&self, paths: &[String]) -> Result<()> {
        let mut index = self.repo.index().context("Failed to open the index")?;
        for path in paths {
            index
                .add_path(Path::new(path))
                .with_context(|| format!("Failed to stage {path}"))?;
        }
        index.write().context("Failed to write the index")?;
        Ok(())
    }

    /// Produces the unified diff of the staged changes for the given
    /// paths.
    ///
    /// Lock files and binary image files are excluded; each exclusion is
    /// reported so the user knows no message covers those files.
    pub fn staged_diff(&self, files: &[String]) -> Result<String> {
        let mut opts = DiffOptions::new();
        let mut any_included = false;

        for file in files {
            if is_excluded(file) {
                warn!(file = %file, "excluded from the diff, no commit message is generated for it");
                continue;
            }
            opts.pathspec(file);
            any_included = true;
        }

        if !any_included {
            return Ok(String::new());
        }

        let head = self.head_tree()?;
        let diff = self
            .repo
            .diff_tree_to_index(head.as_ref(), None, Some(&mut opts))
            .context("Failed to diff HEAD against the index")?;

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            match line.origin() {
                '+' | '-' | ' ' => text.push(line.origin()),
                _ => {}
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .context("Failed to render the staged diff")?;

        Ok(text)
    }

    /// Creates a commit of the current index with the repository's
    /// configured signature.
    pub fn commit(&self, message: &str) -> Result<git2::Oid> {
        let signature = self
            .repo
            .signature()
            .context("Failed to resolve the commit signature; set user.name and user.email")?;

        let mut index = self.repo.index().context("Failed to open the index")?;
        let tree_id = index.write_tree().context("Failed to write the tree")?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .context("Failed to look up the written tree")?;

        let parent = match self.head_tree()? {
            Some(_) => {
                let head = self.repo.head().context("Failed to read HEAD")?;
                Some(
                    head.peel_to_commit()
                        .context("Failed to resolve HEAD to a commit")?,
                )
            }
            None => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .context("Failed to create the commit")
    }
}

/// Whether a path matches the lock-file or binary-image exclusions.
fn is_excluded(path: &str) -> bool {
    EXCLUDED_LOCK_PATTERNS
        .iter()
        .any(|pattern| path.contains(pattern))
        || EXCLUDED_IMAGE_EXTENSIONS
            .iter()
            .any(|ext| path.to_lowercase().ends_with(ext))
}
