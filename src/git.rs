//! Latest-commit lookup backed by libgit2.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use git2::{ErrorCode, Repository};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    /// No repository at or above the starting directory
    #[error("not inside a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// HEAD does not point at a commit yet
    #[error("repository has no commits: {}", .0.display())]
    NoCommits(PathBuf),

    #[error("commit time {0} is out of range")]
    InvalidTime(i64),

    #[error("git error: {0}")]
    Repository(#[from] git2::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub short_hash: String,
    pub subject: String,
    /// Committer date, in the committer's own offset
    pub committed_at: DateTime<FixedOffset>,
}

/// Something that can report the most recent commit.
pub trait CommitSource {
    fn latest_commit(&self) -> Result<CommitInfo, GitError>;
}

/// Discovers the repository from `start` upward, the way `git` does from the cwd.
#[derive(Debug, Clone)]
pub struct RepoSource {
    start: PathBuf,
}

impl RepoSource {
    pub fn new(start: impl Into<PathBuf>) -> Self {
        Self {
            start: start.into(),
        }
    }

    fn open(&self) -> Result<Repository, GitError> {
        Repository::discover(&self.start).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                GitError::NotARepository(self.start.clone())
            } else {
                GitError::Repository(e)
            }
        })
    }
}

impl CommitSource for RepoSource {
    fn latest_commit(&self) -> Result<CommitInfo, GitError> {
        let repo = self.open()?;
        let head = match repo.head() {
            Ok(h) => h,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Err(GitError::NoCommits(workdir_of(&repo)));
            }
            Err(e) => return Err(e.into()),
        };
        let commit = head.peel_to_commit()?;
        tracing::debug!(id = %commit.id(), "resolved HEAD");

        let short_hash = commit
            .as_object()
            .short_id()?
            .as_str()
            .unwrap_or_default()
            .to_string();
        let subject = commit
            .summary_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        let committed_at = to_datetime(commit.time())?;

        Ok(CommitInfo {
            short_hash,
            subject,
            committed_at,
        })
    }
}

fn workdir_of(repo: &Repository) -> PathBuf {
    repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf()
}

fn to_datetime(time: git2::Time) -> Result<DateTime<FixedOffset>, GitError> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .ok_or(GitError::InvalidTime(time.seconds()))?;
    DateTime::from_timestamp(time.seconds(), 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or(GitError::InvalidTime(time.seconds()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_subject_hash_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let repo = fixture::init(dir.path());
        let oid = fixture::commit(&repo, "Fix typo\n\nLonger body text.\n", fixture::NEW_YEAR_SGT);

        let info = RepoSource::new(dir.path()).latest_commit().unwrap();
        assert_eq!(info.subject, "Fix typo");
        assert!(oid.to_string().starts_with(&info.short_hash));
        assert!(info.short_hash.len() >= 7);
        assert_eq!(info.committed_at.timestamp(), fixture::NEW_YEAR_SGT);
        assert_eq!(info.committed_at.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn picks_the_newest_commit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = fixture::init(dir.path());
        fixture::commit(&repo, "First", fixture::NEW_YEAR_SGT);
        fixture::commit(&repo, "Second", fixture::NEW_YEAR_SGT + 60);

        let info = RepoSource::new(dir.path()).latest_commit().unwrap();
        assert_eq!(info.subject, "Second");
    }

    #[test]
    fn discovers_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let repo = fixture::init(dir.path());
        fixture::commit(&repo, "Add docs", fixture::NEW_YEAR_SGT);
        let sub = dir.path().join("docs");
        std::fs::create_dir(&sub).unwrap();

        let info = RepoSource::new(&sub).latest_commit().unwrap();
        assert_eq!(info.subject, "Add docs");
    }

    #[test]
    fn empty_repository_reports_no_commits() {
        let dir = tempfile::tempdir().unwrap();
        fixture::init(dir.path());
        let err = RepoSource::new(dir.path()).latest_commit().unwrap_err();
        assert!(matches!(err, GitError::NoCommits(_)), "{:?}", err);
    }

    #[test]
    fn multi_line_first_paragraph_is_squashed() {
        let dir = tempfile::tempdir().unwrap();
        let repo = fixture::init(dir.path());
        fixture::commit(&repo, "Update nav\nand footer\n\nbody", fixture::NEW_YEAR_SGT);
        let info = RepoSource::new(dir.path()).latest_commit().unwrap();
        assert_eq!(info.subject, "Update nav and footer");
    }
}
