//! Git source - recipe sources cloned from git repositories.

use std::fmt;
use std::path::Path;

use git2::{Repository, ResetType};
use url::Url;

use crate::sources::source::{Source, SourceError};
use crate::util::hash::sha256_str;

/// Which commit of a repository to check out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum GitReference {
    /// Whatever the remote HEAD points to
    #[default]
    DefaultBranch,
    Branch(String),
    Tag(String),
    Rev(String),
}

impl fmt::Display for GitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitReference::DefaultBranch => Ok(()),
            GitReference::Branch(b) => write!(f, "?branch={}", b),
            GitReference::Tag(t) => write!(f, "?tag={}", t),
            GitReference::Rev(r) => write!(f, "?rev={}", r),
        }
    }
}

/// A source for git repositories.
pub struct GitSource {
    /// Remote repository URL
    remote: Url,

    /// Git reference (branch, tag, rev)
    reference: GitReference,
}

impl GitSource {
    /// Create a new git source.
    pub fn new(remote: Url, reference: GitReference) -> Self {
        GitSource { remote, reference }
    }

    fn describe(&self) -> String {
        format!("git+{}{}", self.remote, self.reference)
    }

    fn checkout(&self, repo: &Repository) -> Result<String, git2::Error> {
        let commit = match &self.reference {
            GitReference::DefaultBranch => repo.head()?.peel_to_commit()?,
            GitReference::Branch(branch) => {
                let remote_branch =
                    repo.find_branch(&format!("origin/{}", branch), git2::BranchType::Remote)?;
                remote_branch.get().peel_to_commit()?
            }
            GitReference::Tag(tag) => repo
                .find_reference(&format!("refs/tags/{}", tag))?
                .peel_to_commit()?,
            GitReference::Rev(rev) => repo.revparse_single(rev)?.peel_to_commit()?,
        };

        repo.reset(commit.as_object(), ResetType::Hard, None)?;
        Ok(commit.id().to_string())
    }
}

impl Source for GitSource {
    fn kind(&self) -> &'static str {
        "git"
    }

    fn cache_key(&self) -> String {
        format!(
            "{}-{}",
            sanitize_url_for_path(&self.remote),
            &sha256_str(&self.describe())[..12]
        )
    }

    fn reusable(&self) -> bool {
        true
    }

    fn materialize(&self, dest: &Path) -> Result<(), SourceError> {
        tracing::info!("Cloning {}", self.remote);

        let repo = Repository::clone(self.remote.as_str(), dest)
            .map_err(|e| SourceError::unavailable(self.describe(), e))?;
        let precise = self
            .checkout(&repo)
            .map_err(|e| SourceError::unavailable(self.describe(), e))?;

        tracing::debug!("checked out {} at {}", self.remote, precise);
        Ok(())
    }
}

/// Sanitize a URL for use as a directory name.
fn sanitize_url_for_path(url: &Url) -> String {
    let mut name = String::new();

    if let Some(host) = url.host_str() {
        name.push_str(host);
    }

    let path = url.path().trim_matches('/');
    if !path.is_empty() {
        name.push('-');
        name.push_str(&path.replace('/', "-"));
    }

    name.trim_end_matches(".git")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
