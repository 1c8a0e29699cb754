use crate::areas::database::Database;
use crate::areas::refs::{HEAD_REF_NAME, Refs, SymRefOrOid};
use crate::artifacts::branch::DEFAULT_BRANCH_NAMES;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::path::{Path, PathBuf};
use thiserror::Error;

const GIT_DIR_NAME: &str = ".git";
const GITDIR_FILE_PREFIX: &str = "gitdir:";

/// Expected reasons for a path not to be auditable
///
/// Callers tell these apart from I/O or corruption errors with
/// `anyhow::Error::downcast_ref`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} is not a git repository")]
    NotARepository(PathBuf),

    #[error("{path} has no resolvable active branch: {reason}")]
    UnresolvedBranch { path: PathBuf, reason: String },
}

/// What HEAD currently designates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// HEAD names a branch; `oid` is `None` while the branch is unborn
    Branch {
        name: BranchName,
        oid: Option<ObjectId>,
    },
    /// HEAD holds a commit id directly
    Detached(ObjectId),
}

/// The branch whose history is audited, with its tip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveBranch {
    pub name: BranchName,
    pub tip: ObjectId,
}

#[derive(Debug)]
pub struct Repository {
    path: Box<Path>,
    git_dir: Box<Path>,
    database: Database,
    refs: Refs,
}

impl Repository {
    /// Open the repository checked out at `path`
    ///
    /// `path/.git` may be the git directory itself or a file holding
    /// `gitdir: <path>`, as left by submodules and linked checkouts.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let not_a_repository = || RepositoryError::NotARepository(path.to_path_buf());

        let path = path.canonicalize().map_err(|_| not_a_repository())?;
        let dot_git = path.join(GIT_DIR_NAME);

        let git_dir = if dot_git.is_dir() {
            dot_git
        } else if dot_git.is_file() {
            Self::read_gitdir_file(&dot_git)?.ok_or_else(not_a_repository)?
        } else {
            return Err(not_a_repository().into());
        };

        if !git_dir.join(HEAD_REF_NAME).is_file() || !git_dir.join("objects").is_dir() {
            return Err(not_a_repository().into());
        }

        let database = Database::new(git_dir.join("objects").into_boxed_path());
        let refs = Refs::new(git_dir.clone().into_boxed_path());

        Ok(Repository {
            path: path.into_boxed_path(),
            git_dir: git_dir.into_boxed_path(),
            database,
            refs,
        })
    }

    /// Create an empty repository whose HEAD points at an unborn `main`
    pub fn init(path: &Path) -> anyhow::Result<Self> {
        let git_dir = path.join(GIT_DIR_NAME);

        for dir in ["objects", "refs/heads", "refs/tags"] {
            std::fs::create_dir_all(git_dir.join(dir))
                .with_context(|| format!("Unable to create {}", git_dir.join(dir).display()))?;
        }
        std::fs::write(
            git_dir.join(HEAD_REF_NAME),
            format!("ref: refs/heads/{}\n", DEFAULT_BRANCH_NAMES[0]),
        )
        .with_context(|| format!("Unable to write HEAD in {}", git_dir.display()))?;

        Self::open(path)
    }

    fn read_gitdir_file(dot_git: &Path) -> anyhow::Result<Option<PathBuf>> {
        let content = std::fs::read_to_string(dot_git)
            .with_context(|| format!("Unable to read {}", dot_git.display()))?;

        let Some(target) = content.trim().strip_prefix(GITDIR_FILE_PREFIX) else {
            return Ok(None);
        };
        let target = Path::new(target.trim());
        let target = match dot_git.parent() {
            Some(parent) if target.is_relative() => parent.join(target),
            _ => target.to_path_buf(),
        };

        Ok(target.is_dir().then_some(target))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn head(&self) -> anyhow::Result<Head> {
        match self.refs.read_head_value()? {
            Some(SymRefOrOid::Oid(oid)) => Ok(Head::Detached(oid)),
            Some(SymRefOrOid::SymRef { .. }) => {
                let current_ref = self.refs.current_ref()?;
                let name = current_ref
                    .branch_name()
                    .with_context(|| format!("HEAD points outside refs/heads: {}", current_ref.as_ref()))?;
                let oid = self.refs.read_oid(&current_ref)?;
                Ok(Head::Branch { name, oid })
            }
            None => anyhow::bail!("HEAD of {} is empty", self.path.display()),
        }
    }

    /// The commit currently checked out, through a branch or a detached HEAD
    pub fn current_commit(&self) -> anyhow::Result<(ObjectId, Commit)> {
        let oid = match self.head()? {
            Head::Detached(oid) => oid,
            Head::Branch { oid: Some(oid), .. } => oid,
            Head::Branch { name, oid: None } => {
                return Err(RepositoryError::UnresolvedBranch {
                    path: self.path.to_path_buf(),
                    reason: format!("branch '{}' has no commits yet", name),
                }
                .into());
            }
        };

        let commit = self.database.load_commit(&oid)?;
        Ok((oid, commit))
    }

    /// Resolve the branch whose history is audited
    ///
    /// A designated branch wins. Otherwise the branch HEAD points at; when
    /// HEAD is detached, the first existing default branch.
    pub fn active_branch(&self, designated: Option<&BranchName>) -> anyhow::Result<ActiveBranch> {
        let unresolved = |reason: String| RepositoryError::UnresolvedBranch {
            path: self.path.to_path_buf(),
            reason,
        };

        let candidates = match (designated, self.head()?) {
            (Some(designated), _) => vec![designated.clone()],
            (None, Head::Branch { name, .. }) => vec![name],
            (None, Head::Detached(_)) => DEFAULT_BRANCH_NAMES
                .iter()
                .filter_map(|name| BranchName::try_parse(name.to_string()).ok())
                .collect(),
        };

        for name in &candidates {
            if let Some(tip) = self.refs.read_branch(name)? {
                return Ok(ActiveBranch {
                    name: name.clone(),
                    tip,
                });
            }
        }

        let available = self
            .refs
            .list_branches()?
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        let tried = candidates
            .iter()
            .map(|name| format!("'{}'", name))
            .collect::<Vec<_>>()
            .join(", ");

        Err(unresolved(format!(
            "tried {}; available branches: [{}]",
            if tried.is_empty() { "nothing".to_string() } else { tried },
            available.join(", ")
        ))
        .into())
    }

    /// Check out `oid` by pointing HEAD directly at it
    ///
    /// Only the reference is rewritten; the branch keeps its tip.
    pub fn detach_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        self.database
            .load_commit(oid)
            .with_context(|| format!("Refusing to check out {} in {}", oid, self.path.display()))?;

        self.refs.detach_head(oid)
    }
}
