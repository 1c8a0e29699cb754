//! Git references (branches, HEAD)
//!
//! This module reads the references the auditor needs and rewrites HEAD.
//! References can be:
//! - Direct: Containing a commit SHA-1
//! - Symbolic: Pointing to another reference (e.g., HEAD -> refs/heads/master)
//!
//! ## Storage
//!
//! - Loose: text files under the git directory containing either a 40-character
//!   SHA-1 hash or `ref: <path>`
//! - Packed: lines of `<sha> <refname>` in `packed-refs`, written by `git gc`
//!   and `git clone`; `#` lines are headers and `^` lines peel annotated tags
//!
//! Loose references shadow packed ones of the same name.

use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::collections::BTreeSet;
use std::io::Write;
use std::ops::DerefMut;
use std::path::Path;
use walkdir::WalkDir;

/// Git references manager
///
/// Handles reading references and rewriting HEAD.
/// Writes take an exclusive file lock.
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory (typically `.git`)
    path: Box<Path>,
}

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Name of the packed references file
const PACKED_REFS_FILE: &str = "packed-refs";

/// Symbolic reference chains longer than this are treated as broken
const MAX_SYMREF_DEPTH: usize = 5;

/// Value of a reference file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymRefOrOid {
    /// Symbolic reference pointing to another ref
    SymRef { sym_ref_name: SymRefName },
    /// Direct object ID
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {:?}", path))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(symref_match[1].trim().to_string()),
            }))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }
}

impl Refs {
    /// Read the raw value of HEAD without following it
    pub fn read_head_value(&self) -> anyhow::Result<Option<SymRefOrOid>> {
        SymRefOrOid::read_symref_or_oid(&self.head_path())
    }

    /// Get the current symbolic reference
    ///
    /// Follows symbolic references recursively to find the final direct reference.
    /// For example, if HEAD points to refs/heads/main, returns refs/heads/main.
    /// A detached HEAD yields `HEAD` itself.
    pub fn current_ref(&self) -> anyhow::Result<SymRefName> {
        let mut source = SymRefName::new(HEAD_REF_NAME.to_string());

        for _ in 0..MAX_SYMREF_DEPTH {
            let ref_content =
                SymRefOrOid::read_symref_or_oid(self.path.join(source.as_ref_path()).as_path())?;

            match ref_content {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => source = sym_ref_name,
                Some(SymRefOrOid::Oid(_)) | None => return Ok(source),
            }
        }

        anyhow::bail!("symbolic reference chain from HEAD is too deep")
    }

    /// Read the object ID a reference points to, following symbolic references
    ///
    /// # Returns
    ///
    /// Some(ObjectId) if the ref exists, None otherwise
    pub fn read_oid(&self, sym_ref_name: &SymRefName) -> anyhow::Result<Option<ObjectId>> {
        let mut name = sym_ref_name.clone();

        for _ in 0..MAX_SYMREF_DEPTH {
            let ref_content =
                SymRefOrOid::read_symref_or_oid(self.path.join(name.as_ref_path()).as_path())?;

            match ref_content {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => name = sym_ref_name,
                Some(SymRefOrOid::Oid(oid)) => return Ok(Some(oid)),
                None => return self.read_packed_ref(&name),
            }
        }

        anyhow::bail!("symbolic reference chain from {} is too deep", sym_ref_name.as_ref())
    }

    pub fn read_branch(&self, branch_name: &BranchName) -> anyhow::Result<Option<ObjectId>> {
        self.read_oid(&branch_name.to_sym_ref_name())
    }

    /// Point HEAD directly at a commit, leaving every branch untouched
    pub fn detach_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(self.head_path(), format!("{}\n", oid.as_ref()))
    }

    pub fn update_branch(&self, branch_name: &BranchName, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(
            self.heads_path().join(branch_name.as_ref()).into_boxed_path(),
            format!("{}\n", oid.as_ref()),
        )
    }

    pub fn update_ref_file(&self, path: Box<Path>, raw_ref: String) -> anyhow::Result<()> {
        // create all the parent directories if they don't exist
        std::fs::create_dir_all(path.parent().with_context(|| {
            format!(
                "failed to create parent directories for ref file at {:?}",
                path
            )
        })?)?;

        // open the ref file as WRONLY and CREAT to write commit_id to it
        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.clone())
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;

        Ok(())
    }

    /// List every branch, loose or packed, sorted by name
    pub fn list_branches(&self) -> anyhow::Result<Vec<BranchName>> {
        let loose = WalkDir::new(self.heads_path())
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative_path = entry.path().strip_prefix(self.path.as_ref()).ok()?;
                Some(SymRefName::new(
                    relative_path.to_string_lossy().replace('\\', "/"),
                ))
            });
        let packed = self
            .packed_refs()?
            .into_iter()
            .map(|(sym_ref_name, _)| sym_ref_name);

        Ok(loose
            .chain(packed)
            .filter_map(|sym_ref_name| sym_ref_name.branch_name())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    fn read_packed_ref(&self, sym_ref_name: &SymRefName) -> anyhow::Result<Option<ObjectId>> {
        Ok(self
            .packed_refs()?
            .into_iter()
            .find(|(name, _)| name == sym_ref_name)
            .map(|(_, oid)| oid))
    }

    fn packed_refs(&self) -> anyhow::Result<Vec<(SymRefName, ObjectId)>> {
        let packed_refs_path = self.path.join(PACKED_REFS_FILE);
        if !packed_refs_path.is_file() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&packed_refs_path)
            .with_context(|| format!("failed to read {:?}", packed_refs_path))?;

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('^'))
            .map(|line| {
                let (oid, name) = line
                    .split_once(' ')
                    .with_context(|| format!("malformed packed ref line: {}", line))?;
                Ok((
                    SymRefName::new(name.trim().to_string()),
                    ObjectId::try_parse(oid.to_string())?,
                ))
            })
            .collect()
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }

    pub fn refs_path(&self) -> Box<Path> {
        self.path.join("refs").into_boxed_path()
    }

    pub fn heads_path(&self) -> Box<Path> {
        self.refs_path().join("heads").into_boxed_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;

    const OID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const OID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn oid(hex: &str) -> ObjectId {
        ObjectId::try_parse(hex.to_string()).unwrap()
    }

    fn git_dir() -> (TempDir, Refs) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("refs").join("heads")).unwrap();
        let refs = Refs::new(dir.path().to_path_buf().into_boxed_path());
        (dir, refs)
    }

    fn head_oid(refs: &Refs) -> anyhow::Result<Option<ObjectId>> {
        refs.read_oid(&SymRefName::new(HEAD_REF_NAME.to_string()))
    }

    fn write(dir: &TempDir, name: &str, content: &str) {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn follows_head_to_loose_branch() {
        let (dir, refs) = git_dir();
        write(&dir, "HEAD", "ref: refs/heads/main\n");
        write(&dir, "refs/heads/main", &format!("{OID_A}\n"));

        assert_eq!(refs.current_ref().unwrap().as_ref_path(), "refs/heads/main");
        assert_eq!(head_oid(&refs).unwrap(), Some(oid(OID_A)));
    }

    #[test]
    fn falls_back_to_packed_refs() {
        let (dir, refs) = git_dir();
        write(&dir, "HEAD", "ref: refs/heads/main\n");
        write(
            &dir,
            "packed-refs",
            &format!(
                "# pack-refs with: peeled fully-peeled sorted\n{OID_A} refs/heads/main\n{OID_B} refs/tags/v1\n^{OID_A}\n"
            ),
        );

        assert_eq!(head_oid(&refs).unwrap(), Some(oid(OID_A)));
        assert_eq!(
            refs.list_branches().unwrap(),
            vec![BranchName::try_parse("main".into()).unwrap()]
        );
    }

    #[test]
    fn loose_refs_shadow_packed_refs() {
        let (dir, refs) = git_dir();
        write(&dir, "packed-refs", &format!("{OID_A} refs/heads/main\n"));
        write(&dir, "refs/heads/main", OID_B);
        let main = BranchName::try_parse("main".into()).unwrap();

        assert_eq!(refs.read_branch(&main).unwrap(), Some(oid(OID_B)));
    }

    #[test]
    fn detached_head_reads_the_commit_directly() {
        let (dir, refs) = git_dir();
        write(&dir, "HEAD", OID_B);

        assert!(refs.current_ref().unwrap().as_ref_path() == HEAD_REF_NAME);
        assert_eq!(
            refs.read_head_value().unwrap(),
            Some(SymRefOrOid::Oid(oid(OID_B)))
        );
    }

    #[test]
    fn unborn_branch_has_no_oid() {
        let (dir, refs) = git_dir();
        write(&dir, "HEAD", "ref: refs/heads/main\n");

        assert_eq!(head_oid(&refs).unwrap(), None);
    }

    #[test]
    fn detach_head_keeps_branches() {
        let (dir, refs) = git_dir();
        write(&dir, "HEAD", "ref: refs/heads/main\n");
        write(&dir, "refs/heads/main", OID_A);

        refs.detach_head(&oid(OID_B)).unwrap();

        assert_eq!(head_oid(&refs).unwrap(), Some(oid(OID_B)));
        assert!(refs.current_ref().unwrap().as_ref_path() == HEAD_REF_NAME);
        let main = BranchName::try_parse("main".into()).unwrap();
        assert_eq!(refs.read_branch(&main).unwrap(), Some(oid(OID_A)));
    }

    #[test]
    fn symref_cycles_are_reported() {
        let (dir, refs) = git_dir();
        write(&dir, "HEAD", "ref: refs/heads/a\n");
        write(&dir, "refs/heads/a", "ref: refs/heads/b\n");
        write(&dir, "refs/heads/b", "ref: refs/heads/a\n");

        assert!(head_oid(&refs).is_err());
    }
}
