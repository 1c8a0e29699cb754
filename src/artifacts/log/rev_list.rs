use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;

/// First-parent history of a commit, newest first
///
/// Commits come from `commit_loader`, usually the object database of a repository.
#[derive(Clone, new)]
pub struct RevList<CommitLoaderFn> {
    commit_loader: CommitLoaderFn,
    start: ObjectId,
}

impl<CommitLoaderFn> IntoIterator for RevList<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    type Item = anyhow::Result<SlimCommit>;
    type IntoIter = RevListIntoIter<CommitLoaderFn>;

    fn into_iter(self) -> Self::IntoIter {
        RevListIntoIter {
            commit_loader: self.commit_loader,
            current_commit_oid: Some(self.start),
        }
    }
}

#[derive(Clone)]
pub struct RevListIntoIter<CommitLoaderFn> {
    commit_loader: CommitLoaderFn,
    current_commit_oid: Option<ObjectId>,
}

impl<CommitLoaderFn> Iterator for RevListIntoIter<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    type Item = anyhow::Result<SlimCommit>;

    fn next(&mut self) -> Option<Self::Item> {
        let commit_oid = self.current_commit_oid.take()?;

        match (self.commit_loader)(&commit_oid) {
            Ok(commit) => {
                // Move to the first parent for the next iteration
                self.current_commit_oid = commit.first_parent().cloned();
                Some(Ok(commit))
            }
            // An unreadable commit ends the walk after surfacing the error
            Err(error) => Some(Err(error)),
        }
    }
}
