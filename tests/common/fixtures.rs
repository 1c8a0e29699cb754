use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use fake::Fake;
use fake::faker::internet::en::FreeEmail;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use repo_cutoff::areas::repository::Repository;
use repo_cutoff::artifacts::branch::branch_name::BranchName;
use repo_cutoff::artifacts::objects::commit::{Author, Commit};
use repo_cutoff::artifacts::objects::object::RawObject;
use repo_cutoff::artifacts::objects::object_id::ObjectId;
use repo_cutoff::artifacts::objects::object_type::ObjectType;
use std::path::Path;

pub fn at(seconds: i64) -> DateTime<FixedOffset> {
    DateTime::from_timestamp(seconds, 0)
        .expect("timestamp in range")
        .fixed_offset()
}

pub fn branch(name: &str) -> BranchName {
    BranchName::try_parse(name.to_string()).expect("valid branch name")
}

/// Store a commit with an empty tree and a random author
pub fn commit_at(repository: &Repository, parents: Vec<ObjectId>, seconds: i64) -> ObjectId {
    let database = repository.database();
    let tree = database
        .store(RawObject::new(ObjectType::Tree, Bytes::new()))
        .expect("Failed to store tree");

    let author = Author::new_with_timestamp(
        Name().fake::<String>(),
        FreeEmail().fake::<String>(),
        at(seconds),
    );
    let message = Words(3..6).fake::<Vec<String>>().join(" ");

    database
        .store(Commit::new(parents, tree, author.clone(), author, message))
        .expect("Failed to store commit")
}

/// Append one commit per timestamp to `branch`, oldest first
pub fn extend_branch(
    repository: &Repository,
    branch_name: &str,
    parent: Option<ObjectId>,
    timestamps: &[i64],
) -> Vec<ObjectId> {
    let mut oids: Vec<ObjectId> = Vec::new();
    for &seconds in timestamps {
        let parent = oids.last().cloned().or_else(|| parent.clone());
        oids.push(commit_at(repository, parent.into_iter().collect(), seconds));
    }

    if let Some(tip) = oids.last() {
        repository
            .refs()
            .update_branch(&branch(branch_name), tip)
            .expect("Failed to update branch");
    }
    oids
}

/// Repository under `dir` with a linear `main`, checked out at its tip
pub fn linear_repository(dir: &Path, timestamps: &[i64]) -> Vec<ObjectId> {
    let repository = Repository::init(dir).expect("Failed to init repository");
    extend_branch(&repository, "main", None, timestamps)
}
