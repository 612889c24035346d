//! The in-memory working set for one `repository_key`: a commit index, a
//! local blob cache (`index_hash`), a mutable head, and the dirty/clean
//! status of the currently checked-out working object.

use std::collections::HashMap;

use crate::errors::StoreError;
use crate::hash::BlobKey;
use crate::object::commit::Commit;
use crate::object::idref::IdRef;
use crate::object::mutable_head::MutableHead;
use crate::object::signature::Signature;
use crate::object::{decode_element, Element, ObjectType};

/// Whether the checked-out working object differs from the last commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepoStatus {
    UpToDate,
    Modified,
}

/// Either a named branch or an exact commit, as accepted by `checkout`.
#[derive(Clone, Debug)]
pub enum CheckoutTarget {
    Branch(String),
    Commit(BlobKey),
}

pub struct Repository {
    pub repository_key: String,
    pub commit_index: HashMap<BlobKey, Commit>,
    pub index_hash: HashMap<BlobKey, Element>,
    pub head: MutableHead,
    pub status: RepoStatus,
    pub cached: bool,
    working_root: Option<(BlobKey, ObjectType)>,
    working_branch: String,
}

const DEFAULT_BRANCH: &str = "master";

impl Repository {
    pub fn new(repository_key: impl Into<String>) -> Self {
        let repository_key = repository_key.into();
        Repository {
            head: MutableHead::new(repository_key.clone()),
            repository_key,
            commit_index: HashMap::new(),
            index_hash: HashMap::new(),
            status: RepoStatus::UpToDate,
            cached: false,
            working_root: None,
            working_branch: DEFAULT_BRANCH.to_string(),
        }
    }

    /// Stage a new working object root. Marks the repository `Modified` so
    /// a subsequent `commit` is permitted.
    pub fn set_working_root(&mut self, root: BlobKey, root_type: ObjectType) {
        self.working_root = Some((root, root_type));
        self.status = RepoStatus::Modified;
    }

    /// Register a decoded structure element in the local cache, and in the
    /// commit index too if it is a commit.
    pub fn load_element(&mut self, bytes: &[u8]) -> Result<Element, StoreError> {
        let element = decode_element(bytes)?;
        if let Element::Commit(commit) = &element {
            self.commit_index.insert(commit.id, commit.clone());
        }
        self.index_hash.insert(element.key(), element.clone());
        Ok(element)
    }

    /// Snapshot the current working object into a new commit whose parents
    /// are the current heads of `branch`, and advance that branch's head.
    /// Requires `status == Modified`.
    pub fn commit(
        &mut self,
        branch: &str,
        author: Signature,
        committer: Signature,
        message: impl Into<String>,
    ) -> Result<BlobKey, StoreError> {
        if self.status != RepoStatus::Modified {
            return Err(StoreError::Repository(
                "commit requested with no modified working object".to_string(),
            ));
        }
        let (root_key, root_type) = self
            .working_root
            .ok_or_else(|| StoreError::Repository("no working object staged".to_string()))?;

        let parents = self
            .head
            .branch(branch)
            .map(|b| b.commit_refs.clone())
            .unwrap_or_default();

        let commit = Commit::new(author, committer, root_key, root_type, parents, message);
        let key = commit.id;

        self.index_hash.insert(key, Element::Commit(commit.clone()));
        self.commit_index.insert(key, commit);
        self.head.branches.retain(|b| b.name != branch);
        self.head.attach(branch, key);
        self.working_branch = branch.to_string();
        self.status = RepoStatus::UpToDate;
        Ok(key)
    }

    /// Fork the current head of `working_branch` under `name`.
    pub fn branch(&mut self, name: &str) -> Result<(), StoreError> {
        let refs = self
            .head
            .branch(&self.working_branch)
            .map(|b| b.commit_refs.clone())
            .ok_or_else(|| {
                StoreError::Repository(format!(
                    "no commits yet on `{}` to branch from",
                    self.working_branch
                ))
            })?;
        for commit in refs {
            self.head.attach(name, commit);
        }
        Ok(())
    }

    /// Load the named head (or an exact commit) as the working object.
    pub fn checkout(&mut self, target: CheckoutTarget) -> Result<BlobKey, StoreError> {
        let commit_key = match target {
            CheckoutTarget::Commit(key) => key,
            CheckoutTarget::Branch(name) => {
                let branch = self.head.branch(&name).ok_or_else(|| {
                    StoreError::not_found(format!("branch `{name}` not found"))
                })?;
                match branch.commit_refs.as_slice() {
                    [single] => *single,
                    [] => {
                        return Err(StoreError::not_found(format!(
                            "branch `{name}` has no commits"
                        )))
                    }
                    _ => {
                        return Err(StoreError::Repository(format!(
                            "branch `{name}` has an unmerged fork; resolve with merge_with"
                        )))
                    }
                }
            }
        };
        let commit = self
            .commit_index
            .get(&commit_key)
            .ok_or_else(|| StoreError::not_found(format!("commit {commit_key} not found")))?;
        self.working_root = Some((commit.root_key(), commit.root_type()));
        self.status = RepoStatus::UpToDate;
        Ok(commit_key)
    }

    /// Produce a merge commit whose parents are the heads of both branches.
    /// Caller is responsible for removing `branch` afterward if desired.
    pub fn merge_with(
        &mut self,
        branch: &str,
        parent_branch: &str,
        author: Signature,
        committer: Signature,
        message: impl Into<String>,
    ) -> Result<BlobKey, StoreError> {
        let mut parents = self
            .head
            .branch(branch)
            .map(|b| b.commit_refs.clone())
            .unwrap_or_default();
        let other = self
            .head
            .branch(parent_branch)
            .map(|b| b.commit_refs.clone())
            .unwrap_or_default();
        for commit in other {
            if !parents.contains(&commit) {
                parents.push(commit);
            }
        }
        if parents.is_empty() {
            return Err(StoreError::Repository(format!(
                "neither `{branch}` nor `{parent_branch}` has any commits to merge"
            )));
        }

        let first_parent = parents[0];
        let (root_key, root_type) = self
            .commit_index
            .get(&first_parent)
            .map(|c| (c.root_key(), c.root_type()))
            .ok_or_else(|| StoreError::not_found(format!("commit {first_parent} not found")))?;

        let commit = Commit::new(author, committer, root_key, root_type, parents, message);
        let key = commit.id;
        self.index_hash.insert(key, Element::Commit(commit.clone()));
        self.commit_index.insert(key, commit);
        self.head.branches.retain(|b| b.name != parent_branch);
        self.head.attach(parent_branch, key);
        Ok(key)
    }

    /// All commit refs across all branches.
    pub fn current_heads(&self) -> Vec<BlobKey> {
        self.head.all_commit_keys()
    }

    /// Fill `idref` with this repository's key and, if `current_state`,
    /// `branch`'s single current head commit.
    pub fn set_repository_reference(
        &self,
        idref: &mut IdRef,
        branch: &str,
        current_state: bool,
    ) -> Result<(), StoreError> {
        idref.repository_key = self.repository_key.clone();
        if current_state {
            let refs = self
                .head
                .branch(branch)
                .map(|b| b.commit_refs.as_slice())
                .unwrap_or(&[]);
            let commit = refs.first().ok_or_else(|| {
                StoreError::not_found(format!("branch `{branch}` has no current commit"))
            })?;
            idref.branch = branch.to_string();
            idref.commit = *commit;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::content::ContentBlob;

    fn sig() -> Signature {
        Signature::new("tester", "tester@example.org")
    }

    #[test]
    fn commit_requires_modified_status() {
        let mut repo = Repository::new("R1");
        let err = repo.commit("master", sig(), sig(), "first").unwrap_err();
        assert!(matches!(err, StoreError::Repository(_)));
    }

    #[test]
    fn commit_then_checkout_round_trips() {
        let mut repo = Repository::new("R1");
        let content = ContentBlob::new(b"cast".to_vec());
        repo.index_hash
            .insert(content.id, Element::Content(content.clone()));
        repo.set_working_root(content.id, ObjectType::Content);
        let commit_key = repo.commit("master", sig(), sig(), "first").unwrap();

        let checked_out = repo
            .checkout(CheckoutTarget::Branch("master".to_string()))
            .unwrap();
        assert_eq!(checked_out, commit_key);
    }

    #[test]
    fn branch_forks_current_head() {
        let mut repo = Repository::new("R1");
        let content = ContentBlob::new(b"cast".to_vec());
        repo.set_working_root(content.id, ObjectType::Content);
        repo.commit("master", sig(), sig(), "first").unwrap();

        repo.branch("dev").unwrap();
        assert_eq!(
            repo.head.branch("dev").unwrap().commit_refs,
            repo.head.branch("master").unwrap().commit_refs
        );
    }
}
