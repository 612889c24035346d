//! The mutable head: a repository's set of branches and their current
//! commit refs. Never stored as a blob — it is reconstructed on demand
//! from the commit store's `branch_name` column and carried over the wire
//! as a plain serializable value.

use std::collections::{HashMap, HashSet};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::hash::BlobKey;
use crate::object::commit::Commit;

/// A named pointer to one or more current head commits. More than one
/// commit ref means a fork created by concurrent writers that has not yet
/// been merged locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Branch {
    pub name: String,
    pub commit_refs: Vec<BlobKey>,
}

impl Branch {
    pub fn new(name: impl Into<String>, commit_refs: Vec<BlobKey>) -> Self {
        Branch {
            name: name.into(),
            commit_refs,
        }
    }

    /// Add a commit ref to this branch's head set, deduping by key.
    pub fn attach(&mut self, commit: BlobKey) {
        if !self.commit_refs.contains(&commit) {
            self.commit_refs.push(commit);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, Default)]
pub struct MutableHead {
    pub repository_key: String,
    pub branches: Vec<Branch>,
}

impl MutableHead {
    pub fn new(repository_key: impl Into<String>) -> Self {
        MutableHead {
            repository_key: repository_key.into(),
            branches: Vec::new(),
        }
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name == name)
    }

    pub fn branch_mut(&mut self, name: &str) -> Option<&mut Branch> {
        self.branches.iter_mut().find(|b| b.name == name)
    }

    pub fn attach(&mut self, branch_name: &str, commit: BlobKey) {
        match self.branch_mut(branch_name) {
            Some(branch) => branch.attach(commit),
            None => self
                .branches
                .push(Branch::new(branch_name.to_string(), vec![commit])),
        }
    }

    pub fn remove_branch(&mut self, name: &str) {
        self.branches.retain(|b| b.name != name);
    }

    /// All commit keys across all branches, deduplicated.
    pub fn all_commit_keys(&self) -> Vec<BlobKey> {
        let mut keys: Vec<BlobKey> = self
            .branches
            .iter()
            .flat_map(|b| b.commit_refs.iter().copied())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Merge rule from `_update_repo_to_head`: for each branch in `other`,
    /// reconcile its commit refs into the matching branch here (creating it
    /// if absent). An incoming ref that descends from a ref already present
    /// replaces it — a fast-forward demotes the old head. An incoming ref
    /// that is itself an ancestor of a ref already present is dropped.
    /// Refs that are ancestors of neither union, remaining an unmerged fork.
    pub fn merge_from(&mut self, other: &MutableHead, commit_index: &HashMap<BlobKey, Commit>) {
        for branch in &other.branches {
            match self.branch_mut(&branch.name) {
                Some(existing) => {
                    for incoming in &branch.commit_refs {
                        existing
                            .commit_refs
                            .retain(|current| !is_ancestor(commit_index, *current, *incoming));
                        let superseded = existing
                            .commit_refs
                            .iter()
                            .any(|current| is_ancestor(commit_index, *incoming, *current));
                        if !superseded {
                            existing.attach(*incoming);
                        }
                    }
                }
                None => self.branches.push(branch.clone()),
            }
        }
    }
}

/// Whether `ancestor` is a strict ancestor of `descendant`, walking parent
/// edges through `commit_index`.
fn is_ancestor(
    commit_index: &HashMap<BlobKey, Commit>,
    ancestor: BlobKey,
    descendant: BlobKey,
) -> bool {
    let mut frontier = vec![descendant];
    let mut seen = HashSet::new();
    while let Some(key) = frontier.pop() {
        if !seen.insert(key) {
            continue;
        }
        let Some(commit) = commit_index.get(&key) else {
            continue;
        };
        for parent in commit.parents() {
            if *parent == ancestor {
                return true;
            }
            frontier.push(*parent);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::signature::Signature;
    use crate::object::ObjectType;

    fn sig() -> Signature {
        Signature::new("tester", "tester@example.org")
    }

    fn root() -> BlobKey {
        BlobKey::new(b"some object root")
    }

    #[test]
    fn merge_unions_distinct_branches() {
        let k1 = BlobKey::new(b"c1");
        let k2 = BlobKey::new(b"c2");
        let mut head = MutableHead::new("R1");
        head.attach("master", k1);

        let mut incoming = MutableHead::new("R1");
        incoming.attach("dev", k2);

        head.merge_from(&incoming, &HashMap::new());
        assert_eq!(head.branches.len(), 2);
    }

    #[test]
    fn merge_dedupes_same_commit_on_same_branch() {
        let k1 = BlobKey::new(b"c1");
        let mut head = MutableHead::new("R1");
        head.attach("master", k1);

        let mut incoming = MutableHead::new("R1");
        incoming.attach("master", k1);

        head.merge_from(&incoming, &HashMap::new());
        assert_eq!(head.branch("master").unwrap().commit_refs.len(), 1);
    }

    #[test]
    fn merge_keeps_distinct_refs_as_unmerged_fork() {
        let k1 = BlobKey::new(b"c1");
        let k2 = BlobKey::new(b"c2");
        let mut head = MutableHead::new("R1");
        head.attach("master", k1);

        let mut incoming = MutableHead::new("R1");
        incoming.attach("master", k2);

        head.merge_from(&incoming, &HashMap::new());
        assert_eq!(head.branch("master").unwrap().commit_refs.len(), 2);
    }

    #[test]
    fn merge_fast_forward_demotes_the_parent_head() {
        let c1 = Commit::new(sig(), sig(), root(), ObjectType::Resource, vec![], "first");
        let c2 = Commit::new(
            sig(),
            sig(),
            root(),
            ObjectType::Resource,
            vec![c1.id],
            "second",
        );
        let mut commit_index = HashMap::new();
        commit_index.insert(c1.id, c1.clone());
        commit_index.insert(c2.id, c2.clone());

        let mut head = MutableHead::new("R1");
        head.attach("master", c1.id);

        let mut incoming = MutableHead::new("R1");
        incoming.attach("master", c2.id);

        head.merge_from(&incoming, &commit_index);
        assert_eq!(head.branch("master").unwrap().commit_refs, vec![c2.id]);
    }

    #[test]
    fn merge_does_not_regress_to_an_ancestor() {
        let c1 = Commit::new(sig(), sig(), root(), ObjectType::Resource, vec![], "first");
        let c2 = Commit::new(
            sig(),
            sig(),
            root(),
            ObjectType::Resource,
            vec![c1.id],
            "second",
        );
        let mut commit_index = HashMap::new();
        commit_index.insert(c1.id, c1.clone());
        commit_index.insert(c2.id, c2.clone());

        let mut head = MutableHead::new("R1");
        head.attach("master", c2.id);

        let mut incoming = MutableHead::new("R1");
        incoming.attach("master", c1.id);

        head.merge_from(&incoming, &commit_index);
        assert_eq!(head.branch("master").unwrap().commit_refs, vec![c2.id]);
    }
}
