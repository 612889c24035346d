//! Commit objects: the distinguished element type that roots a snapshot —
//! exactly one object root (an association, resource, or terminology) plus
//! zero or more parent commits plus author/committer/message metadata.
//!
//! A commit's identity is the hash of its own serialized bytes; parent
//! edges are therefore acyclic by construction, since a child's key
//! depends on its parents' keys.

use bincode::{Decode, Encode};

use super::signature::Signature;
use super::{HasLinks, Link, ObjectType};
use crate::hash::BlobKey;

#[derive(Clone, Debug, Encode, Decode)]
pub struct CommitBody {
    pub root_key: BlobKey,
    pub root_type: ObjectType,
    pub parent_commit_ids: Vec<BlobKey>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct Commit {
    pub id: BlobKey,
    pub body: CommitBody,
}

impl Commit {
    pub fn new(
        author: Signature,
        committer: Signature,
        root_key: BlobKey,
        root_type: ObjectType,
        parent_commit_ids: Vec<BlobKey>,
        message: impl Into<String>,
    ) -> Self {
        let body = CommitBody {
            root_key,
            root_type,
            parent_commit_ids,
            author,
            committer,
            message: message.into(),
        };
        let encoded = bincode::encode_to_vec(&body, bincode::config::standard())
            .expect("commit body encoding is infallible");
        let id = BlobKey::new(&encoded);
        Commit { id, body }
    }

    pub fn root_key(&self) -> BlobKey {
        self.body.root_key
    }

    pub fn root_type(&self) -> ObjectType {
        self.body.root_type
    }

    pub fn parents(&self) -> &[BlobKey] {
        &self.body.parent_commit_ids
    }

    pub fn message(&self) -> &str {
        &self.body.message
    }
}

impl HasLinks for Commit {
    fn links(&self) -> Vec<Link> {
        vec![Link::new("root", self.body.root_key, self.body.root_type)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::signature::Signature;

    fn sig() -> Signature {
        Signature::new("tester", "tester@example.org")
    }

    #[test]
    fn identical_content_dedupes_to_same_key() {
        let root = BlobKey::new(b"a resource body");
        let a = Signature::at("tester", "tester@example.org", Default::default());
        let b = Signature::at("tester", "tester@example.org", Default::default());
        let c1 = Commit::new(
            a,
            sig(),
            root,
            ObjectType::Resource,
            vec![],
            "initial snapshot",
        );
        let c2 = Commit::new(
            b,
            sig(),
            root,
            ObjectType::Resource,
            vec![],
            "initial snapshot",
        );
        // Same inputs except committer timestamp, which `sig()` makes
        // non-deterministic across the two calls — so only assert the
        // deterministic half: fixing every field produces the same key.
        assert_ne!(c1.id, c2.id, "committer timestamps differ so keys should differ");

        let committer = sig();
        let c3 = Commit::new(
            Signature::at("tester", "tester@example.org", Default::default()),
            committer.clone(),
            root,
            ObjectType::Resource,
            vec![],
            "initial snapshot",
        );
        let c4 = Commit::new(
            Signature::at("tester", "tester@example.org", Default::default()),
            committer,
            root,
            ObjectType::Resource,
            vec![],
            "initial snapshot",
        );
        assert_eq!(c3.id, c4.id);
    }

    #[test]
    fn links_to_its_root() {
        let root = BlobKey::new(b"a resource body");
        let commit = Commit::new(
            sig(),
            sig(),
            root,
            ObjectType::Resource,
            vec![],
            "msg",
        );
        let links = commit.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, root);
        assert_eq!(links[0].target_type, ObjectType::Resource);
    }
}
