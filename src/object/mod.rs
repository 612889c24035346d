//! Object model for the versioned store.
//!
//! A *structure element* is the unit the blob store persists: an immutable,
//! content-addressed node of the object DAG. This module defines the
//! element type tags, the outbound-link representation that lets the
//! workbench chase the DAG without understanding each payload, and the
//! codec that turns a typed in-memory value into the bytes whose hash is
//! its key (and back).
//!
//! Every concrete element type (commit, association, resource, terminology,
//! content) is a thin `key`-carrying wrapper around a `*Body` type that
//! implements `bincode::Encode`/`Decode`. The key is always the hash of the
//! body's encoded bytes, never encoded into the body itself — that would
//! make the hash depend on the hash, which the content-addressing
//! invariant forbids.

pub mod association;
pub mod commit;
pub mod content;
pub mod idref;
pub mod mutable_head;
pub mod resource;
pub mod signature;
pub mod terminology;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::hash::BlobKey;

pub use association::Association;
pub use commit::Commit;
pub use content::ContentBlob;
pub use idref::IdRef;
pub use resource::{LifecycleState, Resource};
pub use terminology::Terminology;

/// The type tag carried alongside every link and every element. Opaque to
/// the blob store; meaningful only to the object model and the workbench's
/// `excluded_types` filter.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Commit,
    Resource,
    Association,
    Terminology,
    Content,
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObjectType::Commit => "commit",
            ObjectType::Resource => "resource",
            ObjectType::Association => "association",
            ObjectType::Terminology => "terminology",
            ObjectType::Content => "content",
        };
        write!(f, "{s}")
    }
}

/// An outbound link from one structure element to another: the target's
/// key, its type (so a filter can skip descending without decoding), and a
/// logical name for the edge (e.g. `"root"`, `"content"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Link {
    pub target: BlobKey,
    pub target_type: ObjectType,
    pub name: String,
}

impl Link {
    pub fn new(name: impl Into<String>, target: BlobKey, target_type: ObjectType) -> Self {
        Link {
            target,
            target_type,
            name: name.into(),
        }
    }
}

/// Anything that can report its own outbound links, for the workbench's
/// transitive blob fetch.
pub trait HasLinks {
    fn links(&self) -> Vec<Link>;
}

/// The wire representation of a structure element: a tagged sum of every
/// element body type. `bincode`'s enum-variant discriminant serves as the
/// "type tag byte" the spec calls for; the payload is everything else.
#[derive(Clone, Debug, Encode, Decode)]
enum ElementBody {
    Commit(commit::CommitBody),
    Resource(resource::ResourceBody),
    Association(association::AssociationBody),
    Terminology(terminology::TerminologyBody),
    Content(content::ContentBody),
}

/// A decoded structure element together with the key it hashes to. This is
/// what `index_hash` and the blob store exchange.
#[derive(Clone, Debug)]
pub enum Element {
    Commit(Commit),
    Resource(Resource),
    Association(Association),
    Terminology(Terminology),
    Content(ContentBlob),
}

impl Element {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Element::Commit(_) => ObjectType::Commit,
            Element::Resource(_) => ObjectType::Resource,
            Element::Association(_) => ObjectType::Association,
            Element::Terminology(_) => ObjectType::Terminology,
            Element::Content(_) => ObjectType::Content,
        }
    }

    pub fn key(&self) -> BlobKey {
        match self {
            Element::Commit(c) => c.id,
            Element::Resource(r) => r.id,
            Element::Association(a) => a.id,
            Element::Terminology(t) => t.id,
            Element::Content(c) => c.id,
        }
    }

    pub fn links(&self) -> Vec<Link> {
        match self {
            Element::Commit(c) => c.links(),
            Element::Resource(r) => r.links(),
            Element::Association(a) => a.links(),
            Element::Terminology(t) => t.links(),
            Element::Content(c) => c.links(),
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Element::Commit(c) => Some(c),
            _ => None,
        }
    }
}

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Serialize an already-keyed element back to its canonical bytes (for
/// transport or for re-verifying a key).
pub fn encode_element(element: &Element) -> Result<Vec<u8>, StoreError> {
    let body = match element {
        Element::Commit(c) => ElementBody::Commit(c.body.clone()),
        Element::Resource(r) => ElementBody::Resource(r.body.clone()),
        Element::Association(a) => ElementBody::Association(a.body.clone()),
        Element::Terminology(t) => ElementBody::Terminology(t.body.clone()),
        Element::Content(c) => ElementBody::Content(c.body.clone()),
    };
    Ok(bincode::encode_to_vec(&body, BINCODE_CONFIG)?)
}

/// Parse bytes into a typed, keyed structure element. The key is always
/// recomputed from the bytes — callers that need to verify a claimed key
/// against untrusted bytes compare it against `element.key()`.
pub fn decode_element(bytes: &[u8]) -> Result<Element, StoreError> {
    let (body, _): (ElementBody, usize) = bincode::decode_from_slice(bytes, BINCODE_CONFIG)?;
    let key = BlobKey::new(bytes);
    Ok(match body {
        ElementBody::Commit(body) => Element::Commit(Commit { id: key, body }),
        ElementBody::Resource(body) => Element::Resource(Resource { id: key, body }),
        ElementBody::Association(body) => Element::Association(Association { id: key, body }),
        ElementBody::Terminology(body) => Element::Terminology(Terminology { id: key, body }),
        ElementBody::Content(body) => Element::Content(ContentBlob { id: key, body }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::content::ContentBlob;

    #[test]
    fn round_trip_preserves_key() {
        let content = ContentBlob::new(b"ctd cast 0091".to_vec());
        let bytes = encode_element(&Element::Content(content.clone())).unwrap();
        let decoded = decode_element(&bytes).unwrap();
        assert_eq!(decoded.key(), content.id);
    }

    #[test]
    fn equal_content_equal_key() {
        let a = ContentBlob::new(b"same bytes".to_vec());
        let b = ContentBlob::new(b"same bytes".to_vec());
        assert_eq!(a.id, b.id);
    }
}
