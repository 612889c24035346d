//! Association commit roots: a (subject, predicate, object) triple of
//! `IdRef`s, each naming a specific commit of a specific repository's
//! branch. These are the edges of the cross-repository resource graph
//! (ownership, membership, `has_a`, …) and are the query substrate for the
//! six `subject_*`/`predicate_*`/`object_*` indexed columns.

use bincode::{Decode, Encode};

use super::idref::IdRef;
use super::{HasLinks, Link};
use crate::hash::BlobKey;

#[derive(Clone, Debug, Encode, Decode)]
pub struct AssociationBody {
    pub subject: IdRef,
    pub predicate: IdRef,
    pub object: IdRef,
}

#[derive(Clone, Debug)]
pub struct Association {
    pub id: BlobKey,
    pub body: AssociationBody,
}

impl Association {
    pub fn new(subject: IdRef, predicate: IdRef, object: IdRef) -> Self {
        let body = AssociationBody {
            subject,
            predicate,
            object,
        };
        let encoded = bincode::encode_to_vec(&body, bincode::config::standard())
            .expect("association body encoding is infallible");
        let id = BlobKey::new(&encoded);
        Association { id, body }
    }
}

impl HasLinks for Association {
    fn links(&self) -> Vec<Link> {
        // Subject/predicate/object reference commits of *other*
        // repositories, not blobs within this object root's own subtree,
        // so they are not outbound DAG links for closure purposes.
        Vec::new()
    }
}
