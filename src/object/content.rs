//! Opaque content blobs: the leaf payload a `Resource` root may link to
//! (instrument readings, a dataset fragment, …). The store never
//! interprets these bytes.

use bincode::{Decode, Encode};

use super::{HasLinks, Link};
use crate::hash::BlobKey;

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct ContentBody {
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct ContentBlob {
    pub id: BlobKey,
    pub body: ContentBody,
}

impl ContentBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        let body = ContentBody { bytes };
        let encoded = bincode::encode_to_vec(&body, bincode::config::standard())
            .expect("content body encoding is infallible");
        let id = BlobKey::new(&encoded);
        ContentBlob { id, body }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body.bytes
    }
}

impl HasLinks for ContentBlob {
    fn links(&self) -> Vec<Link> {
        Vec::new()
    }
}
