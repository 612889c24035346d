//! Terminology commit roots: a single indexed keyword, used to tag
//! vocabulary entries (units, parameter names, controlled-vocabulary
//! terms) that resources and associations refer to by repository key.

use bincode::{Decode, Encode};

use super::{HasLinks, Link};
use crate::hash::BlobKey;

#[derive(Clone, Debug, Encode, Decode)]
pub struct TerminologyBody {
    pub keyword: String,
}

#[derive(Clone, Debug)]
pub struct Terminology {
    pub id: BlobKey,
    pub body: TerminologyBody,
}

impl Terminology {
    pub fn new(keyword: impl Into<String>) -> Self {
        let body = TerminologyBody {
            keyword: keyword.into(),
        };
        let encoded = bincode::encode_to_vec(&body, bincode::config::standard())
            .expect("terminology body encoding is infallible");
        let id = BlobKey::new(&encoded);
        Terminology { id, body }
    }

    pub fn keyword(&self) -> &str {
        &self.body.keyword
    }
}

impl HasLinks for Terminology {
    fn links(&self) -> Vec<Link> {
        Vec::new()
    }
}
