//! `IdRef`: a reference to a specific commit of a specific repository's
//! branch. Used as the subject/predicate/object of an association, and as
//! the value `Repository::set_repository_reference` fills in.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::hash::BlobKey;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct IdRef {
    pub repository_key: String,
    pub branch: String,
    pub commit: BlobKey,
}

impl IdRef {
    pub fn new(repository_key: impl Into<String>, branch: impl Into<String>, commit: BlobKey) -> Self {
        IdRef {
            repository_key: repository_key.into(),
            branch: branch.into(),
            commit,
        }
    }
}
