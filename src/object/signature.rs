//! Author/committer signature attached to a commit.

use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Signature {
    pub name: String,
    pub email: String,
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Signature {
            name: name.into(),
            email: email.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn at(name: impl Into<String>, email: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Signature {
            name: name.into(),
            email: email.into(),
            timestamp,
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} <{}> {}",
            self.name,
            self.email,
            self.timestamp.timestamp()
        )
    }
}
