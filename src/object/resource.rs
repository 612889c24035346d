//! Resource commit roots: a typed, lifecycle-tracked entity (a dataset, an
//! instrument, a platform, …) with an optional opaque content blob.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::{HasLinks, Link, ObjectType};
use crate::errors::StoreError;
use crate::hash::BlobKey;

/// Mirrors the lifecycle enumeration in the data model exactly; values are
/// indexed verbatim as `resource_life_cycle_state`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode,
)]
#[serde(rename_all = "PascalCase")]
pub enum LifecycleState {
    New,
    Active,
    Inactive,
    Commissioned,
    Decommissioned,
    Retired,
    Developed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::New => "New",
            LifecycleState::Active => "Active",
            LifecycleState::Inactive => "Inactive",
            LifecycleState::Commissioned => "Commissioned",
            LifecycleState::Decommissioned => "Decommissioned",
            LifecycleState::Retired => "Retired",
            LifecycleState::Developed => "Developed",
        }
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "New" => LifecycleState::New,
            "Active" => LifecycleState::Active,
            "Inactive" => LifecycleState::Inactive,
            "Commissioned" => LifecycleState::Commissioned,
            "Decommissioned" => LifecycleState::Decommissioned,
            "Retired" => LifecycleState::Retired,
            "Developed" => LifecycleState::Developed,
            other => {
                return Err(StoreError::InvalidElement(format!(
                    "`{other}` is not a valid resource lifecycle state"
                )));
            }
        })
    }
}

#[derive(Clone, Debug, Encode, Decode)]
pub struct ResourceBody {
    pub resource_type: String,
    pub lifecycle_state: LifecycleState,
    pub name: String,
    pub content: Option<BlobKey>,
}

#[derive(Clone, Debug)]
pub struct Resource {
    pub id: BlobKey,
    pub body: ResourceBody,
}

impl Resource {
    pub fn new(
        resource_type: impl Into<String>,
        lifecycle_state: LifecycleState,
        name: impl Into<String>,
        content: Option<BlobKey>,
    ) -> Self {
        let body = ResourceBody {
            resource_type: resource_type.into(),
            lifecycle_state,
            name: name.into(),
            content,
        };
        let encoded = bincode::encode_to_vec(&body, bincode::config::standard())
            .expect("resource body encoding is infallible");
        let id = BlobKey::new(&encoded);
        Resource { id, body }
    }

    pub fn resource_type(&self) -> &str {
        &self.body.resource_type
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.body.lifecycle_state
    }
}

impl HasLinks for Resource {
    fn links(&self) -> Vec<Link> {
        match self.body.content {
            Some(target) => vec![Link::new("content", target, ObjectType::Content)],
            None => Vec::new(),
        }
    }
}
