//! Wire-level request/reply payloads for the five RPC operations, and the
//! response-code taxonomy they map errors onto.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::hash::BlobKey;
use crate::object::ObjectType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ResponseCode {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    InternalServerError = 500,
}

impl From<&StoreError> for ResponseCode {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::BadRequest(_)
            | StoreError::InvalidIndex(_)
            | StoreError::InvalidValueType(_) => ResponseCode::BadRequest,
            StoreError::NotFound(_) => ResponseCode::NotFound,
            StoreError::VerifyFailed(_)
            | StoreError::StoreTimeout(_)
            | StoreError::InvalidElement(_)
            | StoreError::Repository(_)
            | StoreError::Io(_)
            | StoreError::Decode(_)
            | StoreError::Encode(_)
            | StoreError::Database(_)
            | StoreError::Internal(_) => ResponseCode::InternalServerError,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PullRequest {
    pub repository_key: String,
    pub commit_keys_puller_has: HashSet<BlobKey>,
    pub get_head_content: bool,
    pub excluded_types: HashSet<ObjectType>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PullReply {
    pub repo_head_element: Vec<u8>,
    pub commit_elements: Vec<Vec<u8>>,
    pub blob_elements: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushRepoState {
    pub repository_key: String,
    pub blob_keys: HashSet<BlobKey>,
    pub repo_head_element: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushRequest {
    pub repositories: Vec<PushRepoState>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub repository_key: String,
    pub branch: Option<String>,
    pub commit_key: Option<BlobKey>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutReply {
    pub commit_key: BlobKey,
    pub blob_elements: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PutBlobsRequest {
    pub blob_elements: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchBlobsRequest {
    pub blob_keys: Vec<BlobKey>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchBlobsReply {
    pub blob_elements: Vec<Vec<u8>>,
}

/// Every inbound request the dispatcher recognizes. An unrecognized wire
/// message never reaches this enum — the transport layer maps decode
/// failures directly to `bad_request` before dispatch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Request {
    Push(PushRequest),
    Pull(PullRequest),
    Checkout(CheckoutRequest),
    PutBlobs(PutBlobsRequest),
    FetchBlobs(FetchBlobsRequest),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Reply {
    Push,
    Pull(PullReply),
    Checkout(CheckoutReply),
    PutBlobs,
    FetchBlobs(FetchBlobsReply),
}
