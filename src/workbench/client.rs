//! The client-side workbench: the caller-initiated half of the sync
//! protocol. Holds its own repositories and blob cache, and drives
//! `pull`/`push`/`checkout`/`fetch_blobs`/`put_blobs` against a
//! [`ServerWorkbench`] (in-process here; a real deployment would put an RPC
//! transport at this seam without changing anything above it).

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use lru_mem::LruCache;
use tokio::sync::Mutex;

use crate::errors::StoreError;
use crate::hash::BlobKey;
use crate::object::mutable_head::MutableHead;
use crate::object::{decode_element, encode_element, Element, ObjectType};
use crate::repository::{CheckoutTarget, Repository};

use super::server::{ReverseFetch, ServerWorkbench};
use crate::protocol::types::{
    CheckoutRequest, FetchBlobsRequest, PullRequest, PushRepoState, PushRequest, PutBlobsRequest,
};

pub struct Workbench {
    repos: DashMap<String, Repository>,
    workbench_cache: Mutex<LruCache<String, Vec<u8>>>,
}

impl Workbench {
    pub fn new(cache_size: usize) -> Self {
        Workbench {
            repos: DashMap::new(),
            workbench_cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    fn with_repo<R>(&self, repository_key: &str, f: impl FnOnce(&mut Repository) -> R) -> R {
        let mut entry = self
            .repos
            .entry(repository_key.to_string())
            .or_insert_with(|| Repository::new(repository_key.to_string()));
        f(entry.value_mut())
    }

    /// Stage a new working object locally, ready to be committed.
    pub fn set_working_root(&self, repository_key: &str, root: BlobKey, root_type: ObjectType) {
        self.with_repo(repository_key, |repo| repo.set_working_root(root, root_type));
    }

    pub fn load_element(&self, repository_key: &str, bytes: &[u8]) -> Result<Element, StoreError> {
        self.with_repo(repository_key, |repo| repo.load_element(bytes))
    }

    pub async fn commit(
        &self,
        repository_key: &str,
        branch: &str,
        author: crate::object::signature::Signature,
        committer: crate::object::signature::Signature,
        message: impl Into<String>,
    ) -> Result<BlobKey, StoreError> {
        self.with_repo(repository_key, |repo| {
            repo.commit(branch, author, committer, message)
        })
    }

    /// Pull from `server`: reconcile the local head with the server's, and
    /// (if `get_head_content`) hydrate the local cache with every blob
    /// reachable from the server's current heads, minus `excluded_types`.
    pub async fn pull(
        &self,
        server: &ServerWorkbench,
        repository_key: &str,
        get_head_content: bool,
        excluded_types: HashSet<ObjectType>,
    ) -> Result<(), StoreError> {
        let commit_keys_puller_has: HashSet<BlobKey> =
            self.with_repo(repository_key, |repo| repo.commit_index.keys().copied().collect());

        let reply = server
            .op_pull(PullRequest {
                repository_key: repository_key.to_string(),
                commit_keys_puller_has,
                get_head_content,
                excluded_types,
            })
            .await?;

        let (head, _): (MutableHead, usize) =
            bincode::decode_from_slice(&reply.repo_head_element, bincode::config::standard())?;

        self.with_repo(repository_key, |repo| {
            for bytes in reply.commit_elements.iter().chain(reply.blob_elements.iter()) {
                if let Ok(element) = decode_element(bytes) {
                    if let Element::Commit(commit) = &element {
                        repo.commit_index.insert(commit.id, commit.clone());
                    }
                    repo.index_hash.insert(element.key(), element);
                }
            }
            repo.head.merge_from(&head, &repo.commit_index);
        });
        Ok(())
    }

    /// Push the local state of `repository_key` to `server`.
    pub async fn push(
        &self,
        server: &ServerWorkbench,
        repository_key: &str,
    ) -> Result<(), StoreError> {
        let (blob_keys, head_bytes) = self.with_repo(repository_key, |repo| {
            let blob_keys: HashSet<BlobKey> = repo.index_hash.keys().copied().collect();
            let head_bytes = bincode::encode_to_vec(&repo.head, bincode::config::standard())
                .expect("mutable head encoding is infallible");
            (blob_keys, head_bytes)
        });

        server
            .op_push(
                PushRequest {
                    repositories: vec![PushRepoState {
                        repository_key: repository_key.to_string(),
                        blob_keys,
                        repo_head_element: head_bytes,
                    }],
                },
                self,
            )
            .await
    }

    /// Navigate read-only to a specific commit or branch without altering
    /// the local working object.
    pub async fn checkout(
        &self,
        server: &ServerWorkbench,
        repository_key: &str,
        target: CheckoutTarget,
    ) -> Result<BlobKey, StoreError> {
        let (branch, commit_key) = match target {
            CheckoutTarget::Branch(name) => (Some(name), None),
            CheckoutTarget::Commit(key) => (None, Some(key)),
        };
        let reply = server
            .op_checkout(CheckoutRequest {
                repository_key: repository_key.to_string(),
                branch,
                commit_key,
            })
            .await?;

        self.with_repo(repository_key, |repo| {
            for bytes in &reply.blob_elements {
                if let Ok(element) = decode_element(bytes) {
                    repo.index_hash.insert(element.key(), element);
                }
            }
        });
        Ok(reply.commit_key)
    }

    pub async fn fetch_blobs(
        &self,
        server: &ServerWorkbench,
        keys: &[BlobKey],
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let reply = server
            .op_fetch_blobs(FetchBlobsRequest {
                blob_keys: keys.to_vec(),
            })
            .await?;
        Ok(reply.blob_elements)
    }

    pub async fn put_blobs(
        &self,
        server: &ServerWorkbench,
        blob_elements: Vec<Vec<u8>>,
    ) -> Result<(), StoreError> {
        server.op_put_blobs(PutBlobsRequest { blob_elements }).await
    }
}

/// Serves the server's reverse `fetch_blobs` call during `push`: the
/// server asks the pusher for exactly the blobs it is missing.
#[async_trait]
impl ReverseFetch for Workbench {
    async fn fetch_blobs(&self, keys: &[BlobKey]) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let bytes = {
                let cached = self.workbench_cache.lock().await.get(&key.to_hex()).cloned();
                match cached {
                    Some(bytes) => bytes,
                    None => {
                        let found = self.repos.iter().find_map(|entry| {
                            entry.value().index_hash.get(key).map(|element| {
                                encode_element(element).unwrap_or_default()
                            })
                        });
                        found.ok_or_else(|| {
                            StoreError::not_found(format!("blob {key} not held locally"))
                        })?
                    }
                }
            };
            out.push(bytes);
        }
        Ok(out)
    }
}

