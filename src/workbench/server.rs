//! The server-side workbench: owns every repository the server currently
//! knows about plus the process-wide blob cache, and answers the five RPC
//! operations. Unlike the client-side [`super::client::Workbench`], it never
//! originates a pull or a push — it only responds to them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use lru_mem::LruCache;
use serde_json::Value as AttrValue;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::hash::BlobKey;
use crate::object::mutable_head::MutableHead;
use crate::object::{decode_element, encode_element, Element, ObjectType};
use crate::repository::{CheckoutTarget, Repository};
use crate::store::{BlobStore, CommitStore, Predicate};

use crate::protocol::types::{
    CheckoutReply, CheckoutRequest, FetchBlobsReply, FetchBlobsRequest, PullReply, PullRequest,
    PushRepoState, PushRequest, PutBlobsRequest,
};

/// Something op_push can ask for blobs it is missing — the pusher,
/// addressed over the reply-to channel of the original push. The client
/// workbench implements this over its own local cache and repositories.
#[async_trait]
pub trait ReverseFetch: Send + Sync {
    async fn fetch_blobs(&self, keys: &[BlobKey]) -> Result<Vec<Vec<u8>>, StoreError>;
}

pub struct ServerWorkbench {
    repos: DashMap<String, Repository>,
    workbench_cache: Mutex<LruCache<String, Vec<u8>>>,
    blob_store: Arc<dyn BlobStore>,
    commit_store: Arc<dyn CommitStore>,
    config: StoreConfig,
}

impl ServerWorkbench {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        commit_store: Arc<dyn CommitStore>,
        config: StoreConfig,
    ) -> Self {
        ServerWorkbench {
            repos: DashMap::new(),
            workbench_cache: Mutex::new(LruCache::new(config.cache_size)),
            blob_store,
            commit_store,
            config,
        }
    }

    fn with_repo<R>(&self, repository_key: &str, f: impl FnOnce(&mut Repository) -> R) -> R {
        let mut entry = self
            .repos
            .entry(repository_key.to_string())
            .or_insert_with(|| Repository::new(repository_key.to_string()));
        f(entry.value_mut())
    }

    async fn cache_get(&self, key: BlobKey) -> Result<Vec<u8>, StoreError> {
        if let Some(bytes) = self.workbench_cache.lock().await.get(&key.to_hex()) {
            return Ok(bytes.clone());
        }
        let bytes = self.blob_store.get(key).await?;
        let mut cache = self.workbench_cache.lock().await;
        let _ = cache.insert(key.to_hex(), bytes.clone());
        Ok(bytes)
    }

    async fn cache_put(&self, key: BlobKey, bytes: Vec<u8>) {
        let mut cache = self.workbench_cache.lock().await;
        if cache.insert(key.to_hex(), bytes).is_err() {
            warn!(%key, "blob too large for workbench cache; stored only in blob_store");
        }
    }

    /// Reconstruct a repository's head from its commit store rows, merge it
    /// with whatever head is already held in memory, and return the full
    /// set of commit keys now known for this repository.
    async fn reload_head(&self, repository_key: &str) -> Result<HashSet<BlobKey>, StoreError> {
        let rows = self
            .commit_store
            .query(
                &[Predicate::eq("repository_key", repository_key)],
                10_000_000,
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::not_found(format!(
                "repository `{repository_key}` not found"
            )));
        }

        let mut reconstructed = MutableHead::new(repository_key.to_string());
        let mut known_commits = HashSet::new();
        self.with_repo(repository_key, |repo| {
            for row in &rows {
                known_commits.insert(row.key);
                if let Ok(element) = decode_element(&row.value) {
                    if let Element::Commit(commit) = &element {
                        repo.commit_index.insert(commit.id, commit.clone());
                    }
                    repo.index_hash.insert(element.key(), element);
                }
                if let Some(branch_names) = row.attributes.get("branch_name") {
                    for branch in branch_names.split(',').filter(|b| !b.is_empty()) {
                        reconstructed.attach(branch, row.key);
                    }
                }
            }
            repo.head.merge_from(&reconstructed, &repo.commit_index);
        });
        Ok(known_commits)
    }

    /// Transitive fetch from a set of object roots: worklist seeded at
    /// `roots`, descending through links that are not in `excluded_types`.
    /// Looks in the repository's local cache first, then the blob store.
    async fn gather_blobs(
        &self,
        repository_key: &str,
        roots: &[BlobKey],
        excluded_types: &HashSet<ObjectType>,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut seen: HashSet<BlobKey> = roots.iter().copied().collect();
        let mut worklist: Vec<BlobKey> = roots.to_vec();
        let mut blobs = Vec::new();

        while let Some(key) = worklist.pop() {
            let cached = self.with_repo(repository_key, |repo| repo.index_hash.get(&key).cloned());
            let element = match cached {
                Some(element) => element,
                None => {
                    let bytes = self.cache_get(key).await?;
                    let element = decode_element(&bytes)?;
                    self.with_repo(repository_key, |repo| {
                        repo.index_hash.insert(key, element.clone());
                    });
                    element
                }
            };

            let bytes = encode_element(&element)?;
            blobs.push(bytes);

            for link in element.links() {
                if excluded_types.contains(&link.target_type) {
                    continue;
                }
                if seen.insert(link.target) {
                    worklist.push(link.target);
                }
            }
        }
        Ok(blobs)
    }

    pub async fn op_pull(&self, req: PullRequest) -> Result<PullReply, StoreError> {
        let known_commits = self.reload_head(&req.repository_key).await?;

        let needs: Vec<BlobKey> = known_commits
            .difference(&req.commit_keys_puller_has)
            .copied()
            .collect();

        let (head_bytes, head_roots, commit_elements) = self.with_repo(&req.repository_key, |repo| {
            let head_bytes = bincode::encode_to_vec(&repo.head, bincode::config::standard())
                .expect("mutable head encoding is infallible");
            let head_roots: Vec<BlobKey> = repo
                .current_heads()
                .into_iter()
                .filter_map(|key| repo.commit_index.get(&key).map(|commit| commit.root_key()))
                .collect();
            let commit_elements: Vec<Vec<u8>> = needs
                .iter()
                .filter_map(|key| repo.index_hash.get(key))
                .filter_map(|element| encode_element(element).ok())
                .collect();
            (head_bytes, head_roots, commit_elements)
        });

        let blob_elements = if req.get_head_content {
            self.gather_blobs(&req.repository_key, &head_roots, &req.excluded_types)
                .await?
        } else {
            Vec::new()
        };

        debug!(
            repository_key = %req.repository_key,
            needs = needs.len(),
            blobs = blob_elements.len(),
            "served pull"
        );

        Ok(PullReply {
            repo_head_element: head_bytes,
            commit_elements,
            blob_elements,
        })
    }

    pub async fn op_push(
        &self,
        req: PushRequest,
        source: &dyn ReverseFetch,
    ) -> Result<(), StoreError> {
        for repo_state in req.repositories {
            self.ingest_one_push(repo_state, source).await?;
        }
        Ok(())
    }

    async fn ingest_one_push(
        &self,
        repo_state: PushRepoState,
        source: &dyn ReverseFetch,
    ) -> Result<(), StoreError> {
        let repository_key = repo_state.repository_key.clone();

        if self.with_repo(&repository_key, |repo| repo.status) == crate::repository::RepoStatus::Modified
        {
            return Err(StoreError::bad_request(format!(
                "server copy of `{repository_key}` has uncommitted work"
            )));
        }

        // reload_head tolerates a brand-new repository with no rows yet;
        // that is not an error for push (only for pull/checkout).
        let _ = self.reload_head(&repository_key).await.or_else(|err| {
            if matches!(err, StoreError::NotFound(_)) {
                Ok(HashSet::new())
            } else {
                Err(err)
            }
        })?;

        let already_have: HashSet<BlobKey> =
            self.with_repo(&repository_key, |repo| repo.index_hash.keys().copied().collect());
        let need_keys: Vec<BlobKey> = repo_state
            .blob_keys
            .difference(&already_have)
            .copied()
            .collect();
        let mut filtered = Vec::with_capacity(need_keys.len());
        for key in need_keys {
            let in_cache = self.workbench_cache.lock().await.get(&key.to_hex()).is_some();
            if in_cache || self.blob_store.has(key).await? {
                continue;
            }
            filtered.push(key);
        }
        let need_keys = filtered;

        let mut new_blobs: Vec<(BlobKey, Vec<u8>)> = Vec::new();
        let mut new_commits: Vec<Element> = Vec::new();
        if !need_keys.is_empty() {
            let fetched = source.fetch_blobs(&need_keys).await?;
            for bytes in fetched {
                let element = decode_element(&bytes)?;
                self.with_repo(&repository_key, |repo| {
                    repo.index_hash.insert(element.key(), element.clone());
                    if let Element::Commit(commit) = &element {
                        repo.commit_index.insert(commit.id, commit.clone());
                    }
                });
                match &element {
                    Element::Commit(_) => new_commits.push(element),
                    _ => new_blobs.push((element.key(), bytes)),
                }
            }
        }

        let incoming_head: MutableHead =
            bincode::decode_from_slice(&repo_state.repo_head_element, bincode::config::standard())
                .map(|(head, _)| head)
                .map_err(StoreError::from)?;
        self.with_repo(&repository_key, |repo| {
            repo.head.merge_from(&incoming_head, &repo.commit_index);
        });

        // 6. Blob writes, fanned out and joined.
        let puts = new_blobs
            .iter()
            .cloned()
            .map(|(key, bytes)| self.blob_store.put(key, bytes));
        futures::future::try_join_all(puts).await?;

        // 7. Attribute commit rows for every newly learned commit.
        let prior_heads: HashSet<BlobKey> = self
            .with_repo(&repository_key, |repo| repo.current_heads())
            .into_iter()
            .collect();
        for element in &new_commits {
            let Element::Commit(commit) = element else {
                continue;
            };
            let attributes = self.with_repo(&repository_key, |repo| {
                commit_attributes(repo, commit, &repository_key, &prior_heads)
            })?;
            let bytes = encode_element(element)?;
            self.commit_store.put(commit.id, bytes, attributes).await?;

            if self.config.verify_after_put {
                if !self.commit_store.has_key(commit.id).await? {
                    return Err(StoreError::VerifyFailed(format!(
                        "commit {} missing after put",
                        commit.id
                    )));
                }
            }
        }

        // 8. Demote former heads no longer current.
        let demoted_rows = self
            .commit_store
            .query(
                &[
                    Predicate::eq("repository_key", repository_key.as_str()),
                    Predicate::gt("branch_name", ""),
                ],
                10_000_000,
            )
            .await?;
        let demotions = demoted_rows
            .into_iter()
            .filter(|row| !prior_heads.contains(&row.key))
            .map(|row| {
                let mut attrs = HashMap::new();
                attrs.insert("branch_name".to_string(), AttrValue::String(String::new()));
                self.commit_store.update_index(row.key, attrs)
            });
        futures::future::try_join_all(demotions).await?;

        Ok(())
    }

    pub async fn op_checkout(&self, req: CheckoutRequest) -> Result<CheckoutReply, StoreError> {
        self.reload_head(&req.repository_key).await?;
        let target = match (req.branch, req.commit_key) {
            (_, Some(commit)) => CheckoutTarget::Commit(commit),
            (Some(branch), None) => CheckoutTarget::Branch(branch),
            (None, None) => {
                return Err(StoreError::bad_request(
                    "checkout requires a branch or a commit key".to_string(),
                ))
            }
        };
        let commit_key =
            self.with_repo(&req.repository_key, |repo| repo.checkout(target))?;
        let blob_elements = self
            .gather_blobs(&req.repository_key, &[commit_key], &HashSet::new())
            .await?;
        Ok(CheckoutReply {
            commit_key,
            blob_elements,
        })
    }

    pub async fn op_fetch_blobs(
        &self,
        req: FetchBlobsRequest,
    ) -> Result<FetchBlobsReply, StoreError> {
        let mut blob_elements = Vec::with_capacity(req.blob_keys.len());
        for key in req.blob_keys {
            blob_elements.push(self.cache_get(key).await?);
        }
        Ok(FetchBlobsReply { blob_elements })
    }

    pub async fn op_put_blobs(&self, req: PutBlobsRequest) -> Result<(), StoreError> {
        let mut puts = Vec::with_capacity(req.blob_elements.len());
        let mut keys = Vec::with_capacity(req.blob_elements.len());
        for bytes in req.blob_elements {
            let key = BlobKey::new(&bytes);
            keys.push(key);
            self.cache_put(key, bytes.clone()).await;
            puts.push(self.blob_store.put(key, bytes));
        }
        futures::future::try_join_all(puts).await?;

        if self.config.verify_after_put {
            let requested: HashSet<BlobKey> = keys.iter().copied().collect();
            let mut observed = HashSet::with_capacity(keys.len());
            for key in &keys {
                if self.blob_store.has(*key).await? {
                    observed.insert(*key);
                }
            }
            if observed != requested {
                return Err(StoreError::VerifyFailed(
                    "observed key set differs from requested key set after put_blobs".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Compute the indexed attribute map for a freshly committed commit, per
/// its object root's type.
fn commit_attributes(
    repo: &Repository,
    commit: &crate::object::commit::Commit,
    repository_key: &str,
    current_heads: &HashSet<BlobKey>,
) -> Result<HashMap<String, AttrValue>, StoreError> {
    let mut attrs = HashMap::new();
    attrs.insert(
        "repository_key".to_string(),
        AttrValue::String(repository_key.to_string()),
    );

    let root = repo.index_hash.get(&commit.root_key()).ok_or_else(|| {
        StoreError::InvalidElement(format!(
            "commit root {} not present locally",
            commit.root_key()
        ))
    })?;
    match root {
        Element::Association(association) => {
            let idref_attrs = [
                ("subject", &association.body.subject),
                ("predicate", &association.body.predicate),
                ("object", &association.body.object),
            ];
            for (prefix, idref) in idref_attrs {
                attrs.insert(
                    format!("{prefix}_key"),
                    AttrValue::String(idref.repository_key.clone()),
                );
                attrs.insert(
                    format!("{prefix}_branch"),
                    AttrValue::String(idref.branch.clone()),
                );
                attrs.insert(
                    format!("{prefix}_commit"),
                    AttrValue::String(idref.commit.to_hex()),
                );
            }
        }
        Element::Resource(resource) => {
            attrs.insert(
                "resource_object_type".to_string(),
                AttrValue::String(resource.body.resource_type.clone()),
            );
            attrs.insert(
                "resource_life_cycle_state".to_string(),
                AttrValue::String(resource.body.lifecycle_state.as_str().to_string()),
            );
        }
        Element::Terminology(terminology) => {
            attrs.insert(
                "keyword".to_string(),
                AttrValue::String(terminology.body.keyword.clone()),
            );
        }
        Element::Content(_) | Element::Commit(_) => {}
    }

    let branch_name = repo
        .head
        .branches
        .iter()
        .filter(|b| b.commit_refs.contains(&commit.id) && current_heads.contains(&commit.id))
        .map(|b| b.name.clone())
        .collect::<Vec<_>>()
        .join(",");
    attrs.insert("branch_name".to_string(), AttrValue::String(branch_name));

    Ok(attrs)
}
