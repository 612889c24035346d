//! Idempotent seeding of well-known catalog content on server cold start: a
//! fixed set of predicate objects, resource-type objects, and identities,
//! plus an `owned_by` association from each catalog entry to the root
//! identity. Each group is independently toggled by [`PreloadConfig`].

use std::collections::HashMap;

use tracing::info;

use crate::config::PreloadConfig;
use crate::errors::StoreError;
use crate::hash::BlobKey;
use crate::object::association::Association;
use crate::object::idref::IdRef;
use crate::object::resource::{LifecycleState, Resource};
use crate::object::signature::Signature;
use crate::object::{encode_element, Element, ObjectType};
use crate::store::{CommitStore, Predicate};
use crate::workbench::{ServerWorkbench, Workbench};

const PREDICATES: &[&str] = &["has_a", "type_of", "owned_by", "has_life_cycle_state"];
const RESOURCE_TYPES: &[&str] = &["dataset", "data_source", "identity"];
const IDENTITIES: &[&str] = &["anonymous", "root"];

const BRANCH: &str = "master";

fn system_signature() -> Signature {
    Signature::new("preloader", "preloader@system.local")
}

async fn already_preloaded(
    commit_store: &dyn CommitStore,
    repository_key: &str,
) -> Result<bool, StoreError> {
    let rows = commit_store
        .query(&[Predicate::eq("repository_key", repository_key)], 1)
        .await?;
    Ok(!rows.is_empty())
}

/// Commit a single `Resource` root as its own repository, pushing it
/// through the normal client-workbench path. Returns `(repository_key,
/// commit_key)` whether the entry was freshly created or already present.
async fn preload_resource(
    client: &Workbench,
    server: &ServerWorkbench,
    commit_store: &dyn CommitStore,
    group: &str,
    name: &str,
) -> Result<(String, BlobKey), StoreError> {
    let repository_key = format!("{group}:{name}");

    if already_preloaded(commit_store, &repository_key).await? {
        let rows = commit_store
            .query(&[Predicate::eq("repository_key", &repository_key)], 1)
            .await?;
        return Ok((repository_key.clone(), rows[0].key));
    }

    let resource = Resource::new(group, LifecycleState::Active, name, None);
    let bytes = encode_element(&Element::Resource(resource.clone()))?;
    client.load_element(&repository_key, &bytes)?;
    client.set_working_root(&repository_key, resource.id, ObjectType::Resource);

    let commit_key = client
        .commit(
            &repository_key,
            BRANCH,
            system_signature(),
            system_signature(),
            format!("preload {repository_key}"),
        )
        .await?;
    client.push(server, &repository_key).await?;

    info!(%repository_key, "preloaded catalog entry");
    Ok((repository_key, commit_key))
}

async fn preload_group(
    client: &Workbench,
    server: &ServerWorkbench,
    commit_store: &dyn CommitStore,
    group: &str,
    names: &[&str],
) -> Result<HashMap<String, (String, BlobKey)>, StoreError> {
    let mut entries = HashMap::new();
    for name in names {
        let entry = preload_resource(client, server, commit_store, group, name).await?;
        entries.insert((*name).to_string(), entry);
    }
    Ok(entries)
}

/// Create an `owned_by` association commit linking `subject` to `owner`.
async fn preload_ownership(
    client: &Workbench,
    server: &ServerWorkbench,
    commit_store: &dyn CommitStore,
    subject_repo: &str,
    subject_commit: BlobKey,
    owned_by_repo: &str,
    owned_by_commit: BlobKey,
    owner_repo: &str,
    owner_commit: BlobKey,
) -> Result<(), StoreError> {
    let repository_key = format!("owned_by:{subject_repo}");
    if already_preloaded(commit_store, &repository_key).await? {
        return Ok(());
    }

    let association = Association::new(
        IdRef::new(subject_repo, BRANCH, subject_commit),
        IdRef::new(owned_by_repo, BRANCH, owned_by_commit),
        IdRef::new(owner_repo, BRANCH, owner_commit),
    );
    let bytes = encode_element(&Element::Association(association.clone()))?;
    client.load_element(&repository_key, &bytes)?;
    client.set_working_root(&repository_key, association.id, ObjectType::Association);
    client
        .commit(
            &repository_key,
            BRANCH,
            system_signature(),
            system_signature(),
            format!("preload ownership for {subject_repo}"),
        )
        .await?;
    client.push(server, &repository_key).await?;
    Ok(())
}

/// Seed the catalogs selected by `config`, skipping any group whose
/// repositories already have commit rows. Idempotent: safe to call on
/// every cold start.
pub async fn preload(
    client: &Workbench,
    server: &ServerWorkbench,
    commit_store: &dyn CommitStore,
    config: &PreloadConfig,
) -> Result<(), StoreError> {
    let mut predicates = HashMap::new();
    if config.predicates {
        predicates = preload_group(client, server, commit_store, "predicate", PREDICATES).await?;
    }

    let mut identities = HashMap::new();
    if config.identities {
        identities = preload_group(client, server, commit_store, "identity", IDENTITIES).await?;
    }

    let mut resource_types = HashMap::new();
    if config.resource_types {
        resource_types =
            preload_group(client, server, commit_store, "resource_type", RESOURCE_TYPES).await?;
    }

    // Ownership associations require both an `owned_by` predicate and a
    // `root` identity, so they are only attempted when both groups ran.
    if let (Some((owned_by_repo, owned_by_commit)), Some((owner_repo, owner_commit))) = (
        predicates.get("owned_by"),
        identities.get("root"),
    ) {
        for (_, (subject_repo, subject_commit)) in resource_types.iter().chain(identities.iter()) {
            if subject_repo == owner_repo {
                continue;
            }
            preload_ownership(
                client,
                server,
                commit_store,
                subject_repo,
                *subject_commit,
                owned_by_repo,
                *owned_by_commit,
                owner_repo,
                *owner_commit,
            )
            .await?;
        }
    }

    // `datasets` and `ais_resources` name sample-data catalogs the source
    // seeds from a fixture directory rather than a fixed literal list; no
    // such fixture ships with this crate, so those two groups are
    // recognized but currently seed nothing.

    Ok(())
}
