//! A thin HTTP front end over the request dispatcher, for manual poking
//! during development. Not part of the crate's public API — the dispatcher
//! and workbench are transport-agnostic; this is one possible transport.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use tidewrack::config::StoreConfig;
use tidewrack::protocol::types::{FetchBlobsReply, FetchBlobsRequest};
use tidewrack::store::{open_blob_store, open_commit_store};
use tidewrack::workbench::ServerWorkbench;

struct AppState {
    workbench: ServerWorkbench,
}

/// `fetch_blobs` is the only RPC that never needs a reverse callback, so
/// it is the one demonstrated directly over HTTP here; the other four
/// operations need a `ReverseFetch` handle to the caller that a one-shot
/// HTTP request doesn't naturally provide.
async fn fetch_blobs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FetchBlobsRequest>,
) -> Json<FetchBlobsReply> {
    match state.workbench.op_fetch_blobs(req).await {
        Ok(reply) => Json(reply),
        Err(_) => Json(FetchBlobsReply {
            blob_elements: Vec::new(),
        }),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = StoreConfig::default();
    let blob_store = open_blob_store(&config).await.expect("open blob store");
    let commit_store = open_commit_store(&config).await.expect("open commit store");
    let workbench = ServerWorkbench::new(blob_store, commit_store, config);
    let state = Arc::new(AppState { workbench });

    let app = Router::new()
        .route("/fetch_blobs", post(fetch_blobs))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind");
    axum::serve(listener, app).await.expect("serve");
}
