//! A small per-request finite-state machine: decode → dispatch to one of
//! the five operations → reply, with every store call wrapped in the
//! configured timeout and every error mapped onto a response code.

use std::time::Duration;

use tracing::{error, warn};

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::workbench::{ReverseFetch, ServerWorkbench};

use super::types::{Reply, Request, ResponseCode};

pub struct RequestDispatcher<'a> {
    workbench: &'a ServerWorkbench,
    timeout: Duration,
}

impl<'a> RequestDispatcher<'a> {
    pub fn new(workbench: &'a ServerWorkbench, config: &StoreConfig) -> Self {
        RequestDispatcher {
            workbench,
            timeout: config.store_timeout(),
        }
    }

    /// Decode, dispatch, and reply. `push` additionally needs a handle back
    /// to the pusher to serve the reverse `fetch_blobs` call; callers that
    /// never push may pass any `ReverseFetch` impl that always errors.
    pub async fn dispatch(
        &self,
        request: Request,
        push_source: &dyn ReverseFetch,
    ) -> (ResponseCode, Result<Reply, StoreError>) {
        let result = self.dispatch_inner(request, push_source).await;
        let code = match &result {
            Ok(_) => ResponseCode::Ok,
            Err(err) => ResponseCode::from(err),
        };
        if code == ResponseCode::InternalServerError {
            error!(?result, "request failed with an internal error");
        }
        (code, result)
    }

    async fn dispatch_inner(
        &self,
        request: Request,
        push_source: &dyn ReverseFetch,
    ) -> Result<Reply, StoreError> {
        match request {
            Request::Push(req) => self
                .with_timeout(self.workbench.op_push(req, push_source))
                .await
                .map(|()| Reply::Push),
            Request::Pull(req) => self
                .with_timeout(self.workbench.op_pull(req))
                .await
                .map(Reply::Pull),
            Request::Checkout(req) => self
                .with_timeout(self.workbench.op_checkout(req))
                .await
                .map(Reply::Checkout),
            Request::PutBlobs(req) => self
                .with_timeout(self.workbench.op_put_blobs(req))
                .await
                .map(|()| Reply::PutBlobs),
            Request::FetchBlobs(req) => self
                .with_timeout(self.workbench.op_fetch_blobs(req))
                .await
                .map(Reply::FetchBlobs),
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.timeout, "store call exceeded its timeout");
                Err(StoreError::StoreTimeout(self.timeout))
            }
        }
    }
}
