use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use wouldyou_core::{ChallengeError, ChallengeService};

use crate::error::ApiError;

pub type AppState<G> = Arc<AppStateInner<G>>;

pub struct AppStateInner<G> {
    pub service: Arc<ChallengeService<G>>,
    pub jwt_secret: String,
    /// Deadline applied to every service call a handler makes.
    pub request_timeout: Duration,
}

impl<G> AppStateInner<G> {
    pub fn new(service: Arc<ChallengeService<G>>, jwt_secret: String, request_timeout: Duration) -> AppState<G> {
        Arc::new(Self {
            service,
            jwt_secret,
            request_timeout,
        })
    }
}

impl<G: Send + Sync + 'static> AppStateInner<G> {
    /// Runs a store-bound service call off the async runtime, under the request deadline.
    pub(crate) async fn blocking<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&ChallengeService<G>) -> Result<T, ChallengeError> + Send + 'static,
        T: Send + 'static,
    {
        let service = self.service.clone();
        let task = tokio::task::spawn_blocking(move || f(&service));

        match tokio::time::timeout(self.request_timeout, task).await {
            Ok(joined) => joined
                .map_err(|e| {
                    error!("spawn_blocking join error: {}", e);
                    ApiError::Internal
                })?
                .map_err(ApiError::from),
            Err(_) => {
                warn!("Request exceeded deadline of {:?}", self.request_timeout);
                Err(ApiError::Timeout)
            }
        }
    }

    /// Awaits an async service call under the request deadline.
    pub(crate) async fn deadline<T>(&self, fut: impl Future<Output = Result<T, ChallengeError>>) -> Result<T, ApiError> {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => {
                warn!("Request exceeded deadline of {:?}", self.request_timeout);
                Err(ApiError::Timeout)
            }
        }
    }
}
