use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::chat::ChatApi;
use crate::error::IntegrationError;
use crate::settings::ChatSettings;
use crate::types::{ResponsesRequest, ResponsesResponse};

/// A non-blocking handle to an in-flight async request.
/// Call `try_recv()` each frame to check for results without blocking the game loop.
pub struct PendingRequest<T> {
    receiver: mpsc::Receiver<Result<T, IntegrationError>>,
}

impl<T> PendingRequest<T> {
    /// Non-blocking check for the result. Returns `None` if still pending.
    pub fn try_recv(&self) -> Option<Result<T, IntegrationError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(IntegrationError::Network("Channel closed".into())))
            }
        }
    }

    /// Blocking wait for the result. Only use outside the frame loop.
    pub fn wait(self) -> Result<T, IntegrationError> {
        self.receiver
            .recv()
            .map_err(|_| IntegrationError::Network("Channel closed".into()))?
    }
}

/// Facade for the chat model.
/// Owns a background tokio runtime and dispatches async work via channels.
pub struct IntegrationClient {
    runtime: tokio::runtime::Runtime,
    chat_api: Arc<ChatApi>,
    online: Arc<AtomicBool>,
}

impl IntegrationClient {
    /// Create a client with a background tokio runtime.
    ///
    /// Fails if the API key is missing from the environment.
    pub fn new(settings: &ChatSettings) -> Result<Self, IntegrationError> {
        let api_key = settings.api_key()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| IntegrationError::Network(format!("Failed to create runtime: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| IntegrationError::Network(format!("Failed to create HTTP client: {}", e)))?;

        info!(endpoint = %settings.endpoint, model = %settings.model, "Chat client ready");

        Ok(Self {
            runtime,
            chat_api: Arc::new(ChatApi::new(client, settings.endpoint.clone(), api_key)),
            online: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Send the conversation to the model.
    pub fn send_chat(&self, request: ResponsesRequest) -> PendingRequest<ResponsesResponse> {
        let (tx, rx) = mpsc::channel();
        let api = Arc::clone(&self.chat_api);
        let online = Arc::clone(&self.online);

        self.runtime.spawn(async move {
            let result = api.respond(&request).await;
            record_reachability(&online, &result);
            let _ = tx.send(result);
        });

        PendingRequest { receiver: rx }
    }

    /// Whether the endpoint appears to be reachable (based on last request result).
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

/// Any answer from the server, even an error status, means it is reachable.
fn record_reachability<T>(online: &AtomicBool, result: &Result<T, IntegrationError>) {
    match result {
        Ok(_) | Err(IntegrationError::ServerError { .. }) => online.store(true, Ordering::Relaxed),
        Err(IntegrationError::Offline) | Err(IntegrationError::Timeout) => {
            online.store(false, Ordering::Relaxed)
        }
        _ => {}
    }
}

#[cfg(test)]
pub(crate) fn pending_pair<T>() -> (
    mpsc::Sender<Result<T, IntegrationError>>,
    PendingRequest<T>,
) {
    let (tx, rx) = mpsc::channel();
    (tx, PendingRequest { receiver: rx })
}
