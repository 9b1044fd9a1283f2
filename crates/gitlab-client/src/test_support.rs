//! Recording fake transport for unit tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Result;
use crate::transport::{Request, Response, Transport};

type Handler = Box<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

/// Records every request, then answers it through `handler` after an
/// optional delay.
pub(crate) struct FakeTransport {
    handler: Handler,
    requests: Mutex<Vec<Request>>,
    delay: Option<Duration>,
}

impl FakeTransport {
    pub(crate) fn new(
        handler: impl Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    pub(crate) fn with_delay(
        handler: impl Fn(&Request) -> Result<Response> + Send + Sync + 'static,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose URL ends with `path`.
    pub(crate) fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }
}

impl Transport for FakeTransport {
    fn send(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + '_>> {
        self.requests.lock().unwrap().push(request.clone());
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.handler)(&request)
        })
    }
}

pub(crate) fn json_response(status: u16, body: serde_json::Value) -> Result<Response> {
    Ok(Response {
        status,
        body: serde_json::to_vec(&body).unwrap(),
    })
}

/// Token endpoint reply with a server-side `created_at` of now.
pub(crate) fn token_body(access: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "refresh_token": format!("rt_{access}"),
        "scope": "api",
        "expires_in": expires_in,
        "created_at": gitlab_auth::now_secs(),
    })
}
