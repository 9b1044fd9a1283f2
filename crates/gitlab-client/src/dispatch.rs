//! Request dispatch
//!
//! Turns `(method, path, args, directive)` into a transport request and the
//! transport's response into a typed reply or a structured error:
//!
//! - GET/HEAD: `args` become the query string, no body is sent
//! - everything else: `args` are sent as the JSON body, no query string
//! - the call directive sets exactly one authorization header
//! - non-2xx responses decode into `ApiError`

use std::sync::Arc;
use std::time::Duration;

use gitlab_auth::CallDirective;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::context::Context;
use crate::error::{ApiError, Error, Result};
use crate::transport::{Request, Transport};

/// Executes calls against one endpoint through an injected transport.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    endpoint: String,
    user_agent: HeaderValue,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| Error::Config(format!("invalid user agent: {e}")))?;
        Ok(Self {
            transport,
            endpoint: endpoint.into().trim_end_matches('/').to_owned(),
            user_agent,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute one call and decode the reply.
    ///
    /// The call is bounded by `ctx` and by the dispatcher's own timeout,
    /// whichever is tighter.
    pub async fn invoke<A, R>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        args: Option<&A>,
        directive: Option<&CallDirective>,
    ) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.build_request(method, path, args, directive)?;
        let ctx = match self.timeout {
            Some(timeout) => ctx.clone().with_timeout(timeout),
            None => ctx.clone(),
        };

        debug!(method = %request.method, path, "dispatching request");
        let response = ctx.run(self.transport.send(request)).await?;

        if !response.is_success() {
            let api_error = ApiError::from_response(response.status, &response.body);
            debug!(status = response.status, path, error = %api_error, "request rejected");
            metrics::counter!("gitlab_api_errors_total", "status" => response.status.to_string())
                .increment(1);
            return Err(Error::Api(api_error));
        }

        decode_reply(&response.body)
    }

    /// Build the transport request for a call without sending it.
    pub fn build_request<A>(
        &self,
        method: Method,
        path: &str,
        args: Option<&A>,
        directive: Option<&CallDirective>,
    ) -> Result<Request>
    where
        A: Serialize + ?Sized,
    {
        let args = args
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| Error::Encode(format!("serializing arguments: {e}")))?;

        let (query, body) = if is_read(&method) {
            (query_pairs(args.as_ref())?, None)
        } else {
            (Vec::new(), args)
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, self.user_agent.clone());
        if let Some((name, value)) = directive.and_then(CallDirective::header) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Encode(format!("invalid auth header name: {e}")))?;
            let mut value = HeaderValue::from_str(&value).map_err(|_| {
                Error::Encode("auth header value contains invalid characters".into())
            })?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        Ok(Request {
            method,
            url: format!("{}{}", self.endpoint, path),
            query,
            headers,
            body,
        })
    }
}

fn is_read(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Decode a 2xx body. An empty body decodes as JSON `null`, so `()` and
/// `Option<T>` replies accept `204 No Content`.
fn decode_reply<R: DeserializeOwned>(body: &[u8]) -> Result<R> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
}

/// Flatten serialized arguments into query pairs.
///
/// `null` fields are skipped, scalars are stringified, arrays repeat as
/// `key[]` and nested objects become `key[sub]`.
pub fn query_pairs(args: Option<&Value>) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    match args {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (key, value) in map {
                flatten(key.clone(), value, &mut pairs);
            }
        }
        Some(other) => {
            return Err(Error::Encode(format!(
                "query arguments must serialize to an object, got {other}"
            )));
        }
    }
    Ok(pairs)
}

fn flatten(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Bool(_) | Value::Number(_) => pairs.push((key, value.to_string())),
        Value::Array(items) => {
            for item in items {
                flatten(format!("{key}[]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                flatten(format!("{key}[{sub}]"), item, pairs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeTransport, json_response};
    use gitlab_auth::{Credential, TokenKind};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Args {
        page: u32,
        search: Option<String>,
        membership: bool,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Project {
        id: u64,
    }

    fn dispatcher(transport: Arc<FakeTransport>) -> Dispatcher {
        Dispatcher::new(transport, "https://gitlab.example.com/", "test-agent", None).unwrap()
    }

    fn args() -> Args {
        Args {
            page: 2,
            search: None,
            membership: true,
        }
    }

    #[test]
    fn get_encodes_args_as_query() {
        let d = dispatcher(FakeTransport::new(|_| json_response(200, json!([]))));
        let request = d
            .build_request(Method::GET, "/api/v4/projects", Some(&args()), None)
            .unwrap();
        assert_eq!(request.url, "https://gitlab.example.com/api/v4/projects");
        assert!(request.body.is_none());
        assert_eq!(
            request.query,
            vec![
                ("membership".to_owned(), "true".to_owned()),
                ("page".to_owned(), "2".to_owned()),
            ]
        );
    }

    #[test]
    fn post_encodes_args_as_body() {
        let d = dispatcher(FakeTransport::new(|_| json_response(200, json!({}))));
        let request = d
            .build_request(Method::POST, "/api/v4/projects", Some(&args()), None)
            .unwrap();
        assert!(request.query.is_empty());
        assert_eq!(
            request.body,
            Some(json!({"page": 2, "search": null, "membership": true}))
        );
    }

    #[test]
    fn no_args_means_no_query_and_no_body() {
        let d = dispatcher(FakeTransport::new(|_| json_response(200, json!({}))));
        for method in [Method::GET, Method::DELETE] {
            let request = d
                .build_request::<()>(method, "/api/v4/version", None, None)
                .unwrap();
            assert!(request.query.is_empty());
            assert!(request.body.is_none());
        }
    }

    #[test]
    fn query_flattens_arrays_and_objects() {
        let value = json!({
            "labels": ["bug", "p1"],
            "custom_attributes": {"team": "core"},
            "missing": null,
        });
        let pairs = query_pairs(Some(&value)).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("custom_attributes[team]".to_owned(), "core".to_owned()),
                ("labels[]".to_owned(), "bug".to_owned()),
                ("labels[]".to_owned(), "p1".to_owned()),
            ]
        );
    }

    #[test]
    fn query_rejects_non_object_args() {
        assert!(matches!(
            query_pairs(Some(&json!(["a"]))),
            Err(Error::Encode(_))
        ));
    }

    #[test]
    fn directive_sets_single_auth_header() {
        let d = dispatcher(FakeTransport::new(|_| json_response(200, json!({}))));

        let job = Credential::token("job-1").with_kind(TokenKind::Job);
        let request = d
            .build_request::<()>(Method::GET, "/x", None, Some(&job.call_directive(None)))
            .unwrap();
        assert_eq!(request.headers.get("job-token").unwrap(), "job-1");
        assert!(request.headers.get("authorization").is_none());
        assert!(request.headers.get("job-token").unwrap().is_sensitive());

        let bearer = Credential::token("glpat-1");
        let request = d
            .build_request::<()>(Method::GET, "/x", None, Some(&bearer.call_directive(None)))
            .unwrap();
        assert_eq!(request.headers.get("authorization").unwrap(), "Bearer glpat-1");
    }

    #[test]
    fn empty_bearer_sends_no_header() {
        let d = dispatcher(FakeTransport::new(|_| json_response(200, json!({}))));
        let directive = Credential::password("root", "pw").call_directive(None);
        let request = d
            .build_request::<()>(Method::GET, "/x", None, Some(&directive))
            .unwrap();
        assert!(request.headers.get("authorization").is_none());
        assert_eq!(request.headers.get("user-agent").unwrap(), "test-agent");
    }

    #[tokio::test]
    async fn decodes_success_reply() {
        let transport = FakeTransport::new(|_| json_response(200, json!({"id": 42})));
        let d = dispatcher(transport.clone());
        let project: Project = d
            .invoke::<(), _>(
                &Context::background(),
                Method::GET,
                "/api/v4/projects/42",
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(project, Project { id: 42 });
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_success_body_decodes_to_unit() {
        let transport = FakeTransport::new(|_| {
            Ok(crate::transport::Response {
                status: 204,
                body: Vec::new(),
            })
        });
        let d = dispatcher(transport);
        let reply: Result<()> = d
            .invoke::<(), _>(
                &Context::background(),
                Method::DELETE,
                "/api/v4/x",
                None,
                None,
            )
            .await;
        assert!(reply.is_ok());
    }

    #[tokio::test]
    async fn non_2xx_becomes_api_error() {
        let transport = FakeTransport::new(|_| {
            json_response(404, json!({"message": "404 Project Not Found"}))
        });
        let d = dispatcher(transport);
        let err = d
            .invoke::<(), Project>(
                &Context::background(),
                Method::GET,
                "/api/v4/projects/1",
                None,
                None,
            )
            .await
            .unwrap_err();
        let api_error = err.api().expect("api error");
        assert_eq!(api_error.status, 404);
        assert_eq!(err.to_string(), "404 Project Not Found");
    }

    #[tokio::test]
    async fn transport_failure_is_returned_unchanged() {
        let transport = FakeTransport::new(|_| Err(Error::Transport("connection refused".into())));
        let d = dispatcher(transport);
        let err = d
            .invoke::<(), Project>(&Context::background(), Method::GET, "/x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(msg) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn malformed_reply_is_decode_error() {
        let transport = FakeTransport::new(|_| json_response(200, json!({"id": "not-a-number"})));
        let d = dispatcher(transport);
        let err = d
            .invoke::<(), Project>(&Context::background(), Method::GET, "/x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_in_flight_request() {
        let transport = FakeTransport::with_delay(
            |_| json_response(200, json!({"id": 1})),
            Duration::from_secs(3600),
        );
        let d = dispatcher(transport.clone());
        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = d
            .invoke::<(), Project>(&ctx, Method::GET, "/x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.requests().len(), 1, "request was sent before cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn dispatcher_timeout_applies() {
        let transport = FakeTransport::with_delay(
            |_| json_response(200, json!({"id": 1})),
            Duration::from_secs(120),
        );
        let d = Dispatcher::new(
            transport,
            "https://gitlab.com",
            "ua",
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        let err = d
            .invoke::<(), Project>(&Context::background(), Method::GET, "/x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }
}
