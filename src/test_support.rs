//! Loopback HTTP server for exercising the reqwest-based clients.

use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Response, StatusCode, Uri};
use axum::Router;
use futures_util::StreamExt;
use tokio::net::TcpListener;

/// A request as seen by the server.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    /// Path plus query string, as sent.
    pub target: String,
    pub authorization: Option<String>,
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    /// Overrides the advertised Content-Length (to simulate truncation).
    pub content_length: Option<usize>,
    /// Send `body`, then hold the connection open without finishing.
    pub stall: bool,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_length: None,
            stall: false,
        }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::ok(value.to_string())
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_length: None,
            stall: false,
        }
    }

    pub fn truncated(body: impl Into<Vec<u8>>, advertised: usize) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_length: Some(advertised),
            stall: false,
        }
    }

    pub fn stalled(body: impl Into<Vec<u8>>) -> Self {
        Self {
            stall: true,
            ..Self::ok(body)
        }
    }

    fn into_response(self) -> Response<Body> {
        let builder = Response::builder()
            .status(StatusCode::from_u16(self.status).unwrap())
            .header(header::CONTENT_TYPE, "application/octet-stream");

        if self.stall {
            let chunk = Bytes::from(self.body);
            let stream = futures_util::stream::once(async move { Ok::<_, std::io::Error>(chunk) })
                .chain(futures_util::stream::pending());
            return builder.body(Body::from_stream(stream)).unwrap();
        }

        match self.content_length {
            // A streamed body has no size hint, so the advertised length is
            // sent as-is and the connection drops short of it.
            Some(advertised) => {
                let chunk = Bytes::from(self.body);
                let stream =
                    futures_util::stream::once(async move { Ok::<_, std::io::Error>(chunk) });
                builder
                    .header(header::CONTENT_LENGTH, advertised.to_string())
                    .body(Body::from_stream(stream))
                    .unwrap()
            }
            None => builder.body(Body::from(self.body)).unwrap(),
        }
    }
}

type Handler = dyn Fn(&SeenRequest) -> Reply + Send + Sync;

#[derive(Clone)]
struct Shared {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

/// Serves every request with `handler` and records it.
pub struct TestServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

impl TestServer {
    pub async fn start<H>(handler: H) -> Self
    where
        H: Fn(&SeenRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let shared = Shared {
            handler: Arc::new(handler),
            requests: requests.clone(),
        };
        let app = Router::new().fallback(respond).with_state(shared);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn respond(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response<Body> {
    let request = SeenRequest {
        method: method.to_string(),
        target: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    shared.requests.lock().unwrap().push(request.clone());
    (shared.handler)(&request).into_response()
}
