//! HTTP entry point: any path under the capture prefix is recorded.

use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use hyper::body::HttpBody;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{debug, error, info};
use serde::Serialize;
use tokio::task;

use crate::data::CapturedMessage;
use crate::error::{BoxError, CaptureError, StoreError};
use crate::normalize::normalize;
use crate::store::MessageStore;

pub const CAPTURE_PREFIX: &str = "/webhook";
pub const CAPTURE_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

const SUCCESS_MESSAGE: &str = "Webhook received and saved";
const FAILURE_MESSAGE: &str = "Failed to save webhook message";
static FALLBACK_ERROR_JSON: &'static str =
    r#"{"status":"error","message":"Failed to save webhook message","error":"cannot encode response"}"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Saved<'a> {
    status: &'a str,
    message: &'a str,
    id: i64,
    received_at: String,
}

#[derive(Debug, Serialize)]
struct Failed<'a> {
    status: &'a str,
    message: &'a str,
    error: String,
}

/// Binds the capture server on `addr` and returns the bound address along
/// with the future that runs it.
pub fn bind(
    addr: &SocketAddr,
    store: Arc<dyn MessageStore>,
) -> hyper::Result<(SocketAddr, impl Future<Output = hyper::Result<()>>)> {
    let service = make_service_fn(move |conn: &AddrStream| {
        let peer = conn.remote_addr();
        let store = store.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| routes(req, peer, store.clone())))
        }
    });
    let server = Server::try_bind(addr)?.serve(service);
    Ok((server.local_addr(), server))
}

pub async fn routes(
    req: Request<Body>,
    peer: SocketAddr,
    store: Arc<dyn MessageStore>,
) -> Result<Response<Body>, Infallible> {
    let response = if !is_capture_path(req.uri().path()) {
        empty(StatusCode::NOT_FOUND)
    } else if !is_capture_method(req.method()) {
        empty(StatusCode::METHOD_NOT_ALLOWED)
    } else {
        receive(req, peer.ip(), store).await
    };
    Ok(response)
}

/// Captures `req` and answers with the success or error JSON shape.
pub async fn receive<B>(req: Request<B>, peer: IpAddr, store: Arc<dyn MessageStore>) -> Response<Body>
where
    B: HttpBody + Unpin,
    B::Error: Into<BoxError>,
{
    match capture(req, peer, store).await {
        Ok(saved) => json(
            StatusCode::OK,
            &Saved {
                status: "success",
                message: SUCCESS_MESSAGE,
                id: saved.id,
                received_at: saved.received_at_formatted(),
            },
        ),
        Err(err) => {
            error!("Cannot capture webhook: {}", err);
            json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &Failed {
                    status: "error",
                    message: FAILURE_MESSAGE,
                    error: err.to_string(),
                },
            )
        }
    }
}

pub async fn capture<B>(
    req: Request<B>,
    peer: IpAddr,
    store: Arc<dyn MessageStore>,
) -> Result<CapturedMessage, CaptureError>
where
    B: HttpBody + Unpin,
    B::Error: Into<BoxError>,
{
    let normalized = normalize(req, peer).await?;
    info!(
        "Received webhook {} {} from {}",
        normalized.method, normalized.path, normalized.source_ip
    );
    debug!("headers {:?}", normalized.headers);

    let message = normalized.into_new_message();
    let saved = task::spawn_blocking(move || store.persist(message))
        .await
        .map_err(|err| StoreError::Task(err.to_string()))??;
    Ok(saved)
}

pub fn is_capture_path(path: &str) -> bool {
    match path.strip_prefix(CAPTURE_PREFIX) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn is_capture_method(method: &Method) -> bool {
    CAPTURE_METHODS.contains(method)
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let (status, text) = match serde_json::to_string(body) {
        Ok(text) => (status, text),
        Err(err) => {
            error!("Cannot encode response: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_ERROR_JSON.to_owned())
        }
    };
    let mut response = Response::new(Body::from(text));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
