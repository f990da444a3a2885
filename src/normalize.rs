//! Turns an inbound HTTP exchange into the fields stored per capture.

use std::collections::HashMap;
use std::net::IpAddr;

use bytes::{BufMut, BytesMut};
use hyper::body::HttpBody;
use hyper::{HeaderMap, Request};

use crate::data::NewMessage;
use crate::error::{BoxError, NormalizeError};

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Canonical view of one inbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub source_ip: String,
}

impl Normalized {
    pub fn into_new_message(self) -> NewMessage {
        NewMessage::new(self.method, self.path, self.headers, Some(self.body), self.source_ip)
    }
}

/// Extracts method, path, headers, body and source ip from `req`.
///
/// `peer` is the transport-level address of the connection and is only used
/// when no forwarding header names a client.
pub async fn normalize<B>(req: Request<B>, peer: IpAddr) -> Result<Normalized, NormalizeError>
where
    B: HttpBody + Unpin,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    let headers = extract_headers(&parts.headers);
    let source_ip = resolve_source_ip(&parts.headers, peer);
    let body = read_body(body).await?;
    Ok(Normalized {
        method: parts.method.as_str().to_owned(),
        path: parts.uri.path().to_owned(),
        headers,
        body,
        source_ip,
    })
}

/// One value per header name; for repeated headers the first one wins.
pub fn extract_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .keys()
        .filter_map(|name| {
            headers
                .get(name)
                .map(|value| (name.as_str().to_owned(), lossy(value.as_bytes())))
        })
        .collect()
}

/// Drains the body and returns it as text with line terminators removed.
pub async fn read_body<B>(mut body: B) -> Result<String, NormalizeError>
where
    B: HttpBody + Unpin,
    B::Error: Into<BoxError>,
{
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|err| NormalizeError::ReadBody(err.into()))?;
        buf.put(chunk);
    }
    Ok(join_lines(&lossy(&buf)))
}

/// Concatenates the lines of `text` without any separator.
pub fn join_lines(text: &str) -> String {
    text.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// X-Forwarded-For, then X-Real-IP, then the peer; first entry of a proxy chain.
pub fn resolve_source_ip(headers: &HeaderMap, peer: IpAddr) -> String {
    let ip = forwarded_value(headers, FORWARDED_FOR)
        .or_else(|| forwarded_value(headers, REAL_IP))
        .unwrap_or_else(|| peer.to_string());

    if ip.contains(',') {
        ip.split(',').next().unwrap_or_default().trim().to_owned()
    } else {
        ip
    }
}

fn forwarded_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = lossy(headers.get(name)?.as_bytes());
    if value.is_empty() || value.eq_ignore_ascii_case("unknown") {
        None
    } else {
        Some(value)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
