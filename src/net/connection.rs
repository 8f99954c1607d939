//! Connection handle for writing the eventual client response.
//!
//! # Responsibilities
//! - Identify each inbound exchange for tracing
//! - Carry the single response slot from the inbound handler to whichever
//!   task finishes the outbound call
//! - Apply keep-alive semantics to the response being written
//!
//! # Design Decisions
//! - The handle is consumed by `write`, so a second write cannot compile
//! - Writes are safe from any task; hyper serializes responses per connection
//! - `Connection: close` on the response makes hyper close after the write

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, Version};
use tokio::sync::oneshot;

/// Global atomic counter for exchange IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one inbound exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Whether the client asked to keep the connection open.
///
/// HTTP/1.1 and later persist unless `Connection: close` is present.
/// HTTP/1.0 persists only with `Connection: keep-alive`.
pub fn is_keep_alive(version: Version, headers: &HeaderMap) -> bool {
    let has_token = |token: &str| {
        headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    };

    match version {
        Version::HTTP_09 | Version::HTTP_10 => has_token("keep-alive"),
        Version::HTTP_11 => !has_token("close"),
        _ => true,
    }
}

/// Single-use writer for one client response.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
    version: Version,
    reply: oneshot::Sender<Response<Body>>,
}

/// The inbound side of a [`ConnectionHandle`]; resolves once the response is
/// written, or errors if the handle was dropped unwritten.
pub type ResponseSlot = oneshot::Receiver<Response<Body>>;

impl ConnectionHandle {
    pub fn new(peer: SocketAddr, version: Version) -> (Self, ResponseSlot) {
        let (reply, slot) = oneshot::channel();
        let handle = Self {
            id: ConnectionId::new(),
            peer,
            version,
            reply,
        };
        (handle, slot)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Write the response. With `keep_alive == false` the connection is
    /// closed once the response has been sent.
    pub fn write(self, mut response: Response<Body>, keep_alive: bool) {
        if !keep_alive && self.version <= Version::HTTP_11 {
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        }

        let status = response.status();
        if self.reply.send(response).is_err() {
            tracing::debug!(
                connection_id = %self.id,
                peer = %self.peer,
                status = %status,
                "Client went away before the response was written"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn headers(connection: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(value) = connection {
            map.insert(header::CONNECTION, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn keep_alive_defaults_per_version() {
        assert!(is_keep_alive(Version::HTTP_11, &headers(None)));
        assert!(!is_keep_alive(Version::HTTP_10, &headers(None)));
        assert!(is_keep_alive(Version::HTTP_2, &headers(None)));
    }

    #[test]
    fn keep_alive_honours_connection_tokens() {
        assert!(!is_keep_alive(Version::HTTP_11, &headers(Some("close"))));
        assert!(!is_keep_alive(Version::HTTP_11, &headers(Some("Upgrade, Close"))));
        assert!(is_keep_alive(Version::HTTP_10, &headers(Some("Keep-Alive"))));
    }

    #[tokio::test]
    async fn write_marks_close_when_not_persistent() {
        let (handle, slot) = ConnectionHandle::new(peer(), Version::HTTP_11);
        handle.write(Response::new(Body::empty()), false);

        let response = slot.await.unwrap();
        assert_eq!(response.headers().get(header::CONNECTION).unwrap(), "close");
    }

    #[tokio::test]
    async fn write_leaves_persistent_connections_open() {
        let (handle, slot) = ConnectionHandle::new(peer(), Version::HTTP_11);
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        handle.write(response, true);

        let response = slot.await.unwrap();
        assert!(response.headers().get(header::CONNECTION).is_none());
    }

    #[tokio::test]
    async fn dropped_handle_resolves_slot_with_error() {
        let (handle, slot) = ConnectionHandle::new(peer(), Version::HTTP_11);
        drop(handle);
        assert!(slot.await.is_err());
    }

    #[test]
    fn write_after_client_left_is_silent() {
        let (handle, slot) = ConnectionHandle::new(peer(), Version::HTTP_11);
        drop(slot);
        handle.write(Response::new(Body::empty()), true);
    }
}
