//! The inbound transaction view consumed by the annotator.

use http::{header, HeaderMap, Request};

/// A borrowed view of the facts annotation needs from an inbound HTTP
/// request: its headers, the peer's network address and the host the client
/// addressed.
///
/// `remote_addr` is expected in `host:port` form but any string is accepted;
/// an empty string means the peer is unknown.
#[derive(Clone, Copy, Debug)]
pub struct InboundRequest<'a> {
    headers: &'a HeaderMap,
    remote_addr: &'a str,
    host: &'a str,
}

impl<'a> InboundRequest<'a> {
    /// Creates a view over bare headers, with no peer address and no host.
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self {
            headers,
            remote_addr: "",
            host: "",
        }
    }

    /// Creates a view over an [`http::Request`], taking the host from the
    /// URI authority and falling back to the `Host` header.
    ///
    /// The peer address lives in the transport, not the request; chain
    /// [`with_remote_addr`][Self::with_remote_addr] to supply it.
    pub fn from_http<B>(req: &'a Request<B>) -> Self {
        let host = req
            .uri()
            .authority()
            .map(|authority| authority.as_str())
            .or_else(|| {
                req.headers()
                    .get(header::HOST)
                    .and_then(|value| value.to_str().ok())
            })
            .unwrap_or("");
        Self {
            headers: req.headers(),
            remote_addr: "",
            host,
        }
    }

    /// Sets the peer address.
    pub fn with_remote_addr(mut self, remote_addr: &'a str) -> Self {
        self.remote_addr = remote_addr;
        self
    }

    /// Sets the host the client addressed.
    pub fn with_host(mut self, host: &'a str) -> Self {
        self.host = host;
        self
    }

    #[inline]
    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }

    #[inline]
    pub fn remote_addr(&self) -> &'a str {
        self.remote_addr
    }

    #[inline]
    pub fn host(&self) -> &'a str {
        self.host
    }
}
