//! Derives an annotated [`CallContext`] from an inbound HTTP request.

use std::time::Duration;

use faststr::FastStr;
use http::header;
use trestle::{net::split_host_port, CallContext};

use crate::{
    context::CallContextExt,
    metadata::{
        MetadataMap, GRPC_TIMEOUT_HEADER, METADATA_HEADER_PREFIX, X_FORWARDED_FOR,
        X_FORWARDED_HOST,
    },
    request::InboundRequest,
    status::Status,
    timeout,
};

/// Annotates call contexts from inbound HTTP requests: projects selected
/// headers into call metadata, injects forwarding provenance and derives a
/// deadline from the `grpc-timeout` header.
///
/// ```rust
/// use std::time::Duration;
///
/// use trestle::CallContext;
/// use trestle_grpc::{Annotator, CallContextExt, InboundRequest};
///
/// let annotator = Annotator::new().with_default_timeout(Duration::from_secs(30));
///
/// let req = http::Request::builder()
///     .uri("http://gateway.local/pkg.Svc/Method")
///     .header("grpc-metadata-trace-id", "abc123")
///     .body(())
///     .unwrap();
///
/// let ctx = annotator
///     .annotate(
///         &CallContext::new(),
///         &InboundRequest::from_http(&req).with_remote_addr("10.0.0.5:4321"),
///     )
///     .unwrap();
///
/// let md = ctx.call_metadata().unwrap();
/// assert_eq!(md.get("trace-id").map(|v| v.as_str()), Some("abc123"));
/// assert_eq!(
///     md.get("x-forwarded-for").map(|v| v.as_str()),
///     Some("10.0.0.5")
/// );
/// assert!(ctx.remaining().is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Annotator {
    default_timeout: Option<Duration>,
}

impl Annotator {
    /// Creates an annotator with no default timeout: requests without a
    /// `grpc-timeout` header get no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout applied when the request carries no `grpc-timeout`
    /// header. `Duration::ZERO` means no deadline.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = (timeout != Duration::ZERO).then_some(timeout);
        self
    }

    /// Derives an annotated context for one inbound request.
    ///
    /// The request's headers are only read, never modified. Fails only when
    /// the request carries a malformed `grpc-timeout` value; the returned
    /// status is `InvalidArgument` and names the offending token. All other
    /// anomalies (an unsplittable peer address, header values that are not
    /// readable strings) are logged and skipped.
    pub fn annotate(
        &self,
        ctx: &CallContext,
        req: &InboundRequest<'_>,
    ) -> Result<CallContext, Status> {
        let timeout = self.effective_timeout(req)?;

        let mut pairs = Vec::new();
        project_headers(&mut pairs, req);
        append_forwarding(&mut pairs, req);

        let ctx = match timeout {
            Some(timeout) if timeout != Duration::ZERO => ctx.with_timeout(timeout),
            _ => ctx.clone(),
        };
        if pairs.is_empty() {
            return Ok(ctx);
        }
        Ok(ctx.with_call_metadata(MetadataMap::from_pairs(pairs)))
    }

    fn effective_timeout(&self, req: &InboundRequest<'_>) -> Result<Option<Duration>, Status> {
        let Some(value) = req.headers().get(GRPC_TIMEOUT_HEADER) else {
            return Ok(self.default_timeout);
        };
        let Ok(token) = value.to_str() else {
            return Err(Status::invalid_argument(
                "invalid grpc-timeout: unreadable header value",
            ));
        };
        if token.is_empty() {
            // an empty value counts as absent
            return Ok(self.default_timeout);
        }
        match timeout::decode(token) {
            Ok(timeout) => Ok(Some(timeout)),
            Err(err) => {
                Err(Status::invalid_argument(format!("invalid grpc-timeout: {token}"))
                    .with_source(err))
            }
        }
    }
}

/// Projects inbound headers into metadata pairs: `authorization` passes
/// through under its own name, `grpc-metadata-*` headers under their
/// stripped name, everything else is ignored. Every value of a repeated
/// header is projected, keeping its order.
fn project_headers(pairs: &mut Vec<(FastStr, FastStr)>, req: &InboundRequest<'_>) {
    for (name, value) in req.headers() {
        let key = if *name == header::AUTHORIZATION {
            name.as_str()
        } else if let Some(stripped) = name.as_str().strip_prefix(METADATA_HEADER_PREFIX) {
            stripped
        } else {
            continue;
        };
        match value.to_str() {
            Ok(value) => pairs.push((FastStr::new(key), FastStr::new(value))),
            Err(_) => {
                tracing::debug!("[TRESTLE] skipping unreadable value of header {}", name);
            }
        }
    }
}

/// Appends forwarding provenance after the projected pairs: the host the
/// client addressed and the client address chain.
fn append_forwarding(pairs: &mut Vec<(FastStr, FastStr)>, req: &InboundRequest<'_>) {
    match header_str(req, X_FORWARDED_HOST) {
        Some(host) => pairs.push((
            FastStr::from_static_str(X_FORWARDED_HOST),
            FastStr::new(host),
        )),
        None if !req.host().is_empty() => pairs.push((
            FastStr::from_static_str(X_FORWARDED_HOST),
            FastStr::new(req.host()),
        )),
        None => {}
    }

    let addr = req.remote_addr();
    if addr.is_empty() {
        return;
    }
    match split_host_port(addr) {
        Ok((remote_ip, _)) => {
            // the raw inbound header feeds the chain, never a projected pair
            let value = match header_str(req, X_FORWARDED_FOR) {
                Some(existing) => FastStr::from(format!("{existing}, {remote_ip}")),
                None => FastStr::new(remote_ip),
            };
            pairs.push((FastStr::from_static_str(X_FORWARDED_FOR), value));
        }
        Err(err) => tracing::warn!("[TRESTLE] invalid remote addr {:?}: {}", addr, err),
    }
}

// First value of `name`, if present, readable and non-empty.
fn header_str<'a>(req: &InboundRequest<'a>, name: &str) -> Option<&'a str> {
    let value = req.headers().get(name)?;
    match value.to_str() {
        Ok("") => None,
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!("[TRESTLE] skipping unreadable value of header {}", name);
            None
        }
    }
}
