//! Typed context values carried alongside a bridged call.
//!
//! Two kinds of metadata ride on a [`CallContext`]: the outbound set the
//! annotator projects from the inbound request, and the [`ServerMetadata`]
//! the call execution layer stashes for the boundary layer to read after
//! the call returns. Each kind lives under its own private key type, so
//! they can never collide with each other or with user values.

use trestle::CallContext;

use crate::metadata::MetadataMap;

/// Metadata produced by the server side of a call: the metadata received at
/// call start ("header") and at call completion ("trailer").
///
/// Populating it is the call execution layer's job; this crate defines the
/// shape and the attach/retrieve contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerMetadata {
    /// Metadata received when the call started.
    pub header: MetadataMap,
    /// Metadata received when the call completed.
    pub trailer: MetadataMap,
}

struct OutboundMetadata(MetadataMap);

struct StashedServerMetadata(ServerMetadata);

/// Context accessors for the metadata flowing through a bridged call.
pub trait CallContextExt {
    /// Derives a context carrying `md` as the outbound call metadata.
    fn with_call_metadata(&self, md: MetadataMap) -> CallContext;

    /// The outbound call metadata bound on this context or the nearest
    /// ancestor, if any.
    fn call_metadata(&self) -> Option<&MetadataMap>;

    /// Derives a context carrying server-produced metadata. A later attach
    /// shadows an earlier one; it never edits it.
    fn with_server_metadata(&self, md: ServerMetadata) -> CallContext;

    /// The server-produced metadata bound on this context or the nearest
    /// ancestor. `None` when no call has attached any.
    fn server_metadata(&self) -> Option<&ServerMetadata>;
}

impl CallContextExt for CallContext {
    fn with_call_metadata(&self, md: MetadataMap) -> CallContext {
        self.with_value(OutboundMetadata(md))
    }

    fn call_metadata(&self) -> Option<&MetadataMap> {
        self.value::<OutboundMetadata>().map(|md| &md.0)
    }

    fn with_server_metadata(&self, md: ServerMetadata) -> CallContext {
        self.with_value(StashedServerMetadata(md))
    }

    fn server_metadata(&self) -> Option<&ServerMetadata> {
        self.value::<StashedServerMetadata>().map(|md| &md.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ServerMetadata {
        let mut header = MetadataMap::new();
        header.append("content-type", "application/grpc");
        let mut trailer = MetadataMap::new();
        trailer.append("grpc-status", "0");
        ServerMetadata { header, trailer }
    }

    #[test]
    fn attach_then_retrieve_round_trips() {
        let md = sample();
        let ctx = CallContext::new().with_server_metadata(md.clone());

        assert_eq!(ctx.server_metadata(), Some(&md));
    }

    #[test]
    fn retrieve_without_attach_is_absent() {
        let ctx = CallContext::new();
        assert!(ctx.server_metadata().is_none());
        assert!(ctx.call_metadata().is_none());
    }

    #[test]
    fn retrieve_walks_ancestors() {
        let md = sample();
        let ctx = CallContext::new()
            .with_server_metadata(md.clone())
            .with_value(42_u8);

        assert_eq!(ctx.server_metadata(), Some(&md));
    }

    #[test]
    fn later_attach_shadows_earlier() {
        let first = sample();
        let second = ServerMetadata::default();

        let parent = CallContext::new().with_server_metadata(first.clone());
        let child = parent.with_server_metadata(second.clone());

        assert_eq!(child.server_metadata(), Some(&second));
        assert_eq!(parent.server_metadata(), Some(&first));
    }

    #[test]
    fn metadata_kinds_use_distinct_slots() {
        let mut outbound = MetadataMap::new();
        outbound.append("authorization", "Bearer xyz");

        let ctx = CallContext::new().with_call_metadata(outbound.clone());
        assert_eq!(ctx.call_metadata(), Some(&outbound));
        assert!(ctx.server_metadata().is_none());
    }
}
