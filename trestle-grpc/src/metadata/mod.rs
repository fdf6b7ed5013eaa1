//! Data structures and header names for the call metadata carried across
//! the HTTP bridge.

mod map;

pub use self::map::{GetAll, IntoIter, Iter, MetadataMap};

/// Inbound HTTP headers with this prefix are projected into call metadata
/// under their stripped name.
pub const METADATA_HEADER_PREFIX: &str = "grpc-metadata-";

/// Prefix under which the boundary layer exposes trailer metadata when it
/// writes the HTTP response.
pub const METADATA_TRAILER_PREFIX: &str = "grpc-trailer-";

/// Header carrying the compact timeout token, see [`crate::timeout`].
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
