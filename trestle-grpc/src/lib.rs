#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub mod annotate;
pub mod context;
pub mod metadata;
pub mod request;
pub mod status;
pub mod timeout;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use trestle::CallContext;

pub use annotate::Annotator;
pub use context::{CallContextExt, ServerMetadata};
pub use metadata::MetadataMap;
pub use request::InboundRequest;
pub use status::{Code, Status};
