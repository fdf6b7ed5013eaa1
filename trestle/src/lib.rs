#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub mod context;
pub mod net;

pub use context::{CallContext, DeadlineExceeded, UntilDeadline};
pub use net::split_host_port;
