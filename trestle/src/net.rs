//! Network address helpers.

use thiserror::Error;

/// Error returned by [`split_host_port`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidHostPort {
    #[error("missing port in address {0:?}")]
    MissingPort(String),
    #[error("too many colons in address {0:?}")]
    TooManyColons(String),
    #[error("missing ']' in address {0:?}")]
    MissingBracket(String),
    #[error("unexpected bracket in address {0:?}")]
    UnexpectedBracket(String),
}

/// Splits a network address of the form `host:port` or `[host]:port` into
/// its host and port parts.
///
/// The port starts after the last colon, so IPv6 literals must be bracketed
/// (`[::1]:80`); a bare IPv6 address is rejected rather than misread. The
/// port part may be empty, as in `host:`.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), InvalidHostPort> {
    let bytes = addr.as_bytes();

    let last_colon = match addr.rfind(':') {
        Some(i) => i,
        None => return Err(InvalidHostPort::MissingPort(addr.to_owned())),
    };

    let (host, open_from, close_from) = if bytes.first() == Some(&b'[') {
        let close = match addr.find(']') {
            Some(i) => i,
            None => return Err(InvalidHostPort::MissingBracket(addr.to_owned())),
        };
        if close + 1 == bytes.len() {
            // `[host]` with nothing after the bracket.
            return Err(InvalidHostPort::MissingPort(addr.to_owned()));
        }
        if close + 1 != last_colon {
            // Either `]` is not followed by a colon, or the colon that
            // follows is not the last one.
            if bytes[close + 1] == b':' {
                return Err(InvalidHostPort::TooManyColons(addr.to_owned()));
            }
            return Err(InvalidHostPort::MissingPort(addr.to_owned()));
        }
        (&addr[1..close], 1, close + 1)
    } else {
        let host = &addr[..last_colon];
        if host.contains(':') {
            return Err(InvalidHostPort::TooManyColons(addr.to_owned()));
        }
        (host, 0, 0)
    };

    if addr[open_from..].contains('[') || addr[close_from..].contains(']') {
        return Err(InvalidHostPort::UnexpectedBracket(addr.to_owned()));
    }

    Ok((host, &addr[last_colon + 1..]))
}
