//! Pre-built [`tracing::Span`] constructors for safenode operations.
//!
//! Consistent span names and field sets make traces easy to filter and
//! correlate across the registry, the service surface and maintenance.

use tracing::{info_span, Span};

/// Span covering the handling of one inbound peer message.
pub fn message_span(kind: &str) -> Span {
    info_span!("safenode_message", kind = %kind)
}

/// Span covering a command on the service surface.
pub fn command_span(command: &str) -> Span {
    info_span!("safenode_command", command = %command)
}

/// Span covering the start of one configured safenode.
pub fn start_alias_span(alias: &str) -> Span {
    info_span!("start_alias", alias = %alias)
}

/// Span covering one maintenance pass.
pub fn maintenance_span(height: u32) -> Span {
    info_span!("maintenance", height = height)
}
