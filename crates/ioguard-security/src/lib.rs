// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound connection guard and secret redaction.
//!
//! Two halves share this crate:
//! - **SSRF prevention**: address classification against a reserved-range
//!   table, client IP resolution, and a guarded dialer / reqwest resolver
//!   that refuse to connect to loopback, link-local or private networks.
//! - **Redaction**: DSN passwords, sensitive JSON values (comment-tolerant),
//!   and a log writer that applies both to every line.

pub mod classify;
pub mod client;
pub mod client_ip;
pub mod dsn;
pub mod error;
pub mod extract;
pub mod guard;
pub mod json_redact;
pub mod json_walker;
pub mod logging;
pub mod policy;
pub mod ranges;
pub mod redact;
pub mod ssrf;

pub use classify::{
    is_link_local_ip, is_loopback_ip, is_private_ip, is_private_network_ip, Classification,
    Classifier, Disposition,
};
pub use client::{build_safe_client, SafeClient};
pub use client_ip::{client_ip, remote_ip, with_remote_ip, ClientIpResolver, RemoteIp};
pub use dsn::redact_dsn;
pub use error::GuardError;
pub use extract::{extract_host, extract_ip};
pub use guard::{check_connection, safe_dial_context, CallContext, Dialer, Resolver, SafeDialer};
pub use json_redact::{redact_json, redact_json_str, redact_value};
pub use json_walker::{walk_json_strings, walk_standard_json_strings};
pub use logging::init_tracing;
pub use policy::{EgressPolicy, EnvOverrides, OverrideSource, Overrides};
pub use ranges::{AddressRange, Category, RangeTable, RangeTag};
pub use redact::{add_secret, is_sensitive_key, redact, RedactingWriter, REDACTED};
pub use ssrf::{validate_url_host, SsrfSafeResolver};
