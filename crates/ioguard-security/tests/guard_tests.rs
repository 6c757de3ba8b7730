// SPDX-FileCopyrightText: 2026 ioguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the guarded dialer with mock DNS and transport.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ioguard_security::guard::check_connection;
use ioguard_security::policy::NoOverrides;
use ioguard_security::{
    CallContext, Dialer, EgressPolicy, GuardError, Overrides, Resolver, SafeDialer,
};
use serial_test::serial;
use tokio_util::sync::CancellationToken;

// --- Mocks ---

#[derive(Clone)]
enum Answer {
    Ips(Vec<IpAddr>),
    Fail,
    Hang,
}

struct MockResolver {
    answer: Answer,
}

impl MockResolver {
    fn ips(ips: &[&str]) -> Self {
        Self {
            answer: Answer::Ips(ips.iter().map(|s| s.parse().unwrap()).collect()),
        }
    }
}

#[async_trait]
impl Resolver for MockResolver {
    async fn lookup_ip(&self, _host: &str) -> io::Result<Vec<IpAddr>> {
        match &self.answer {
            Answer::Ips(ips) => Ok(ips.clone()),
            Answer::Fail => Err(io::Error::new(io::ErrorKind::NotFound, "nxdomain")),
            Answer::Hang => std::future::pending().await,
        }
    }
}

#[derive(Clone, Default)]
struct MockDialer {
    attempts: Arc<Mutex<Vec<SocketAddr>>>,
    refuse: Arc<HashSet<IpAddr>>,
    hang: bool,
}

impl MockDialer {
    fn refusing(ips: &[&str]) -> Self {
        Self {
            refuse: Arc::new(ips.iter().map(|s| s.parse().unwrap()).collect()),
            ..Self::default()
        }
    }

    /// Records the attempt, then never connects.
    fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    fn attempts(&self) -> Vec<SocketAddr> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    type Conn = SocketAddr;

    async fn dial(&self, addr: SocketAddr) -> io::Result<SocketAddr> {
        self.attempts.lock().unwrap().push(addr);
        if self.hang {
            return std::future::pending().await;
        }
        if self.refuse.contains(&addr.ip()) {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        } else {
            Ok(addr)
        }
    }
}

fn mock_guard(resolver: MockResolver, dialer: MockDialer) -> SafeDialer<MockDialer> {
    SafeDialer::new()
        .with_policy(EgressPolicy::strict())
        .with_resolver(resolver)
        .with_dialer(dialer)
}

fn sock(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

// --- Resolution and policy ---

#[tokio::test]
async fn public_host_dials_first_address() {
    let dialer = MockDialer::default();
    let guard = mock_guard(MockResolver::ips(&["93.184.216.34", "93.184.216.35"]), dialer.clone());

    let conn = guard
        .dial_context(&CallContext::new(), "tcp", "example.com:443")
        .await
        .unwrap();

    assert_eq!(conn, sock("93.184.216.34:443"));
    assert_eq!(dialer.attempts(), vec![sock("93.184.216.34:443")]);
}

#[tokio::test]
async fn falls_through_to_next_address_on_dial_failure() {
    let dialer = MockDialer::refusing(&["93.184.216.34"]);
    let guard = mock_guard(MockResolver::ips(&["93.184.216.34", "93.184.216.35"]), dialer.clone());

    let conn = guard
        .dial_context(&CallContext::new(), "tcp", "example.com:80")
        .await
        .unwrap();

    assert_eq!(conn, sock("93.184.216.35:80"));
    assert_eq!(dialer.attempts().len(), 2);
}

#[tokio::test]
async fn returns_first_error_when_every_dial_fails() {
    let dialer = MockDialer::refusing(&["93.184.216.34", "93.184.216.35"]);
    let guard = mock_guard(MockResolver::ips(&["93.184.216.34", "93.184.216.35"]), dialer);

    let err = guard
        .dial_context(&CallContext::new(), "tcp", "example.com:80")
        .await
        .unwrap_err();

    match err {
        GuardError::Dial { addr, .. } => assert_eq!(addr, sock("93.184.216.34:80")),
        other => panic!("expected dial error, got {other:?}"),
    }
}

#[tokio::test]
async fn one_private_answer_blocks_everything() {
    let dialer = MockDialer::default();
    let guard = mock_guard(MockResolver::ips(&["93.184.216.34", "10.0.0.7"]), dialer.clone());

    let err = guard
        .dial_context(&CallContext::new(), "tcp", "rebind.example:80")
        .await
        .unwrap_err();

    match err {
        GuardError::Blocked { host, ip, .. } => {
            assert_eq!(host, "rebind.example");
            assert_eq!(ip, "10.0.0.7".parse::<IpAddr>().unwrap());
        }
        other => panic!("expected block, got {other:?}"),
    }
    assert!(dialer.attempts().is_empty(), "nothing may be dialed");
}

#[tokio::test]
async fn embedded_forms_are_blocked() {
    let dialer = MockDialer::default();
    let guard = mock_guard(MockResolver::ips(&["::ffff:127.0.0.1"]), dialer.clone());
    let err = guard
        .dial_context(&CallContext::new(), "tcp", "sneaky.example:80")
        .await
        .unwrap_err();
    assert!(err.is_blocked());

    let err = guard
        .dial_context(&CallContext::new(), "tcp", "[64:ff9b::a9fe:a9fe]:80")
        .await
        .unwrap_err();
    assert!(err.is_blocked());
    assert!(dialer.attempts().is_empty());
}

#[tokio::test]
async fn resolve_failure_and_empty_answer() {
    let guard_fail = mock_guard(MockResolver { answer: Answer::Fail }, MockDialer::default());
    let err = guard_fail
        .dial_context(&CallContext::new(), "tcp", "missing.example:80")
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::Resolve { .. }));
    assert!(err.to_string().contains("dns lookup failed"));

    let guard_empty = mock_guard(MockResolver::ips(&[]), MockDialer::default());
    let err = guard_empty
        .dial_context(&CallContext::new(), "tcp", "empty.example:80")
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::NoAddresses { .. }));
    assert!(err.to_string().contains("no ip addresses found"));
}

#[tokio::test]
async fn network_suffix_filters_family() {
    let dialer = MockDialer::default();
    let guard = mock_guard(MockResolver::ips(&["2606:2800:220:1::1", "93.184.216.34"]), dialer.clone());

    let conn = guard
        .dial_context(&CallContext::new(), "tcp4", "example.com:80")
        .await
        .unwrap();
    assert_eq!(conn, sock("93.184.216.34:80"));

    let conn = guard
        .dial_context(&CallContext::new(), "tcp6", "example.com:80")
        .await
        .unwrap();
    assert_eq!(conn, sock("[2606:2800:220:1::1]:80"));

    let v4_only = mock_guard(MockResolver::ips(&["93.184.216.34"]), MockDialer::default());
    let err = v4_only
        .dial_context(&CallContext::new(), "tcp6", "example.com:80")
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::NoAddresses { .. }));
}

#[tokio::test]
async fn literal_addresses_skip_the_resolver() {
    let dialer = MockDialer::default();
    let guard = mock_guard(MockResolver { answer: Answer::Fail }, dialer.clone());
    let conn = guard
        .dial_context(&CallContext::new(), "tcp", "[2606:4700:4700::1111]:53")
        .await
        .unwrap();
    assert_eq!(conn, sock("[2606:4700:4700::1111]:53"));
}

#[tokio::test]
async fn invalid_targets_are_rejected() {
    let guard = mock_guard(MockResolver::ips(&["93.184.216.34"]), MockDialer::default());
    for addr in ["example.com", "example.com:notaport", "[::1:80", ""] {
        let err = guard
            .dial_context(&CallContext::new(), "tcp", addr)
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::InvalidAddress { .. }), "{addr}");
    }
    let err = guard
        .dial_context(&CallContext::new(), "unix", "example.com:80")
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::InvalidAddress { .. }));
}

// --- Per-category flags and overrides ---

#[tokio::test]
async fn category_flags_permit_only_their_category() {
    let mut guard = mock_guard(
        MockResolver::ips(&["127.0.0.1", "169.254.169.254"]),
        MockDialer::default(),
    );
    guard.policy_mut().allow_loopback = true;
    let err = guard
        .check_host(&CallContext::new(), "mixed.internal")
        .await
        .unwrap_err();
    assert!(err.is_blocked());

    guard.policy_mut().allow_link_local = true;
    let ips = guard
        .check_host(&CallContext::new(), "mixed.internal")
        .await
        .unwrap();
    assert_eq!(ips.len(), 2);
}

#[tokio::test]
async fn override_source_is_consulted_per_call() {
    let flag = Arc::new(AtomicBool::new(false));
    let source = {
        let flag = Arc::clone(&flag);
        move || Overrides {
            allow_loopback: false,
            allow_private_network: flag.load(Ordering::SeqCst),
        }
    };
    let dialer = MockDialer::default();
    let guard = SafeDialer::new()
        .with_policy(EgressPolicy::strict().with_overrides(source))
        .with_resolver(MockResolver::ips(&["192.168.1.10"]))
        .with_dialer(dialer.clone());

    assert!(guard
        .dial_context(&CallContext::new(), "tcp", "nas.lan:445")
        .await
        .unwrap_err()
        .is_blocked());

    flag.store(true, Ordering::SeqCst);
    let conn = guard
        .dial_context(&CallContext::new(), "tcp", "nas.lan:445")
        .await
        .unwrap();
    assert_eq!(conn, sock("192.168.1.10:445"));
}

#[tokio::test]
async fn allowlisted_network_is_dialed() {
    let dialer = MockDialer::default();
    let policy = EgressPolicy::strict()
        .with_overrides(NoOverrides)
        .with_allowlist(vec!["10.42.0.0/16".parse().unwrap()]);
    let guard = SafeDialer::new()
        .with_policy(policy)
        .with_resolver(MockResolver::ips(&["10.42.1.1"]))
        .with_dialer(dialer.clone());

    let conn = guard
        .dial_context(&CallContext::new(), "tcp", "svc.cluster.local:8080")
        .await
        .unwrap();
    assert_eq!(conn, sock("10.42.1.1:8080"));
}

// --- Cancellation ---

#[tokio::test]
async fn cancellation_during_resolution() {
    let token = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(token.clone());
    let guard = mock_guard(MockResolver { answer: Answer::Hang }, MockDialer::default());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let err = guard
        .dial_context(&ctx, "tcp", "slow.example:80")
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, GuardError::Cancelled));
    assert!(err.is_cancellation());
}

#[tokio::test(start_paused = true)]
async fn deadline_during_resolution() {
    let ctx = CallContext::new().with_timeout(Duration::from_secs(2));
    let guard = mock_guard(MockResolver { answer: Answer::Hang }, MockDialer::default());

    let err = guard
        .dial_context(&ctx, "tcp", "slow.example:80")
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::DeadlineExceeded));
}

#[tokio::test]
async fn cancellation_during_dial() {
    let token = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(token.clone());
    let dialer = MockDialer::hanging();
    let guard = mock_guard(MockResolver::ips(&["93.184.216.34"]), dialer.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let err = guard
        .dial_context(&ctx, "tcp", "example.com:443")
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, GuardError::Cancelled));
    assert!(err.is_cancellation());
    assert_eq!(dialer.attempts(), vec![sock("93.184.216.34:443")]);
}

#[tokio::test(start_paused = true)]
async fn deadline_during_dial() {
    let ctx = CallContext::new().with_timeout(Duration::from_secs(2));
    let dialer = MockDialer::hanging();
    let guard = mock_guard(MockResolver::ips(&["93.184.216.34", "93.184.216.35"]), dialer.clone());

    let err = guard
        .dial_context(&ctx, "tcp", "example.com:443")
        .await
        .unwrap_err();

    assert!(matches!(err, GuardError::DeadlineExceeded));
    assert!(err.is_cancellation());
    // The deadline stops the whole dial, not just the first attempt.
    assert_eq!(dialer.attempts(), vec![sock("93.184.216.34:443")]);
}

// --- Real sockets ---

#[tokio::test]
async fn real_loopback_listener_respects_policy() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let strict = SafeDialer::new().with_policy(EgressPolicy::strict());
    let err = strict
        .dial_context(&CallContext::new(), "tcp", &addr)
        .await
        .unwrap_err();
    assert!(err.is_blocked());

    let mut policy = EgressPolicy::strict();
    policy.allow_loopback = true;
    let permissive = SafeDialer::new()
        .with_policy(policy)
        .with_timeout(Duration::from_secs(5));
    let stream = permissive
        .dial_context(&CallContext::new(), "tcp", &addr)
        .await
        .unwrap();
    assert_eq!(stream.peer_addr().unwrap(), listener.local_addr().unwrap());
}

#[tokio::test]
#[serial]
async fn check_connection_honors_dangerous_flag() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}/health");

    // SAFETY: env mutation is serialized across tests.
    unsafe { std::env::remove_var("IOGUARD_DANGEROUS_ALLOW_LOCAL_IPS") };
    let err = check_connection(&CallContext::new(), &url).await.unwrap_err();
    assert!(err.is_blocked());

    unsafe { std::env::set_var("IOGUARD_DANGEROUS_ALLOW_LOCAL_IPS", "true") };
    let result = check_connection(&CallContext::new(), &url).await;
    unsafe { std::env::remove_var("IOGUARD_DANGEROUS_ALLOW_LOCAL_IPS") };
    result.unwrap();
}

#[tokio::test]
#[serial]
async fn check_connection_honors_loopback_flag() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap().to_string();

    unsafe { std::env::set_var("IOGUARD_ALLOW_LOOPBACK_RESOURCES", "true") };
    let result = check_connection(&CallContext::new(), &target).await;
    unsafe { std::env::remove_var("IOGUARD_ALLOW_LOOPBACK_RESOURCES") };
    result.unwrap();
}
