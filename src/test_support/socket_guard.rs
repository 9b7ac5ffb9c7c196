use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

#[must_use]
pub(crate) fn socket_tests_required() -> bool {
    std::env::var("GRABFILE_REQUIRE_SOCKET_TESTS")
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Whether wiremock-backed tests must be skipped because localhost cannot be bound.
#[track_caller]
#[must_use]
pub(crate) fn should_skip_socket_bound_test() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let location = Location::caller();
    let message = format!(
        "[socket-bound-test] cannot bind localhost socket at {}:{}",
        location.file(),
        location.line()
    );
    assert!(
        !socket_tests_required(),
        "{message}. Unset GRABFILE_REQUIRE_SOCKET_TESTS to allow skipping."
    );

    eprintln!("{message}. Skipping test.");
    true
}

pub(crate) async fn start_mock_server_or_skip() -> Option<MockServer> {
    if should_skip_socket_bound_test() {
        None
    } else {
        Some(MockServer::start().await)
    }
}
