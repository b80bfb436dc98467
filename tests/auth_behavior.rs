//! Session lifecycle: login broadcasts, proactive refresh on expiry,
//! the one-shot 401 refresh handler, and unauthorized escalation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use marketwatch_api::MarketWatchClient;
use marketwatch_core::{
    ApiError, HttpMethod, HttpResponse, KeyValueStorage, MemoryStorage, TOKEN_EXPIRED_HEADER,
};
use marketwatch_tests::{
    fresh_token, login_response_body, near_expiry_token, refresh_response_body, test_config,
    MockTransport,
};

fn client_with(transport: Arc<MockTransport>, storage: Arc<MemoryStorage>) -> MarketWatchClient {
    MarketWatchClient::with_parts(test_config(), transport, storage)
}

/// Storage pre-seeded with a persisted session, keyed the way the
/// default `market-watcher` prefix lays keys out.
fn seeded_storage(access_token: &str) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    storage.set("market-watcher-access-token", access_token.to_string());
    storage.set(
        "market-watcher-refresh-token",
        String::from("persisted-refresh"),
    );
    storage
}

#[tokio::test]
async fn login_stores_session_and_broadcasts_auth_change() {
    let token = fresh_token();
    let body = login_response_body(&token);
    let transport = MockTransport::new(move |request| {
        assert!(request.url.ends_with("auth/login"));
        Ok(HttpResponse::ok_json(body.clone()))
    });
    let client = client_with(transport.clone(), Arc::new(MemoryStorage::new()));
    let mut auth_changes = client.token_store().subscribe_auth_changed();

    let response = client
        .token_store()
        .login("jaina", "hunter2")
        .await
        .expect("login succeeds");

    assert_eq!(response.user.user_name, "jaina");
    assert!(client.token_store().is_user_logged_in());
    assert_eq!(
        client.token_store().logged_in_user().map(|u| u.email),
        Some(String::from("jaina@example.test"))
    );
    assert_eq!(auth_changes.try_recv(), Ok(true));

    // The store attaches its own device id to the credentials.
    let login_body = transport.calls()[0].body.clone().expect("login has a body");
    assert!(login_body.contains("deviceId"));
}

#[tokio::test]
async fn near_expiry_token_is_refreshed_once_before_the_request() {
    let new_token = fresh_token();
    let refresh_body = refresh_response_body(&new_token);
    let transport = MockTransport::new(move |request| {
        if request.url.contains("auth/refreshToken") {
            Ok(HttpResponse::ok_json(refresh_body.clone()))
        } else {
            Ok(HttpResponse::ok_json("[]"))
        }
    });
    let client = client_with(transport.clone(), seeded_storage(&near_expiry_token()));

    let result: Option<serde_json::Value> = client
        .executor()
        .get_json("items")
        .await
        .expect("request succeeds after refresh");

    assert!(result.is_some());
    assert_eq!(transport.calls_to("auth/refreshToken"), 1);

    // The resubmitted request carries the refreshed bearer.
    let items_call = transport
        .calls()
        .into_iter()
        .find(|call| call.url.ends_with("items"))
        .expect("items call recorded");
    assert_eq!(
        items_call.header("authorization"),
        Some(format!("Bearer {new_token}").as_str())
    );
}

#[tokio::test]
async fn expired_401_refreshes_once_and_resubmits() {
    let new_token = fresh_token();
    let refresh_body = refresh_response_body(&new_token);
    let item_attempts = Arc::new(AtomicUsize::new(0));
    let seen = item_attempts.clone();
    let transport = MockTransport::new(move |request| {
        if request.url.contains("auth/refreshToken") {
            return Ok(HttpResponse::ok_json(refresh_body.clone()));
        }

        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(HttpResponse::new(401, "").with_header(TOKEN_EXPIRED_HEADER, "true"))
        } else {
            Ok(HttpResponse::ok_json("[]"))
        }
    });
    let client = client_with(transport.clone(), seeded_storage(&fresh_token()));

    let result: Option<serde_json::Value> = client
        .executor()
        .get_json("items")
        .await
        .expect("resubmission succeeds");

    assert!(result.is_some());
    assert_eq!(transport.calls_to("items"), 2);
    assert_eq!(transport.calls_to("auth/refreshToken"), 1);
}

#[tokio::test]
async fn second_401_escalates_instead_of_refreshing_again() {
    let refresh_body = refresh_response_body(&fresh_token());
    let transport = MockTransport::new(move |request| {
        if request.url.contains("auth/refreshToken") {
            Ok(HttpResponse::ok_json(refresh_body.clone()))
        } else {
            Ok(HttpResponse::new(401, "").with_header(TOKEN_EXPIRED_HEADER, "true"))
        }
    });
    let client = client_with(transport.clone(), seeded_storage(&fresh_token()));
    let mut unauthorized = client.token_store().subscribe_unauthorized();

    let result = client
        .executor()
        .execute(HttpMethod::Get, "items", None, false)
        .await;

    assert!(matches!(
        result,
        Err(ApiError::Status { status: 401, .. })
    ));
    // One refresh, one resubmission, then escalation.
    assert_eq!(transport.calls_to("auth/refreshToken"), 1);
    assert_eq!(transport.calls_to("items"), 2);
    assert_eq!(unauthorized.try_recv(), Ok(401));
}

#[tokio::test]
async fn forbidden_broadcasts_unauthorized_without_refreshing() {
    let transport = MockTransport::new(|_| Ok(HttpResponse::new(403, "forbidden")));
    let client = client_with(transport.clone(), seeded_storage(&fresh_token()));
    let mut unauthorized = client.token_store().subscribe_unauthorized();

    let result = client
        .executor()
        .execute(HttpMethod::Get, "admin/users", None, false)
        .await;

    assert!(matches!(
        result,
        Err(ApiError::Status { status: 403, .. })
    ));
    assert_eq!(transport.calls_to("auth/refreshToken"), 0);
    assert_eq!(unauthorized.try_recv(), Ok(403));
}

#[tokio::test]
async fn refresh_failure_fails_the_original_request() {
    let transport = MockTransport::new(|request| {
        if request.url.contains("auth/refreshToken") {
            Ok(HttpResponse::new(500, "refresh backend down"))
        } else {
            Ok(HttpResponse::ok_json("[]"))
        }
    });
    let client = client_with(transport.clone(), seeded_storage(&near_expiry_token()));

    let result: Result<Option<serde_json::Value>, _> = client.executor().get_json("items").await;

    assert!(matches!(result, Err(ApiError::RefreshFailed(_))));
    // The request the refresh was gating never goes out.
    assert_eq!(transport.calls_to("items"), 0);
}

#[tokio::test]
async fn concurrent_refreshes_coalesce_into_one_call() {
    let refresh_body = refresh_response_body(&fresh_token());
    let transport = MockTransport::with_delay(Duration::from_millis(50), move |request| {
        if request.url.contains("auth/refreshToken") {
            Ok(HttpResponse::ok_json(refresh_body.clone()))
        } else {
            Ok(HttpResponse::ok_json("[]"))
        }
    });
    let client = client_with(transport.clone(), seeded_storage(&near_expiry_token()));

    let (a, b) = tokio::join!(
        client.executor().get_json::<serde_json::Value>("items"),
        client
            .executor()
            .get_json::<serde_json::Value>("watchLists"),
    );

    a.expect("first request succeeds");
    b.expect("second request succeeds");
    assert_eq!(transport.calls_to("auth/refreshToken"), 1);
}

#[tokio::test]
async fn logout_drops_the_bearer_from_subsequent_requests() {
    let transport = MockTransport::new(|_| Ok(HttpResponse::ok_json("[]")));
    let client = client_with(transport.clone(), seeded_storage(&fresh_token()));

    client.token_store().logout();
    let _: Option<serde_json::Value> = client
        .executor()
        .get_json("items")
        .await
        .expect("anonymous request succeeds");

    assert_eq!(transport.calls()[0].header("authorization"), None);
}
