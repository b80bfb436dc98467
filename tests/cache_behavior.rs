//! Entity cache coherence through the domain clients: mutations patch
//! the cached list in place, deletes evict, and repeated reads never
//! refetch what is already cached.

use std::sync::Arc;

use marketwatch_api::{
    CreateAlertRequest, ItemQueryParameters, MarketWatchClient, RealmQueryParameters,
    UpdateAlertRequest,
};
use marketwatch_core::{CursorPaginationParams, HttpResponse, MemoryStorage};
use marketwatch_tests::{no_retry_config, MockTransport};

fn client_with(transport: Arc<MockTransport>) -> MarketWatchClient {
    MarketWatchClient::with_parts(no_retry_config(), transport, Arc::new(MemoryStorage::new()))
}

fn alert_json(id: i64, name: &str) -> String {
    format!(r#"{{"id":{id},"userId":1,"name":"{name}"}}"#)
}

fn item_json(id: i64, name: &str) -> String {
    format!(r#"{{"id":{id},"name":"{name}","isStackable":true}}"#)
}

fn realm_json(id: i64, name: &str) -> String {
    format!(r#"{{"id":{id},"name":"{name}"}}"#)
}

fn page_of(nodes: &[String]) -> String {
    format!(
        r#"{{"nodes":[{}],"pageInfo":{{"hasNextPage":false,"hasPreviousPage":false}}}}"#,
        nodes.join(",")
    )
}

#[tokio::test]
async fn created_alert_appears_in_cached_list_exactly_once() {
    let transport = MockTransport::new(|request| {
        match (request.method.as_str(), request.url.as_str()) {
            ("GET", url) if url.ends_with("users/1/alerts") => Ok(HttpResponse::ok_json(
                page_of(&[alert_json(5, "iron below 10g"), alert_json(6, "copper spike")]),
            )),
            ("POST", url) if url.ends_with("users/1/alerts") => {
                Ok(HttpResponse::new(201, alert_json(7, "saronite crash")))
            }
            other => panic!("unexpected request: {other:?}"),
        }
    });
    let client = client_with(transport.clone());

    client
        .alerts()
        .get_alerts_for_user(1)
        .await
        .expect("initial list fetch");
    client
        .alerts()
        .create_alert_for_user(
            1,
            &CreateAlertRequest {
                name: String::from("saronite crash"),
                description: None,
            },
        )
        .await
        .expect("create succeeds");

    let alerts = client
        .alerts()
        .get_alerts_for_user(1)
        .await
        .expect("cached list read");

    assert_eq!(
        alerts.iter().filter(|alert| alert.id == 7).count(),
        1,
        "created alert present exactly once"
    );
    // The second list read was served from cache.
    assert_eq!(transport.calls_to("users/1/alerts"), 2);
}

#[tokio::test]
async fn updated_alert_replaces_its_list_entry_in_place() {
    let transport = MockTransport::new(|request| {
        match (request.method.as_str(), request.url.as_str()) {
            ("GET", url) if url.ends_with("users/1/alerts") => Ok(HttpResponse::ok_json(
                page_of(&[alert_json(5, "iron below 10g"), alert_json(6, "copper spike")]),
            )),
            ("PATCH", url) if url.ends_with("users/1/alerts/5") => {
                Ok(HttpResponse::ok_json(alert_json(5, "iron below 8g")))
            }
            other => panic!("unexpected request: {other:?}"),
        }
    });
    let client = client_with(transport.clone());

    client
        .alerts()
        .get_alerts_for_user(1)
        .await
        .expect("initial list fetch");
    client
        .alerts()
        .update_alert_for_user(
            1,
            5,
            &UpdateAlertRequest {
                name: Some(String::from("iron below 8g")),
                description: None,
            },
        )
        .await
        .expect("update succeeds");

    let alerts = client
        .alerts()
        .get_alerts_for_user(1)
        .await
        .expect("cached list read");

    assert_eq!(alerts.len(), 2);
    let updated = alerts.iter().find(|alert| alert.id == 5).expect("still listed");
    assert_eq!(updated.name, "iron below 8g");

    // The update went over the wire as a JSON-Patch document.
    let patch = transport.calls()[1].body.clone().expect("patch body");
    assert!(patch.contains(r#""op":"add""#));
    assert!(patch.contains(r#""path":"/name""#));
}

#[tokio::test]
async fn deleted_alert_is_evicted_from_single_and_list_entries() {
    let transport = MockTransport::new(|request| {
        match (request.method.as_str(), request.url.as_str()) {
            ("GET", url) if url.ends_with("users/1/alerts") => Ok(HttpResponse::ok_json(
                page_of(&[alert_json(5, "iron below 10g"), alert_json(6, "copper spike")]),
            )),
            ("DELETE", url) if url.ends_with("users/1/alerts/5") => {
                Ok(HttpResponse::new(204, ""))
            }
            ("GET", url) if url.ends_with("users/1/alerts/5") => {
                Ok(HttpResponse::new(404, "gone"))
            }
            other => panic!("unexpected request: {other:?}"),
        }
    });
    let client = client_with(transport.clone());

    client
        .alerts()
        .get_alerts_for_user(1)
        .await
        .expect("initial list fetch");
    client
        .alerts()
        .delete_alert_for_user(1, 5)
        .await
        .expect("delete succeeds");

    // The single entry was evicted, so this goes back to the network.
    let single = client
        .alerts()
        .get_alert_for_user(1, 5)
        .await
        .expect("lookup completes");
    assert_eq!(single, None);

    // The cached list dropped the deleted alert but kept the rest.
    let alerts = client
        .alerts()
        .get_alerts_for_user(1)
        .await
        .expect("cached list read");
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, 6);
    assert_eq!(transport.calls_to("users/1/alerts/5"), 2);
}

#[tokio::test]
async fn list_fetch_seeds_single_entry_lookups() {
    let transport = MockTransport::new(|request| {
        match (request.method.as_str(), request.url.as_str()) {
            ("GET", url) if url.ends_with("users/1/alerts") => Ok(HttpResponse::ok_json(
                page_of(&[alert_json(5, "iron below 10g"), alert_json(6, "copper spike")]),
            )),
            other => panic!("unexpected request: {other:?}"),
        }
    });
    let client = client_with(transport.clone());

    client
        .alerts()
        .get_alerts_for_user(1)
        .await
        .expect("list fetch");

    let alert = client
        .alerts()
        .get_alert_for_user(1, 6)
        .await
        .expect("single lookup")
        .expect("alert present");

    assert_eq!(alert.name, "copper spike");
    assert_eq!(transport.call_count(), 1, "single lookup served from cache");
}

#[tokio::test]
async fn item_lists_are_cached_per_query_signature() {
    let transport = MockTransport::new(|request| {
        if request.url.contains("name=iron") {
            Ok(HttpResponse::ok_json(page_of(&[
                item_json(10, "Iron Ore"),
                item_json(11, "Iron Bar"),
            ])))
        } else {
            Ok(HttpResponse::ok_json(page_of(&[item_json(
                20,
                "Copper Ore",
            )])))
        }
    });
    let client = client_with(transport.clone());

    let iron_params = ItemQueryParameters {
        name: Some(String::from("iron")),
        ..Default::default()
    };
    let copper_params = ItemQueryParameters {
        name: Some(String::from("copper")),
        ..Default::default()
    };

    let first = client.items().get_items(&iron_params).await.expect("fetch");
    let again = client.items().get_items(&iron_params).await.expect("cached");
    let other = client
        .items()
        .get_items(&copper_params)
        .await
        .expect("different signature fetches");

    assert_eq!(first, again);
    assert_eq!(other.len(), 1);
    assert_eq!(transport.call_count(), 2, "one call per distinct query");
}

#[tokio::test]
async fn realm_list_fetch_seeds_single_realm_lookups() {
    let transport = MockTransport::new(|request| {
        if request.url.contains("wow/realms?") {
            Ok(HttpResponse::ok_json(page_of(&[
                realm_json(10, "Thrall"),
                realm_json(11, "Durotan"),
            ])))
        } else if request.url.ends_with("wow/realms/99") {
            Ok(HttpResponse::new(404, "no such realm"))
        } else {
            panic!("unexpected request: {}", request.url);
        }
    });
    let client = client_with(transport.clone());

    let realms = client
        .realms()
        .get_realms(&RealmQueryParameters::default())
        .await
        .expect("list fetch");
    assert_eq!(realms.len(), 2);

    // Seeded by the list fetch, so no network call.
    let realm = client
        .realms()
        .get_realm(10)
        .await
        .expect("single lookup")
        .expect("realm present");
    assert_eq!(realm.name, "Thrall");
    assert_eq!(transport.call_count(), 1);

    // An unknown realm reads as absent, not as an error.
    assert_eq!(client.realms().get_realm(99).await.expect("lookup"), None);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn connected_realm_fetch_seeds_both_cache_shapes() {
    let transport = MockTransport::new(|request| {
        if request.url.contains("wow/connectedRealms?") {
            let body = format!(
                r#"{{"nodes":[{{"id":1,"realms":[{},{}]}}],
                    "pageInfo":{{"hasNextPage":false,"hasPreviousPage":false}}}}"#,
                realm_json(10, "Thrall"),
                realm_json(11, "Durotan"),
            );
            Ok(HttpResponse::ok_json(body))
        } else {
            panic!("unexpected request: {}", request.url);
        }
    });
    let client = client_with(transport.clone());

    let connected = client
        .realms()
        .get_connected_realms(&CursorPaginationParams::default())
        .await
        .expect("list fetch");
    assert_eq!(connected.len(), 1);

    // The connected-realm entry and its member realms are all seeded.
    let connected_realm = client
        .realms()
        .get_connected_realm(1)
        .await
        .expect("connected lookup")
        .expect("present");
    assert_eq!(connected_realm.realms.len(), 2);

    let realm = client
        .realms()
        .get_realm(11)
        .await
        .expect("member lookup")
        .expect("present");
    assert_eq!(realm.name, "Durotan");

    assert_eq!(transport.call_count(), 1, "everything after the list is cached");
}
