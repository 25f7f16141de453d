//! Integration tests for devices, device tags and device environment
//! variables using wiremock.
//!
//! - GET/PATCH/DELETE /v7/device(<id>), GET /v7/device(uuid='<uuid>')
//! - GET/POST /v7/device_tag, PATCH /v7/device_tag(device=<id>,tag_key='<key>'),
//!   DELETE /v7/device_tag(<id>)
//! - GET/POST /v7/device_environment_variable,
//!   GET/PATCH/DELETE /v7/device_environment_variable(<id>)
//!
//! The environment variable round trip runs against a stateful fake so
//! every step observes server state, not anything cached client-side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use balena_cloud::device_tags::*;
use balena_cloud::device_variables::*;
use balena_cloud::devices::*;
use balena_cloud::{BalenaCloud, BalenaCloudError};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn mock_client(server: &MockServer) -> BalenaCloud {
    BalenaCloud::builder("API_TOKEN")
        .base_url(&format!("{}/v7/", server.uri()))
        .build()
}

fn device_fixture() -> Value {
    json!({
        "d": [{
            "id": 1,
            "uuid": "test-uuid",
            "device_name": "silent-river",
            "belongs_to__application": {"__id": 100},
            "is_online": true,
            "status": "Idle",
            "api_heartbeat_state": "online",
            "is_active": true,
            "os_version": "balenaOS 5.3.0"
        }]
    })
}

// ── Devices ────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_device_by_id() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/v7/device(1)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let device = get_device(&client, DeviceRef::Id(1)).await.unwrap();
    assert_eq!(device.uuid, "test-uuid");
    assert_eq!(device.name, "silent-river");
    assert_eq!(device.fleet_id, 100);
}

#[tokio::test]
async fn get_device_by_uuid() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/v7/device(uuid='test-uuid')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let device = get_device(&client, DeviceRef::Uuid("test-uuid".to_string()))
        .await
        .unwrap();
    assert_eq!(device.id, 1);
}

#[tokio::test]
async fn get_device_without_identifier_makes_no_request() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    let err = get_device(&client, DeviceLookup::default()).await.unwrap_err();
    assert!(matches!(err, BalenaCloudError::ParameterValidation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn get_device_empty_result_is_not_found() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/v7/device(1)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"d": []})))
        .mount(&server)
        .await;

    let err = get_device(&client, DeviceRef::Id(1)).await.unwrap_err();
    assert!(matches!(err, BalenaCloudError::ResourceNotFound(_)));
}

#[tokio::test]
async fn update_device_patches_raw_data() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("PATCH"))
        .and(path("/v7/device(1)"))
        .and(body_json(json!({"device_name": "Test Device"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    update_device(&client, 1, &json!({"device_name": "Test Device"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_device_accepts_typed_update() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("PATCH"))
        .and(path("/v7/device(1)"))
        .and(body_json(json!({"note": "rack 4"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let update = DeviceUpdate {
        note: Some("rack 4".to_string()),
        ..Default::default()
    };
    update_device(&client, 1, &update).await.unwrap();
}

#[tokio::test]
async fn update_device_propagates_unauthorized() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("PATCH"))
        .and(path("/v7/device(1)"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = update_device(&client, 1, &json!({"device_name": "x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, BalenaCloudError::Authentication { .. }));
}

#[tokio::test]
async fn remove_device_sends_delete() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("DELETE"))
        .and(path("/v7/device(1)"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    remove_device(&client, 1).await.unwrap();
}

// ── Device tags ────────────────────────────────────────────────────────

fn tags_fixture() -> Value {
    json!({
        "d": [
            {"id": 1, "device": {"__id": 1}, "tag_key": "location", "value": "warehouse"},
            {"id": 2, "device": {"__id": 1}, "tag_key": "owner", "value": "ops"},
            {"id": 3, "device": {"__id": 1}, "tag_key": "rack", "value": "4"}
        ]
    })
}

#[tokio::test]
async fn list_device_tags_by_id_preserves_order() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/v7/device_tag"))
        .and(query_param("$filter", "device eq 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tags_fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let tags = list_device_tags(&client, DeviceRef::Id(1)).await.unwrap();
    assert_eq!(tags.len(), 3);
    let keys: Vec<&str> = tags.iter().map(|t| t.key.as_str()).collect();
    assert_eq!(keys, vec!["location", "owner", "rack"]);
}

#[tokio::test]
async fn list_device_tags_by_uuid_filters_on_navigation() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/v7/device_tag"))
        .and(query_param("$filter", "device/uuid eq 'test-uuid'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tags_fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = DeviceLookup {
        uuid: Some("test-uuid".to_string()),
        ..Default::default()
    };
    let tags = list_device_tags(&client, lookup).await.unwrap();
    assert_eq!(tags.len(), 3);
}

#[tokio::test]
async fn list_device_tags_without_identifier_makes_no_request() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    let err = list_device_tags(&client, DeviceLookup::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BalenaCloudError::ParameterValidation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn add_device_tag_returns_created_tag() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/v7/device_tag"))
        .and(body_json(json!({"device": 1, "tag_key": "test_key", "value": "test_value"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "device": {"__id": 1},
            "tag_key": "test_key",
            "value": "test_value"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tag = add_device_tag(&client, 1, "test_key", "test_value")
        .await
        .unwrap();
    assert_eq!(
        tag,
        Tag {
            id: 7,
            key: "test_key".to_string(),
            value: "test_value".to_string(),
            device_id: 1,
        }
    );
}

#[tokio::test]
async fn update_device_tag_addresses_natural_key() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("PATCH"))
        .and(path("/v7/device_tag(device=1,tag_key='test_key')"))
        .and(body_json(json!({"value": "new_value"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    update_device_tag(&client, 1, "test_key", "new_value")
        .await
        .unwrap();
}

#[tokio::test]
async fn remove_device_tag_sends_delete() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("DELETE"))
        .and(path("/v7/device_tag(1)"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    remove_device_tag(&client, 1).await.unwrap();
}

// ── Device environment variables ───────────────────────────────────────

#[tokio::test]
async fn list_device_variables_by_uuid_uses_any_subquery() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/v7/device_environment_variable"))
        .and(query_param("$filter", "device/any(d:d/uuid eq 'test-uuid')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "d": [{"id": 1, "device": {"__id": 1}, "name": "A", "value": "1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vars = list_device_variables(&client, DeviceRef::Uuid("test-uuid".to_string()))
        .await
        .unwrap();
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].name, "A");
}

#[tokio::test]
async fn list_device_variables_without_identifier_makes_no_request() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    let err = list_device_variables(&client, DeviceLookup::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BalenaCloudError::ParameterValidation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn get_device_variable_empty_result_is_not_found() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/v7/device_environment_variable(9)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"d": []})))
        .mount(&server)
        .await;

    let err = get_device_variable(&client, 9).await.unwrap_err();
    assert!(matches!(err, BalenaCloudError::ResourceNotFound(_)));
}

/// In-memory stand-in for the `device_environment_variable` resource.
#[derive(Clone, Default)]
struct VariableStore {
    rows: Arc<Mutex<Vec<Value>>>,
    next_id: Arc<AtomicU64>,
}

fn id_from_path(request: &Request) -> u64 {
    let path = request.url.path();
    let start = path.find('(').expect("keyed path") + 1;
    let end = path.find(')').expect("keyed path");
    path[start..end].parse().expect("numeric key")
}

struct ListVariables(VariableStore);

impl Respond for ListVariables {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let rows = self.0.rows.lock().unwrap().clone();
        ResponseTemplate::new(200).set_body_json(json!({"d": rows}))
    }
}

struct CreateVariable(VariableStore);

impl Respond for CreateVariable {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let id = self.0.next_id.fetch_add(1, Ordering::SeqCst) + 100;
        let row = json!({
            "id": id,
            "device": {"__id": body["device"]},
            "name": body["name"],
            "value": body["value"]
        });
        self.0.rows.lock().unwrap().push(row.clone());
        ResponseTemplate::new(201).set_body_json(row)
    }
}

struct UpdateVariable(VariableStore);

impl Respond for UpdateVariable {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = id_from_path(request);
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let mut rows = self.0.rows.lock().unwrap();
        for row in rows.iter_mut().filter(|row| row["id"] == id) {
            row["value"] = body["value"].clone();
        }
        ResponseTemplate::new(200)
    }
}

struct DeleteVariable(VariableStore);

impl Respond for DeleteVariable {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = id_from_path(request);
        self.0.rows.lock().unwrap().retain(|row| row["id"] != id);
        ResponseTemplate::new(200)
    }
}

#[tokio::test]
async fn device_variable_add_update_remove_round_trip() {
    let server = MockServer::start().await;
    let client = mock_client(&server);
    let store = VariableStore::default();

    Mock::given(method("GET"))
        .and(path("/v7/device_environment_variable"))
        .and(query_param("$filter", "device eq 1"))
        .respond_with(ListVariables(store.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v7/device_environment_variable"))
        .respond_with(CreateVariable(store.clone()))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path_regex(r"^/v7/device_environment_variable\(\d+\)$"))
        .respond_with(UpdateVariable(store.clone()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/v7/device_environment_variable\(\d+\)$"))
        .respond_with(DeleteVariable(store.clone()))
        .mount(&server)
        .await;

    // Add, then list: the new id is present.
    let created = add_device_variable(&client, 1, "MY_ENV_VAR", "my_value")
        .await
        .unwrap();
    assert_eq!(created.name, "MY_ENV_VAR");
    assert_eq!(created.device_id, 1);
    let vars = list_device_variables(&client, DeviceRef::Id(1)).await.unwrap();
    assert!(vars.iter().any(|v| v.id == created.id));

    // Update, then list: the value changed.
    update_device_variable(&client, created.id, "new_value")
        .await
        .unwrap();
    let vars = list_device_variables(&client, DeviceRef::Id(1)).await.unwrap();
    let updated = vars.iter().find(|v| v.id == created.id).unwrap();
    assert_eq!(updated.value, "new_value");

    // Remove, then list: the id is gone.
    remove_device_variable(&client, created.id).await.unwrap();
    let vars = list_device_variables(&client, DeviceRef::Id(1)).await.unwrap();
    assert!(vars.iter().all(|v| v.id != created.id));
}
