//! End-to-end power transitions against a mock API.
//!
//! Every poweroff scenario asserts the captured boot target is restored
//! exactly once, whichever way the transition ends.

use std::time::Duration;

use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ovhpower::{
    Api, DediClient, DriverConfig, Endpoint, Error, Node, OvhDriver, PowerInterface, PowerState,
};

/// Boot target the server was on before the transition.
const PREVIOUS_BOOT_ID: i64 = 1;
/// Boot target of the poweroff iPXE script.
const POWEROFF_BOOT_ID: i64 = 49;
/// Boot target of the normal boot iPXE script.
const BOOT_SCRIPT_BOOT_ID: i64 = 50;

fn driver_for(server: &MockServer) -> OvhDriver {
    let config = DriverConfig {
        endpoint: Endpoint::OvhEu,
        application_key: "app-key".to_string(),
        application_secret: "app-secret".to_string(),
        consumer_key: "consumer-key".to_string(),
        poweroff_script: "poweroff.ipxe".to_string(),
        boot_script: "boot.ipxe".to_string(),
    };
    let client =
        DediClient::new(Api::new(server.uri(), "app-key", "app-secret", "consumer-key").unwrap());
    OvhDriver::with_client(config, client)
        .with_poll_interval(Duration::from_millis(1))
        .with_poll_timeout(Duration::from_secs(5))
}

/// Mocks shared by the poweroff scenarios: clock, server detail with the
/// previous boot target, script resolution, and the boot-target mutations.
async fn mount_poweroff_fixtures(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/time"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(chrono::Utc::now().timestamp().to_string()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "ns123", "state": "ok", "bootId": PREVIOUS_BOOT_ID
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/boot"))
        .and(query_param("bootType", "ipxeCustomerScript"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([POWEROFF_BOOT_ID])),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/dedicated/server/ns123/boot/{POWEROFF_BOOT_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "bootId": POWEROFF_BOOT_ID,
            "bootType": "ipxeCustomerScript",
            "kernel": "poweroff.ipxe"
        })))
        .mount(server)
        .await;
}

/// Mount the boot-target mutation mocks: the switch to the poweroff script
/// and the restoration of the previous target, each expected exactly once.
async fn mount_boot_mutations(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/dedicated/server/ns123"))
        .and(body_json(serde_json::json!({ "bootId": POWEROFF_BOOT_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/dedicated/server/ns123"))
        .and(body_json(serde_json::json!({ "bootId": PREVIOUS_BOOT_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_reboot(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/dedicated/server/ns123/reboot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "taskId": 1001, "function": "hardReboot", "status": "init"
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn task_body(status: &str) -> serde_json::Value {
    serde_json::json!({ "taskId": 1001, "function": "hardReboot", "status": status })
}

#[tokio::test]
async fn poweroff_restores_previous_boot_target() {
    let server = MockServer::start().await;
    mount_poweroff_fixtures(&server).await;
    mount_boot_mutations(&server).await;
    mount_reboot(&server).await;

    // Task progresses doing, doing, done.
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("doing")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("done")))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let mut node = Node::new("ns123");
    driver
        .set_power_state(&mut node, PowerState::Off, None)
        .await
        .unwrap();

    assert_eq!(node.power_state, Some(PowerState::Off));
    // Mock expectations assert the restore PUT ran exactly once.
}

#[tokio::test]
async fn error_terminal_task_reports_error_and_still_restores() {
    let server = MockServer::start().await;
    mount_poweroff_fixtures(&server).await;
    mount_boot_mutations(&server).await;
    mount_reboot(&server).await;

    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("customerError")))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let mut node = Node::new("ns123");
    driver
        .set_power_state(&mut node, PowerState::Off, None)
        .await
        .unwrap();

    assert_eq!(node.power_state, Some(PowerState::Error));
}

#[tokio::test]
async fn poll_timeout_errors_and_still_restores() {
    let server = MockServer::start().await;
    mount_poweroff_fixtures(&server).await;
    mount_boot_mutations(&server).await;
    mount_reboot(&server).await;

    // The task never leaves doing.
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("doing")))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let mut node = Node::new("ns123");
    let result = driver
        .set_power_state(&mut node, PowerState::Off, Some(Duration::from_millis(30)))
        .await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(node.power_state, Some(PowerState::Error));
}

#[tokio::test]
async fn poll_failure_propagates_after_restore() {
    let server = MockServer::start().await;
    mount_poweroff_fixtures(&server).await;
    mount_boot_mutations(&server).await;
    mount_reboot(&server).await;

    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(500).set_body_string("task lookup broken"))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let mut node = Node::new("ns123");
    let result = driver
        .set_power_state(&mut node, PowerState::Off, None)
        .await;

    match result {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.contains("task lookup broken"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    // mount_boot_mutations expectations verify the restore happened anyway.
}

#[tokio::test]
async fn original_error_wins_over_restore_failure() {
    let server = MockServer::start().await;
    mount_poweroff_fixtures(&server).await;
    mount_reboot(&server).await;

    Mock::given(method("PUT"))
        .and(path("/dedicated/server/ns123"))
        .and(body_json(serde_json::json!({ "bootId": POWEROFF_BOOT_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;
    // Restoration fails too; the poll failure must stay the surfaced error.
    Mock::given(method("PUT"))
        .and(path("/dedicated/server/ns123"))
        .and(body_json(serde_json::json!({ "bootId": PREVIOUS_BOOT_ID })))
        .respond_with(ResponseTemplate::new(500).set_body_string("restore broken"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(500).set_body_string("task lookup broken"))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let mut node = Node::new("ns123");
    let result = driver
        .set_power_state(&mut node, PowerState::Off, None)
        .await;

    match result {
        Err(Error::Api { body, .. }) => assert!(body.contains("task lookup broken")),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn restore_failure_alone_is_surfaced() {
    let server = MockServer::start().await;
    mount_poweroff_fixtures(&server).await;
    mount_reboot(&server).await;

    Mock::given(method("PUT"))
        .and(path("/dedicated/server/ns123"))
        .and(body_json(serde_json::json!({ "bootId": POWEROFF_BOOT_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/dedicated/server/ns123"))
        .and(body_json(serde_json::json!({ "bootId": PREVIOUS_BOOT_ID })))
        .respond_with(ResponseTemplate::new(409).set_body_string("restore broken"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("done")))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let mut node = Node::new("ns123");
    let result = driver
        .set_power_state(&mut node, PowerState::Off, None)
        .await;

    // The transition itself finished; the caller still must learn the boot
    // target could not be put back.
    match result {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 409);
            assert!(body.contains("restore broken"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(node.power_state, Some(PowerState::Off));
}

#[tokio::test]
async fn power_on_boots_the_configured_script_without_capture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/time"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(chrono::Utc::now().timestamp().to_string()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/boot"))
        .and(query_param("bootType", "ipxeCustomerScript"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([BOOT_SCRIPT_BOOT_ID])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/dedicated/server/ns123/boot/{BOOT_SCRIPT_BOOT_ID}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "bootId": BOOT_SCRIPT_BOOT_ID,
            "bootType": "ipxeCustomerScript",
            "kernel": "boot.ipxe"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/dedicated/server/ns123"))
        .and(body_json(serde_json::json!({ "bootId": BOOT_SCRIPT_BOOT_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;
    mount_reboot(&server).await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("done")))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let mut node = Node::new("ns123");
    driver
        .set_power_state(&mut node, PowerState::On, None)
        .await
        .unwrap();

    assert_eq!(node.power_state, Some(PowerState::On));

    // No capture, no restore: the boot-target mutation ran exactly once and
    // the server detail was never fetched.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests.iter().filter(|r| r.method.as_str() == "PUT").count(),
        1
    );
    assert!(!requests
        .iter()
        .any(|r| r.method.as_str() == "GET" && r.url.path() == "/dedicated/server/ns123"));
}

#[tokio::test]
async fn reboot_is_a_power_transition_to_reboot_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/time"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(chrono::Utc::now().timestamp().to_string()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/boot"))
        .and(query_param("bootType", "ipxeCustomerScript"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([BOOT_SCRIPT_BOOT_ID])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/dedicated/server/ns123/boot/{BOOT_SCRIPT_BOOT_ID}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "bootId": BOOT_SCRIPT_BOOT_ID,
            "bootType": "ipxeCustomerScript",
            "kernel": "boot.ipxe"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/dedicated/server/ns123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&server)
        .await;
    mount_reboot(&server).await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns123/task/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("done")))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let mut node = Node::new("ns123");
    driver.reboot(&mut node, None).await.unwrap();

    assert_eq!(node.power_state, Some(PowerState::Reboot));
}

#[tokio::test]
async fn invalid_target_state_is_rejected_before_any_call() {
    let server = MockServer::start().await;
    let driver = driver_for(&server);
    let mut node = Node::new("ns123");

    assert!(matches!(
        driver
            .set_power_state(&mut node, PowerState::Error, None)
            .await,
        Err(Error::InvalidParameter(_))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}
