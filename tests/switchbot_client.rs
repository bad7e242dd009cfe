//! Integration tests for the signed SwitchBot client using wiremock.

use std::time::Duration;

use serde_json::{json, Value};
use switchbot_panel::switchbot::{
    models::{Command, Device, DeviceKind, InfraredRemoteDevice},
    sign, ClientSettings, Credentials, RequestOptions, SwitchBotClient, SwitchBotError,
};
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";
const SECRET: &str = "test-secret";

fn client_for(server: &MockServer) -> SwitchBotClient {
    client_with(server, Credentials::new(TOKEN, SECRET))
}

fn client_with(server: &MockServer, credentials: Credentials) -> SwitchBotClient {
    let mut settings = ClientSettings::new(credentials);
    settings.api_base_url = server.uri();
    SwitchBotClient::new(settings).unwrap()
}

fn envelope(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "statusCode": 100,
        "message": "success",
        "body": body
    }))
}

// ============================================================================
// Executor
// ============================================================================

mod executor {
    use super::*;

    #[tokio::test]
    async fn successful_envelope_resolves_to_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/devices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statusCode": 100, "message": "", "body": {"foo": 1}
            })))
            .mount(&server)
            .await;

        let body: Value = client_for(&server)
            .execute("/v1.1/devices", RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(body, json!({"foo": 1}));
    }

    #[tokio::test]
    async fn failed_envelope_rejects_with_vendor_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"statusCode": 190, "message": "boom"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .execute::<Value>("/v1.1/devices", RequestOptions::get())
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchBotError::Api { status_code: 190, .. }));
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn http_failure_carries_status_and_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .execute::<Value>("/v1.1/devices", RequestOptions::get())
            .await
            .unwrap_err();
        match &err {
            SwitchBotError::Http { status, body } => {
                assert_eq!(*status, 500);
                assert_eq!(body, "server error");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("server error"));
    }

    #[tokio::test]
    async fn missing_credentials_never_reach_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(envelope(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        for creds in [Credentials::new("", SECRET), Credentials::new(TOKEN, "")] {
            let err = client_with(&server, creds)
                .execute::<Value>("/v1.1/devices", RequestOptions::get())
                .await
                .unwrap_err();
            assert!(matches!(err, SwitchBotError::MissingCredentials));
        }
    }

    #[tokio::test]
    async fn every_request_is_signed_with_a_fresh_nonce() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/scenes"))
            .respond_with(envelope(json!([])))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.list_scenes().await.unwrap();
        client.list_scenes().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);

        let creds = Credentials::new(TOKEN, SECRET);
        let mut nonces = Vec::new();
        for req in &requests {
            let header = |name: &str| {
                req.headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_else(|| panic!("missing header {name}"))
                    .to_owned()
            };
            let t = header("t");
            let nonce = header("nonce");

            assert_eq!(header("authorization"), TOKEN);
            assert_eq!(header("content-type"), "application/json; charset=utf8");
            assert_eq!(header("sign"), sign(&creds, &t, &nonce).unwrap());
            assert!(t.parse::<i64>().is_ok());
            assert!(
                req.headers.values().all(|v| v.to_str().map_or(true, |s| !s.contains(SECRET))),
                "secret must never be transmitted"
            );
            nonces.push(nonce);
        }
        assert_ne!(nonces[0], nonces[1]);
    }

    #[tokio::test]
    async fn caller_headers_override_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(envelope(json!({})))
            .mount(&server)
            .await;

        let options = RequestOptions::get()
            .header("content-type", "application/json")
            .header("x-trace", "abc");
        client_for(&server)
            .execute::<Value>("/v1.1/devices", options)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let headers = &requests[0].headers;
        let values: Vec<_> = headers.get_all("content-type").iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "application/json");
        assert_eq!(headers.get("x-trace").unwrap(), "abc");
        assert!(headers.get("sign").is_some());
    }

    #[tokio::test]
    async fn proxy_base_is_prepended_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/https:/+api\.switch-bot\.com/v1\.1/scenes$"))
            .respond_with(envelope(json!([{"sceneId": "S1", "sceneName": "Movie"}])))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = ClientSettings::new(Credentials::new(TOKEN, SECRET));
        settings.proxy_base = format!("{}/", server.uri());
        let client = SwitchBotClient::new(settings).unwrap();

        assert_eq!(
            client.url_for("/v1.1/scenes"),
            format!("{}/https://api.switch-bot.com/v1.1/scenes", server.uri())
        );
        let scenes = client.list_scenes().await.unwrap();
        assert_eq!(scenes[0].scene_name, "Movie");
    }

    #[tokio::test]
    async fn slow_response_surfaces_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(envelope(json!({})).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut settings = ClientSettings::new(Credentials::new(TOKEN, SECRET));
        settings.api_base_url = server.uri();
        settings.timeout = Duration::from_millis(50);
        let client = SwitchBotClient::new(settings).unwrap();

        let err = client.list_scenes().await.unwrap_err();
        assert!(matches!(err, SwitchBotError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let mut settings = ClientSettings::new(Credentials::new(TOKEN, SECRET));
        settings.api_base_url = "http://127.0.0.1:1".to_owned();
        let client = SwitchBotClient::new(settings).unwrap();

        let err = client.list_scenes().await.unwrap_err();
        assert!(matches!(err, SwitchBotError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_scenes().await.unwrap_err();
        assert!(matches!(err, SwitchBotError::Decode(_)), "got {err:?}");
    }
}

// ============================================================================
// Domain operations
// ============================================================================

mod operations {
    use super::*;

    #[tokio::test]
    async fn list_devices_puts_physical_devices_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/devices"))
            .respond_with(envelope(json!({
                "deviceList": [
                    {"deviceId": "A", "deviceName": "Bot", "hubDeviceId": "H", "deviceType": "Bot", "enableCloudService": true},
                    {"deviceId": "C", "deviceName": "Meter", "hubDeviceId": "H", "deviceType": "Meter", "enableCloudService": false}
                ],
                "infraredRemoteList": [
                    {"deviceId": "B", "deviceName": "AC", "hubDeviceId": "H", "remoteType": "Air Conditioner"},
                    {"deviceId": "D", "deviceName": "TV", "hubDeviceId": "H", "remoteType": "TV"}
                ]
            })))
            .mount(&server)
            .await;

        let devices = client_for(&server).list_devices().await.unwrap();
        let ids: Vec<_> = devices.iter().map(Device::device_id).collect();
        assert_eq!(ids, ["A", "C", "B", "D"]);
        assert_eq!(devices[0].kind(), DeviceKind::Physical);
        assert_eq!(devices[2].kind(), DeviceKind::InfraredRemote);
    }

    #[tokio::test]
    async fn device_status_is_returned_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/devices/M1/status"))
            .respond_with(envelope(json!({
                "deviceId": "M1", "deviceType": "Meter", "hubDeviceId": "H",
                "temperature": 21.4, "humidity": 55, "battery": 100
            })))
            .mount(&server)
            .await;

        let status = client_for(&server).get_device_status("M1").await.unwrap();
        assert_eq!(status.device_type, "Meter");
        assert_eq!(status.temperature, Some(21.4));
        assert_eq!(status.humidity, Some(55.0));
        assert_eq!(status.battery, Some(100.0));
        assert!(status.extra.is_empty());
    }

    #[tokio::test]
    async fn status_of_infrared_remote_is_rejected_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(envelope(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let remote = Device::from(InfraredRemoteDevice {
            device_id: "IR1".to_owned(),
            device_name: "TV".to_owned(),
            hub_device_id: "H".to_owned(),
            remote_type: "TV".to_owned(),
            device_type: None,
        });

        let err = client_for(&server).device_status(&remote).await.unwrap_err();
        assert!(matches!(err, SwitchBotError::UnsupportedOperation { .. }));
        assert!(err.is_local());
    }

    #[tokio::test]
    async fn send_command_posts_exact_json_body_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.1/devices/DEV1/commands"))
            .and(body_json(json!({"commandType": "command", "command": "turnOn"})))
            .respond_with(envelope(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server)
            .send_command("DEV1", &Command::new("turnOn"))
            .await
            .unwrap();
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn list_scenes_returns_scenes_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/scenes"))
            .respond_with(envelope(json!([
                {"sceneId": "S1", "sceneName": "Morning"},
                {"sceneId": "S2", "sceneName": "Night"}
            ])))
            .mount(&server)
            .await;

        let scenes = client_for(&server).list_scenes().await.unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[1].scene_id, "S2");
        assert_eq!(scenes[1].scene_name, "Night");
    }

    #[tokio::test]
    async fn execute_scene_posts_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.1/scenes/S1/execute"))
            .and(body_json(json!({})))
            .respond_with(envelope(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).execute_scene("S1").await.unwrap();
    }

    #[tokio::test]
    async fn write_call_without_body_field_resolves_to_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"statusCode": 100, "message": "success"})),
            )
            .mount(&server)
            .await;

        let body = client_for(&server).execute_scene("S1").await.unwrap();
        assert!(body.is_null());
    }
}
