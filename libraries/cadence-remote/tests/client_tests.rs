//! Tests for the remote playback clients.
//!
//! These tests use mock servers to verify client behavior without
//! requiring a real playback service.

use async_trait::async_trait;
use cadence_core::{CadenceError, DeviceSdkFactory, RemoteControl, SdkEvent, TokenService, TokenSource};
use cadence_remote::{
    PollingDeviceFactory, RemoteClientError, RemoteConfig, RemoteControlClient,
    TokenServiceClient, TokenServiceConfig,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticToken(&'static str);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> cadence_core::Result<String> {
        Ok(self.0.to_string())
    }
}

struct NoToken;

#[async_trait]
impl TokenSource for NoToken {
    async fn access_token(&self) -> cadence_core::Result<String> {
        Err(CadenceError::ReauthRequired)
    }
}

fn remote_client(server: &MockServer) -> RemoteControlClient {
    RemoteControlClient::new(
        RemoteConfig::new(server.uri()),
        Arc::new(StaticToken("test_access_token")),
    )
    .unwrap()
}

// =============================================================================
// Client Creation Tests
// =============================================================================

mod client_creation {
    use super::*;

    #[test]
    fn test_empty_url_rejected() {
        let result = RemoteControlClient::new(RemoteConfig::new(""), Arc::new(NoToken));

        match result {
            Err(RemoteClientError::InvalidUrl(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected InvalidUrl error"),
        }
    }

    #[test]
    fn test_ftp_scheme_rejected() {
        let result = TokenServiceClient::new(TokenServiceConfig::new("ftp://example.com"));
        assert!(matches!(result, Err(RemoteClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_trailing_slashes_removed() {
        let client = RemoteControlClient::new(
            RemoteConfig::new("https://api.example.com/v1//"),
            Arc::new(NoToken),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/v1");
    }
}

// =============================================================================
// Remote Control Tests
// =============================================================================

mod remote_control {
    use super::*;

    #[tokio::test]
    async fn test_list_devices_sends_bearer_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/player/devices"))
            .and(header("authorization", "Bearer test_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "devices": [
                    { "id": "dev-1", "name": "Cadence Journal", "is_active": false, "type": "Computer" },
                    { "id": "dev-2", "name": "Kitchen", "is_active": true, "type": "Speaker", "volume_percent": 35 }
                ]
            })))
            .mount(&mock_server)
            .await;

        let devices = remote_client(&mock_server).list_devices().await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, "dev-1");
        assert!(!devices[0].is_active);
        assert!(devices[1].is_active);
        assert_eq!(devices[1].volume_percent, Some(35));
    }

    #[tokio::test]
    async fn test_start_playback_targets_device_with_offset() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/me/player/play"))
            .and(query_param("device_id", "dev-1"))
            .and(body_json(serde_json::json!({
                "uris": ["track:abc"],
                "position_ms": 10000
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        remote_client(&mock_server)
            .start_playback("dev-1", "track:abc", 10_000)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_start_playback_unknown_device() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/me/player/play"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": { "status": 404, "message": "Device not found" }
            })))
            .mount(&mock_server)
            .await;

        let result = remote_client(&mock_server)
            .start_playback("dev-missing", "track:abc", 0)
            .await;

        match result {
            Err(RemoteClientError::DeviceNotFound(id)) => assert_eq!(id, "dev-missing"),
            other => panic!("Expected DeviceNotFound, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transfer_playback_without_autoplay() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/me/player"))
            .and(body_json(serde_json::json!({
                "device_ids": ["dev-1"],
                "play": false
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        remote_client(&mock_server)
            .transfer_playback("dev-1", false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_premium_required() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/me/player/pause"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let client = remote_client(&mock_server);
        let result = RemoteControl::pause(&client, "dev-1").await;

        assert_eq!(result, Err(CadenceError::PremiumRequired));
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/player/devices"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&mock_server)
            .await;

        let result = remote_client(&mock_server).list_devices().await;

        match result {
            Err(RemoteClientError::RateLimited { retry_after_secs }) => {
                assert_eq!(retry_after_secs, 7)
            }
            other => panic!("Expected RateLimited, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_uses_api_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/player/devices"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "status": 401, "message": "The access token expired" }
            })))
            .mount(&mock_server)
            .await;

        let result = remote_client(&mock_server).list_devices().await;

        match result {
            Err(RemoteClientError::Unauthorized(msg)) => {
                assert_eq!(msg, "The access token expired")
            }
            other => panic!("Expected Unauthorized, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client =
            RemoteControlClient::new(RemoteConfig::new(mock_server.uri()), Arc::new(NoToken))
                .unwrap();
        let result = RemoteControl::list_devices(&client).await;

        assert_eq!(result, Err(CadenceError::ReauthRequired));
    }

    #[tokio::test]
    async fn test_playback_state_no_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/player"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let state = remote_client(&mock_server).playback_state().await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_playback_state_parsed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_playing": false,
                "progress_ms": 42000,
                "item": { "uri": "track:xyz" }
            })))
            .mount(&mock_server)
            .await;

        let state = remote_client(&mock_server)
            .playback_state()
            .await
            .unwrap()
            .expect("player state");

        assert!(state.paused);
        assert_eq!(state.position_ms, 42000);
        assert_eq!(state.track_uri.as_deref(), Some("track:xyz"));
    }
}

// =============================================================================
// Token Service Tests
// =============================================================================

mod token_service {
    use super::*;

    #[tokio::test]
    async fn test_fetch_token_with_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/playback/token"))
            .and(header("authorization", "Bearer journal_session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh_access",
                "expires_in": 3600,
                "premium": true
            })))
            .mount(&mock_server)
            .await;

        let client = TokenServiceClient::new(TokenServiceConfig::with_session(
            mock_server.uri(),
            "journal_session",
        ))
        .unwrap();

        let grant = client.fetch_token().await.unwrap();
        assert_eq!(grant.access_token, "fresh_access");
        assert_eq!(grant.expires_in, 3600);
        assert!(grant.premium);
    }

    #[tokio::test]
    async fn test_revoked_link_requires_reauth() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/playback/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("link revoked"))
            .mount(&mock_server)
            .await;

        let client =
            TokenServiceClient::new(TokenServiceConfig::new(mock_server.uri())).unwrap();

        let result = client.fetch_credential().await;
        assert_eq!(result, Err(CadenceError::ReauthRequired));
    }

    #[tokio::test]
    async fn test_server_error_is_not_reauth() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/playback/token"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let client =
            TokenServiceClient::new(TokenServiceConfig::new(mock_server.uri())).unwrap();

        let result = client.fetch_credential().await;
        match result {
            Err(CadenceError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("Expected Api error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let client =
            TokenServiceClient::new(TokenServiceConfig::new("http://127.0.0.1:9")).unwrap();

        let result = client.fetch_credential().await;
        assert!(matches!(result, Err(CadenceError::Network(_))));
    }
}

// =============================================================================
// Polling Device Tests
// =============================================================================

mod polling_device {
    use super::*;

    async fn next_event(events: &mut tokio::sync::mpsc::UnboundedReceiver<SdkEvent>) -> SdkEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within timeout")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_ready_then_state_changes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/player/devices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "devices": [{ "id": "dev-7", "name": "Study Speaker", "is_active": true, "type": "Speaker" }]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/me/player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_playing": true,
                "progress_ms": 5000,
                "item": { "uri": "track:abc" }
            })))
            .mount(&mock_server)
            .await;

        let remote: Arc<dyn RemoteControl> = Arc::new(remote_client(&mock_server));
        let factory = PollingDeviceFactory::new(remote, Duration::from_millis(20));
        let mut handle = factory
            .create("study speaker", Arc::new(StaticToken("test_access_token")))
            .unwrap();

        handle.sdk.connect().unwrap();

        assert_eq!(
            next_event(&mut handle.events).await,
            SdkEvent::Ready {
                device_id: "dev-7".into()
            }
        );

        match next_event(&mut handle.events).await {
            SdkEvent::StateChanged { state: Some(state) } => {
                assert!(!state.paused);
                assert_eq!(state.position_ms, 5000);
            }
            other => panic!("Expected StateChanged, got: {:?}", other),
        }

        handle.sdk.disconnect();
    }

    #[tokio::test]
    async fn test_unknown_device_name_fails_initialization() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/player/devices"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "devices": [] })),
            )
            .mount(&mock_server)
            .await;

        let remote: Arc<dyn RemoteControl> = Arc::new(remote_client(&mock_server));
        let factory = PollingDeviceFactory::new(remote, Duration::from_millis(20));
        let mut handle = factory
            .create("Nowhere", Arc::new(StaticToken("test_access_token")))
            .unwrap();

        handle.sdk.connect().unwrap();

        assert!(matches!(
            next_event(&mut handle.events).await,
            SdkEvent::InitializationError { .. }
        ));
    }
}
