//! Integration tests for the Helix REST client.
//!
//! These tests verify:
//! - Requests carry the Client-Id and bearer token headers
//! - Envelopes unwrap into pages; cursors thread through `after`
//! - 401/403 map to auth errors, 404 to not-found, 5xx to network
//! - Search endpoints pass their filter parameters

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lantern::error::{AuthError, CoreError};
use lantern::helix::HelixClient;
use lantern::models::ChannelId;

const CLIENT_ID: &str = "test-client-id";
const TOKEN: &str = "test-token";

fn client_for(server: &MockServer) -> HelixClient {
    HelixClient::with_base_url(server.uri(), CLIENT_ID, TOKEN)
}

// ===== Test 1: credentials ride every request =====

#[tokio::test]
async fn test_get_streams_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streams"))
        .and(header("Client-Id", CLIENT_ID))
        .and(header("Authorization", "Bearer test-token"))
        .and(query_param("user_login", "twitchdev"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": "40952121085",
                "user_id": "141981764",
                "user_login": "twitchdev",
                "user_name": "TwitchDev",
                "game_id": "509670",
                "game_name": "Science & Technology",
                "title": "Livecoding the SDK",
                "viewer_count": 3017,
                "started_at": "2021-03-10T15:04:21Z",
                "language": "en",
                "thumbnail_url": "https://example.com/{width}x{height}.jpg",
                "is_mature": false
            }],
            "pagination": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let streams = client_for(&server)
        .get_streams(&["twitchdev"])
        .await
        .expect("get_streams");

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].user_login, "twitchdev");
    assert_eq!(streams[0].viewer_count, 3017);
}

// ===== Test 2: users lookup mixes logins and ids =====

#[tokio::test]
async fn test_get_users_mixes_logins_and_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("login", "twitchdev"))
        .and(query_param("id", "527115020"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {
                    "id": "141981764",
                    "login": "twitchdev",
                    "display_name": "TwitchDev",
                    "created_at": "2016-12-14T20:32:28Z"
                },
                {
                    "id": "527115020",
                    "login": "twitchgaming",
                    "display_name": "TwitchGaming",
                    "created_at": "2020-01-24T21:26:26Z"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = client_for(&server)
        .get_users(&["twitchdev"], &["527115020"])
        .await
        .expect("get_users");

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].display_name, "TwitchDev");
    assert_eq!(users[1].id, "527115020");
}

// ===== Test 3: cursors thread through the after parameter =====

#[tokio::test]
async fn test_followed_streams_cursor_pagination() {
    let server = MockServer::start().await;
    let stream = |id: &str, login: &str| {
        serde_json::json!({
            "id": id,
            "user_id": "1",
            "user_login": login,
            "user_name": login,
            "title": "live",
            "viewer_count": 1,
            "started_at": "2021-03-10T15:04:21Z",
            "language": "en",
            "thumbnail_url": ""
        })
    };

    // Mounted first so the `after` requirement is checked before the
    // catch-all page matches.
    Mock::given(method("GET"))
        .and(path("/streams/followed"))
        .and(query_param("user_id", "141981764"))
        .and(query_param("after", "eyJiIjpudWxsfQ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [stream("3", "channel_three")],
            "pagination": {}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/streams/followed"))
        .and(query_param("user_id", "141981764"))
        .and(query_param("first", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [stream("1", "channel_one"), stream("2", "channel_two")],
            "pagination": {"cursor": "eyJiIjpudWxsfQ"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = ChannelId::new("141981764");

    let first = client
        .get_followed_streams(&user, None)
        .await
        .expect("first page");
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.cursor.as_deref(), Some("eyJiIjpudWxsfQ"));

    let second = client
        .get_followed_streams(&user, first.cursor.as_deref())
        .await
        .expect("second page");
    assert!(second.is_last());

    let all = first.extended(second);
    assert_eq!(all.items.len(), 3);
    assert!(all.is_last());
}

// ===== Test 4: 401 maps to an auth error =====

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streams/followed"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid oauth token"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .get_followed_streams(&ChannelId::new("1"), None)
        .await;

    match result {
        Err(CoreError::Auth(err)) => {
            assert!(matches!(err, AuthError::Unauthorized { .. }));
            assert!(err.requires_reauth());
        }
        other => panic!("expected auth error, got {:?}", other.err()),
    }
}

// ===== Test 5: 403 maps to forbidden =====

#[tokio::test]
async fn test_forbidden_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/followed"))
        .respond_with(ResponseTemplate::new(403).set_body_string("missing scope"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .get_followed_channels(&ChannelId::new("1"), None)
        .await;

    match result {
        Err(CoreError::Auth(err)) => {
            assert!(matches!(err, AuthError::Forbidden { .. }));
            assert!(err.requires_reauth());
        }
        other => panic!("expected auth error, got {:?}", other.err()),
    }
}

// ===== Test 6: 404 maps to not-found =====

#[tokio::test]
async fn test_missing_resource_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(404).set_body_string("user not found"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .get_videos(&ChannelId::new("0"), None)
        .await;

    match result {
        Err(CoreError::NotFound { what }) => assert!(what.contains("videos")),
        other => panic!("expected not-found, got {:?}", other.err()),
    }
}

// ===== Test 7: 5xx maps to a retryable network error =====

#[tokio::test]
async fn test_server_error_maps_to_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streams"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try again"))
        .mount(&server)
        .await;

    let result = client_for(&server).get_streams(&["twitchdev"]).await;

    match result {
        Err(err @ CoreError::Network(_)) => assert!(err.is_retryable()),
        other => panic!("expected network error, got {:?}", other.err()),
    }
}

// ===== Test 8: channel search passes its filters =====

#[tokio::test]
async fn test_search_channels_passes_live_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/channels"))
        .and(query_param("query", "rust"))
        .and(query_param("live_only", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": "41245072",
                "broadcaster_login": "rustlang",
                "display_name": "RustLang",
                "is_live": true
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server)
        .search_channels("rust", true)
        .await
        .expect("search_channels");

    assert_eq!(page.items.len(), 1);
    assert!(page.items[0].is_live);
    assert!(page.is_last());
}

// ===== Test 9: category search decodes results =====

#[tokio::test]
async fn test_search_categories_decodes_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/categories"))
        .and(query_param("query", "science"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": "509670",
                "name": "Science & Technology",
                "box_art_url": "https://example.com/box.jpg"
            }],
            "pagination": {"cursor": "next"}
        })))
        .mount(&server)
        .await;

    let page = client_for(&server)
        .search_categories("science")
        .await
        .expect("search_categories");

    assert_eq!(page.items[0].name, "Science & Technology");
    assert_eq!(page.cursor.as_deref(), Some("next"));
}
