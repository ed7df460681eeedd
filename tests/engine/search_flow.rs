use super::backend::engine_for;
use glitchary::SearchStatus;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn query_is_url_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "cats & dogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [{"id": "p1", "prompt": "cats & dogs"}],
            "users": [{"user_id": "u1", "username": "catlover"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let engine = engine_for(&server, false);

    let snapshot = engine.search().search_now("  cats & dogs ").await;

    assert_eq!(snapshot.status, SearchStatus::Done);
    assert_eq!(snapshot.results.posts.len(), 1);
    assert_eq!(snapshot.results.users[0].username.as_deref(), Some("catlover"));
}

#[tokio::test]
async fn typing_burst_sends_single_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "fox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": [{"id": "p1"}]})))
        .expect(1)
        .mount(&server)
        .await;
    let engine = engine_for(&server, false);
    let search = engine.search();

    search.input("f");
    search.input("fo");
    search.input("fox");
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(search.snapshot().status, SearchStatus::Done);
}

#[tokio::test]
async fn slow_stale_response_does_not_overwrite_newer_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "old"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"posts": [{"id": "stale"}]}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": [{"id": "fresh"}]})))
        .mount(&server)
        .await;
    let engine = engine_for(&server, false);
    let search = engine.search();

    let (old, new) = tokio::join!(search.search_now("old"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        search.search_now("new").await
    });

    assert_eq!(new.results.posts[0].id, "fresh");
    assert_eq!(old.results.posts[0].id, "fresh");
    assert_eq!(search.snapshot().query_text, "new");
}

#[tokio::test]
async fn backend_failure_leaves_idle_and_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let engine = engine_for(&server, false);

    let snapshot = engine.search().search_now("anything").await;

    assert_eq!(snapshot.status, SearchStatus::Idle);
    assert!(snapshot.results.is_empty());
    assert!(snapshot.last_error.is_some());
}
