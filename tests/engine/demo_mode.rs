use super::backend::engine_for;
use glitchary::interactions::{PostSeed, UserSeed};
use glitchary::{MutationOutcome, Route};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn demo_session_never_touches_the_backend_for_writes() {
    let server = MockServer::start().await;
    let engine = engine_for(&server, false);

    engine.enter_demo();
    assert_eq!(engine.auth().route(), Route::Feed);

    let cache = engine.interactions();
    cache.hydrate_post("p1", PostSeed::default()).await;
    cache.initialize_user("u1", UserSeed::default());

    assert_eq!(cache.amplify("p1").await, MutationOutcome::LocalOnly);
    assert_eq!(cache.bookmark("p1").await, MutationOutcome::LocalOnly);
    assert_eq!(cache.follow("u1").await, MutationOutcome::LocalOnly);
    assert_eq!(cache.add_comment("p1", "hi").await, MutationOutcome::Skipped);
    assert!(cache.create_call("a prompt").await.is_none());

    assert!(cache.post("p1").unwrap().is_amplified());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn demo_reads_carry_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    let mut config = super::backend::config_for(&server, true);
    config.credential = Some("leaked-if-sent".into());
    let engine = glitchary::ClientEngine::connect(config);

    engine.enter_demo();
    engine.search().search_now("cats").await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn demo_persona_comes_from_config() {
    let server = MockServer::start().await;
    let engine = engine_for(&server, false);

    engine.enter_demo();

    let snapshot = engine.auth().snapshot();
    assert!(snapshot.session.is_demo());
    assert_eq!(snapshot.session.actor_id(), Some("mock-user-id-123"));
    assert_eq!(snapshot.session.profile().unwrap().username, "Demo User");
    assert!(snapshot.session.credential().is_none());
}
