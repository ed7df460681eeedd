use super::backend::{ACTOR, TOKEN, engine_for, feed_engine, profile_json};
use glitchary::auth::{ProfileDraft, SignedInSession};
use glitchary::{AuthState, Route, SessionEvent};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn existing_profile_routes_to_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/profiles/{ACTOR}")))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(ACTOR)))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server, true);
    assert_eq!(engine.auth().route(), Route::Loading);
    engine.start().await;

    let snapshot = engine.auth().snapshot();
    assert_eq!(snapshot.state, AuthState::AuthenticatedWithProfile);
    assert_eq!(snapshot.session.profile().unwrap().username, "ada");
    assert!(!snapshot.session.is_demo());
}

#[tokio::test]
async fn missing_profile_then_creation_reaches_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/profiles/{ACTOR}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/profiles"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"user_id": ACTOR, "username": "ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(profile_json(ACTOR)))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server, true);
    engine.start().await;
    assert_eq!(engine.auth().route(), Route::CreateProfile);

    let profile = engine
        .create_profile(ProfileDraft {
            username: "ada".into(),
            ..ProfileDraft::default()
        })
        .await
        .unwrap();

    assert_eq!(profile.user_id, ACTOR);
    assert_eq!(engine.auth().route(), Route::Feed);
}

#[tokio::test]
async fn fatal_lookup_forces_sign_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/profiles/{ACTOR}")))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&server)
        .await;

    let engine = engine_for(&server, true);
    engine.start().await;

    let snapshot = engine.auth().snapshot();
    assert_eq!(snapshot.state, AuthState::Anonymous);
    assert!(snapshot.session.credential().is_none());
    assert!(snapshot.last_error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn no_configured_session_is_anonymous_without_requests() {
    let server = MockServer::start().await;

    let engine = engine_for(&server, false);
    engine.start().await;

    assert_eq!(engine.auth().route(), Route::SignIn);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn event_stream_drives_sign_in_and_out() {
    let server = MockServer::start().await;
    let engine = feed_engine(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/profiles/actor-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("actor-2")))
        .mount(&server)
        .await;
    let mut changes = engine.auth().subscribe();
    changes.borrow_and_update();

    let (tx, rx) = mpsc::channel(8);
    tx.send(SessionEvent::SignedOut).await.unwrap();
    tx.send(SessionEvent::SignedIn(SignedInSession::new("actor-2", "tok-2")))
        .await
        .unwrap();
    drop(tx);
    engine.run(rx).await;

    assert!(changes.has_changed().unwrap());
    let snapshot = engine.auth().snapshot();
    assert_eq!(snapshot.state, AuthState::AuthenticatedWithProfile);
    assert_eq!(snapshot.session.actor_id(), Some("actor-2"));
}
