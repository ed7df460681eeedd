use super::backend::{ACTOR, TOKEN, feed_engine};
use glitchary::MutationOutcome;
use glitchary::interactions::{PostSeed, UserSeed};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn seed(count: u64) -> PostSeed {
    PostSeed {
        amplify_count: Some(count),
        is_amplified: Some(false),
        ..PostSeed::default()
    }
}

#[tokio::test]
async fn amplify_prefers_server_counters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/calls/p1/amplify"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"amplifies": 12, "is_amplified": true})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let engine = feed_engine(&server).await;
    engine.interactions().initialize_post("p1", seed(3));

    assert_eq!(
        engine.interactions().amplify("p1").await,
        MutationOutcome::Committed
    );

    let record = engine.interactions().post("p1").unwrap();
    assert!(record.is_amplified());
    assert_eq!(record.amplify_count(), 12);
}

#[tokio::test]
async fn server_error_rolls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/calls/p1/bookmark"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let engine = feed_engine(&server).await;
    engine.interactions().initialize_post("p1", seed(3));
    let before = engine.interactions().post("p1").unwrap();

    assert_eq!(
        engine.interactions().bookmark("p1").await,
        MutationOutcome::RolledBack
    );

    assert_eq!(engine.interactions().post("p1").unwrap(), before);
    assert!(engine.interactions().last_error().is_some());
}

#[tokio::test]
async fn second_toggle_while_first_in_flight_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/calls/p1/amplify"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;
    let engine = feed_engine(&server).await;
    let cache = engine.interactions();
    cache.initialize_post("p1", seed(0));

    let (first, second) = tokio::join!(cache.amplify("p1"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.amplify("p1").await
    });

    assert_eq!(first, MutationOutcome::Committed);
    assert_eq!(second, MutationOutcome::Rejected);
    assert_eq!(cache.post("p1").unwrap().amplify_count(), 1);
}

#[tokio::test]
async fn comment_round_trip_uses_backend_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/calls/p1/interactions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"amplifies": 2, "replies": 5})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/responses"))
        .and(body_partial_json(json!({
            "call_id": "p1",
            "user_id": ACTOR,
            "response_text": "great call"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "response": {"id": "resp-9", "created_at": "2025-06-01T08:30:00Z"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let engine = feed_engine(&server).await;
    let cache = engine.interactions();
    cache.hydrate_post("p1", PostSeed::default()).await;

    assert_eq!(
        cache.add_comment("p1", "great call").await,
        MutationOutcome::Committed
    );

    let record = cache.post("p1").unwrap();
    assert_eq!(record.amplify_count(), 2);
    assert_eq!(record.reply_count, 6);
    assert_eq!(record.comments.len(), 1);
    assert_eq!(record.comments[0].id, "resp-9");
    assert_eq!(record.comments[0].author.username, "ada");
}

#[tokio::test]
async fn follow_then_unfollow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/u9/follow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_following": true, "followers": 4})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/u9/follow"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let engine = feed_engine(&server).await;
    let cache = engine.interactions();
    cache.initialize_user("u9", UserSeed::default());

    assert_eq!(cache.follow("u9").await, MutationOutcome::Committed);
    assert_eq!(cache.user("u9").unwrap().follower_count(), 4);
    assert_eq!(cache.unfollow("u9").await, MutationOutcome::Committed);

    let user = cache.user("u9").unwrap();
    assert!(!user.is_following());
    assert_eq!(user.follower_count(), 3);
}

#[tokio::test]
async fn created_call_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/calls"))
        .and(body_partial_json(json!({"user_id": ACTOR, "prompt": "paint a fox"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "call": {"id": "c1", "user_id": ACTOR, "prompt": "paint a fox", "created_at": "2025-06-01T08:30:00Z"}
        })))
        .mount(&server)
        .await;
    let engine = feed_engine(&server).await;

    let id = engine.interactions().create_call("paint a fox").await;

    assert_eq!(id.as_deref(), Some("c1"));
    let record = engine.interactions().post("c1").unwrap();
    assert_eq!(record.author_id.as_deref(), Some(ACTOR));
    assert_eq!(record.amplify_count(), 0);
}

#[tokio::test]
async fn echo_is_posted_with_actor_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/echoes"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(
            json!({"call_id": "c1", "response_id": "r7", "user_id": ACTOR}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Echo created successfully",
            "echo": {"id": "e1", "call_id": "c1", "response_id": "r7", "user_id": ACTOR, "created_at": "2025-06-01T09:00:00Z"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let engine = feed_engine(&server).await;

    let id = engine.interactions().create_echo("c1", "r7").await;

    assert_eq!(id.as_deref(), Some("e1"));
    let record = engine.interactions().post("e1").unwrap();
    assert_eq!(record.author_id.as_deref(), Some(ACTOR));
    assert_eq!(record.amplify_count(), 0);
}

#[tokio::test]
async fn sign_out_makes_writes_no_ops() {
    let server = MockServer::start().await;
    let engine = feed_engine(&server).await;
    engine.interactions().initialize_post("p1", seed(1));
    let requests_before = server.received_requests().await.unwrap().len();

    engine.sign_out();
    engine.interactions().initialize_post("p1", seed(1));

    assert_eq!(
        engine.interactions().amplify("p1").await,
        MutationOutcome::Skipped
    );
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_before
    );
}
