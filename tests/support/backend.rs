#![allow(dead_code)]

use glitchary::{ClientEngine, Config};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACTOR: &str = "actor-1";
pub const TOKEN: &str = "tok-actor-1";

pub fn config_for(server: &MockServer, signed_in: bool) -> Config {
    let mut config = Config {
        api_base_url: format!("{}/api", server.uri()),
        ..Config::default()
    };
    config.search.debounce_ms = 50;
    if signed_in {
        config.actor_id = Some(ACTOR.into());
        config.credential = Some(TOKEN.into());
    }
    config
}

pub fn engine_for(server: &MockServer, signed_in: bool) -> ClientEngine {
    ClientEngine::connect(config_for(server, signed_in))
}

pub fn profile_json(user_id: &str) -> Value {
    json!({
        "profile": {
            "user_id": user_id,
            "username": "ada",
            "avatar_url": "https://img.example/ada.png",
            "bio": "hello"
        }
    })
}

/// Mount a profile lookup that finds `ACTOR`.
pub async fn mount_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/api/profiles/{ACTOR}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(ACTOR)))
        .mount(server)
        .await;
}

/// Engine signed in as `ACTOR` with a resolved profile.
pub async fn feed_engine(server: &MockServer) -> ClientEngine {
    mount_profile(server).await;
    let engine = engine_for(server, true);
    engine.start().await;
    engine
}
