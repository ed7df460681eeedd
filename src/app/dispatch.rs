use crate::app::status::render_status;
use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result, bail};
use glitchary::auth::ProfileDraft;
use glitchary::interactions::{PostSeed, UserSeed};
use glitchary::{ClientEngine, Config, MutationOutcome, Route};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

/// Fail unless the session reached the feed.
fn require_feed(engine: &ClientEngine) -> Result<()> {
    let snapshot = engine.auth().snapshot();
    match snapshot.route() {
        Route::Feed => Ok(()),
        Route::CreateProfile => {
            bail!("signed in without a profile; run `glitchary create-profile <username>` first")
        }
        Route::SignIn | Route::Loading => match &snapshot.last_error {
            Some(err) => bail!("not signed in: {err}"),
            None => bail!("not signed in; set GLITCHARY_ACTOR_ID and GLITCHARY_TOKEN or pass --demo"),
        },
    }
}

/// Print the outcome and turn failures into a non-zero exit.
fn report(engine: &ClientEngine, outcome: MutationOutcome) -> Result<()> {
    println!("{outcome}");
    match outcome {
        MutationOutcome::RolledBack | MutationOutcome::Failed => {
            let reason = engine
                .interactions()
                .last_error()
                .unwrap_or_else(|| "unknown error".to_string());
            bail!("{reason}")
        }
        MutationOutcome::Missing => bail!("record not found"),
        _ => Ok(()),
    }
}

async fn on_post(engine: &ClientEngine, post_id: &str) {
    engine
        .interactions()
        .hydrate_post(post_id, PostSeed::default())
        .await;
}

fn print_post(engine: &ClientEngine, post_id: &str) -> Result<()> {
    match engine.interactions().post(post_id) {
        Some(record) => print_json(&record),
        None => bail!("post {post_id} is not cached"),
    }
}

fn print_user(engine: &ClientEngine, user_id: &str) -> Result<()> {
    match engine.interactions().user(user_id) {
        Some(record) => print_json(&record),
        None => bail!("user {user_id} is not cached"),
    }
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let engine = ClientEngine::connect(config);
    if cli.demo {
        engine.enter_demo();
    } else if !matches!(cli.command, Commands::Status) {
        engine.start().await;
    }
    tracing::debug!(state = %engine.auth().state(), "session ready");

    match cli.command {
        Commands::Status => {
            println!("{}", render_status(engine.config()));
            Ok(())
        }
        Commands::Whoami => print_json(&*engine.auth().snapshot()),
        Commands::CreateProfile {
            username,
            bio,
            avatar_url,
        } => {
            let profile = engine
                .create_profile(ProfileDraft {
                    username,
                    bio,
                    avatar_url,
                })
                .await
                .context("profile creation failed")?;
            print_json(&profile)
        }
        Commands::Search { query } => {
            let snapshot = engine.search().search_now(&query).await;
            if let Some(err) = &snapshot.last_error {
                bail!("{err}");
            }
            if snapshot.results.is_empty() {
                println!("no results for {:?}", snapshot.query_text);
                return Ok(());
            }
            print_json(&snapshot.results)
        }
        Commands::Amplify { post_id } => {
            require_feed(&engine)?;
            on_post(&engine, &post_id).await;
            let outcome = engine.interactions().amplify(&post_id).await;
            report(&engine, outcome)?;
            print_post(&engine, &post_id)
        }
        Commands::Bookmark { post_id } => {
            require_feed(&engine)?;
            on_post(&engine, &post_id).await;
            let outcome = engine.interactions().bookmark(&post_id).await;
            report(&engine, outcome)?;
            print_post(&engine, &post_id)
        }
        Commands::Follow { user_id } => {
            require_feed(&engine)?;
            engine
                .interactions()
                .initialize_user(&user_id, UserSeed::default());
            let outcome = engine.interactions().follow(&user_id).await;
            report(&engine, outcome)?;
            print_user(&engine, &user_id)
        }
        Commands::Unfollow { user_id } => {
            require_feed(&engine)?;
            // Follow state is not fetched from the backend.
            engine.interactions().initialize_user(
                &user_id,
                UserSeed {
                    is_following: Some(true),
                    ..UserSeed::default()
                },
            );
            let outcome = engine.interactions().unfollow(&user_id).await;
            report(&engine, outcome)?;
            print_user(&engine, &user_id)
        }
        Commands::Comment { post_id, text } => {
            require_feed(&engine)?;
            on_post(&engine, &post_id).await;
            let outcome = engine.interactions().add_comment(&post_id, &text).await;
            report(&engine, outcome)?;
            print_post(&engine, &post_id)
        }
        Commands::Post { prompt } => {
            require_feed(&engine)?;
            let Some(post_id) = engine.interactions().create_call(&prompt).await else {
                if let Some(err) = engine.interactions().last_error() {
                    bail!("call creation failed: {err}");
                }
                bail!("call creation needs a signed-in, non-demo session");
            };
            print_post(&engine, &post_id)
        }
        Commands::Echo {
            call_id,
            response_id,
        } => {
            require_feed(&engine)?;
            let Some(echo_id) = engine
                .interactions()
                .create_echo(&call_id, &response_id)
                .await
            else {
                if let Some(err) = engine.interactions().last_error() {
                    bail!("echo failed: {err}");
                }
                bail!("echo needs a signed-in, non-demo session");
            };
            print_post(&engine, &echo_id)
        }
    }
}
