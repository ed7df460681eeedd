#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod interactions;
pub mod search;

pub use auth::{AuthSessionController, AuthState, Route, SessionEvent, SessionHandle};
pub use config::Config;
pub use engine::ClientEngine;
pub use error::{GlitcharyError, Result};
pub use gateway::{HttpGateway, RequestGateway};
pub use interactions::{InteractionCache, MutationOutcome};
pub use search::{SearchPipeline, SearchSnapshot, SearchStatus};
