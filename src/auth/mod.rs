pub mod controller;
pub mod session;

pub use controller::{AuthSessionController, ProfileDraft, SessionEvent};
pub use session::{
    AuthSession, AuthState, Profile, Route, SessionHandle, SessionSnapshot, SignedInSession,
};
