//! Session store: who is signed in.
//!
//! Sign-in and sign-up are validated locally and take effect immediately;
//! there is no authentication backend.

use crate::error::SessionError;
use crate::types::UserProfile;
use storefront_core::{SmallVec, effect::Effect, reducer::Reducer};
use storefront_macros::Action;

/// Current session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    user: Option<UserProfile>,
    is_logged_in: bool,
    error: Option<SessionError>,
}

impl SessionState {
    /// Creates a signed-out session
    #[must_use]
    pub const fn new() -> Self {
        Self {
            user: None,
            is_logged_in: false,
            error: None,
        }
    }

    /// Whether a user is signed in
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.is_logged_in
    }

    /// The signed-in user
    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Last validation error
    #[must_use]
    pub const fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }
}

/// Session commands
#[derive(Action, Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Sign in with existing credentials
    #[command]
    SignIn {
        /// Email address
        email: String,
        /// Password
        password: String,
    },

    /// Create an account and sign in
    #[command]
    SignUp {
        /// Display name
        name: String,
        /// Email address
        email: String,
        /// Password
        password: String,
    },

    /// Merge the given fields into the signed-in profile
    ///
    /// Fails with [`SessionError::NotSignedIn`] when signed out.
    #[command]
    UpdateProfile {
        /// New display name
        name: Option<String>,
        /// New email address
        email: Option<String>,
    },

    /// Sign out and forget the user
    #[command]
    SignOut,
}

/// Reducer for the session
#[derive(Clone, Debug, Default)]
pub struct SessionReducer;

impl SessionReducer {
    /// Creates a new `SessionReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_credentials(email: &str, password: &str) -> Result<(), SessionError> {
        if !email.contains('@') {
            return Err(SessionError::InvalidEmail(email.to_string()));
        }

        if password.is_empty() {
            return Err(SessionError::EmptyPassword);
        }

        Ok(())
    }

    fn sign_in(state: &mut SessionState, user: UserProfile) {
        tracing::info!(email = %user.email, "Signed in");
        state.user = Some(user);
        state.is_logged_in = true;
        state.error = None;
    }
}

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SessionAction::SignIn { email, password } => {
                match Self::validate_credentials(&email, &password) {
                    Ok(()) => Self::sign_in(state, UserProfile { name: None, email }),
                    Err(error) => {
                        tracing::warn!(%error, "Sign-in rejected");
                        state.error = Some(error);
                    }
                }
            }

            SessionAction::SignUp {
                name,
                email,
                password,
            } => {
                let validated = if name.trim().is_empty() {
                    Err(SessionError::EmptyName)
                } else {
                    Self::validate_credentials(&email, &password)
                };

                match validated {
                    Ok(()) => Self::sign_in(
                        state,
                        UserProfile {
                            name: Some(name),
                            email,
                        },
                    ),
                    Err(error) => {
                        tracing::warn!(%error, "Sign-up rejected");
                        state.error = Some(error);
                    }
                }
            }

            SessionAction::UpdateProfile { name, email } => {
                let Some(user) = state.user.as_mut() else {
                    tracing::warn!("Profile update rejected: signed out");
                    state.error = Some(SessionError::NotSignedIn);
                    return SmallVec::new();
                };

                if let Some(email) = email {
                    if !email.contains('@') {
                        tracing::warn!(%email, "Profile update rejected");
                        state.error = Some(SessionError::InvalidEmail(email));
                        return SmallVec::new();
                    }
                    user.email = email;
                }
                if let Some(name) = name {
                    user.name = Some(name);
                }
                state.error = None;
                tracing::debug!("Profile updated");
            }

            SessionAction::SignOut => {
                tracing::info!("Signed out");
                *state = SessionState::new();
            }
        }

        SmallVec::new()
    }
}
