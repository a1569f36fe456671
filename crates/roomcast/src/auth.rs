//! Authentication hook for resolving a connection's identity.
//!
//! Roomcast doesn't validate tokens itself — that belongs to whatever
//! issues them (a session service, JWT middleware, an API gateway).
//! The server calls [`Authenticator::authenticate`] once per connection,
//! during the handshake, and admits the resulting [`Profile`] to the
//! requested room.

use roomcast_protocol::Profile;

/// The token presented in a handshake could not be resolved to a user.
#[derive(Debug, thiserror::Error)]
#[error("authentication failed: {0}")]
pub struct AuthError(String);

impl AuthError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Resolves a client's auth token into their profile.
///
/// `Send + Sync + 'static` because the authenticator is shared across
/// connection handler tasks for the server's whole lifetime.
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the token and returns the profile to admit.
    ///
    /// An `Err` rejects the handshake and closes the connection before
    /// the client ever reaches a room.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Profile, AuthError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct PrefixAuth;

    impl Authenticator for PrefixAuth {
        async fn authenticate(
            &self,
            token: &str,
        ) -> Result<Profile, AuthError> {
            let username = token
                .strip_prefix("user:")
                .ok_or_else(|| AuthError::new("bad token"))?;
            Ok(Profile {
                user_id: Uuid::new_v4(),
                username: username.to_string(),
                first_name: None,
                last_name: None,
            })
        }
    }

    #[tokio::test]
    async fn test_authenticate_accepts_and_rejects() {
        let auth = PrefixAuth;
        let profile = auth.authenticate("user:ada").await.unwrap();
        assert_eq!(profile.username, "ada");
        assert!(auth.authenticate("garbage").await.is_err());
    }
}
