//! Identity provider
//!
//! Wraps the JWT validator and publishes sign-in/sign-out events so the
//! session registry can open and discard per-user contexts.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::jwt::{extract_token_from_header, JwtValidator, TokenInput};
use crate::types::{Result, StampbookError};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name,
        }
    }

    /// Display name, or "Anonymous" when the provider has none
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "Anonymous",
        }
    }
}

/// Principal lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalEvent {
    SignedIn(Principal),
    SignedOut(Principal),
}

pub struct IdentityProvider {
    validator: JwtValidator,
    events: broadcast::Sender<PrincipalEvent>,
}

impl IdentityProvider {
    pub fn new(validator: JwtValidator) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { validator, events }
    }

    /// Resolve a principal from a raw token without publishing anything
    pub fn verify(&self, token: &str) -> Result<Principal> {
        let result = self.validator.verify_token(token);
        match result.claims {
            Some(claims) if result.valid => Ok(Principal::new(claims.sub, claims.name)),
            _ => Err(StampbookError::Unauthorized(
                result.error.unwrap_or_else(|| "Invalid token".into()),
            )),
        }
    }

    /// Resolve a principal from an Authorization header value
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<Principal> {
        let token = extract_token_from_header(auth_header)
            .ok_or_else(|| StampbookError::Unauthorized("Missing bearer token".into()))?;
        self.verify(token)
    }

    /// Verify a token and announce the principal as signed in
    pub fn sign_in(&self, token: &str) -> Result<Principal> {
        let principal = self.verify(token)?;
        info!(user_id = %principal.user_id, "Principal signed in");
        self.publish(PrincipalEvent::SignedIn(principal.clone()));
        Ok(principal)
    }

    /// Announce the principal as signed out
    pub fn sign_out(&self, principal: &Principal) {
        info!(user_id = %principal.user_id, "Principal signed out");
        self.publish(PrincipalEvent::SignedOut(principal.clone()));
    }

    /// Issue a token for `user_id` (dev mode and tests)
    pub fn issue_token(&self, user_id: &str, display_name: Option<String>) -> Result<String> {
        self.validator.generate_token(TokenInput {
            user_id: user_id.to_string(),
            display_name,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrincipalEvent> {
        self.events.subscribe()
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.validator.expiry_seconds()
    }

    fn publish(&self, event: PrincipalEvent) {
        // No receivers is fine: nobody is listening yet
        if self.events.send(event).is_err() {
            debug!("No principal event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> IdentityProvider {
        IdentityProvider::new(JwtValidator::new_dev())
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(Principal::new("u1", None).display_name(), "Anonymous");
        assert_eq!(
            Principal::new("u1", Some("  ".into())).display_name(),
            "Anonymous"
        );
        assert_eq!(Principal::new("u1", Some("Ada".into())).display_name(), "Ada");
    }

    #[test]
    fn test_authenticate_header() {
        let provider = provider();
        let token = provider.issue_token("u1", Some("Ada".into())).unwrap();

        let header = format!("Bearer {token}");
        let principal = provider.authenticate(Some(&header)).unwrap();
        assert_eq!(principal, Principal::new("u1", Some("Ada".into())));

        assert!(matches!(
            provider.authenticate(None),
            Err(StampbookError::Unauthorized(_))
        ));
        assert!(provider.authenticate(Some("Bearer nope")).is_err());
    }

    #[tokio::test]
    async fn test_sign_in_and_out_publish_events() {
        let provider = provider();
        let mut events = provider.subscribe();
        let token = provider.issue_token("u1", None).unwrap();

        let principal = provider.sign_in(&token).unwrap();
        provider.sign_out(&principal);

        assert_eq!(
            events.recv().await.unwrap(),
            PrincipalEvent::SignedIn(principal.clone())
        );
        assert_eq!(
            events.recv().await.unwrap(),
            PrincipalEvent::SignedOut(principal)
        );
    }

    #[test]
    fn test_sign_in_without_subscribers() {
        let provider = provider();
        let token = provider.issue_token("u1", None).unwrap();
        assert!(provider.sign_in(&token).is_ok());
        assert!(provider.sign_in("garbage").is_err());
    }
}
