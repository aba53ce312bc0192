//! Single-use, expiring password reset tokens.
//!
//! The store is process-wide and deliberately in-memory: the token itself is
//! the capability, entries live for fifteen minutes, and losing them on
//! restart only forces the user to request a new link. Applying the new
//! secret is not this crate's business; it goes through
//! [`CredentialDirectory`], which in production is the credential-owning
//! backend service.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Minimum accepted length for a new secret, in characters.
pub const MIN_SECRET_CHARS: usize = 8;

#[derive(Clone, Debug)]
struct ResetEntry {
    email: String,
    expires_at: Instant,
}

/// Outcome of a consume attempt. Only `Consumed` burns the token; a weak
/// secret leaves it live so the user can retry within the window.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed { email: String },
    InvalidToken,
    ExpiredToken,
    WeakSecret,
}

pub struct ResetTokenStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, ResetEntry>>,
}

impl ResetTokenStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh token for `email`.
    ///
    /// The store does not know whether the address belongs to a real account,
    /// and must not behave differently if it does not. Multiple outstanding
    /// tokens per email are each independently valid.
    ///
    /// # Errors
    /// Returns an error only if the system RNG fails.
    pub async fn issue(&self, email: &str) -> Result<String> {
        let token = generate_reset_token()?;
        let now = Instant::now();

        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            token.clone(),
            ResetEntry {
                email: email.trim().to_lowercase(),
                expires_at: now + self.ttl,
            },
        );

        Ok(token)
    }

    /// Validate and, on success, burn a token. Check and removal happen under
    /// one lock acquisition, so concurrent consumes of the same token resolve
    /// to exactly one `Consumed`.
    pub async fn consume(&self, token: &str, new_secret: &str) -> ConsumeOutcome {
        let mut entries = self.entries.lock().await;

        let Some(entry) = entries.get(token) else {
            return ConsumeOutcome::InvalidToken;
        };

        if Instant::now() > entry.expires_at {
            entries.remove(token);
            return ConsumeOutcome::ExpiredToken;
        }

        if new_secret.chars().count() < MIN_SECRET_CHARS {
            return ConsumeOutcome::WeakSecret;
        }

        match entries.remove(token) {
            Some(entry) => ConsumeOutcome::Consumed { email: entry.email },
            None => ConsumeOutcome::InvalidToken,
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// Random, URL-safe, collision-resistant token. The raw value only ever
/// travels inside the reset link.
fn generate_reset_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// The external service that owns user credentials.
///
/// The gateway never stores passwords; it only relays a validated reset to
/// whoever does.
pub trait CredentialDirectory: Send + Sync {
    /// Replace the secret for `email`.
    ///
    /// # Errors
    /// Returns an error if the credential owner rejects or cannot apply the update.
    fn apply_secret(&self, email: &str, secret: &str) -> Result<()>;
}

/// Local dev directory that logs instead of calling the credential service.
#[derive(Clone, Debug)]
pub struct LogCredentialDirectory;

impl CredentialDirectory for LogCredentialDirectory {
    fn apply_secret(&self, email: &str, _secret: &str) -> Result<()> {
        info!(email = %email, "credential update stub");
        Ok(())
    }
}

/// Out-of-band delivery channel for reset links.
pub trait ResetNotifier: Send + Sync {
    /// Deliver `reset_url` to the user behind `email`.
    ///
    /// # Errors
    /// Returns an error if delivery fails; callers must stay generic toward the client.
    fn deliver(&self, email: &str, reset_url: &str) -> Result<()>;
}

/// Local dev notifier that logs the link instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogResetNotifier;

impl ResetNotifier for LogResetNotifier {
    fn deliver(&self, email: &str, reset_url: &str) -> Result<()> {
        info!(email = %email, reset_url = %reset_url, "reset link delivery stub");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const TTL: Duration = Duration::from_secs(15 * 60);

    #[tokio::test]
    async fn issue_returns_distinct_tokens_for_same_email() -> Result<()> {
        let store = ResetTokenStore::new(TTL);

        let first = store.issue("alice@example.com").await?;
        let second = store.issue("alice@example.com").await?;

        assert!(!first.is_empty());
        assert_ne!(first, second);

        // Both stay independently valid.
        assert!(matches!(
            store.consume(&first, "longenough1").await,
            ConsumeOutcome::Consumed { .. }
        ));
        assert!(matches!(
            store.consume(&second, "longenough1").await,
            ConsumeOutcome::Consumed { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn issue_normalizes_email() -> Result<()> {
        let store = ResetTokenStore::new(TTL);
        let token = store.issue(" Alice@Example.COM ").await?;

        assert_eq!(
            store.consume(&token, "longenough1").await,
            ConsumeOutcome::Consumed {
                email: "alice@example.com".to_string()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn weak_secret_does_not_burn_the_token() -> Result<()> {
        let store = ResetTokenStore::new(TTL);
        let token = store.issue("alice@example.com").await?;

        assert_eq!(
            store.consume(&token, "1234567").await,
            ConsumeOutcome::WeakSecret
        );
        // Same token still works with a stronger secret.
        assert!(matches!(
            store.consume(&token, "longenough1").await,
            ConsumeOutcome::Consumed { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn consumed_token_is_gone() -> Result<()> {
        let store = ResetTokenStore::new(TTL);
        let token = store.issue("alice@example.com").await?;

        assert!(matches!(
            store.consume(&token, "longenough1").await,
            ConsumeOutcome::Consumed { .. }
        ));
        assert_eq!(
            store.consume(&token, "longenough1").await,
            ConsumeOutcome::InvalidToken
        );
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_purged() -> Result<()> {
        let store = ResetTokenStore::new(Duration::ZERO);
        let token = store.issue("alice@example.com").await?;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(
            store.consume(&token, "longenough1").await,
            ConsumeOutcome::ExpiredToken
        );
        // The entry was deleted on expiry detection.
        assert_eq!(
            store.consume(&token, "longenough1").await,
            ConsumeOutcome::InvalidToken
        );
        Ok(())
    }

    #[tokio::test]
    async fn issue_purges_expired_entries() -> Result<()> {
        let store = ResetTokenStore::new(Duration::ZERO);
        store.issue("alice@example.com").await?;
        tokio::time::sleep(Duration::from_millis(5)).await;

        store.issue("bob@example.com").await?;
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_consume_yields_exactly_one_success() -> Result<()> {
        let store = ResetTokenStore::new(TTL);
        let token = store.issue("alice@example.com").await?;

        let (first, second) = tokio::join!(
            store.consume(&token, "longenough1"),
            store.consume(&token, "longenough1"),
        );

        let outcomes = [first, second];
        let consumed = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ConsumeOutcome::Consumed { .. }))
            .count();
        let invalid = outcomes
            .iter()
            .filter(|outcome| **outcome == ConsumeOutcome::InvalidToken)
            .count();

        assert_eq!(consumed, 1);
        assert_eq!(invalid, 1);
        Ok(())
    }

    #[test]
    fn generated_tokens_are_url_safe() -> Result<()> {
        let token = generate_reset_token()?;
        assert_eq!(Base64UrlUnpadded::decode_vec(&token).map(|b| b.len()), Ok(32));
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        Ok(())
    }
}
