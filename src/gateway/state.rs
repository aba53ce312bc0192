//! Gateway configuration and shared per-process state.

use anyhow::{Context, Result};
use reqwest::{redirect, Client};
use std::sync::Arc;
use std::time::Duration;

use super::reset::{CredentialDirectory, ResetNotifier, ResetTokenStore};
use crate::APP_USER_AGENT;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: u64 = 15 * 60;
const DEFAULT_LOGIN_PATH: &str = "/auth/login";
const DEFAULT_LOGIN_PAGE_PATH: &str = "/login";

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    backend_base_url: String,
    frontend_base_url: String,
    login_path: String,
    login_page_path: String,
    session_ttl_seconds: i64,
    reset_token_ttl_seconds: u64,
    protected_prefixes: Vec<String>,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(backend_base_url: String, frontend_base_url: String) -> Self {
        Self {
            backend_base_url,
            frontend_base_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            login_page_path: DEFAULT_LOGIN_PAGE_PATH.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            protected_prefixes: vec!["/dashboard".to_string()],
        }
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: String) -> Self {
        self.login_path = login_path;
        self
    }

    #[must_use]
    pub fn with_login_page_path(mut self, login_page_path: String) -> Self {
        self.login_page_path = login_page_path;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_protected_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.protected_prefixes = prefixes;
        self
    }

    #[must_use]
    pub fn backend_base_url(&self) -> &str {
        &self.backend_base_url
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn login_page_path(&self) -> &str {
        &self.login_page_path
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn reset_token_ttl(&self) -> Duration {
        Duration::from_secs(self.reset_token_ttl_seconds)
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }

    /// Upstream login endpoint tried by the credential negotiator.
    pub(crate) fn login_url(&self) -> String {
        let base = self.backend_base_url.trim_end_matches('/');
        format!("{base}{}", self.login_path)
    }

    /// Join a proxied resource path (and optional query string) onto the backend base.
    pub(crate) fn backend_target(&self, path: &str, query: Option<&str>) -> String {
        let base = self.backend_base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        match query {
            Some(query) if !query.is_empty() => format!("{base}/{path}?{query}"),
            _ => format!("{base}/{path}"),
        }
    }

    /// Reset link embedded in the out-of-band notification.
    pub(crate) fn reset_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        format!("{base}/login/reset/{token}")
    }

    /// Prefix match on path-segment boundaries, so `/dashboard` guards
    /// `/dashboard` and `/dashboard/...` but not `/dashboards`.
    pub(crate) fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

pub struct GatewayState {
    config: GatewayConfig,
    http: Client,
    reset_tokens: ResetTokenStore,
    credentials: Arc<dyn CredentialDirectory>,
    notifier: Arc<dyn ResetNotifier>,
}

impl GatewayState {
    /// Build the shared state, including the upstream HTTP client.
    ///
    /// Redirects are never followed: the forwarding gateway injects a bearer
    /// header, and following an upstream redirect would replay it against a
    /// location the gateway does not control.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        config: GatewayConfig,
        credentials: Arc<dyn CredentialDirectory>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to build upstream HTTP client")?;

        let reset_tokens = ResetTokenStore::new(config.reset_token_ttl());

        Ok(Self {
            config,
            http,
            reset_tokens,
            credentials,
            notifier,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    #[must_use]
    pub fn reset_tokens(&self) -> &ResetTokenStore {
        &self.reset_tokens
    }

    pub(crate) fn credentials(&self) -> &dyn CredentialDirectory {
        self.credentials.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn ResetNotifier {
        self.notifier.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::reset::{LogCredentialDirectory, LogResetNotifier};

    fn config() -> GatewayConfig {
        GatewayConfig::new(
            "http://localhost:3333".to_string(),
            "http://localhost:3000".to_string(),
        )
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config = config();

        assert_eq!(config.backend_base_url(), "http://localhost:3333");
        assert_eq!(config.login_url(), "http://localhost:3333/auth/login");
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(
            config.reset_token_ttl(),
            Duration::from_secs(DEFAULT_RESET_TOKEN_TTL_SECONDS)
        );
        assert_eq!(config.login_page_path(), "/login");
        assert!(!config.session_cookie_secure());

        let config = config
            .with_login_path("/v2/login".to_string())
            .with_login_page_path("/entrar".to_string())
            .with_session_ttl_seconds(60)
            .with_reset_token_ttl_seconds(30)
            .with_protected_prefixes(vec!["/admin".to_string()]);

        assert_eq!(config.login_url(), "http://localhost:3333/v2/login");
        assert_eq!(config.login_page_path(), "/entrar");
        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.reset_token_ttl(), Duration::from_secs(30));
        assert!(config.is_protected("/admin/users"));
        assert!(!config.is_protected("/dashboard"));
    }

    #[test]
    fn secure_flag_follows_frontend_scheme() {
        let secure = GatewayConfig::new(
            "https://api.fetraf.dev".to_string(),
            "https://painel.fetraf.dev".to_string(),
        );
        assert!(secure.session_cookie_secure());
    }

    #[test]
    fn backend_target_joins_path_and_query() {
        let config = GatewayConfig::new(
            "http://localhost:3333/".to_string(),
            "http://localhost:3000".to_string(),
        );

        assert_eq!(
            config.backend_target("/usuarios", None),
            "http://localhost:3333/usuarios"
        );
        assert_eq!(
            config.backend_target("usuarios", Some("page=2")),
            "http://localhost:3333/usuarios?page=2"
        );
        assert_eq!(
            config.backend_target("/auth/me", Some("")),
            "http://localhost:3333/auth/me"
        );
    }

    #[test]
    fn protected_prefix_respects_segment_boundaries() {
        let config = config();

        assert!(config.is_protected("/dashboard"));
        assert!(config.is_protected("/dashboard/filiados/42"));
        assert!(!config.is_protected("/dashboards"));
        assert!(!config.is_protected("/login"));
    }

    #[test]
    fn reset_url_embeds_token() {
        let config = GatewayConfig::new(
            "http://localhost:3333".to_string(),
            "https://painel.fetraf.dev/".to_string(),
        );
        assert_eq!(
            config.reset_url("abc123"),
            "https://painel.fetraf.dev/login/reset/abc123"
        );
    }

    #[test]
    fn state_constructs_with_log_collaborators() {
        let state = GatewayState::new(
            config(),
            Arc::new(LogCredentialDirectory),
            Arc::new(LogResetNotifier),
        )
        .unwrap();
        assert_eq!(state.config().backend_base_url(), "http://localhost:3333");
    }
}
