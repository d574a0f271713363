//! Auth state and configuration shared across handlers.

use std::sync::Arc;

use crate::token::TokenKeys;

pub struct AuthState {
    frontend_base_url: String,
    keys: Arc<TokenKeys>,
}

impl AuthState {
    #[must_use]
    pub fn new(frontend_base_url: String, keys: Arc<TokenKeys>) -> Self {
        Self {
            frontend_base_url,
            keys,
        }
    }

    #[must_use]
    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(super) fn refresh_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn state(frontend: &str) -> AuthState {
        let keys = TokenKeys::new(
            SecretString::from("access".to_string()),
            SecretString::from("refresh".to_string()),
            15,
            7,
        );
        AuthState::new(frontend.to_string(), Arc::new(keys))
    }

    #[test]
    fn cookie_secure_follows_frontend_scheme() {
        assert!(state("https://aduan.dev").refresh_cookie_secure());
        assert!(!state("http://localhost:5173").refresh_cookie_secure());
    }

    #[test]
    fn exposes_keys_and_frontend() {
        let state = state("https://aduan.dev");
        assert_eq!(state.frontend_base_url(), "https://aduan.dev");
        assert_eq!(state.keys().refresh_ttl_seconds(), 7 * 24 * 60 * 60);
    }
}
