//! # Aduan (Citizen Complaint API)
//!
//! `aduan` is the HTTP backend of a citizen-complaint system. Citizens file
//! complaints with up to five images, administrators respond and move them
//! through a status lifecycle, and both sides authenticate with short-lived
//! JWT access tokens refreshed via a server-side session table.
//!
//! ## Authentication
//!
//! Sign-in issues an HS256 access token (minutes-scale TTL, returned in the
//! response body) and a refresh token (days-scale TTL, `HttpOnly`
//! `refreshToken` cookie backed by a `refresh_tokens` row). The two tokens
//! use independent secrets; decoding with the wrong one fails closed.
//!
//! ## Authorization
//!
//! Every route declares its allowed-role set explicitly (`admin`, `user`),
//! with no implicit admin grant. Resource access additionally passes an
//! ownership check: admins see everything, users only their own rows.
//! Unauthorized access returns `403 Permission denied` without detail.
//!
//! ## Complaint images
//!
//! Image sets are bounded at five per complaint. Mutations are reconciled
//! against a remote asset store: uploads happen before deletes so a failed
//! upload never leaves a complaint with zero images, and a mid-batch upload
//! failure destroys the already-uploaded assets before surfacing the error.

pub mod api;
pub mod assets;
pub mod cli;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
