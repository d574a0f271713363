//! Auth handlers and supporting modules.
//!
//! This module coordinates credential sign-in, access-token refresh, and
//! sign-out, plus the guard/gate primitives the rest of the API uses.
//!
//! ## Token model
//!
//! - **Access token**: HS256 JWT, minutes-scale TTL, carried in the
//!   `Authorization: Bearer` header. Stateless, never persisted.
//! - **Refresh token**: HS256 JWT, days-scale TTL, carried in the
//!   `refreshToken` `HttpOnly` cookie and mirrored by a `refresh_tokens`
//!   row. The raw cookie value is the lookup key; rows are invalidated by
//!   deletion and expiry is enforced at query time, never by a sweeper.
//!
//! Refresh tokens are not rotated on use: a refresh leaves the stored row
//! valid until its original expiry.

pub(crate) mod gate;
pub(crate) mod guard;
pub(crate) mod session;
pub(crate) mod signin;
mod state;
pub(crate) mod storage;
pub(crate) mod types;

pub use gate::Role;
pub use guard::{Authenticator, JwtAuthenticator, Principal, RequestAuth};
pub use state::AuthState;
