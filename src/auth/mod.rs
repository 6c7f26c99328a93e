//! Token-based authentication with role-based access control.
//!
//! Short-lived access tokens and longer-lived refresh tokens are both bound
//! to a server-side session, so deleting the session revokes every token
//! minted for it immediately.

mod chain;
mod cookie;
mod flow;
mod guard;
mod state;

pub use chain::{CurrentUser, authenticate_request, deserialize_user};
pub use cookie::{
    ACCESS_COOKIE_NAME, LOGGED_IN_COOKIE_NAME, REFRESH_COOKIE_NAME, bearer_token, cleared_cookies,
    get_cookie, session_cookies,
};
pub use flow::{AuthFlow, LoginTokens, NewUser, RefreshedAccess, find_live_session, normalize_email};
pub use guard::{RequiredRoles, authorize, restrict_to};
pub use state::{AuthSettings, HasAuthBackend};
