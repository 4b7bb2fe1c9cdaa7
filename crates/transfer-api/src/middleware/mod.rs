//! Request extractors and cookie helpers.

pub mod session;

pub use session::{
    parse_cookie, session_cookie, user_cookie, AdminSession, SESSION_COOKIE, USER_COOKIE,
};
