//! HTTP handlers for the transfer API.

pub mod admin;
pub mod auth;
pub mod submissions;
pub mod system;
pub mod uploads;
pub mod users;
pub mod vocabs;
