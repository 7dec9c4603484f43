//! API handlers for konto.
//!
//! `auth` owns login/logout, the admin gate, and the shared auth state;
//! `account` owns the authenticated self-service flows and password
//! reset; `health` and `root` are operational endpoints.

pub mod account;
pub mod auth;
pub mod health;
pub mod root;
