//! Signed-in session ownership.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` owns the session and is the only code that changes it; `session`
//! defines the read-only snapshot handed to everything else.

pub mod auth;
pub mod session;
