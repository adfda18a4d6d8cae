//! Networking modules for the CMS REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` is the only code that touches the wire, `api` layers bearer
//! credentials and refresh-on-401 on top of it, `blog` exposes the typed
//! domain endpoints, and `types` defines the shared wire schema.

pub mod api;
pub mod blog;
pub mod error;
pub mod request;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
