//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own persistence and business rules so route handlers
//! stay focused on request parsing, auth plumbing and status mapping.

pub mod login_code;
pub mod session;
pub mod wishlist;
