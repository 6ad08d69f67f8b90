//! Route access rules and post-login resumption.
//!
//! Pure decision logic only: no I/O and no framework types. The HTTP side
//! (`routes::gate`, `routes::auth`) feeds it request data and turns its
//! decisions into responses.

pub mod callback;
pub mod policy;
