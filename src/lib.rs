//! Storefront server: route authorization gate, code login and wishlist API,
//! plus the optimistic wishlist toggle used by clients of that API.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod routes;
pub mod services;
pub mod state;
