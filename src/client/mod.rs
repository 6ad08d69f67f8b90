//! Client-side state for membership toggles.
//!
//! DESIGN
//! ======
//! `toggle` holds the reusable optimistic controller, `membership` the seam
//! it drives, and `api` the HTTP implementation of that seam for the
//! storefront wishlist. Other toggles (follow, star) plug a different
//! `MembershipService` into the same controller.

pub mod api;
pub mod membership;
pub mod toggle;
