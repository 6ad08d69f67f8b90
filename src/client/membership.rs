//! Remote membership service seam.
//!
//! A membership is a single user↔entity relationship that can be toggled:
//! wishlist item, follow, star. The wire envelopes here are shared by the
//! server routes that produce them and the HTTP client that consumes them.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddData<M> {
    pub membership_id: M,
}

/// Envelope returned by an add call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddResponse<M> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AddData<M>>,
}

impl<M> AddResponse<M> {
    pub fn added(membership_id: M) -> Self {
        Self { success: true, data: Some(AddData { membership_id }) }
    }
}

/// Envelope returned by a remove call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub success: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("unreadable response body: {0}")]
    Decode(String),
    #[error("server rejected the change")]
    Rejected,
    #[error("server accepted the add but returned no membership id")]
    MissingMembershipId,
    #[error("no membership id to remove")]
    UnknownMembership,
}

impl From<reqwest::Error> for MembershipError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[async_trait::async_trait]
pub trait MembershipService: Send + Sync {
    /// What the membership points at (a product id for wishlists).
    type EntityId: Clone + Send + Sync;
    /// Server-assigned id of one membership row.
    type MembershipId: Clone + Debug + PartialEq + Send + Sync;

    async fn add(&self, entity: &Self::EntityId) -> Result<AddResponse<Self::MembershipId>, MembershipError>;

    async fn remove(&self, membership: &Self::MembershipId) -> Result<RemoveResponse, MembershipError>;
}
