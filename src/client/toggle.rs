//! Optimistic toggle controller.
//!
//! DESIGN
//! ======
//! Two slots: `committed` holds the last server-confirmed state and
//! `overlay` holds the desired value of the one in-flight mutation. What the
//! UI shows is always derived as "overlay if present, else committed", so
//! clearing the overlay after a failure is the entire rollback. Committed
//! state only changes on a successful response.
//!
//! CONCURRENCY
//! ===========
//! A capacity-1 semaphore is the single-flight guard. A trigger that cannot
//! take the permit is dropped: no queueing, and the in-flight call is never
//! cancelled. The overlay is only set while the permit is held, and the
//! guard owning the permit clears it even when the caller drops the
//! `toggle` future, so `pending` and "a mutation is in flight" are the
//! same fact.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Semaphore, SemaphorePermit, watch};

use super::membership::{MembershipError, MembershipService};

/// Confirmed membership: `membership_id` is known whenever `is_member` is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipState<M> {
    pub is_member: bool,
    pub membership_id: Option<M>,
}

impl<M> MembershipState<M> {
    pub fn member(membership_id: M) -> Self {
        Self { is_member: true, membership_id: Some(membership_id) }
    }

    #[must_use]
    pub fn not_member() -> Self {
        Self { is_member: false, membership_id: None }
    }
}

/// What display code renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleView<M> {
    pub is_member: bool,
    /// `None` while a change is pending or when not a member.
    pub membership_id: Option<M>,
    pub pending: bool,
}

#[derive(Debug)]
pub enum ToggleOutcome<M> {
    /// Another toggle was in flight; nothing changed.
    Ignored,
    Committed(MembershipState<M>),
    /// The mutation failed and the displayed state fell back to committed.
    RolledBack(MembershipError),
}

struct Slots<M> {
    committed: MembershipState<M>,
    overlay: Option<bool>,
}

impl<M: Clone> Slots<M> {
    fn view(&self) -> ToggleView<M> {
        match self.overlay {
            Some(desired) => ToggleView { is_member: desired, membership_id: None, pending: true },
            None => ToggleView {
                is_member: self.committed.is_member,
                membership_id: self.committed.membership_id.clone(),
                pending: false,
            },
        }
    }
}

type AddedCallback<M> = Box<dyn Fn(&M) + Send + Sync>;

/// Optimistic cache of one remote membership, bound to one entity.
pub struct OptimisticToggle<S: MembershipService> {
    service: Arc<S>,
    entity: S::EntityId,
    slots: Mutex<Slots<S::MembershipId>>,
    flight: Semaphore,
    views: watch::Sender<ToggleView<S::MembershipId>>,
    on_added: Option<AddedCallback<S::MembershipId>>,
}

impl<S: MembershipService> OptimisticToggle<S> {
    pub fn new(service: Arc<S>, entity: S::EntityId, committed: MembershipState<S::MembershipId>) -> Self {
        let slots = Slots { committed, overlay: None };
        let (views, _) = watch::channel(slots.view());
        Self { service, entity, slots: Mutex::new(slots), flight: Semaphore::new(1), views, on_added: None }
    }

    /// Run `callback` with the new membership id after each successful add.
    #[must_use]
    pub fn on_added(mut self, callback: impl Fn(&S::MembershipId) + Send + Sync + 'static) -> Self {
        self.on_added = Some(Box::new(callback));
        self
    }

    pub fn entity(&self) -> &S::EntityId {
        &self.entity
    }

    pub fn view(&self) -> ToggleView<S::MembershipId> {
        self.lock().view()
    }

    pub fn committed(&self) -> MembershipState<S::MembershipId> {
        self.lock().committed.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().overlay.is_some()
    }

    /// Receive every view this controller publishes.
    pub fn subscribe(&self) -> watch::Receiver<ToggleView<S::MembershipId>> {
        self.views.subscribe()
    }

    /// Flip membership optimistically and settle once the service answers.
    pub async fn toggle(&self) -> ToggleOutcome<S::MembershipId> {
        let Ok(permit) = self.flight.try_acquire() else {
            return ToggleOutcome::Ignored;
        };
        let _flight = InFlight { toggle: self, _permit: permit };

        let committed = {
            let mut slots = self.lock();
            slots.overlay = Some(!slots.committed.is_member);
            self.publish(&slots);
            slots.committed.clone()
        };

        let adding = !committed.is_member;
        let result = if adding {
            self.add().await
        } else {
            self.remove(committed.membership_id.as_ref()).await
        };

        let outcome = {
            let mut slots = self.lock();
            slots.overlay = None;
            let outcome = match result {
                Ok(next) => {
                    slots.committed = next.clone();
                    ToggleOutcome::Committed(next)
                }
                Err(e) => {
                    tracing::warn!(error = %e, adding, "membership toggle failed; reverting");
                    ToggleOutcome::RolledBack(e)
                }
            };
            self.publish(&slots);
            outcome
        };

        if adding {
            if let (ToggleOutcome::Committed(MembershipState { membership_id: Some(id), .. }), Some(callback)) =
                (&outcome, &self.on_added)
            {
                callback(id);
            }
        }
        outcome
    }

    async fn add(&self) -> Result<MembershipState<S::MembershipId>, MembershipError> {
        let response = self.service.add(&self.entity).await?;
        if !response.success {
            return Err(MembershipError::Rejected);
        }
        let data = response.data.ok_or(MembershipError::MissingMembershipId)?;
        Ok(MembershipState::member(data.membership_id))
    }

    async fn remove(
        &self,
        membership_id: Option<&S::MembershipId>,
    ) -> Result<MembershipState<S::MembershipId>, MembershipError> {
        let membership_id = membership_id.ok_or(MembershipError::UnknownMembership)?;
        let response = self.service.remove(membership_id).await?;
        if !response.success {
            return Err(MembershipError::Rejected);
        }
        Ok(MembershipState::not_member())
    }

    fn lock(&self) -> MutexGuard<'_, Slots<S::MembershipId>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, slots: &Slots<S::MembershipId>) {
        self.views.send_replace(slots.view());
    }
}

/// Holds the flight permit. If the `toggle` future is dropped mid-call the
/// overlay is cleared here, before the permit is released.
struct InFlight<'a, S: MembershipService> {
    toggle: &'a OptimisticToggle<S>,
    _permit: SemaphorePermit<'a>,
}

impl<S: MembershipService> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        let mut slots = self.toggle.lock();
        if slots.overlay.take().is_some() {
            tracing::debug!("membership toggle abandoned mid-flight; reverting");
            self.toggle.publish(&slots);
        }
    }
}

#[cfg(test)]
#[path = "toggle_test.rs"]
mod tests;
