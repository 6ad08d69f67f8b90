use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

use super::*;
use crate::client::membership::{AddResponse, RemoveResponse};

// =========================================================================
// ScriptedService
// =========================================================================

/// Membership service returning queued results. With `hold` set, each call
/// signals `started` and then waits for `release` before answering.
#[derive(Default)]
struct ScriptedService {
    adds: Mutex<VecDeque<Result<AddResponse<u64>, MembershipError>>>,
    removes: Mutex<VecDeque<Result<RemoveResponse, MembershipError>>>,
    add_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    hold: bool,
    started: Notify,
    release: Notify,
}

impl ScriptedService {
    fn held() -> Self {
        Self { hold: true, ..Self::default() }
    }

    fn push_add(&self, result: Result<AddResponse<u64>, MembershipError>) {
        self.adds.lock().unwrap().push_back(result);
    }

    fn push_remove(&self, result: Result<RemoveResponse, MembershipError>) {
        self.removes.lock().unwrap().push_back(result);
    }

    async fn wait_if_held(&self) {
        if self.hold {
            self.started.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait::async_trait]
impl MembershipService for ScriptedService {
    type EntityId = String;
    type MembershipId = u64;

    async fn add(&self, _entity: &String) -> Result<AddResponse<u64>, MembershipError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_if_held().await;
        let next = self.adds.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(MembershipError::Transport("unscripted".into())))
    }

    async fn remove(&self, _membership: &u64) -> Result<RemoveResponse, MembershipError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_if_held().await;
        let next = self.removes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(MembershipError::Transport("unscripted".into())))
    }
}

fn controller(service: &Arc<ScriptedService>, committed: MembershipState<u64>) -> Arc<OptimisticToggle<ScriptedService>> {
    Arc::new(OptimisticToggle::new(Arc::clone(service), "sku-1".to_owned(), committed))
}

fn settled(is_member: bool, membership_id: Option<u64>) -> ToggleView<u64> {
    ToggleView { is_member, membership_id, pending: false }
}

// =========================================================================
// initial state
// =========================================================================

#[test]
fn fresh_controller_shows_committed_state() {
    let service = Arc::new(ScriptedService::default());
    let ctrl = controller(&service, MembershipState::member(42));
    assert_eq!(ctrl.view(), settled(true, Some(42)));
    assert!(!ctrl.is_pending());
    assert_eq!(ctrl.entity(), "sku-1");
}

// =========================================================================
// toggle on
// =========================================================================

#[tokio::test]
async fn toggle_on_is_visible_before_response_and_reverts_on_failure() {
    let service = Arc::new(ScriptedService::held());
    service.push_add(Err(MembershipError::Transport("connection reset".into())));
    let ctrl = controller(&service, MembershipState::not_member());

    let task = tokio::spawn({
        let ctrl = Arc::clone(&ctrl);
        async move { ctrl.toggle().await }
    });
    service.started.notified().await;

    let during = ctrl.view();
    assert!(during.is_member);
    assert!(during.pending);
    assert_eq!(during.membership_id, None);
    assert_eq!(ctrl.committed(), MembershipState::not_member());

    service.release.notify_one();
    let outcome = task.await.unwrap();

    assert!(matches!(outcome, ToggleOutcome::RolledBack(MembershipError::Transport(_))));
    assert_eq!(ctrl.view(), settled(false, None));
    assert_eq!(ctrl.committed(), MembershipState::not_member());
}

#[tokio::test]
async fn toggle_on_success_commits_server_id_and_runs_callback() {
    let service = Arc::new(ScriptedService::default());
    service.push_add(Ok(AddResponse::added(7)));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let ctrl = OptimisticToggle::new(Arc::clone(&service), "sku-1".to_owned(), MembershipState::not_member())
        .on_added({
            let seen = Arc::clone(&seen);
            move |id| seen.lock().unwrap().push(*id)
        });

    let outcome = ctrl.toggle().await;

    assert!(matches!(outcome, ToggleOutcome::Committed(ref s) if *s == MembershipState::member(7)));
    assert_eq!(ctrl.view(), settled(true, Some(7)));
    assert_eq!(*seen.lock().unwrap(), vec![7]);
}

#[tokio::test]
async fn rejected_add_rolls_back() {
    let service = Arc::new(ScriptedService::default());
    service.push_add(Ok(AddResponse { success: false, data: None }));
    let ctrl = controller(&service, MembershipState::not_member());

    let outcome = ctrl.toggle().await;

    assert!(matches!(outcome, ToggleOutcome::RolledBack(MembershipError::Rejected)));
    assert_eq!(ctrl.view(), settled(false, None));
}

#[tokio::test]
async fn success_without_membership_id_is_treated_as_failure() {
    let service = Arc::new(ScriptedService::default());
    service.push_add(Ok(AddResponse { success: true, data: None }));
    let called = Arc::new(AtomicUsize::new(0));
    let ctrl = OptimisticToggle::new(Arc::clone(&service), "sku-1".to_owned(), MembershipState::not_member())
        .on_added({
            let called = Arc::clone(&called);
            move |_| {
                called.fetch_add(1, Ordering::SeqCst);
            }
        });

    let outcome = ctrl.toggle().await;

    assert!(matches!(outcome, ToggleOutcome::RolledBack(MembershipError::MissingMembershipId)));
    assert_eq!(ctrl.committed(), MembershipState::not_member());
    assert_eq!(called.load(Ordering::SeqCst), 0);
}

// =========================================================================
// toggle off
// =========================================================================

#[tokio::test]
async fn toggle_off_is_visible_before_response_and_commits_on_success() {
    let service = Arc::new(ScriptedService::held());
    service.push_remove(Ok(RemoveResponse { success: true }));
    let ctrl = controller(&service, MembershipState::member(42));

    let task = tokio::spawn({
        let ctrl = Arc::clone(&ctrl);
        async move { ctrl.toggle().await }
    });
    service.started.notified().await;

    let during = ctrl.view();
    assert!(!during.is_member);
    assert!(during.pending);
    assert_eq!(ctrl.committed(), MembershipState::member(42));

    service.release.notify_one();
    let outcome = task.await.unwrap();

    assert!(matches!(outcome, ToggleOutcome::Committed(ref s) if *s == MembershipState::not_member()));
    assert_eq!(ctrl.committed(), MembershipState::not_member());
    assert_eq!(ctrl.view(), settled(false, None));
    // Later reads keep showing the committed state.
    assert_eq!(ctrl.view(), settled(false, None));
}

#[tokio::test]
async fn failed_remove_restores_membership_id() {
    let service = Arc::new(ScriptedService::default());
    service.push_remove(Err(MembershipError::Status(503)));
    let ctrl = controller(&service, MembershipState::member(42));

    let outcome = ctrl.toggle().await;

    assert!(matches!(outcome, ToggleOutcome::RolledBack(MembershipError::Status(503))));
    assert_eq!(ctrl.view(), settled(true, Some(42)));
}

#[tokio::test]
async fn remove_without_known_id_fails_without_calling_service() {
    let service = Arc::new(ScriptedService::default());
    let ctrl = controller(&service, MembershipState { is_member: true, membership_id: None });

    let outcome = ctrl.toggle().await;

    assert!(matches!(outcome, ToggleOutcome::RolledBack(MembershipError::UnknownMembership)));
    assert_eq!(service.remove_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctrl.view(), settled(true, None));
}

// =========================================================================
// single flight
// =========================================================================

#[tokio::test]
async fn second_trigger_while_in_flight_is_ignored() {
    let service = Arc::new(ScriptedService::held());
    service.push_add(Ok(AddResponse::added(9)));
    service.push_add(Ok(AddResponse::added(10)));
    let ctrl = controller(&service, MembershipState::not_member());

    let task = tokio::spawn({
        let ctrl = Arc::clone(&ctrl);
        async move { ctrl.toggle().await }
    });
    service.started.notified().await;
    let before = ctrl.view();

    let second = ctrl.toggle().await;

    assert!(matches!(second, ToggleOutcome::Ignored));
    assert_eq!(ctrl.view(), before);
    assert_eq!(service.add_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.remove_calls.load(Ordering::SeqCst), 0);

    service.release.notify_one();
    let first = task.await.unwrap();
    assert!(matches!(first, ToggleOutcome::Committed(_)));
    assert_eq!(ctrl.view(), settled(true, Some(9)));
    assert_eq!(service.add_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn toggle_is_available_again_after_settling() {
    let service = Arc::new(ScriptedService::default());
    service.push_add(Ok(AddResponse::added(3)));
    service.push_remove(Ok(RemoveResponse { success: true }));
    let ctrl = controller(&service, MembershipState::not_member());

    assert!(matches!(ctrl.toggle().await, ToggleOutcome::Committed(_)));
    assert!(matches!(ctrl.toggle().await, ToggleOutcome::Committed(_)));
    assert_eq!(ctrl.view(), settled(false, None));
    assert_eq!(service.add_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.remove_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn abandoned_toggle_reverts_and_frees_the_controller() {
    let service = Arc::new(ScriptedService::held());
    service.push_add(Ok(AddResponse::added(11)));
    let ctrl = controller(&service, MembershipState::not_member());
    let rx = ctrl.subscribe();

    let task = tokio::spawn({
        let ctrl = Arc::clone(&ctrl);
        async move { ctrl.toggle().await }
    });
    service.started.notified().await;
    assert!(ctrl.is_pending());

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert!(!ctrl.is_pending());
    assert_eq!(ctrl.view(), settled(false, None));
    assert_eq!(*rx.borrow(), settled(false, None));
    assert_eq!(ctrl.committed(), MembershipState::not_member());

    // The queued add was never consumed; the next trigger gets it.
    service.release.notify_one();
    let next = ctrl.toggle().await;
    assert!(matches!(next, ToggleOutcome::Committed(ref s) if *s == MembershipState::member(11)));
}

// =========================================================================
// subscribers
// =========================================================================

#[tokio::test]
async fn subscribers_see_pending_then_settled_view() {
    let service = Arc::new(ScriptedService::held());
    service.push_add(Ok(AddResponse::added(5)));
    let ctrl = controller(&service, MembershipState::not_member());
    let mut rx = ctrl.subscribe();
    assert_eq!(*rx.borrow_and_update(), settled(false, None));

    let task = tokio::spawn({
        let ctrl = Arc::clone(&ctrl);
        async move { ctrl.toggle().await }
    });
    service.started.notified().await;

    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().pending);

    service.release.notify_one();
    task.await.unwrap();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), settled(true, Some(5)));
}
