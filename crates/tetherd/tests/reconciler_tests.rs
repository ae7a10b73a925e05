//! Reconciler behavior: idempotence, capability independence, racing
//! triggers, and the presentation dismiss races.

mod common;

use common::{build_ctx, MockAdmin, MockBackend, MockSurface};
use tempfile::TempDir;
use tether_common::DeviceLockState;
use tetherd::presentation::{NavKey, PresentationState};
use tetherd::reconciler::TriggerOrigin;

#[tokio::test]
async fn test_repeated_lock_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let ctx = build_ctx(&temp, MockAdmin::new(true), MockSurface::new(), MockBackend::new());

    ctx.reconciler
        .request_lock("m1", TriggerOrigin::Admin)
        .await
        .unwrap();
    ctx.reconciler
        .request_lock("m2", TriggerOrigin::Admin)
        .await
        .unwrap();
    ctx.reconciler
        .request_lock("m1", TriggerOrigin::Admin)
        .await
        .unwrap();

    // Repetition never compounds: same observable state as one lock("m1").
    let state = ctx.store.lock_state().await;
    assert!(state.is_locked());
    assert_eq!(state.message(), Some("m1"));
    assert_eq!(ctx.presentation.state(), PresentationState::ShownEnforced);
}

#[tokio::test]
async fn test_repeated_unlock_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let ctx = build_ctx(&temp, MockAdmin::new(true), MockSurface::new(), MockBackend::new());

    ctx.reconciler
        .request_unlock(TriggerOrigin::Admin)
        .await
        .unwrap();
    ctx.reconciler
        .request_unlock(TriggerOrigin::Admin)
        .await
        .unwrap();

    assert_eq!(ctx.store.lock_state().await, DeviceLockState::Unlocked);
    assert_eq!(ctx.presentation.state(), PresentationState::NotShown);
}

#[tokio::test]
async fn test_lock_without_capability_still_persists() {
    let temp = TempDir::new().unwrap();
    let admin = MockAdmin::new(false);
    let ctx = build_ctx(
        &temp,
        admin.clone(),
        MockSurface::new(),
        MockBackend::new(),
    );

    let outcome = ctx
        .reconciler
        .request_lock("overdue", TriggerOrigin::Push)
        .await
        .unwrap();

    // The logical lock state is authoritative even though kiosk
    // enforcement could not be applied.
    assert!(!outcome.enforced);
    let state = ctx.store.lock_state().await;
    assert!(state.is_locked());
    assert_eq!(state.message(), Some("overdue"));
    assert_eq!(admin.invocations("start_lock_task"), 0);
}

#[tokio::test]
async fn test_empty_message_gets_default() {
    let temp = TempDir::new().unwrap();
    let ctx = build_ctx(&temp, MockAdmin::new(true), MockSurface::new(), MockBackend::new());

    ctx.reconciler
        .request_lock("", TriggerOrigin::Push)
        .await
        .unwrap();

    assert_eq!(
        ctx.store.lock_state().await.message(),
        Some(tether_common::DEFAULT_LOCK_MESSAGE)
    );
}

#[tokio::test]
async fn test_concurrent_lock_unlock_converges() {
    for i in 0..16 {
        let temp = TempDir::new().unwrap();
        let ctx = build_ctx(&temp, MockAdmin::new(true), MockSurface::new(), MockBackend::new());

        let lock_ctx = ctx.clone();
        let unlock_ctx = ctx.clone();
        let lock = tokio::spawn(async move {
            lock_ctx
                .reconciler
                .request_lock("A", TriggerOrigin::Push)
                .await
                .unwrap();
        });
        let unlock = tokio::spawn(async move {
            unlock_ctx
                .reconciler
                .request_unlock(TriggerOrigin::Push)
                .await
                .unwrap();
        });
        let (a, b) = tokio::join!(lock, unlock);
        a.unwrap();
        b.unwrap();

        // Exactly one of the two final states; never a mix.
        let state = ctx.store.lock_state().await;
        match state {
            DeviceLockState::Unlocked => {}
            DeviceLockState::Locked { ref message, .. } => {
                assert_eq!(message, "A", "iteration {}", i)
            }
        }
    }
}

#[tokio::test]
async fn test_set_message_only_while_locked() {
    let temp = TempDir::new().unwrap();
    let ctx = build_ctx(&temp, MockAdmin::new(true), MockSurface::new(), MockBackend::new());

    assert!(!ctx
        .reconciler
        .set_message("new text", TriggerOrigin::Push)
        .await
        .unwrap());
    assert_eq!(ctx.store.lock_state().await, DeviceLockState::Unlocked);

    ctx.reconciler
        .request_lock("first", TriggerOrigin::Push)
        .await
        .unwrap();
    assert!(ctx
        .reconciler
        .set_message("second", TriggerOrigin::Push)
        .await
        .unwrap());
    assert_eq!(ctx.store.lock_state().await.message(), Some("second"));
}

#[tokio::test]
async fn test_stale_dismiss_does_not_take_surface_down() {
    let temp = TempDir::new().unwrap();
    let surface = MockSurface::new();
    let ctx = build_ctx(&temp, MockAdmin::new(true), surface.clone(), MockBackend::new());

    ctx.reconciler
        .request_lock("overdue", TriggerOrigin::Push)
        .await
        .unwrap();

    // A dismiss signal arriving with stale state: the store still says
    // locked, so the surface must stay up.
    ctx.presentation.notify_dismiss().await;
    assert_eq!(ctx.presentation.state(), PresentationState::ShownEnforced);
    assert!(surface.shown().is_some());
}

#[tokio::test]
async fn test_unlock_then_redundant_dismiss_is_noop() {
    let temp = TempDir::new().unwrap();
    let surface = MockSurface::new();
    let ctx = build_ctx(&temp, MockAdmin::new(true), surface.clone(), MockBackend::new());

    ctx.reconciler
        .request_lock("overdue", TriggerOrigin::Push)
        .await
        .unwrap();
    ctx.reconciler
        .request_unlock(TriggerOrigin::Push)
        .await
        .unwrap();
    assert_eq!(ctx.presentation.state(), PresentationState::NotShown);

    let dismissed_before = surface.dismiss_count.load(std::sync::atomic::Ordering::SeqCst);
    ctx.presentation.notify_dismiss().await;
    assert_eq!(
        surface.dismiss_count.load(std::sync::atomic::Ordering::SeqCst),
        dismissed_before
    );
}

#[tokio::test]
async fn test_navigation_intercepted_only_while_enforced() {
    let temp = TempDir::new().unwrap();
    let ctx = build_ctx(&temp, MockAdmin::new(true), MockSurface::new(), MockBackend::new());

    assert!(!ctx.presentation.intercepts(NavKey::Back));
    ctx.reconciler
        .request_lock("overdue", TriggerOrigin::Push)
        .await
        .unwrap();
    assert!(ctx.presentation.intercepts(NavKey::Back));
    assert!(ctx.presentation.intercepts(NavKey::Home));
    assert!(ctx.presentation.intercepts(NavKey::Recents));
    assert!(ctx.presentation.intercepts(NavKey::Menu));
}

#[tokio::test]
async fn test_focus_loss_reasserts_surface_while_locked() {
    let temp = TempDir::new().unwrap();
    let surface = MockSurface::new();
    let ctx = build_ctx(&temp, MockAdmin::new(true), surface.clone(), MockBackend::new());

    ctx.reconciler
        .request_lock("overdue", TriggerOrigin::Push)
        .await
        .unwrap();
    ctx.presentation.on_focus_lost().await;
    assert_eq!(surface.front_count.load(std::sync::atomic::Ordering::SeqCst), 1);

    ctx.reconciler
        .request_unlock(TriggerOrigin::Push)
        .await
        .unwrap();
    ctx.presentation.on_focus_lost().await;
    assert_eq!(surface.front_count.load(std::sync::atomic::Ordering::SeqCst), 1);
}
