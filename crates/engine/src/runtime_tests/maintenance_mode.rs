// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hk_core::keys;
use hk_core::test_support::pull_request_event;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn flag_is_persisted_for_other_instances() {
    let ctx = setup();
    let other = setup_with_store(ctx.store.clone(), ctx.clock.clone(), test_config());

    ctx.runtime.set_maintenance(true).await.unwrap();

    assert!(ctx.runtime.is_maintenance());
    assert!(!other.runtime.is_maintenance());
    assert!(other.runtime.load_maintenance().await.unwrap());
    assert!(other.runtime.is_maintenance());
}

#[tokio::test]
async fn listener_follows_toggles_from_other_instances() {
    let ctx = setup();
    let other = setup_with_store(ctx.store.clone(), ctx.clock.clone(), test_config());
    let cancel = CancellationToken::new();

    let (result, ()) = tokio::join!(ctx.runtime.run_maintenance_listener(cancel.clone()), async {
        other.runtime.set_maintenance(true).await.unwrap();
        while !ctx.runtime.is_maintenance() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        other.runtime.set_maintenance(false).await.unwrap();
        while ctx.runtime.is_maintenance() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
    });

    result.unwrap();
    assert!(!ctx.runtime.is_maintenance());
}

#[tokio::test]
async fn unknown_messages_are_ignored() {
    let ctx = setup();
    let cancel = CancellationToken::new();

    let (result, ()) = tokio::join!(ctx.runtime.run_maintenance_listener(cancel.clone()), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        ctx.store
            .publish(keys::MAINTENANCE_CHANNEL, "maybe")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    result.unwrap();
    assert!(!ctx.runtime.is_maintenance());
}

#[tokio::test]
async fn dispatch_pauses_during_maintenance() {
    let ctx = setup();
    ctx.runtime.set_maintenance(true).await.unwrap();
    let event = pull_request_event("e-1", "main", "abc");
    ctx.submit(&event).await;
    let cancel = CancellationToken::new();

    let (result, ()) = tokio::join!(ctx.runtime.run_dispatch_loop(cancel.clone()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    result.unwrap();
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 1);
    assert_eq!(ctx.reload(&event).await.status, hk_core::EventStatus::Scheduled);
}
