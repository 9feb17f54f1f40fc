//! Tests for components/timer.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kodegen_call_notify::CallNotifyError;
use kodegen_call_notify::components::timer::RingTimer;
use tokio::runtime::Handle;
use tokio_test::{assert_err, assert_ok};

fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let fired = Arc::new(AtomicUsize::new(0));
    let handle = fired.clone();
    (fired, move || {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_arm_without_runtime_fails() {
    let mut timer = RingTimer::new(None);
    let (_, on_fire) = counter();
    assert!(!timer.has_runtime());
    let err = assert_err!(timer.arm(1, Duration::from_secs(1), on_fire));
    assert_eq!(err, CallNotifyError::NoRuntime);
    assert_eq!(timer.pending_generation(), None);
}

#[tokio::test(start_paused = true)]
async fn test_timer_fires_after_delay() {
    let mut timer = RingTimer::new(Some(Handle::current()));
    let (fired, on_fire) = counter();
    assert_ok!(timer.arm(1, Duration::from_secs(10), on_fire));
    assert!(timer.is_armed());
    assert_eq!(timer.pending_generation(), Some(1));

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!timer.is_armed());
    assert!(timer.disarm(1));
    assert_eq!(timer.pending_generation(), None);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_and_rearm() {
    let mut timer = RingTimer::new(Some(Handle::current()));
    let (first, on_first) = counter();
    let (second, on_second) = counter();

    assert_ok!(timer.arm(1, Duration::from_secs(10), on_first));
    assert_ok!(timer.arm(2, Duration::from_secs(10), on_second));
    assert_eq!(timer.pending_generation(), Some(2));
    assert!(!timer.disarm(1));

    assert!(timer.cancel());
    assert!(!timer.cancel());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}
