//! Lifecycle manager behavior with faked collaborators: adoption, startup
//! convergence, retryability, and disconnect-without-kill semantics.

mod common;

use common::{fake_install, FakeChecker, FakeLauncher, FakeProber};
use futures::future::join_all;
use ib_gateway::{Error, GatewayManager, GatewayMode};
use std::sync::Arc;
use std::time::Duration;

fn local_manager(
    install: ib_gateway::GatewayInstall,
    prober: Arc<FakeProber>,
    checker: Arc<FakeChecker>,
    launcher: Arc<FakeLauncher>,
) -> GatewayManager {
    GatewayManager::with_components(
        GatewayMode::Local,
        "localhost".to_string(),
        install,
        prober,
        checker,
        launcher,
    )
}

#[tokio::test]
async fn concurrent_ensure_ready_launches_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::succeeding();
    let manager = local_manager(
        fake_install(&dir),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    let results = join_all((0..10).map(|_| {
        let m = manager.clone();
        async move { m.ensure_ready().await }
    }))
    .await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(launcher.launch_count(), 1);
    assert!(manager.is_ready());
}

#[tokio::test]
async fn quick_start_adopts_existing_gateway_without_launching() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::succeeding();
    let prober = Arc::new(FakeProber::new(&[(
        5002,
        "java 4242 root clientportal.gw (LISTEN)",
    )]));
    let manager = local_manager(
        fake_install(&dir),
        prober,
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    manager.quick_start().await.unwrap();

    assert!(manager.is_ready());
    assert_eq!(manager.current_port(), 5002);
    assert_eq!(manager.gateway_url(), "https://localhost:5002");
    assert_eq!(launcher.launch_count(), 0);
}

#[tokio::test]
async fn quick_start_returns_before_background_startup_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::slow(Duration::from_millis(100));
    let manager = local_manager(
        fake_install(&dir),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    manager.quick_start().await.unwrap();
    // Not ready yet: the launch is still sleeping on the background task.
    assert!(!manager.is_ready());

    // Readiness arrives asynchronously.
    tokio::time::timeout(Duration::from_secs(2), async {
        while !manager.is_ready() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("gateway never became ready");
    assert_eq!(launcher.launch_count(), 1);
}

#[tokio::test]
async fn ensure_ready_awaits_in_flight_background_startup() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::slow(Duration::from_millis(100));
    let manager = local_manager(
        fake_install(&dir),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    manager.quick_start().await.unwrap();
    manager.ensure_ready().await.unwrap();

    assert!(manager.is_ready());
    assert_eq!(launcher.launch_count(), 1, "converged on in-flight startup");
}

#[tokio::test]
async fn failed_background_startup_is_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::failing_first(1);
    let manager = local_manager(
        fake_install(&dir),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    manager.quick_start().await.unwrap();
    // ensure_ready either awaits the failing in-flight attempt and falls
    // through to a fresh one, or arrives after the handle was cleared.
    manager.ensure_ready().await.unwrap();

    assert!(manager.is_ready());
    assert_eq!(launcher.launch_count(), 2);
}

#[tokio::test]
async fn startup_timeout_resets_to_retryable_state() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::failing_first(u32::MAX);
    let manager = local_manager(
        fake_install(&dir),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    let err = manager.ensure_ready().await.unwrap_err();
    assert!(matches!(err, Error::GatewayStartupTimeout(_)));
    assert!(!err.is_fatal());
    assert!(!manager.is_ready());

    // The manager is not wedged: a later call tries again.
    let err = manager.ensure_ready().await.unwrap_err();
    assert!(matches!(err, Error::GatewayStartupTimeout(_)));
    assert!(launcher.launch_count() >= 2);
}

#[tokio::test]
async fn missing_installation_is_fatal_and_never_launches() {
    let launcher = FakeLauncher::succeeding();
    let manager = local_manager(
        ib_gateway::GatewayInstall::new("/nonexistent/clientportal.gw"),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    let err = manager.ensure_ready().await.unwrap_err();
    assert!(matches!(err, Error::GatewayNotInstalled(_)));
    assert!(err.is_fatal());
    assert_eq!(launcher.launch_count(), 0);
}

#[tokio::test]
async fn stop_clears_references_but_issues_no_kill() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::succeeding();
    let manager = local_manager(
        fake_install(&dir),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    manager.ensure_ready().await.unwrap();
    assert!(manager.is_ready());
    assert!(manager.status().pid.is_some());

    manager.stop().await.unwrap();

    assert!(!manager.is_ready());
    assert!(manager.status().pid.is_none());
    // The launcher trait has no kill operation at all; the recorded exit
    // hook was never fired, i.e. the process was left untouched.
    assert_eq!(launcher.hooks.lock().len(), 1);
}

#[tokio::test]
async fn process_exit_downgrades_readiness_asynchronously() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::succeeding();
    let manager = local_manager(
        fake_install(&dir),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    manager.ensure_ready().await.unwrap();
    assert!(manager.is_ready());

    // The gateway dies behind the manager's back.
    launcher.simulate_exit();
    assert!(!manager.is_ready());
    assert!(manager.status().pid.is_none());

    // A later ensure_ready starts over.
    manager.ensure_ready().await.unwrap();
    assert!(manager.is_ready());
    assert_eq!(launcher.launch_count(), 2);
}

#[tokio::test]
async fn stale_exit_hook_from_a_replaced_launch_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::succeeding();
    let prober = Arc::new(FakeProber::empty());
    let manager = local_manager(
        fake_install(&dir),
        prober.clone(),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    // First launch, then forget it; its exit hook is still outstanding.
    manager.ensure_ready().await.unwrap();
    manager.stop().await.unwrap();

    // A replacement gateway is adopted.
    prober.occupy(5000, "java 4242 ibkr clientportal.gw (LISTEN)");
    manager.ensure_ready().await.unwrap();
    assert!(manager.is_ready());

    // The original process dies late. Its hook must not downgrade the
    // adopted gateway's state.
    launcher.simulate_exit();
    assert!(manager.is_ready());
    assert_eq!(manager.current_port(), 5000);
}

#[tokio::test]
async fn failed_startup_clears_only_its_own_handle() {
    let dir = tempfile::tempdir().unwrap();
    // Every launch fails, slowly: attempt one is in flight while the manager
    // is stopped and restarted with a second background attempt.
    let launcher = FakeLauncher::failing_slowly(Duration::from_millis(200));
    let manager = local_manager(
        fake_install(&dir),
        Arc::new(FakeProber::empty()),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    manager.quick_start().await.unwrap();
    manager.stop().await.unwrap();
    manager.start_async().await;

    // The first attempt's failure lands while the second is still queued;
    // it must not evict the second attempt's handle, so this start_async is
    // a no-op rather than a third launch.
    tokio::time::sleep(Duration::from_millis(300)).await;
    manager.start_async().await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(launcher.launch_count(), 2);
    assert!(!manager.is_ready());
}

#[tokio::test]
async fn stopped_manager_readopts_a_still_running_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::succeeding();
    let prober = Arc::new(FakeProber::empty());
    let manager = local_manager(
        fake_install(&dir),
        prober.clone(),
        Arc::new(FakeChecker::alive()),
        launcher.clone(),
    );

    manager.ensure_ready().await.unwrap();
    manager.stop().await.unwrap();

    // The gateway this manager launched is still listening; discovery finds
    // and adopts it instead of launching again.
    prober.occupy(5000, "java 4242 ibkr clientportal.gw (LISTEN)");
    manager.ensure_ready().await.unwrap();

    assert!(manager.is_ready());
    assert_eq!(manager.current_port(), 5000);
    assert_eq!(launcher.launch_count(), 1);
}
