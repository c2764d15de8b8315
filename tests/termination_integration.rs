//! Termination integration tests.
//!
//! Every way a session can end must release the remote resource exactly
//! once, including when several triggers fire at nearly the same time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{driver, script, MockRemote};
use remote_shell::termination::SignalKind;
use remote_shell::{
    DriverOutcome, ExecutionPlan, InputEvent, LineReader, LocalProvider, ProviderOptions, RemoteError, RemoteEvent,
    RemoteHandle, ShellError, TerminationCause, TerminationCoordinator, TerminationState,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

type Session = JoinHandle<remote_shell::Result<DriverOutcome>>;

/// A session that sits at the prompt until shutdown.
fn idle_session(coordinator: &TerminationCoordinator) -> Session {
    let token = coordinator.token();
    tokio::spawn(async move {
        token.triggered().await;
        Ok(DriverOutcome::Cancelled)
    })
}

fn channels() -> (
    (mpsc::Sender<SignalKind>, mpsc::Receiver<SignalKind>),
    (mpsc::Sender<RemoteEvent>, mpsc::Receiver<RemoteEvent>),
) {
    (mpsc::channel(4), mpsc::channel(4))
}

#[tokio::test]
async fn test_normal_end_releases_once() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());
    let ((_signal_tx, signals), (_event_tx, events)) = channels();

    let (mut driver, out, _err) = driver(&remote, &coordinator);
    let plan = ExecutionPlan {
        execute: Some("echo bye; exit".to_string()),
        ..Default::default()
    };
    let session = tokio::spawn(async move { driver.run(plan, None).await });

    let report = coordinator.run(session, signals, events).await;

    assert_eq!(report.cause, TerminationCause::SessionEnded);
    assert!(report.released);
    assert_eq!(report.exit_code, 0);
    assert_eq!(out.contents(), "bye\n");
    assert_eq!(remote.releases(), 1);
    assert_eq!(coordinator.state().unwrap(), TerminationState::Terminated);

    // Later attempts are no-ops.
    assert!(!coordinator.trigger(TerminationCause::SessionEnded).unwrap());
    assert!(!assert_ok!(coordinator.release().await));
    assert_eq!(remote.releases(), 1);
}

#[tokio::test]
async fn test_signal_lets_in_flight_statement_finish() {
    let dir = tempfile::tempdir().unwrap();
    let file = script(dir.path(), "job.txt", "run first\nrun second\n");

    let remote = MockRemote::slow_run(Duration::from_millis(200));
    let coordinator = TerminationCoordinator::new(remote.clone());
    let ((signal_tx, signals), (_event_tx, events)) = channels();

    let (mut driver, _out, _err) = driver(&remote, &coordinator);
    let plan = ExecutionPlan {
        files: vec![file],
        ..Default::default()
    };
    let session = tokio::spawn(async move { driver.run(plan, None).await });

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        signal_tx.send(SignalKind::Interrupt).await.unwrap();
    });

    let report = coordinator.run(session, signals, events).await;

    assert_eq!(report.cause, TerminationCause::Signal(SignalKind::Interrupt));
    assert_eq!(report.exit_code, 0);
    assert!(report.released);
    assert_eq!(remote.commands(), vec!["first".to_string()]);
    assert_eq!(remote.releases(), 1);
}

#[tokio::test]
async fn test_second_signal_abandons_session() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());
    let ((signal_tx, signals), (_event_tx, events)) = channels();

    // Never finishes on its own.
    let session: Session = tokio::spawn(std::future::pending());

    signal_tx.send(SignalKind::Terminate).await.unwrap();
    signal_tx.send(SignalKind::Terminate).await.unwrap();

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        coordinator.run(session, signals, events),
    )
    .await
    .unwrap();

    assert_eq!(report.cause, TerminationCause::Signal(SignalKind::Terminate));
    assert!(report.released);
    assert_eq!(remote.releases(), 1);
}

#[tokio::test]
async fn test_remote_destroyed_ends_session() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());
    let ((_signal_tx, signals), (event_tx, events)) = channels();

    let session = idle_session(&coordinator);
    event_tx
        .send(RemoteEvent::Destroyed {
            reason: "provider shut down".into(),
        })
        .await
        .unwrap();

    let report = coordinator.run(session, signals, events).await;

    assert!(matches!(
        report.cause,
        TerminationCause::Remote(RemoteEvent::Destroyed { .. })
    ));
    assert_eq!(report.exit_code, 1);
    assert_eq!(remote.releases(), 1);
}

#[tokio::test]
async fn test_fatal_error_ends_session() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());
    let ((_signal_tx, signals), (_event_tx, events)) = channels();

    let (mut driver, _out, _err) = driver(&remote, &coordinator);
    let plan = ExecutionPlan {
        files: vec!["/nonexistent/batch.txt".into()],
        execute: Some("run never".to_string()),
        interactive: false,
    };
    let session = tokio::spawn(async move { driver.run(plan, None).await });

    let report = coordinator.run(session, signals, events).await;

    assert!(matches!(report.cause, TerminationCause::Fatal(_)));
    assert!(report.cause.to_string().contains("batch.txt"));
    assert_eq!(report.exit_code, 1);
    assert_eq!(remote.runs(), 0);
    assert_eq!(remote.releases(), 1);
}

#[tokio::test]
async fn test_panicking_session_still_releases() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());
    let ((_signal_tx, signals), (_event_tx, events)) = channels();

    let session: Session = tokio::spawn(async { panic!("dispatcher bug") });

    let report = coordinator.run(session, signals, events).await;

    assert!(matches!(report.cause, TerminationCause::Fatal(_)));
    assert_eq!(report.exit_code, 1);
    assert_eq!(remote.releases(), 1);
}

#[tokio::test]
async fn test_release_requires_trigger() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());

    let err = assert_err!(coordinator.release().await);
    assert!(matches!(err, ShellError::InvalidStateTransition { .. }));
    assert_eq!(coordinator.state().unwrap(), TerminationState::Active);
    assert_eq!(remote.releases(), 0);
}

#[tokio::test]
async fn test_first_trigger_wins() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());
    let token = coordinator.token();

    assert!(coordinator
        .trigger(TerminationCause::Signal(SignalKind::Interrupt))
        .unwrap());
    assert!(!coordinator
        .trigger(TerminationCause::Fatal("late".into()))
        .unwrap());

    assert!(token.is_triggered());
    assert_eq!(coordinator.state().unwrap(), TerminationState::Terminating);
    assert_eq!(
        coordinator.cause().unwrap(),
        Some(TerminationCause::Signal(SignalKind::Interrupt))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_release_once() {
    let remote = MockRemote::slow_release(Duration::from_millis(20));
    let coordinator = Arc::new(TerminationCoordinator::new(remote.clone()));

    let causes = vec![
        TerminationCause::SessionEnded,
        TerminationCause::Signal(SignalKind::Interrupt),
        TerminationCause::Signal(SignalKind::Terminate),
        TerminationCause::Remote(RemoteEvent::WorkloadFailed {
            reason: "oom".into(),
        }),
        TerminationCause::Fatal("boom".into()),
        TerminationCause::SessionEnded,
        TerminationCause::Signal(SignalKind::Interrupt),
        TerminationCause::Remote(RemoteEvent::Destroyed {
            reason: "gone".into(),
        }),
    ];

    let tasks: Vec<_> = causes
        .into_iter()
        .map(|cause| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                let won = coordinator.trigger(cause).unwrap();
                let released = coordinator.release().await.unwrap();
                (won, released)
            })
        })
        .collect();

    let mut wins = 0;
    let mut releases = 0;
    for task in tasks {
        let (won, released) = task.await.unwrap();
        wins += usize::from(won);
        releases += usize::from(released);
    }

    assert_eq!(wins, 1);
    assert_eq!(releases, 1);
    assert_eq!(remote.releases(), 1);
    assert_eq!(coordinator.state().unwrap(), TerminationState::Terminated);
}

#[tokio::test]
async fn test_local_provider_timeout_releases_activity() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, events) = LocalProvider::start(ProviderOptions {
        workdir: Some(dir.path().to_path_buf()),
        activity_timeout: Duration::from_millis(50),
        command_timeout: None,
    })
    .await
    .unwrap();
    let coordinator = TerminationCoordinator::new(provider.clone());
    let (_signal_tx, signals) = mpsc::channel(4);

    let session = idle_session(&coordinator);
    let report = coordinator.run(session, signals, events).await;

    assert_eq!(
        report.cause,
        TerminationCause::Remote(RemoteEvent::Destroyed {
            reason: "activity timeout".into()
        })
    );
    assert!(report.released);
    assert!(provider.is_released());
    assert!(matches!(
        provider.run_command("true").await,
        Err(RemoteError::Released)
    ));
}

#[tokio::test]
async fn test_remote_event_abandons_pending_prompt() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());
    let ((_signal_tx, signals), (event_tx, events)) = channels();

    // One line, then the operator stops typing and the prompt stays open.
    let input = LineReader::from_events([InputEvent::Line("echo ready".into())]).unwrap();
    let (mut driver, out, _err) = driver(&remote, &coordinator);
    let (done_tx, done_rx) = oneshot::channel();
    let session = tokio::spawn(async move {
        let outcome = driver.run(ExecutionPlan::default(), Some(input)).await;
        let _ = done_tx.send((outcome_of(&outcome), driver.context().is_exited()));
        outcome
    });

    let watched = out.clone();
    tokio::spawn(async move {
        while watched.contents() != "ready\n" {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        event_tx
            .send(RemoteEvent::Destroyed {
                reason: "lease expired".into(),
            })
            .await
            .unwrap();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        coordinator.run(session, signals, events),
    )
    .await
    .expect("shutdown should not wait for the prompt");

    assert_eq!(
        report.cause,
        TerminationCause::Remote(RemoteEvent::Destroyed {
            reason: "lease expired".into()
        })
    );
    assert_eq!(report.exit_code, 1);
    assert!(report.released);
    assert_eq!(remote.releases(), 1);

    let (outcome, exited) = done_rx.await.unwrap();
    assert_eq!(outcome, Some(DriverOutcome::Cancelled));
    assert!(exited);
    assert_eq!(out.contents(), "ready\n");
}

#[tokio::test]
async fn test_ctrl_c_at_prompt_counts_as_interrupt() {
    let remote = MockRemote::new();
    let coordinator = TerminationCoordinator::new(remote.clone());
    let ((_signal_tx, signals), (_event_tx, events)) = channels();

    let input = LineReader::from_events([
        InputEvent::Line("echo hi".into()),
        InputEvent::Interrupted,
        InputEvent::Line("echo never".into()),
    ])
    .unwrap();
    let (mut driver, out, _err) = driver(&remote, &coordinator);
    let session = tokio::spawn(async move { driver.run(ExecutionPlan::default(), Some(input)).await });

    let report = coordinator.run(session, signals, events).await;

    assert_eq!(report.cause, TerminationCause::Signal(SignalKind::Interrupt));
    assert_eq!(report.exit_code, 0);
    assert!(report.released);
    assert_eq!(out.contents(), "hi\n");
    assert_eq!(remote.releases(), 1);
}

#[tokio::test]
async fn test_local_provider_workload_failure_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, events) = LocalProvider::start(ProviderOptions {
        workdir: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .await
    .unwrap();
    let coordinator = TerminationCoordinator::new(provider.clone());
    let (_signal_tx, signals) = mpsc::channel(4);

    let session = idle_session(&coordinator);
    assert_ok!(
        provider
            .notify(RemoteEvent::WorkloadFailed {
                reason: "worker crashed".into()
            })
            .await
    );

    let report = coordinator.run(session, signals, events).await;

    assert_eq!(
        report.cause,
        TerminationCause::Remote(RemoteEvent::WorkloadFailed {
            reason: "worker crashed".into()
        })
    );
    assert_eq!(report.exit_code, 1);
    assert!(report.released);
    assert!(provider.is_released());

    // The shell stopped listening once the session ended.
    assert_err!(
        provider
            .notify(RemoteEvent::Destroyed {
                reason: "late".into()
            })
            .await
    );
}

fn outcome_of(result: &remote_shell::Result<DriverOutcome>) -> Option<DriverOutcome> {
    result.as_ref().ok().copied()
}
