// tests/procedure_scenarios.rs

mod common;
use crate::common::{
    ExecutionLog, HandleBoard, RecordingListener, cancelling_task, completing_task, failing_task,
    init_tracing, with_timeout,
};

use std::error::Error;

use permflow::errors::PermflowError;
use permflow::procedure::{Procedure, ProcedureEvent, ProcedureListener, RunOutcome, TaskView};
use permflow::task::{Task, TaskHandle, TaskState};

type TestResult = Result<(), Box<dyn Error>>;

fn event_names(events: &[ProcedureEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| match e {
            ProcedureEvent::BlockCompleted(v) => format!("block_completed:{}", v.name),
            ProcedureEvent::BlockFailed(v) => format!("block_failed:{}", v.name),
            ProcedureEvent::Progress { task, percent, .. } => {
                format!("progress:{}:{}", task.name, percent)
            }
            ProcedureEvent::Completed => "completed".to_string(),
            ProcedureEvent::Failed(v) => format!("failed:{}", v.name),
            ProcedureEvent::Cancelled { code, reason } => format!("cancel:{code}:{reason}"),
        })
        .collect()
}

#[tokio::test]
async fn linear_success_reports_each_block_then_completes() -> TestResult {
    init_tracing();

    let board = HandleBoard::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    procedure.add_task(board.park("A"))?;
    procedure.add_task_by_pre_task_name(["A"], board.park("B"))?;
    let run = procedure.start(recorder.clone())?;

    assert!(board.is_dispatched("A"));
    assert!(!board.is_dispatched("B"), "B must wait for A");
    assert_eq!(run.state_of("B"), Some(TaskState::Pending));

    board.get("A").complete();
    assert_eq!(event_names(&recorder.events()), vec!["block_completed:A"]);
    assert!(board.is_dispatched("B"));

    board.get("B").complete();

    let outcome = with_timeout(run.wait()).await?;
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        event_names(&recorder.events()),
        vec!["block_completed:A", "block_completed:B", "completed"]
    );
    assert_eq!(recorder.terminal_count(), 1);
    Ok(())
}

#[tokio::test]
async fn failure_aborts_before_next_generation() -> TestResult {
    init_tracing();

    let log = ExecutionLog::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    procedure.add_task(failing_task("A", "x", &log))?;
    procedure.add_task_by_pre_task_name(["A"], completing_task("B", &log))?;
    let run = procedure.start(recorder.clone())?;

    let outcome = with_timeout(run.wait()).await?;
    assert_eq!(
        outcome,
        RunOutcome::Failed {
            task: "A".to_string(),
            reason: "x".to_string()
        }
    );
    assert_eq!(log.entries(), vec!["A"], "B must never be dispatched");
    assert_eq!(
        event_names(&recorder.events()),
        vec!["block_failed:A", "failed:A"]
    );

    match recorder.terminal_events().as_slice() {
        [ProcedureEvent::Failed(view)] => {
            assert_eq!(view.state, TaskState::Failed);
            assert_eq!(view.reason.as_deref(), Some("x"));
            assert_eq!(view.generation, 0);
        }
        other => panic!("unexpected terminal events: {other:?}"),
    }
    assert_eq!(run.state_of("B"), Some(TaskState::Pending));
    Ok(())
}

#[tokio::test]
async fn fan_in_waits_for_every_root() -> TestResult {
    init_tracing();

    let board = HandleBoard::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    procedure.add_task(board.park("A"))?;
    procedure.add_task(board.park("B"))?;
    procedure.add_task_by_pre_task_name(["A", "B"], board.park("C"))?;
    let run = procedure.start(recorder.clone())?;

    assert_eq!(board.dispatched(), vec!["A", "B"]);

    board.get("B").complete();
    assert!(!board.is_dispatched("C"), "C must wait for A as well");
    assert!(recorder.completed_blocks().is_empty());

    board.get("A").complete();
    assert!(board.is_dispatched("C"));
    assert_eq!(recorder.completed_blocks(), vec!["A"]);

    board.get("C").complete();
    let outcome = with_timeout(run.wait()).await?;
    assert!(outcome.is_completed());
    assert_eq!(recorder.completed_blocks(), vec!["A", "C"]);
    Ok(())
}

#[tokio::test]
async fn cancellation_reports_only_on_cancel() -> TestResult {
    init_tracing();

    let log = ExecutionLog::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    procedure.add_task(cancelling_task("A", 7, "user declined", &log))?;
    procedure.add_task_by_pre_task_name(["A"], completing_task("B", &log))?;
    let run = procedure.start(recorder.clone())?;

    let outcome = with_timeout(run.wait()).await?;
    assert_eq!(
        outcome,
        RunOutcome::Cancelled {
            task: "A".to_string(),
            code: 7,
            reason: "user declined".to_string()
        }
    );
    assert_eq!(
        recorder.events(),
        vec![ProcedureEvent::Cancelled {
            code: 7,
            reason: "user declined".to_string()
        }]
    );
    assert!(!log.contains("B"));
    Ok(())
}

#[tokio::test]
async fn repeated_handle_calls_are_ignored() -> TestResult {
    init_tracing();

    let board = HandleBoard::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    procedure.add_task(board.park("A"))?;
    procedure.add_task_by_pre_task_name(["A"], board.park("B"))?;
    let run = procedure.start(recorder.clone())?;

    let a = board.get("A");
    a.complete();
    a.complete();
    a.clone().fail("too late");
    a.cancel(1, "too late");

    assert_eq!(a.state(), TaskState::Completed);
    assert_eq!(recorder.completed_blocks(), vec!["A"]);

    board.get("B").complete();
    board.get("B").complete();

    let outcome = with_timeout(run.wait()).await?;
    assert!(outcome.is_completed());
    assert_eq!(
        event_names(&recorder.events()),
        vec!["block_completed:A", "block_completed:B", "completed"]
    );
    Ok(())
}

#[tokio::test]
async fn signal_after_finish_is_ignored() -> TestResult {
    init_tracing();

    let board = HandleBoard::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    procedure.add_task(board.park("A"))?;
    procedure.add_task(board.park("B"))?;
    let run = procedure.start(recorder.clone())?;

    board.get("A").fail("boom");
    assert!(!run.is_finished(), "B is still running");

    board.get("B").complete();
    let outcome = with_timeout(run.wait()).await?;
    assert!(matches!(outcome, RunOutcome::Failed { ref task, .. } if task == "A"));

    // Late signals from any handle change nothing.
    board.get("B").fail("late");
    board.get("A").cancel(3, "late");
    assert_eq!(recorder.terminal_count(), 1);
    assert_eq!(run.outcome(), Some(outcome));
    Ok(())
}

#[test]
fn unknown_predecessor_is_rejected_at_build_time() {
    init_tracing();

    let log = ExecutionLog::new();
    let mut procedure = Procedure::new();
    procedure.add_task(completing_task("A", &log)).unwrap();

    let err = procedure
        .add_task_by_pre_task_name(["A", "ghost"], completing_task("B", &log))
        .unwrap_err();

    match err {
        PermflowError::TaskNotFound(msg) => {
            assert!(msg.contains("ghost"));
        }
        other => panic!("expected TaskNotFound, got {other:?}"),
    }
    assert!(!procedure.contains("B"));
    assert_eq!(procedure.len(), 1);
    assert!(log.entries().is_empty(), "nothing runs at build time");
}

#[test]
fn predecessor_must_be_registered_first() {
    let log = ExecutionLog::new();
    let mut procedure = Procedure::new();

    // A task cannot name itself: it is not registered yet. Cycles are
    // therefore impossible to express through the builder.
    let err = procedure
        .add_task_by_pre_task_name(["A"], completing_task("A", &log))
        .unwrap_err();

    assert!(matches!(err, PermflowError::TaskNotFound(_)));
    assert!(procedure.is_empty());
}

#[test]
fn duplicate_task_name_is_rejected() {
    let log = ExecutionLog::new();
    let mut procedure = Procedure::new();
    procedure.add_task(completing_task("A", &log)).unwrap();

    let err = procedure.add_task(completing_task("A", &log)).unwrap_err();

    assert!(matches!(err, PermflowError::DuplicateTask(ref name) if name.contains('A')));
    assert_eq!(procedure.len(), 1);
}

#[test]
fn duplicate_predecessor_names_collapse() -> TestResult {
    let log = ExecutionLog::new();
    let mut procedure = Procedure::new();
    procedure.add_task(completing_task("A", &log))?;
    procedure.add_task_by_pre_task_name(["A", "A"], completing_task("B", &log))?;

    assert_eq!(procedure.graph().dependencies_of("B"), &["A".to_string()]);
    Ok(())
}

#[tokio::test]
async fn empty_procedure_completes_immediately() -> TestResult {
    init_tracing();

    let recorder = RecordingListener::new();
    let run = Procedure::new().start(recorder.clone())?;

    assert!(run.is_finished());
    assert_eq!(with_timeout(run.wait()).await?, RunOutcome::Completed);
    assert_eq!(recorder.events(), vec![ProcedureEvent::Completed]);
    Ok(())
}

#[tokio::test]
async fn action_error_fails_the_task() -> TestResult {
    init_tracing();

    let recorder = RecordingListener::new();
    let mut procedure = Procedure::new();
    procedure.add_task(Task::new("load", |_handle: TaskHandle| {
        anyhow::bail!("disk on fire")
    }))?;
    let run = procedure.start(recorder.clone())?;

    match with_timeout(run.wait()).await? {
        RunOutcome::Failed { task, reason } => {
            assert_eq!(task, "load");
            assert!(reason.contains("disk on fire"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(recorder.failed_blocks(), vec!["load"]);
    Ok(())
}

#[tokio::test]
async fn panicking_action_fails_the_task() -> TestResult {
    init_tracing();

    let recorder = RecordingListener::new();
    let mut procedure = Procedure::new();
    procedure.add_task(Task::new("explode", |_handle: TaskHandle| -> anyhow::Result<()> {
        panic!("kaboom")
    }))?;
    let run = procedure.start(recorder.clone())?;

    match with_timeout(run.wait()).await? {
        RunOutcome::Failed { task, reason } => {
            assert_eq!(task, "explode");
            assert!(reason.contains("kaboom"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(recorder.terminal_count(), 1);
    Ok(())
}

#[tokio::test]
async fn progress_is_forwarded_while_running_only() -> TestResult {
    init_tracing();

    let board = HandleBoard::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    procedure.add_task(board.park("download"))?;
    let run = procedure.start(recorder.clone())?;

    let handle = board.get("download");
    handle.progress(10, Some("starting"));
    handle.progress(250, None);
    handle.complete();
    handle.progress(99, Some("after the fact"));

    with_timeout(run.wait()).await?;
    assert_eq!(
        recorder.progress(),
        vec![
            ("download".to_string(), 10, Some("starting".to_string())),
            ("download".to_string(), 100, None),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn tasks_of_a_generation_are_all_dispatched_before_the_barrier() -> TestResult {
    init_tracing();

    let log = ExecutionLog::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    for name in ["r1", "r2", "r3"] {
        procedure.add_task(completing_task(name, &log))?;
    }
    procedure.add_task_by_pre_task_name(["r1", "r2", "r3"], completing_task("join", &log))?;
    procedure.add_task_by_pre_task_name(["join"], completing_task("tail", &log))?;
    let run = procedure.start(recorder.clone())?;

    assert!(with_timeout(run.wait()).await?.is_completed());
    assert_eq!(log.entries(), vec!["r1", "r2", "r3", "join", "tail"]);
    // One block callback per generation, closed by its last task.
    assert_eq!(recorder.completed_blocks(), vec!["r3", "join", "tail"]);
    Ok(())
}

/// Forwards to a recorder but panics on every block callback.
struct PanickingBlockListener {
    inner: RecordingListener,
}

impl ProcedureListener for PanickingBlockListener {
    fn on_block_completed(&self, _task: &TaskView) {
        panic!("listener bug");
    }

    fn on_completed(&self) {
        self.inner.on_completed();
    }

    fn on_failed(&self, task: &TaskView) {
        self.inner.on_failed(task);
    }

    fn on_cancel(&self, code: i32, reason: &str) {
        self.inner.on_cancel(code, reason);
    }
}

#[tokio::test]
async fn panicking_listener_does_not_stall_the_run() -> TestResult {
    init_tracing();

    let log = ExecutionLog::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    procedure.add_task(completing_task("a", &log))?;
    procedure.add_task_by_pre_task_name(["a"], completing_task("b", &log))?;
    let run = procedure.start(PanickingBlockListener {
        inner: recorder.clone(),
    })?;

    assert_eq!(with_timeout(run.wait()).await?, RunOutcome::Completed);
    assert_eq!(log.entries(), vec!["a", "b"]);
    assert_eq!(run.state_of("a"), Some(TaskState::Completed));
    assert_eq!(run.state_of("b"), Some(TaskState::Completed));
    assert_eq!(recorder.terminal_events(), vec![ProcedureEvent::Completed]);
    Ok(())
}
