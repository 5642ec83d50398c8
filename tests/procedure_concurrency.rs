// tests/procedure_concurrency.rs

mod common;
use crate::common::{HandleBoard, RecordingListener, init_tracing, with_timeout};

use std::error::Error;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use permflow::config::ExecutorConfig;
use permflow::exec::{Executor, ExecutorExt, Executors, InlineExecutor};
use permflow::procedure::{
    ChannelListener, Procedure, ProcedureEvent, ProcedureListener, RunOutcome, TaskView,
};
use permflow::task::{Task, TaskHandle};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn concurrent_completion_fires_block_once() -> TestResult {
    init_tracing();

    const WIDTH: usize = 16;

    let board = HandleBoard::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    let roots: Vec<String> = (0..WIDTH).map(|i| format!("root_{i}")).collect();
    for name in &roots {
        procedure.add_task(board.park(name))?;
    }
    procedure.add_task_by_pre_task_name(&roots, board.park("sink"))?;
    let run = procedure.start(recorder.clone())?;

    let barrier = Arc::new(Barrier::new(WIDTH));
    let threads: Vec<_> = roots
        .iter()
        .map(|name| {
            let handle = board.get(name);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                handle.complete();
                // A second call from the same thread races with the others.
                handle.complete();
            })
        })
        .collect();
    for t in threads {
        t.join().expect("completion thread panicked");
    }

    assert_eq!(recorder.completed_blocks().len(), 1);
    assert!(board.is_dispatched("sink"));

    board.get("sink").complete();
    assert!(with_timeout(run.wait()).await?.is_completed());
    assert_eq!(recorder.completed_blocks().len(), 2);
    assert_eq!(recorder.terminal_count(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_fail_and_cancel_yield_one_terminal_callback() -> TestResult {
    init_tracing();

    let board = HandleBoard::new();
    let recorder = RecordingListener::new();

    let mut procedure = Procedure::new();
    for name in ["a", "b", "c", "d"] {
        procedure.add_task(board.park(name))?;
    }
    procedure.add_task_by_pre_task_name(["a", "b", "c", "d"], board.park("never"))?;
    let run = procedure.start(recorder.clone())?;

    let barrier = Arc::new(Barrier::new(4));
    let mut threads = Vec::new();
    for (i, name) in ["a", "b", "c", "d"].into_iter().enumerate() {
        let handle = board.get(name);
        let barrier = Arc::clone(&barrier);
        threads.push(thread::spawn(move || {
            barrier.wait();
            match i {
                0 => handle.fail("a broke"),
                1 => handle.cancel(9, "b gave up"),
                _ => handle.complete(),
            }
        }));
    }
    for t in threads {
        t.join().expect("signal thread panicked");
    }

    let outcome = with_timeout(run.wait()).await?;
    assert!(!outcome.is_completed());
    assert_eq!(recorder.terminal_count(), 1);
    assert!(!board.is_dispatched("never"));

    // Whichever abort won, the terminal callback matches it.
    match (outcome, recorder.terminal_events().as_slice()) {
        (RunOutcome::Failed { task, .. }, [ProcedureEvent::Failed(view)]) => {
            assert_eq!(task, "a");
            assert_eq!(view.name, "a");
            assert_eq!(recorder.failed_blocks(), vec!["a"]);
        }
        (RunOutcome::Cancelled { code, .. }, [ProcedureEvent::Cancelled { code: seen, .. }]) => {
            assert_eq!(code, 9);
            assert_eq!(*seen, 9);
            assert!(recorder.failed_blocks().is_empty());
        }
        (outcome, events) => panic!("mismatched outcome {outcome:?} / {events:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn tasks_hop_onto_worker_pool() -> TestResult {
    init_tracing();

    let executors = Arc::new(Executors::new(
        ExecutorConfig::default(),
        Arc::new(InlineExecutor),
    ));
    let (listener, mut events) = ChannelListener::channel();

    let mut procedure = Procedure::new();
    for stage in ["fetch", "parse", "store"] {
        let executors = Arc::clone(&executors);
        let task = Task::new(stage, move |handle: TaskHandle| {
            let pool = executors.core()?;
            pool.spawn(move || {
                thread::sleep(Duration::from_millis(5));
                handle.complete();
            });
            Ok(())
        });
        match stage {
            "fetch" => procedure.add_task(task)?,
            "parse" => procedure.add_task_by_pre_task_name(["fetch"], task)?,
            _ => procedure.add_task_by_pre_task_name(["parse"], task)?,
        };
    }
    let run = procedure.start(listener)?;

    let outcome = with_timeout(run.wait()).await?;
    assert!(outcome.is_completed());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    let blocks: Vec<String> = seen
        .iter()
        .filter_map(|e| match e {
            ProcedureEvent::BlockCompleted(v) => Some(v.name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(blocks, vec!["fetch", "parse", "store"]);
    assert_eq!(seen.last(), Some(&ProcedureEvent::Completed));

    executors.shutdown();
    Ok(())
}

#[tokio::test]
async fn block_callbacks_follow_generation_order_under_threads() -> TestResult {
    init_tracing();

    let recorder = RecordingListener::new();
    let mut procedure = Procedure::new();

    // Three generations of four tasks each; every task completes from its
    // own thread after a short, uneven delay.
    let mut previous: Vec<String> = Vec::new();
    for generation in 0..3 {
        let mut current = Vec::new();
        for i in 0..4 {
            let name = format!("g{generation}_{i}");
            let delay = Duration::from_millis(((i * 7 + generation * 3) % 5) as u64);
            let task = Task::new(name.clone(), move |handle: TaskHandle| {
                thread::spawn(move || {
                    thread::sleep(delay);
                    handle.complete();
                });
                Ok(())
            });
            procedure.add_task_by_pre_task_name(&previous, task)?;
            current.push(name);
        }
        previous = current;
    }
    let run = procedure.start(recorder.clone())?;

    assert!(with_timeout(run.wait()).await?.is_completed());

    let generations: Vec<usize> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ProcedureEvent::BlockCompleted(v) => Some(v.generation),
            _ => None,
        })
        .collect();
    assert_eq!(generations, vec![0, 1, 2]);
    Ok(())
}

/// Completes the parked handle from another thread while a progress
/// callback is still running.
#[derive(Default)]
struct CompletesDuringProgress {
    handle: Mutex<Option<TaskHandle>>,
    events: Mutex<Vec<&'static str>>,
}

impl CompletesDuringProgress {
    fn push(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProcedureListener for CompletesDuringProgress {
    fn on_progress(&self, _task: &TaskView, _percent: u8, _description: Option<&str>) {
        self.push("progress-start");
        if let Some(handle) = self.handle.lock().unwrap().take() {
            thread::spawn(move || handle.complete())
                .join()
                .expect("completion thread panicked");
        }
        self.push("progress-end");
    }

    fn on_completed(&self) {
        self.push("completed");
    }

    fn on_failed(&self, _task: &TaskView) {
        self.push("failed");
    }

    fn on_cancel(&self, _code: i32, _reason: &str) {
        self.push("cancelled");
    }
}

#[tokio::test]
async fn terminal_callback_waits_for_in_flight_progress() -> TestResult {
    init_tracing();

    let listener = Arc::new(CompletesDuringProgress::default());

    let mut procedure = Procedure::new();
    let slot = Arc::clone(&listener);
    procedure.add_task(Task::new("upload", move |handle: TaskHandle| {
        *slot.handle.lock().unwrap() = Some(handle.clone());
        handle.progress(50, Some("halfway"));
        Ok(())
    }))?;
    let run = procedure.start(Arc::clone(&listener))?;

    assert!(with_timeout(run.wait()).await?.is_completed());
    assert_eq!(
        *listener.events.lock().unwrap(),
        vec!["progress-start", "progress-end", "completed"]
    );
    assert_eq!(run.state_of("upload"), Some(permflow::task::TaskState::Completed));
    Ok(())
}

#[test]
fn executor_trait_objects_are_shareable() {
    fn assert_send_sync<T: Send + Sync + ?Sized>() {}
    assert_send_sync::<dyn Executor>();
    assert_send_sync::<TaskHandle>();
}
