// tests/run_core.rs

use permflow::dag::DagGraph;
use permflow::procedure::{CoreCommand, RunCore, RunOutcome, Signal};
use permflow::task::TaskState;

fn core(edges: &[(&str, &[&str])]) -> RunCore {
    let mut g = DagGraph::new();
    for (name, deps) in edges {
        g.insert(*name, deps.iter().map(|d| d.to_string()).collect());
    }
    RunCore::new(1, g.generations().expect("valid graph"))
}

fn dispatched(commands: &[CoreCommand]) -> Vec<Vec<String>> {
    commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::Dispatch { tasks, .. } => Some(tasks.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn begin_dispatches_generation_zero() {
    let mut core = core(&[("A", &[]), ("B", &[]), ("C", &["A", "B"])]);

    let step = core.begin();

    assert_eq!(
        step.commands,
        vec![CoreCommand::Dispatch {
            generation: 0,
            tasks: vec!["A".to_string(), "B".to_string()],
        }]
    );
    assert_eq!(core.state_of("A"), Some(TaskState::Running));
    assert_eq!(core.state_of("C"), Some(TaskState::Pending));
    assert_eq!(core.outstanding(), 2);
    assert_eq!(core.current_generation(), Some(0));
    assert_eq!(core.generation_count(), 2);
}

#[test]
fn begin_twice_is_a_no_op() {
    let mut core = core(&[("A", &[])]);

    assert!(!core.begin().is_empty());
    assert!(core.begin().is_empty());
}

#[test]
fn barrier_closes_on_last_completion() {
    let mut core = core(&[("A", &[]), ("B", &[]), ("C", &["A", "B"])]);
    core.begin();

    let first = core.step("B", Signal::Complete);
    assert!(first.is_empty(), "A is still outstanding");

    let second = core.step("A", Signal::Complete);
    assert!(matches!(
        second.commands.first(),
        Some(CoreCommand::BlockCompleted(view)) if view.name == "A" && view.generation == 0
    ));
    assert_eq!(dispatched(&second.commands), vec![vec!["C".to_string()]]);

    let last = core.step("C", Signal::Complete);
    assert_eq!(last.commands.len(), 2);
    assert!(matches!(
        &last.commands[1],
        CoreCommand::Finish { outcome: RunOutcome::Completed, task: None }
    ));
    assert!(core.is_finished());
    assert_eq!(core.outcome(), Some(&RunOutcome::Completed));
}

#[test]
fn failure_waits_for_siblings_then_finishes() {
    let mut core = core(&[("A", &[]), ("B", &[]), ("C", &["A", "B"])]);
    core.begin();

    let step = core.step("A", Signal::Fail("bad input".to_string()));
    assert!(step.is_empty());
    assert!(core.is_aborted());
    assert!(!core.is_finished());

    // The sibling's result is discarded, but it still closes the barrier.
    let step = core.step("B", Signal::Complete);
    assert!(dispatched(&step.commands).is_empty());
    match step.commands.as_slice() {
        [
            CoreCommand::BlockFailed(view),
            CoreCommand::Finish {
                outcome: RunOutcome::Failed { task, reason },
                task: Some(failed),
            },
        ] => {
            assert_eq!(view.name, "A");
            assert_eq!(task, "A");
            assert_eq!(reason, "bad input");
            assert_eq!(failed.state, TaskState::Failed);
        }
        other => panic!("unexpected commands: {other:?}"),
    }
    assert_eq!(core.state_of("C"), Some(TaskState::Pending));
}

#[test]
fn first_abort_wins() {
    let mut core = core(&[("A", &[]), ("B", &[])]);
    core.begin();

    core.step("A", Signal::Cancel {
        code: 4,
        reason: "closed".to_string(),
    });
    let step = core.step("B", Signal::Fail("also broken".to_string()));

    assert_eq!(
        step.commands,
        vec![CoreCommand::Finish {
            outcome: RunOutcome::Cancelled {
                task: "A".to_string(),
                code: 4,
                reason: "closed".to_string(),
            },
            task: core.view_of("A"),
        }]
    );
    assert_eq!(core.state_of("B"), Some(TaskState::Failed));
}

#[test]
fn signals_for_non_running_tasks_are_ignored() {
    let mut core = core(&[("A", &[]), ("B", &["A"])]);
    core.begin();

    assert!(core.step("B", Signal::Complete).is_empty(), "B is pending");
    assert!(core.step("nope", Signal::Complete).is_empty(), "unknown task");
    assert_eq!(core.state_of("B"), Some(TaskState::Pending));

    core.step("A", Signal::Complete);
    assert!(core.step("A", Signal::Fail("again".to_string())).is_empty());
    assert_eq!(core.state_of("A"), Some(TaskState::Completed));
}

#[test]
fn progress_targets_running_tasks_only() {
    let mut core = core(&[("A", &[]), ("B", &["A"])]);
    core.begin();

    assert!(core.progress_target("A").is_some());
    assert!(core.progress_target("B").is_none());

    core.step("A", Signal::Complete);
    assert!(core.progress_target("A").is_none());
    assert!(core.progress_target("B").is_some());
}

#[test]
fn empty_core_finishes_on_begin() {
    let mut core = RunCore::new(9, DagGraph::new().generations().expect("empty graph"));

    let step = core.begin();

    assert_eq!(
        step.commands,
        vec![CoreCommand::Finish {
            outcome: RunOutcome::Completed,
            task: None
        }]
    );
    assert_eq!(core.run_id(), 9);
}
