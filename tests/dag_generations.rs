// tests/dag_generations.rs

use permflow::dag::DagGraph;
use permflow::errors::PermflowError;

fn names(block: &[String]) -> Vec<&str> {
    block.iter().map(String::as_str).collect()
}

fn graph(edges: &[(&str, &[&str])]) -> DagGraph {
    let mut g = DagGraph::new();
    for (name, deps) in edges {
        g.insert(*name, deps.iter().map(|d| d.to_string()).collect());
    }
    g
}

#[test]
fn diamond_is_layered_in_insertion_order() {
    let g = graph(&[
        ("A", &[]),
        ("C", &["A"]),
        ("B", &["A"]),
        ("D", &["B", "C"]),
    ]);

    let generations = g.generations().unwrap();

    assert_eq!(generations.len(), 3);
    assert_eq!(names(generations.get(0).unwrap()), vec!["A"]);
    assert_eq!(names(generations.get(1).unwrap()), vec!["C", "B"]);
    assert_eq!(names(generations.get(2).unwrap()), vec!["D"]);
    assert_eq!(generations.generation_of("D"), Some(2));
    assert_eq!(generations.task_count(), 4);
}

#[test]
fn task_sits_one_past_its_deepest_predecessor() {
    // A -> B -> C, and D depends on A and C directly.
    let g = graph(&[("A", &[]), ("B", &["A"]), ("C", &["B"]), ("D", &["A", "C"])]);

    let generations = g.generations().unwrap();

    assert_eq!(generations.generation_of("D"), Some(3));
    assert_eq!(g.dependents_of("A"), &["B".to_string(), "D".to_string()]);
    assert_eq!(g.dependencies_of("D"), &["A".to_string(), "C".to_string()]);
}

#[test]
fn roots_share_generation_zero() {
    let g = graph(&[("A", &[]), ("B", &[]), ("C", &["A", "B"])]);

    let generations = g.generations().unwrap();

    assert_eq!(names(generations.get(0).unwrap()), vec!["A", "B"]);
    assert_eq!(names(generations.get(1).unwrap()), vec!["C"]);
}

#[test]
fn two_node_cycle_is_rejected() {
    let g = graph(&[("A", &["B"]), ("B", &["A"])]);

    match g.generations() {
        Err(PermflowError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let g = graph(&[("A", &["A"])]);

    assert!(matches!(g.generations(), Err(PermflowError::DagCycle(_))));
}

#[test]
fn cycle_downstream_of_valid_tasks_is_rejected() {
    let g = graph(&[("root", &[]), ("X", &["root", "Y"]), ("Y", &["X"])]);

    assert!(matches!(g.generations(), Err(PermflowError::DagCycle(_))));
}

#[test]
fn dangling_predecessor_is_rejected() {
    let g = graph(&[("A", &[]), ("B", &["missing"])]);

    match g.generations() {
        Err(PermflowError::TaskNotFound(msg)) => {
            assert!(msg.contains("missing"));
            assert!(msg.contains('B'));
        }
        other => panic!("expected TaskNotFound, got {other:?}"),
    }
}

#[test]
fn forward_reference_is_layered_by_dependency_not_insertion() {
    let g = graph(&[("B", &["A"]), ("A", &[])]);

    let generations = g.generations().unwrap();

    assert_eq!(names(generations.get(0).unwrap()), vec!["A"]);
    assert_eq!(names(generations.get(1).unwrap()), vec!["B"]);
}

#[test]
fn empty_graph_has_no_generations() {
    let g = DagGraph::new();

    let generations = g.generations().unwrap();

    assert!(generations.is_empty());
    assert_eq!(generations.task_count(), 0);
}

#[test]
fn duplicate_insert_is_refused() {
    let mut g = DagGraph::new();

    assert!(g.insert("A", vec![]));
    assert!(!g.insert("A", vec![]));
    assert_eq!(g.len(), 1);
    assert_eq!(g.tasks().collect::<Vec<_>>(), vec!["A"]);
}
