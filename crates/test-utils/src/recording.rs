use std::sync::{Arc, Mutex};

use permflow::procedure::{ProcedureEvent, ProcedureListener, TaskView};

/// Listener that records every callback, in emission order.
///
/// Clones share the same log, so keep one clone for assertions and hand
/// the other to `Procedure::start`.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<ProcedureEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ProcedureEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<ProcedureEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn terminal_events(&self) -> Vec<ProcedureEvent> {
        self.events()
            .into_iter()
            .filter(ProcedureEvent::is_terminal)
            .collect()
    }

    pub fn terminal_count(&self) -> usize {
        self.terminal_events().len()
    }

    /// Names of the tasks reported by `on_block_completed`, in order.
    pub fn completed_blocks(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProcedureEvent::BlockCompleted(view) => Some(view.name),
                _ => None,
            })
            .collect()
    }

    pub fn failed_blocks(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProcedureEvent::BlockFailed(view) => Some(view.name),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<(String, u8, Option<String>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProcedureEvent::Progress {
                    task,
                    percent,
                    description,
                } => Some((task.name, percent, description)),
                _ => None,
            })
            .collect()
    }
}

impl ProcedureListener for RecordingListener {
    fn on_block_completed(&self, task: &TaskView) {
        self.push(ProcedureEvent::BlockCompleted(task.clone()));
    }

    fn on_block_failed(&self, task: &TaskView) {
        self.push(ProcedureEvent::BlockFailed(task.clone()));
    }

    fn on_progress(&self, task: &TaskView, percent: u8, description: Option<&str>) {
        self.push(ProcedureEvent::Progress {
            task: task.clone(),
            percent,
            description: description.map(str::to_string),
        });
    }

    fn on_completed(&self) {
        self.push(ProcedureEvent::Completed);
    }

    fn on_failed(&self, task: &TaskView) {
        self.push(ProcedureEvent::Failed(task.clone()));
    }

    fn on_cancel(&self, code: i32, reason: &str) {
        self.push(ProcedureEvent::Cancelled {
            code,
            reason: reason.to_string(),
        });
    }
}
