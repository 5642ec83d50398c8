#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use permflow::task::{Task, TaskHandle};

/// Shared, ordered record of which task bodies ran.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.entries.lock().unwrap().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == name)
    }
}

/// Task that records itself and completes synchronously.
pub fn completing_task(name: &str, log: &ExecutionLog) -> Task {
    let log = log.clone();
    let task_name = name.to_string();
    Task::new(name, move |handle: TaskHandle| {
        log.record(&task_name);
        handle.complete();
        Ok(())
    })
}

/// Task that records itself and fails synchronously.
pub fn failing_task(name: &str, reason: &str, log: &ExecutionLog) -> Task {
    let log = log.clone();
    let task_name = name.to_string();
    let reason = reason.to_string();
    Task::new(name, move |handle: TaskHandle| {
        log.record(&task_name);
        handle.fail(reason);
        Ok(())
    })
}

/// Task that records itself and cancels the run synchronously.
pub fn cancelling_task(name: &str, code: i32, reason: &str, log: &ExecutionLog) -> Task {
    let log = log.clone();
    let task_name = name.to_string();
    let reason = reason.to_string();
    Task::new(name, move |handle: TaskHandle| {
        log.record(&task_name);
        handle.cancel(code, reason);
        Ok(())
    })
}

/// Collects the handles of "parked" tasks so a test can signal them later,
/// in any order, from any thread.
#[derive(Debug, Clone, Default)]
pub struct HandleBoard {
    handles: Arc<Mutex<HashMap<String, TaskHandle>>>,
}

impl HandleBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Task whose body only stores its handle.
    pub fn park(&self, name: &str) -> Task {
        let handles = Arc::clone(&self.handles);
        let task_name = name.to_string();
        Task::new(name, move |handle: TaskHandle| {
            handles.lock().unwrap().insert(task_name, handle);
            Ok(())
        })
    }

    pub fn get(&self, name: &str) -> TaskHandle {
        self.handles
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("task '{name}' has not been dispatched"))
    }

    pub fn is_dispatched(&self, name: &str) -> bool {
        self.handles.lock().unwrap().contains_key(name)
    }

    pub fn dispatched(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}
