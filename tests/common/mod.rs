#![allow(dead_code, unused_imports)]

pub use permflow_test_utils::builders::{
    ExecutionLog, HandleBoard, cancelling_task, completing_task, failing_task,
};
pub use permflow_test_utils::{
    FakePlatform, RecordingListener, ScriptedDialogs, init_tracing, intent_key, with_timeout,
};
