// src/exec/mod.rs

//! Thread-hopping layer used by task bodies.
//!
//! - [`backend`] defines the `Executor` / `ScheduleExecutor` traits and an
//!   inline executor.
//! - [`main_thread`] posts work to a loop owned by the UI thread.
//! - [`single`] runs work on one background thread, in order (IO).
//! - [`pool`] wraps dedicated Tokio runtimes for the worker and scheduled
//!   pools.
//! - [`registry`] bundles them into an explicit `Executors` value.

pub mod backend;
pub mod main_thread;
pub mod pool;
pub mod registry;
pub mod single;

pub use backend::{Executor, ExecutorExt, InlineExecutor, ScheduleExecutor, Work};
pub use main_thread::{MainLoop, MainThreadExecutor};
pub use pool::{PoolExecutor, ScheduledExecutor};
pub use registry::Executors;
pub use single::SingleThreadExecutor;
