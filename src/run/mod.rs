//! Run controller: executes one annealing run at a time as a cancellable,
//! observable unit of work.
//!
//! A run's events arrive on its [`RunHandle`] in the order
//! `start, (progress | temp_change)*, (finish | error)`; a cancelled run
//! simply stops emitting. Malformed input skips `start` and yields a single
//! `error`.

mod controller;
mod event;

pub use controller::{
    Backpressure, CancelToken, RunController, RunError, RunHandle, RunSettings, StreamConfig,
    WORKER_FAULT_MESSAGE,
};
pub use event::{FinishPayload, ProgressPayload, RunEvent, RunId, StartPayload};
