//! Test doubles for driving the reconciliation loop without a network,
//! a process table or wall-clock time.

mod mock;

pub use mock::{ManualClock, RecordingController, ScriptedDirectory, StaticTxtSource};
