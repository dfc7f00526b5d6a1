//! Tideline - timeline management for partitioned event streams
//!
//! Moves event types between physical storages without losing ordering:
//! producers are fenced cluster-wide while the active timeline is sealed
//! and its successor takes over. Also owns the coordination-ensemble
//! sessions the rest of the process shares.

pub mod config;
pub mod coordination;
pub mod model;
pub mod services;
pub mod storage;
pub mod sync;
pub mod utils;
pub mod worker;
