//! Deduplication pipeline.
//!
//! This module provides functionality for:
//! - Classifying a file as unique or duplicate against the fingerprint store
//! - Planning a collision-free destination in the unique / duplicate trees
//! - Driving a whole scan with resumable, interruptible progress
//!
//! Everything runs on one thread with a single writer, so neither the store
//! nor the destination tree needs locking.

pub mod classifier;
pub mod orchestrator;
pub mod placement;

pub use classifier::{Classification, Classifier};
pub use orchestrator::{
    Orchestrator, RunError, ScanConfig, ScanReport, SpaceProbe, SysinfoProbe, DEFAULT_DISK_MARGIN,
    SAVE_INTERVAL,
};
pub use placement::{
    next_free_name, PlacementError, PlacementPlanner, DUPLICATE_DIR, MAX_NAME_ATTEMPTS, UNIQUE_DIR,
};
