// src/watch/mod.rs

//! File watching and rebuild decisions.
//!
//! This module is responsible for:
//! - Classifying `watch` / `documents` / `schema` patterns into pattern sets.
//! - Deciding whether a changed path affects any output target.
//! - Picking the single directory to subscribe to.
//! - Wiring up a cross-platform filesystem watcher (`notify`) and turning its
//!   events into triggers.
//!
//! It does **not** know how outputs are generated; it only turns filesystem
//! changes into output-level triggers.

pub mod event_loop;
pub mod path_utils;
pub mod patterns;
pub mod rebuild;
pub mod root;
pub mod service;

pub use event_loop::{
    build_subscribe_options, start_watching, WatchHandler, WatchPlan, WatchStopper,
};
pub use patterns::{
    make_global_pattern_set, make_local_pattern_set, make_local_pattern_sets, sort_patterns,
    LocalPatternSet, PatternSet, SortedPatterns,
};
pub use rebuild::{make_should_rebuild, Decision, RebuildDecider};
pub use root::resolve_watch_directory;
pub use service::{
    EventSink, FsEvent, NotifyWatchService, SubscribeOptions, WatchService, WatchSubscription,
};
