//! Dependency tracing: which parts of its inputs a transition reads.

pub mod engine;
pub mod path_set;
pub mod pick;
pub mod tracked;

pub use engine::{trace, DependencyTrace, TraceError, TransitionFn, TransitionRegistry};
pub use path_set::{merge_unique_paths, PathSet};
pub use pick::{deep_pick, has_path};
pub use tracked::{PathRecorder, ReadObserver, Tracked};
