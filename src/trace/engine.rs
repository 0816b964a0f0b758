//! Dependency tracing for transition functions.
//!
//! A trace is exact for one concrete invocation: a transition that reads
//! `model.counter` only when `relay.flag` is set reports that dependency
//! only for runs where the flag was set. To cover several historical
//! invocations, trace each one and union the results with
//! [`DependencyTrace::merge`].

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Node;
use crate::timeline::{Message, MessageLog, ReconstructError};
use crate::trace::path_set::{merge_unique_paths, PathSet};
use crate::trace::tracked::{PathRecorder, Tracked};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("Context '{context}' does not exist")]
    ContextNotFound { context: String },
    #[error("Context '{context}' does not contain a transition named '{name}'")]
    NotFound { context: String, name: String },
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),
}

/// The paths a single transition read from each of its three inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTrace {
    pub model: PathSet,
    pub message: PathSet,
    pub relay: PathSet,
}

impl DependencyTrace {
    /// Per-input union, keeping the paths of `self` first.
    pub fn merge(&self, other: &DependencyTrace) -> DependencyTrace {
        DependencyTrace {
            model: merge_unique_paths(&self.model, &other.model),
            message: merge_unique_paths(&self.message, &other.message),
            relay: merge_unique_paths(&self.relay, &other.relay),
        }
    }
}

/// Run `transition` once over tracked views of its inputs and collect what it read.
///
/// The return value of `transition` is discarded; only its reads matter.
pub fn trace<F, R>(transition: F, model: &Node, message: &Node, relay: &Node) -> DependencyTrace
where
    F: for<'t> FnOnce(Tracked<'t>, Tracked<'t>, Tracked<'t>) -> R,
{
    let model_reads = PathRecorder::new();
    let message_reads = PathRecorder::new();
    let relay_reads = PathRecorder::new();

    {
        let _ = transition(
            Tracked::new(model, &model_reads),
            Tracked::new(message, &message_reads),
            Tracked::new(relay, &relay_reads),
        );
    }

    DependencyTrace {
        model: model_reads.into_paths(),
        message: message_reads.into_paths(),
        relay: relay_reads.into_paths(),
    }
}

/// A pure state transition: `(model, message, relay) -> next model`.
pub type TransitionFn =
    Box<dyn for<'t> Fn(Tracked<'t>, Tracked<'t>, Tracked<'t>) -> Node + Send + Sync>;

/// Transition functions addressable by container context and message name.
#[derive(Default)]
pub struct TransitionRegistry {
    contexts: HashMap<String, HashMap<String, TransitionFn>>,
}

impl TransitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, context: impl Into<String>, name: impl Into<String>, transition: F)
    where
        F: for<'t> Fn(Tracked<'t>, Tracked<'t>, Tracked<'t>) -> Node + Send + Sync + 'static,
    {
        self.contexts
            .entry(context.into())
            .or_default()
            .insert(name.into(), Box::new(transition));
    }

    pub fn resolve(&self, context: &str, name: &str) -> Result<&TransitionFn, TraceError> {
        let transitions =
            self.contexts
                .get(context)
                .ok_or_else(|| TraceError::ContextNotFound {
                    context: context.to_string(),
                })?;
        transitions.get(name).ok_or_else(|| TraceError::NotFound {
            context: context.to_string(),
            name: name.to_string(),
        })
    }

    /// Trace `msg` given the model its transition saw.
    ///
    /// Absent `data`/`relay` payloads are traced as empty objects.
    pub fn trace_message(&self, msg: &Message, model: &Node) -> Result<DependencyTrace, TraceError> {
        let transition = self.resolve(&msg.context, &msg.message_type)?;
        let empty = Node::empty_object();
        let data = msg.data.as_ref().filter(|d| !d.is_null()).unwrap_or(&empty);
        let relay = msg.relay.as_ref().filter(|r| !r.is_null()).unwrap_or(&empty);

        let result = trace(|m, d, r| transition(m, d, r), model, data, relay);
        tracing::debug!(
            id = %msg.id,
            context = %msg.context,
            name = %msg.message_type,
            model_paths = result.model.len(),
            message_paths = result.message.len(),
            relay_paths = result.relay.len(),
            "Traced transition"
        );
        Ok(result)
    }

    /// Trace the message at `index` of `log`, reconstructing the model it saw.
    ///
    /// The model is the global state just before the message, narrowed to
    /// the message's container path.
    pub fn trace_at(&self, log: &MessageLog, index: usize) -> Result<DependencyTrace, TraceError> {
        let before = log.state_at(index)?;
        let msg = log
            .messages()
            .get(index)
            .ok_or(ReconstructError::IndexOutOfRange {
                index,
                len: log.len(),
            })?;
        let model = model_slice(&before, msg);
        self.trace_message(msg, &model)
    }

    /// Trace every message of a selection individually and union the results.
    pub fn trace_selection(
        &self,
        log: &MessageLog,
        range: Range<usize>,
    ) -> Result<DependencyTrace, TraceError> {
        let mut merged = DependencyTrace::default();
        for index in range {
            let traced = self.trace_at(log, index)?;
            merged = merged.merge(&traced);
        }
        Ok(merged)
    }
}

fn model_slice(global: &Node, msg: &Message) -> Node {
    match global.get_path(&msg.path) {
        Some(node) if !node.is_null() => node.clone(),
        _ => Node::empty_object(),
    }
}
