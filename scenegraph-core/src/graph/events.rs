//! Evaluated notifications.
//!
//! Observers (redraw, remote viewers) register a listener and receive the set
//! of nodes evaluated by each pass.

use indexmap::IndexSet;

use super::node::{GraphId, NodeId};

/// Payload handed to evaluated listeners once per pass.
#[derive(Debug, Clone, Copy)]
pub struct GraphEvaluatedArgs<'a> {
    /// The graph that ran the pass.
    pub graph: GraphId,

    /// Every node evaluated during the pass, in evaluation order.
    pub nodes: &'a IndexSet<NodeId>,
}

/// Identifies a registered listener so it can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&GraphEvaluatedArgs<'_>)>;

/// Ordered list of evaluated listeners.
#[derive(Default)]
pub(crate) struct EvaluatedListeners {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl EvaluatedListeners {
    pub(crate) fn add<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&GraphEvaluatedArgs<'_>) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub(crate) fn raise(&mut self, args: &GraphEvaluatedArgs<'_>) {
        for (_, listener) in &mut self.listeners {
            listener(args);
        }
    }
}

impl std::fmt::Debug for EvaluatedListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatedListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
