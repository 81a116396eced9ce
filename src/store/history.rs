use crate::state::FlowState;
use std::collections::VecDeque;

/// Bounded undo/redo stacks of whole-state snapshots.
///
/// Snapshots share every unchanged slice and element with their neighbours, so
/// keeping one per undoable action stays cheap.
#[derive(Debug, Clone, Default)]
pub struct UndoRedo {
    past: VecDeque<FlowState>,
    future: Vec<FlowState>,
    limit: usize,
}

impl UndoRedo {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit,
        }
    }

    /// Records the state an undoable action is about to replace.
    ///
    /// This clears the redo stack since a new action invalidates anything undone.
    pub fn record(&mut self, previous: FlowState) {
        self.future.clear();
        if self.limit == 0 {
            return;
        }
        self.past.push_back(previous);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
    }

    pub fn undo(&mut self, current: &FlowState) -> Option<FlowState> {
        let previous = self.past.pop_back()?;
        self.future.push(current.clone());
        Some(previous)
    }

    pub fn redo(&mut self, current: &FlowState) -> Option<FlowState> {
        let next = self.future.pop()?;
        self.past.push_back(current.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
