//! The flow store: owns the current state, dispatches actions through the root
//! reducer and keeps the undo/redo history.

use crate::actions::Action;
use crate::config::StoreConfig;
use crate::error::FlowError;
use crate::graph::{assert_auto_layout_state, derive_connectors};
use crate::metadata::ElementTypeRegistry;
use crate::model::{Connector, GuidGenerator, UuidGenerator};
use crate::reducers::{ReducerContext, reduce_flow};
use crate::state::FlowState;
use std::sync::Arc;

mod history;

pub use history::UndoRedo;

pub struct FlowStore {
    state: FlowState,
    context: ReducerContext,
    config: StoreConfig,
    history: UndoRedo,
}

pub struct FlowStoreBuilder {
    config: StoreConfig,
    registry: Option<ElementTypeRegistry>,
    guids: Arc<dyn GuidGenerator>,
    state: FlowState,
}

impl FlowStoreBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            registry: None,
            guids: Arc::new(UuidGenerator),
            state: FlowState::auto_layout(),
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: ElementTypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_guid_generator(mut self, guids: Arc<dyn GuidGenerator>) -> Self {
        self.guids = guids;
        self
    }

    /// Starts from an existing state instead of an empty auto-layout flow.
    pub fn with_state(mut self, state: FlowState) -> Self {
        self.state = state;
        self
    }

    pub fn build(self) -> FlowStore {
        let context = ReducerContext::new(
            Arc::new(self.registry.unwrap_or_default()),
            self.guids,
            self.config.naming.clone(),
        );
        FlowStore {
            state: self.state,
            context,
            history: UndoRedo::new(self.config.undo_limit),
            config: self.config,
        }
    }
}

impl Default for FlowStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowStore {
    pub fn builder() -> FlowStoreBuilder {
        FlowStoreBuilder::new()
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &ElementTypeRegistry {
        &self.context.registry
    }

    /// Applies an action. On error the state is left exactly as it was.
    pub fn dispatch(&mut self, action: Action) -> Result<&FlowState, FlowError> {
        log::debug!("Dispatching {}", action.type_name());
        match action {
            Action::Undo => {
                if let Some(previous) = self.history.undo(&self.state) {
                    self.state = previous;
                }
                return Ok(&self.state);
            }
            Action::Redo => {
                if let Some(next) = self.history.redo(&self.state) {
                    self.state = next;
                }
                return Ok(&self.state);
            }
            Action::ClearUndoRedo => {
                self.history.clear();
                return Ok(&self.state);
            }
            _ => {}
        }

        let next = reduce_flow(&self.state, &action, &self.context)?;
        if self.config.assert_invariants
            && next.properties.is_auto_layout_canvas
            && !next.elements.ptr_eq(&self.state.elements)
        {
            if let Err(violation) = assert_auto_layout_state(next.elements.map(), next.connectors.as_slice()) {
                log::error!("{} left the flow inconsistent: {}", action.type_name(), violation);
                return Err(violation);
            }
        }

        if matches!(action, Action::UpdateFlow(_)) {
            self.history.clear();
        } else if action.is_undoable() && !next.ptr_eq(&self.state) {
            let previous = std::mem::replace(&mut self.state, next);
            self.history.record(previous);
            return Ok(&self.state);
        }
        self.state = next;
        Ok(&self.state)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Runs the auto-layout invariant checks against the current state.
    pub fn check_invariants(&self) -> Result<(), FlowError> {
        assert_auto_layout_state(self.state.elements.map(), self.state.connectors.as_slice())
    }

    /// The connectors an auto-layout canvas draws for the current state.
    pub fn derived_connectors(&self) -> Result<Vec<Connector>, FlowError> {
        derive_connectors(self.state.elements.map())
    }
}

impl Default for FlowStore {
    fn default() -> Self {
        Self::builder().build()
    }
}
