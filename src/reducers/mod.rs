//! Slice reducers and the root reducer that fans an action out to them.
//!
//! An action flows through the slices in a fixed order: elements, then the
//! auto-layout topology pass (only on the auto-layout canvas), then connectors,
//! then flow properties. Each reducer returns the identical handle it was given
//! when the action does not concern its slice.

use crate::actions::Action;
use crate::config::NamingConfig;
use crate::error::FlowError;
use crate::metadata::ElementTypeRegistry;
use crate::model::{GuidGenerator, UuidGenerator};
use crate::state::FlowState;
use std::sync::Arc;

pub mod auto_layout;
pub mod connectors;
pub mod elements;
pub mod properties;

/// Collaborators the reducers consult but do not own.
#[derive(Clone)]
pub struct ReducerContext {
    pub registry: Arc<ElementTypeRegistry>,
    pub guids: Arc<dyn GuidGenerator>,
    pub naming: NamingConfig,
}

impl ReducerContext {
    pub fn new(registry: Arc<ElementTypeRegistry>, guids: Arc<dyn GuidGenerator>, naming: NamingConfig) -> Self {
        Self {
            registry,
            guids,
            naming,
        }
    }
}

impl Default for ReducerContext {
    fn default() -> Self {
        Self::new(
            Arc::new(ElementTypeRegistry::default()),
            Arc::new(UuidGenerator),
            NamingConfig::default(),
        )
    }
}

/// Reduces the whole flow state.
///
/// The input is never modified; unchanged slices are shared with it.
pub fn reduce_flow(state: &FlowState, action: &Action, context: &ReducerContext) -> Result<FlowState, FlowError> {
    let elements = elements::reduce(&state.elements, action, context);
    let elements = if state.properties.is_auto_layout_canvas {
        auto_layout::reduce(&state.elements, elements, action, context)?
    } else {
        elements
    };
    let connectors = connectors::reduce(&state.connectors, action, &elements, context);
    let graph_changed = !elements.ptr_eq(&state.elements) || !connectors.ptr_eq(&state.connectors);
    let properties = properties::reduce(&state.properties, action, graph_changed);
    Ok(FlowState {
        elements,
        connectors,
        properties,
    })
}
