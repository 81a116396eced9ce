//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the nagare crate.
//! Import this module to get access to the core functionality without having to import
//! each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use nagare::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let config = StoreConfig::from_file("path/to/config.json")?;
//! let mut store = FlowStore::builder().with_config(config).build();
//!
//! let actions: Vec<Action> = serde_json::from_str(&std::fs::read_to_string("path/to/actions.json")?)?;
//! for action in actions {
//!     store.dispatch(action)?;
//! }
//! store.check_invariants()?;
//! # Ok(())
//! # }
//! ```

// Store and reducers
pub use crate::reducers::{ReducerContext, reduce_flow};
pub use crate::store::{FlowStore, FlowStoreBuilder};

// Actions and payloads
pub use crate::actions::{
    Action, AddElementPayload, CreateGotoPayload, DecorateCanvasPayload, DeleteElementPayload, DuplicatePayload,
    ElementRef, ElementWithChildrenPayload, FixedCanvasSelectionPayload, MarqueeSelectPayload, PastePayload,
    PropertiesPatch, ResetGotosPayload,
};

// Model and state
pub use crate::model::{
    AvailableConnection, ChildIndex, ConnectionSource, Connector, ConnectorKey, ConnectorType, FlowElement, Guid,
    GuidGenerator, NodeType, ROOT_ELEMENT_GUID, SequentialGuidGenerator, UuidGenerator, element_type,
};
pub use crate::state::{Connectors, Elements, FlowProperties, FlowState};

// Metadata and configuration
pub use crate::config::{NamingConfig, StoreConfig};
pub use crate::metadata::{ElementTypeConfig, ElementTypeRegistry};

// Error types
pub use crate::error::{ConfigError, FlowError, InvariantViolation};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
