//! # Nagare - Auto-Layout Flow Graph Model and Reducers
//!
//! **Nagare** is the state core of a visual flow builder. A flow is an arena of
//! elements keyed by guid; on the auto-layout canvas each element carries its own
//! layout links (`prev`/`next`, branch heads pointing back at their `parent`, a
//! fixed-length `children` array per branching element, a fault branch and
//! incoming gotos). Every edit is an [`Action`](actions::Action) reduced into a
//! new immutable [`FlowState`](state::FlowState).
//!
//! ## Core Workflow
//!
//! 1.  **Describe your element types**: the default
//!     [`ElementTypeRegistry`](metadata::ElementTypeRegistry) knows the built-in
//!     types; map your own type names onto them or register custom configs.
//! 2.  **Build a store**: [`FlowStore::builder`](store::FlowStore::builder) wires
//!     the registry, a guid generator and a [`StoreConfig`](config::StoreConfig).
//! 3.  **Dispatch actions**: each dispatch runs the slice reducers (elements,
//!     auto-layout topology, connectors, properties). Slices an action does not
//!     touch keep their identity, so views can skip work with a pointer check.
//! 4.  **Render**: read the elements directly, or derive the connectors of an
//!     auto-layout canvas with [`FlowStore::derived_connectors`](store::FlowStore::derived_connectors).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nagare::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut store = FlowStore::builder()
//!         .with_config(StoreConfig::default().with_assertions(true))
//!         .build();
//!
//!     // The start element heads the main line; the store terminates it with an End.
//!     store.dispatch(Action::AddStartElement(FlowElement::canvas("start", element_type::START)))?;
//!
//!     // Insert an assignment right after the start element.
//!     store.dispatch(Action::AddCanvasElement(AddElementPayload {
//!         element: FlowElement::canvas("assign", element_type::ASSIGNMENT).with_label("Set Total"),
//!         alc_connection_source: Some(ConnectionSource::next("start")),
//!     }))?;
//!
//!     for connector in store.derived_connectors()? {
//!         println!("{} -> {} ({:?})", connector.source, connector.target, connector.connector_type);
//!     }
//!
//!     // Undo restores the previous snapshot.
//!     store.dispatch(Action::Undo)?;
//!     assert!(!store.state().elements.contains("assign"));
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod model;
pub mod prelude;
pub mod reducers;
pub mod state;
pub mod store;
