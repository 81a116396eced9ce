//! Element-type metadata: which layout role an element type plays, which
//! connection slots it exposes and how it is duplicated.

use crate::error::FlowError;
use crate::model::{ConnectorType, FlowElement, NodeType, element_type};
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

mod duplicate;
mod naming;

pub use duplicate::{DuplicateContext, DuplicatedElement, duplicate_element};
pub use naming::{NameLookup, UniqueNamer};

/// Defines the contract for an element type known to the canvas.
pub trait ElementTypeConfig: Send + Sync {
    fn element_type(&self) -> &str;

    fn node_type(&self) -> NodeType;

    /// Whether each child element (outcome, wait event, path) owns an outgoing connector.
    fn has_child_connections(&self) -> bool {
        false
    }

    /// Connection slots an element of this type has on top of its per-child slots.
    fn fixed_connections(&self, _has_children: bool) -> Vec<ConnectorType> {
        vec![ConnectorType::Regular]
    }

    fn supports_fault(&self) -> bool {
        false
    }

    /// Produces a copy of `source` under the guid and names held by `context`.
    fn duplicate(&self, source: &FlowElement, context: &mut DuplicateContext<'_, '_>) -> DuplicatedElement {
        duplicate_element(source, context)
    }
}

/// Master macro to define the built-in element types, their registration and their lookup by name.
macro_rules! define_element_types {
    ( $( ($struct_name:ident, $element_type:expr, $node_type:expr, children: $children:expr, fault: $fault:expr, fixed: [$($fixed:expr),*]) ),* $(,)? ) => {
        $(
            struct $struct_name;
            impl ElementTypeConfig for $struct_name {
                fn element_type(&self) -> &str { $element_type }
                fn node_type(&self) -> NodeType { $node_type }
                fn has_child_connections(&self) -> bool { $children }
                fn fixed_connections(&self, _has_children: bool) -> Vec<ConnectorType> { vec![$($fixed),*] }
                fn supports_fault(&self) -> bool { $fault }
            }
        )*

        fn register_default_element_types(registry: &mut AHashMap<String, Arc<dyn ElementTypeConfig>>) {
            $( registry.insert($element_type.to_string(), Arc::new($struct_name)); )*
            registry.insert(element_type::START.to_string(), Arc::new(StartElementConfig));
        }

        fn create_element_type_by_name(name: &str) -> Option<Arc<dyn ElementTypeConfig>> {
            $( if name == $element_type { return Some(Arc::new($struct_name)); } )*
            if name == element_type::START {
                return Some(Arc::new(StartElementConfig));
            }
            None
        }
    };
}

define_element_types! {
    (RootConfig, element_type::ROOT, NodeType::Root, children: false, fault: false, fixed: []),
    (EndConfig, element_type::END, NodeType::End, children: false, fault: false, fixed: []),
    (DecisionConfig, element_type::DECISION, NodeType::Decision, children: true, fault: false, fixed: [ConnectorType::Default]),
    (WaitConfig, element_type::WAIT, NodeType::Wait, children: true, fault: true, fixed: [ConnectorType::Default, ConnectorType::Fault]),
    (LoopConfig, element_type::LOOP, NodeType::Loop, children: false, fault: false, fixed: [ConnectorType::LoopNext, ConnectorType::LoopEnd]),
    (ScreenConfig, element_type::SCREEN, NodeType::Leaf, children: false, fault: false, fixed: [ConnectorType::Regular]),
    (AssignmentConfig, element_type::ASSIGNMENT, NodeType::Leaf, children: false, fault: false, fixed: [ConnectorType::Regular]),
    (ActionCallConfig, element_type::ACTION_CALL, NodeType::Leaf, children: false, fault: true, fixed: [ConnectorType::Regular, ConnectorType::Fault]),
    (SubflowConfig, element_type::SUBFLOW, NodeType::Leaf, children: false, fault: false, fixed: [ConnectorType::Regular]),
    (RecordCreateConfig, element_type::RECORD_CREATE, NodeType::Leaf, children: false, fault: true, fixed: [ConnectorType::Regular, ConnectorType::Fault]),
    (RecordUpdateConfig, element_type::RECORD_UPDATE, NodeType::Leaf, children: false, fault: true, fixed: [ConnectorType::Regular, ConnectorType::Fault]),
    (RecordLookupConfig, element_type::RECORD_LOOKUP, NodeType::Leaf, children: false, fault: true, fixed: [ConnectorType::Regular, ConnectorType::Fault]),
    (RecordDeleteConfig, element_type::RECORD_DELETE, NodeType::Leaf, children: false, fault: true, fixed: [ConnectorType::Regular, ConnectorType::Fault]),
}

/// The Start element switches its outgoing slot from REGULAR to IMMEDIATE once it
/// has scheduled paths.
struct StartElementConfig;

impl ElementTypeConfig for StartElementConfig {
    fn element_type(&self) -> &str {
        element_type::START
    }

    fn node_type(&self) -> NodeType {
        NodeType::Start
    }

    fn has_child_connections(&self) -> bool {
        true
    }

    fn fixed_connections(&self, has_children: bool) -> Vec<ConnectorType> {
        if has_children {
            vec![ConnectorType::Immediate]
        } else {
            vec![ConnectorType::Regular]
        }
    }
}

/// Lookup table from element type name to its configuration.
#[derive(Clone)]
pub struct ElementTypeRegistry {
    configs: AHashMap<String, Arc<dyn ElementTypeConfig>>,
}

impl ElementTypeRegistry {
    pub fn builder() -> ElementTypeRegistryBuilder {
        ElementTypeRegistryBuilder::new()
    }

    pub fn get(&self, element_type: &str) -> Option<&dyn ElementTypeConfig> {
        self.configs.get(element_type).map(Arc::as_ref)
    }

    /// Resolves the configuration for a placed element, failing on unregistered types.
    pub fn config_for(&self, element: &FlowElement) -> Result<&dyn ElementTypeConfig, FlowError> {
        self.get(&element.element_type)
            .ok_or_else(|| FlowError::UnknownElementType {
                guid: element.guid.clone(),
                element_type: element.element_type.clone(),
            })
    }

    pub fn node_type_of(&self, element: &FlowElement) -> Result<NodeType, FlowError> {
        self.config_for(element).map(|config| config.node_type())
    }
}

impl Default for ElementTypeRegistry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for ElementTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.configs.keys().collect();
        types.sort();
        f.debug_struct("ElementTypeRegistry").field("types", &types).finish()
    }
}

pub struct ElementTypeRegistryBuilder {
    configs: AHashMap<String, Arc<dyn ElementTypeConfig>>,
}

impl ElementTypeRegistryBuilder {
    pub fn new() -> Self {
        let mut configs: AHashMap<String, Arc<dyn ElementTypeConfig>> = AHashMap::new();
        register_default_element_types(&mut configs);
        Self { configs }
    }

    /// Registers `user_type_name` as an alias behaving like the built-in `builtin_type_name`.
    pub fn with_type_mapping(mut self, user_type_name: &str, builtin_type_name: &str) -> Self {
        if let Some(config) = create_element_type_by_name(builtin_type_name) {
            self.configs.insert(user_type_name.to_string(), config);
        } else {
            log::warn!("Ignoring mapping '{user_type_name}' -> unknown element type '{builtin_type_name}'");
        }
        self
    }

    pub fn with_custom_type(mut self, config: Arc<dyn ElementTypeConfig>) -> Self {
        self.configs.insert(config.element_type().to_string(), config);
        self
    }

    pub fn build(self) -> ElementTypeRegistry {
        ElementTypeRegistry {
            configs: self.configs,
        }
    }
}

impl Default for ElementTypeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
