use super::{ChildIndex, ConnectionSource, ConnectorType, Guid, NodeType, element_type};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Merge-point bookkeeping written by canvas decoration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HighlightInfo {
    pub highlight_next: bool,
    pub highlight_loop_back: bool,
    pub highlight_fault: bool,
    pub branch_indexes_to_highlight: Vec<usize>,
    pub merge_branch_indexes_to_highlight: Vec<usize>,
}

impl HighlightInfo {
    pub fn add_branch_index(&mut self, index: usize) {
        if !self.branch_indexes_to_highlight.contains(&index) {
            self.branch_indexes_to_highlight.push(index);
        }
    }

    pub fn add_merge_branch_index(&mut self, index: usize) -> bool {
        if self.merge_branch_indexes_to_highlight.contains(&index) {
            return false;
        }
        self.merge_branch_indexes_to_highlight.push(index);
        true
    }
}

/// UI state carried by every element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementConfig {
    pub is_selected: bool,
    pub is_highlighted: bool,
    pub is_selectable: bool,
    pub has_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_info: Option<HighlightInfo>,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            is_selected: false,
            is_highlighted: false,
            is_selectable: true,
            has_error: false,
            highlight_info: None,
        }
    }
}

/// An outgoing connection slot that has not been drawn yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableConnection {
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_reference: Option<Guid>,
}

impl AvailableConnection {
    pub fn of_type(connector_type: ConnectorType) -> Self {
        Self {
            connector_type,
            child_reference: None,
        }
    }

    pub fn for_child(child_reference: impl Into<Guid>) -> Self {
        Self {
            connector_type: ConnectorType::Regular,
            child_reference: Some(child_reference.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildReference {
    pub child_reference: Guid,
}

/// A flow element: a canvas node, a child element (outcome, wait event, scheduled
/// path, screen field) or a resource.
///
/// Topology fields (`node_type` through `incoming_goto`) are owned by the
/// auto-layout reducer and only meaningful for placed canvas elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowElement {
    pub guid: Guid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub element_type: String,
    #[serde(default)]
    pub is_canvas_element: bool,
    #[serde(default)]
    pub config: ElementConfig,

    #[serde(default)]
    pub connector_count: usize,
    #[serde(default)]
    pub max_connections: usize,
    #[serde(default)]
    pub available_connections: Vec<AvailableConnection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_references: Vec<ChildReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<Guid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Guid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Guid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_index: Option<ChildIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Option<Guid>>>,
    #[serde(default)]
    pub is_terminal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Guid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incoming_goto: Vec<ConnectionSource>,

    /// Element data the graph core does not interpret.
    #[serde(default, flatten)]
    pub properties: Map<String, Value>,
}

impl FlowElement {
    pub fn new(guid: impl Into<Guid>, element_type: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: None,
            label: None,
            element_type: element_type.into(),
            is_canvas_element: false,
            config: ElementConfig::default(),
            connector_count: 0,
            max_connections: 0,
            available_connections: Vec::new(),
            child_references: Vec::new(),
            node_type: None,
            prev: None,
            next: None,
            parent: None,
            child_index: None,
            children: None,
            is_terminal: false,
            fault: None,
            incoming_goto: Vec::new(),
            properties: Map::new(),
        }
    }

    /// A canvas element with a single open REGULAR slot.
    pub fn canvas(guid: impl Into<Guid>, element_type: impl Into<String>) -> Self {
        let mut element = Self::new(guid, element_type);
        element.is_canvas_element = true;
        element.max_connections = 1;
        element.available_connections = vec![AvailableConnection::of_type(ConnectorType::Regular)];
        element
    }

    /// The End element synthesized whenever a branch must be terminated.
    pub fn end_element(guid: impl Into<Guid>) -> Self {
        let mut element = Self::new(guid, element_type::END);
        element.is_canvas_element = true;
        element.node_type = Some(NodeType::End);
        element
    }

    pub fn root_element() -> Self {
        let mut element = Self::new(super::ROOT_ELEMENT_GUID, element_type::ROOT);
        element.node_type = Some(NodeType::Root);
        element.children = Some(vec![None]);
        element.config.is_selectable = false;
        element
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_child_references<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Guid>,
    {
        self.child_references = children
            .into_iter()
            .map(|child| ChildReference {
                child_reference: child.into(),
            })
            .collect();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn is_end(&self) -> bool {
        self.node_type == Some(NodeType::End)
    }

    pub fn child_reference_guids(&self) -> impl Iterator<Item = &Guid> {
        self.child_references.iter().map(|c| &c.child_reference)
    }

    pub fn highlight_info_mut(&mut self) -> &mut HighlightInfo {
        self.config.highlight_info.get_or_insert_with(HighlightInfo::default)
    }

    /// Drops every auto-layout link, leaving a free-standing element.
    pub fn clear_topology(&mut self) {
        self.prev = None;
        self.next = None;
        self.parent = None;
        self.child_index = None;
        self.children = None;
        self.is_terminal = false;
        self.fault = None;
        self.incoming_goto.clear();
    }

    /// Merges the user-editable fields of `patch` into this element.
    ///
    /// Topology, selection state and connector bookkeeping stay untouched; they are
    /// maintained by the reducers.
    pub fn merge_from(&mut self, patch: &FlowElement) {
        if patch.name.is_some() {
            self.name.clone_from(&patch.name);
        }
        if patch.label.is_some() {
            self.label.clone_from(&patch.label);
        }
        self.element_type.clone_from(&patch.element_type);
        self.is_canvas_element |= patch.is_canvas_element;
        self.config.has_error = patch.config.has_error;
        if !patch.child_references.is_empty() {
            self.child_references.clone_from(&patch.child_references);
        }
        for (key, value) in &patch.properties {
            self.properties.insert(key.clone(), value.clone());
        }
    }
}
