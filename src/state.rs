//! Immutable state slices shared between reductions.
//!
//! Every slice is reference counted. A reducer that has nothing to change returns
//! a clone of the input handle, so callers can detect "no change" with `ptr_eq`.
//! Mutation goes through `Arc::make_mut`, which copies only what is shared.

use crate::model::{Connector, FlowElement, Guid};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type ElementMap = AHashMap<Guid, Arc<FlowElement>>;

/// The elements slice: every element of the flow keyed by guid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Elements(Arc<ElementMap>);

impl Elements {
    pub fn new(map: ElementMap) -> Self {
        Self(Arc::new(map))
    }

    pub fn get(&self, guid: &str) -> Option<&FlowElement> {
        self.0.get(guid).map(Arc::as_ref)
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.0.contains_key(guid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Guid, &FlowElement)> {
        self.0.iter().map(|(guid, element)| (guid, element.as_ref()))
    }

    pub fn map(&self) -> &ElementMap {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Elements) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Same guids mapped to equal elements, whether or not the handles are shared.
    pub fn same_entries(&self, other: &Elements) -> bool {
        self.ptr_eq(other)
            || (self.0.len() == other.0.len()
                && self.0.iter().all(|(guid, element)| {
                    other
                        .0
                        .get(guid)
                        .is_some_and(|theirs| Arc::ptr_eq(element, theirs) || element == theirs)
                }))
    }

    pub(crate) fn make_mut(&mut self) -> &mut ElementMap {
        Arc::make_mut(&mut self.0)
    }
}

impl FromIterator<FlowElement> for Elements {
    fn from_iter<T: IntoIterator<Item = FlowElement>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|element| (element.guid.clone(), Arc::new(element)))
                .collect(),
        )
    }
}

/// The connectors slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Connectors(Arc<Vec<Connector>>);

impl Connectors {
    pub fn new(connectors: Vec<Connector>) -> Self {
        Self(Arc::new(connectors))
    }

    pub fn get(&self, guid: &str) -> Option<&Connector> {
        self.0.iter().find(|c| c.guid == guid)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Connector> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Connector] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ptr_eq(&self, other: &Connectors) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn make_mut(&mut self) -> &mut Vec<Connector> {
        Arc::make_mut(&mut self.0)
    }
}

impl FromIterator<Connector> for Connectors {
    fn from_iter<T: IntoIterator<Item = Connector>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Flow-level properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
    pub has_unsaved_changes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_inserted_resource: Option<Guid>,
    pub is_auto_layout_canvas: bool,
}

/// The full store state: one handle per slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowState {
    pub elements: Elements,
    pub connectors: Connectors,
    pub properties: Arc<FlowProperties>,
}

impl FlowState {
    /// An empty flow on the auto-layout canvas.
    pub fn auto_layout() -> Self {
        Self {
            properties: Arc::new(FlowProperties {
                is_auto_layout_canvas: true,
                ..FlowProperties::default()
            }),
            ..Self::default()
        }
    }

    /// Whether every slice is the identical handle of `other`.
    pub fn ptr_eq(&self, other: &FlowState) -> bool {
        self.elements.ptr_eq(&other.elements)
            && self.connectors.ptr_eq(&other.connectors)
            && Arc::ptr_eq(&self.properties, &other.properties)
    }
}
