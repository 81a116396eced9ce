//! The flow model: elements, connectors and the slots that link them.
//!
//! A flow is an arena of [`FlowElement`]s keyed by guid. Auto-layout topology is
//! expressed on the elements themselves (`prev`/`next`, branch heads pointing back
//! at their `parent`, fixed-length `children` arrays) rather than through a
//! separate edge list. The flat [`Connector`] list is only maintained for the
//! free-form canvas and for selection/highlight state.

use serde::{Deserialize, Serialize};
use std::fmt;

mod connector;
mod element;
mod guid;

pub use connector::{Connector, ConnectorConfig, ConnectorKey, ConnectorType};
pub use element::{
    AvailableConnection, ChildReference, ElementConfig, FlowElement, HighlightInfo,
};
pub use guid::{GuidGenerator, SequentialGuidGenerator, UuidGenerator};

/// Opaque unique identifier of an element or connector.
pub type Guid = String;

/// Guid of the synthetic element that owns the main line of an auto-layout flow.
pub const ROOT_ELEMENT_GUID: &str = "root";

/// Element type names understood by the default metadata registry.
pub mod element_type {
    pub const ROOT: &str = "root";
    pub const START: &str = "START_ELEMENT";
    pub const END: &str = "END_ELEMENT";
    pub const DECISION: &str = "Decision";
    pub const WAIT: &str = "Wait";
    pub const LOOP: &str = "Loop";
    pub const SCREEN: &str = "Screen";
    pub const ASSIGNMENT: &str = "Assignment";
    pub const ACTION_CALL: &str = "ActionCall";
    pub const SUBFLOW: &str = "Subflow";
    pub const RECORD_CREATE: &str = "RecordCreate";
    pub const RECORD_UPDATE: &str = "RecordUpdate";
    pub const RECORD_LOOKUP: &str = "RecordLookup";
    pub const RECORD_DELETE: &str = "RecordDelete";

    pub const OUTCOME: &str = "OUTCOME";
    pub const WAIT_EVENT: &str = "WAIT_EVENT";
    pub const SCHEDULED_PATH: &str = "SCHEDULED_PATH";
    pub const SCREEN_FIELD: &str = "SCREEN_FIELD";
}

/// Layout role of an element in the auto-layout graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Root,
    Start,
    Leaf,
    Decision,
    Wait,
    Loop,
    ScreenRegion,
    End,
}

impl NodeType {
    /// Number of branches a node of this type holds given its child reference count,
    /// or `None` when the node has no `children` array.
    pub fn branch_count(self, child_references: usize) -> Option<usize> {
        match self {
            NodeType::Root | NodeType::Loop => Some(1),
            NodeType::Decision | NodeType::Wait => Some(child_references + 1),
            NodeType::ScreenRegion => Some(child_references),
            NodeType::Start if child_references > 0 => Some(child_references + 1),
            NodeType::Start | NodeType::Leaf | NodeType::End => None,
        }
    }

    /// Branch index that hosts the given child reference.
    pub fn branch_for_reference(self, reference_index: usize) -> usize {
        match self {
            NodeType::Start => reference_index + 1,
            _ => reference_index,
        }
    }

    /// Child reference index hosted by a branch, if the branch belongs to a child.
    pub fn reference_for_branch(self, branch_index: usize, child_references: usize) -> Option<usize> {
        match self {
            NodeType::Start => branch_index.checked_sub(1),
            NodeType::Decision | NodeType::Wait | NodeType::ScreenRegion => {
                (branch_index < child_references).then_some(branch_index)
            }
            _ => None,
        }
    }

    /// Connector type drawn for a branch of this node.
    pub fn branch_connector_type(self, branch_index: usize, child_references: usize) -> ConnectorType {
        match self {
            NodeType::Decision | NodeType::Wait if branch_index == child_references => {
                ConnectorType::Default
            }
            NodeType::Start if branch_index == 0 => ConnectorType::Immediate,
            NodeType::Loop => ConnectorType::LoopNext,
            _ => ConnectorType::Regular,
        }
    }

    /// Whether branches of this node rejoin at a merge point below it.
    pub fn merges_branches(self) -> bool {
        !matches!(self, NodeType::Root | NodeType::Loop)
    }
}

/// Position of a branch under its parent element.
///
/// On the wire a branch index is a plain number and the fault branch is `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ChildIndex {
    Branch(usize),
    Fault,
}

pub const FAULT_INDEX: i64 = -1;

impl From<ChildIndex> for i64 {
    fn from(index: ChildIndex) -> Self {
        match index {
            ChildIndex::Branch(i) => i as i64,
            ChildIndex::Fault => FAULT_INDEX,
        }
    }
}

impl TryFrom<i64> for ChildIndex {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            FAULT_INDEX => Ok(ChildIndex::Fault),
            v if v >= 0 => Ok(ChildIndex::Branch(v as usize)),
            v => Err(format!("invalid child index {v}")),
        }
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildIndex::Branch(i) => write!(f, "{i}"),
            ChildIndex::Fault => write!(f, "fault"),
        }
    }
}

/// An outgoing slot of an element: its `next` link, one of its branches, or its
/// fault branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSource {
    pub guid: Guid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_index: Option<ChildIndex>,
}

impl ConnectionSource {
    pub fn next(guid: impl Into<Guid>) -> Self {
        Self {
            guid: guid.into(),
            child_index: None,
        }
    }

    pub fn branch(guid: impl Into<Guid>, index: usize) -> Self {
        Self {
            guid: guid.into(),
            child_index: Some(ChildIndex::Branch(index)),
        }
    }

    pub fn fault(guid: impl Into<Guid>) -> Self {
        Self {
            guid: guid.into(),
            child_index: Some(ChildIndex::Fault),
        }
    }

    pub fn with_child_index(guid: impl Into<Guid>, child_index: Option<ChildIndex>) -> Self {
        Self {
            guid: guid.into(),
            child_index,
        }
    }
}

impl fmt::Display for ConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.child_index {
            None => write!(f, "'{}'", self.guid),
            Some(index) => write!(f, "'{}'[{}]", self.guid, index),
        }
    }
}
