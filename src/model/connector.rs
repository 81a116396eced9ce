use super::Guid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorType {
    Regular,
    Default,
    Fault,
    Immediate,
    LoopNext,
    LoopEnd,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectorConfig {
    pub is_selected: bool,
    pub is_highlighted: bool,
}

/// A directed edge between two elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub guid: Guid,
    pub source: Guid,
    pub target: Guid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_source: Option<Guid>,
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "isGoTo")]
    pub is_goto: bool,
    #[serde(default)]
    pub config: ConnectorConfig,
}

impl Connector {
    pub fn new(
        guid: impl Into<Guid>,
        source: impl Into<Guid>,
        target: impl Into<Guid>,
        connector_type: ConnectorType,
    ) -> Self {
        Self {
            guid: guid.into(),
            source: source.into(),
            target: target.into(),
            child_source: None,
            connector_type,
            label: None,
            is_goto: false,
            config: ConnectorConfig::default(),
        }
    }

    pub fn with_child_source(mut self, child_source: impl Into<Guid>) -> Self {
        self.child_source = Some(child_source.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn key(&self) -> ConnectorKey {
        ConnectorKey {
            source: self.source.clone(),
            connector_type: self.connector_type,
            child_source: self.child_source.clone(),
        }
    }

    /// Whether this connector is the one a highlight request names.
    pub fn matches_key(&self, key: &ConnectorKey) -> bool {
        self.source == key.source
            && self.connector_type == key.connector_type
            && (key.child_source.is_none() || self.child_source == key.child_source)
    }
}

/// Identifies a connector by where it leaves from rather than by guid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorKey {
    pub source: Guid,
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_source: Option<Guid>,
}

impl ConnectorKey {
    pub fn new(source: impl Into<Guid>, connector_type: ConnectorType) -> Self {
        Self {
            source: source.into(),
            connector_type,
            child_source: None,
        }
    }

    pub fn with_child_source(mut self, child_source: impl Into<Guid>) -> Self {
        self.child_source = Some(child_source.into());
        self
    }
}
