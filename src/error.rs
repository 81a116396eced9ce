use crate::model::{ConnectionSource, Guid};
use thiserror::Error;

/// Errors raised while reducing an action against the flow state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("Element '{guid}' not found while {context}")]
    ElementNotFound { guid: Guid, context: String },

    #[error("Element '{guid}' has an unregistered element type: '{element_type}'")]
    UnknownElementType { guid: Guid, element_type: String },

    #[error("Invalid connection from {from} to '{target}': {message}")]
    InvalidConnection {
        from: ConnectionSource,
        target: Guid,
        message: String,
    },

    #[error("Invalid operation on '{guid}': {message}")]
    InvalidOperation { guid: Guid, message: String },

    #[error("Malformed graph around '{guid}': {message}")]
    MalformedGraph { guid: Guid, message: String },

    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl FlowError {
    pub(crate) fn not_found(guid: &str, context: &str) -> Self {
        FlowError::ElementNotFound {
            guid: guid.to_string(),
            context: context.to_string(),
        }
    }

    pub(crate) fn invalid_operation(guid: &str, message: impl Into<String>) -> Self {
        FlowError::InvalidOperation {
            guid: guid.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(guid: &str, message: impl Into<String>) -> Self {
        FlowError::MalformedGraph {
            guid: guid.to_string(),
            message: message.into(),
        }
    }
}

/// A structural inconsistency detected by the auto-layout assertion pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("Element '{guid}' references missing element '{missing}'")]
    DanglingReference { guid: Guid, missing: Guid },

    #[error("Child '{child}' of '{parent}' at branch {index} does not point back at its parent")]
    ChildBackReference {
        parent: Guid,
        child: Guid,
        index: String,
    },

    #[error("Link between '{guid}' and '{other}' is one-sided")]
    LinkMismatch { guid: Guid, other: Guid },

    #[error("Goto link {from} -> '{target}' is not recorded on both ends")]
    GotoMismatch { from: ConnectionSource, target: Guid },

    #[error("Branch headed by '{head}' stores isTerminal={stored}, computed {computed}")]
    TerminalMismatch {
        head: Guid,
        stored: bool,
        computed: bool,
    },

    #[error("Branch headed by '{0}' must be terminal")]
    UnterminatedBranch(Guid),

    #[error("End element '{0}' has outgoing links")]
    EndWithSuccessor(Guid),

    #[error("Element '{guid}' has {actual} branches, expected {expected}")]
    BranchCount {
        guid: Guid,
        actual: usize,
        expected: usize,
    },

    #[error("Element '{guid}' has connectorCount {stored} but {actual} connectors")]
    ConnectorCount {
        guid: Guid,
        stored: usize,
        actual: usize,
    },

    #[error("Connector '{connector}' references missing element '{missing}'")]
    OrphanedConnector { connector: Guid, missing: Guid },

    #[error("Element '{0}' is not reachable from the root")]
    Unreachable(Guid),
}

/// Errors raised while loading a [`StoreConfig`](crate::config::StoreConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Copy label template '{template}' has no '{{n}}' placeholder")]
    CopyLabelTemplate { template: String },
}
