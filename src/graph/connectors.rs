use super::navigation::{find_first_element, is_goto_link, resolve};
use crate::error::FlowError;
use crate::model::{ChildIndex, ConnectionSource, Connector, ConnectorType, FlowElement, Guid, NodeType};
use crate::state::ElementMap;
use itertools::Itertools;

/// The element reached when leaving `guid` along its main line: its `next`, or the
/// merge point of the closest enclosing branch that rejoins, or the loop it closes.
pub fn successor_after(flow: &ElementMap, guid: &str) -> Result<Option<Guid>, FlowError> {
    let mut current = guid.to_string();
    for _ in 0..=flow.len() {
        let element = resolve(flow, &current, "finding a successor")?;
        if let Some(next) = &element.next {
            return Ok(Some(next.clone()));
        }
        if element.is_end() {
            return Ok(None);
        }
        let head = find_first_element(flow, &current)?;
        let head = resolve(flow, &head, "finding a successor")?;
        let (Some(parent), Some(index)) = (&head.parent, head.child_index) else {
            return Ok(None);
        };
        match (resolve(flow, parent, "finding a successor")?.node_type, index) {
            (Some(NodeType::Root), _) | (_, ChildIndex::Fault) => return Ok(None),
            (Some(NodeType::Loop), _) => return Ok(Some(parent.clone())),
            _ => current = parent.clone(),
        }
    }
    Err(FlowError::malformed(guid, "parent links form a cycle"))
}

/// Derives the connector list the canvas draws for an auto-layout flow.
///
/// Connector guids are stable: `{source}:{slot}`.
pub fn derive_connectors(flow: &ElementMap) -> Result<Vec<Connector>, FlowError> {
    let mut connectors = Vec::new();
    for guid in flow.keys().sorted() {
        let element = resolve(flow, guid, "deriving connectors")?;
        let Some(node_type) = element.node_type else {
            continue;
        };
        if matches!(node_type, NodeType::Root | NodeType::End) {
            continue;
        }
        derive_for_element(flow, element, node_type, &mut connectors)?;
    }
    Ok(connectors)
}

fn derive_for_element(
    flow: &ElementMap,
    element: &FlowElement,
    node_type: NodeType,
    out: &mut Vec<Connector>,
) -> Result<(), FlowError> {
    let guid = &element.guid;
    let references: Vec<&Guid> = element.child_reference_guids().collect();

    if let Some(children) = &element.children {
        for (index, slot) in children.iter().enumerate() {
            let connector_type = node_type.branch_connector_type(index, references.len());
            let source = ConnectionSource::branch(guid, index);
            let target = match slot {
                Some(target) => Some(target.clone()),
                None if node_type == NodeType::Loop => Some(guid.clone()),
                None => successor_after(flow, guid)?,
            };
            if let Some(target) = target {
                let mut connector = Connector::new(format!("{guid}:{index}"), guid, &target, connector_type);
                connector.is_goto = is_goto_link(flow, &source, &target);
                if let Some(reference) = node_type
                    .reference_for_branch(index, references.len())
                    .and_then(|r| references.get(r))
                {
                    connector.child_source = Some((*reference).clone());
                }
                out.push(connector);
            }
        }
    }

    let merges_only = element.children.is_some() && node_type.merges_branches();
    let next_target = match &element.next {
        Some(next) => Some(next.clone()),
        None if merges_only => None,
        None => successor_after(flow, guid)?,
    };
    if let Some(target) = next_target {
        let connector_type = if node_type == NodeType::Loop {
            ConnectorType::LoopEnd
        } else {
            ConnectorType::Regular
        };
        let mut connector = Connector::new(format!("{guid}:next"), guid, &target, connector_type);
        connector.is_goto = is_goto_link(flow, &ConnectionSource::next(guid), &target);
        out.push(connector);
    }

    if let Some(fault) = &element.fault {
        let mut connector = Connector::new(format!("{guid}:fault"), guid, fault, ConnectorType::Fault);
        connector.is_goto = is_goto_link(flow, &ConnectionSource::fault(guid), fault);
        out.push(connector);
    }
    Ok(())
}
