use super::navigation::{is_goto_link, outgoing_slots, slot_target};
use super::terminal::compute_branch_terminal;
use crate::error::{FlowError, InvariantViolation};
use crate::model::{ChildIndex, ConnectionSource, Connector, FlowElement, Guid, NodeType, ROOT_ELEMENT_GUID};
use crate::state::ElementMap;
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;

/// Checks every structural invariant of an auto-layout flow and reports the first
/// violation found.
pub fn assert_auto_layout_state(flow: &ElementMap, connectors: &[Connector]) -> Result<(), FlowError> {
    for guid in flow.keys().sorted() {
        let element = &flow[guid];
        if element.node_type.is_none() {
            continue;
        }
        check_links(flow, element)?;
        check_branches(flow, element)?;
        check_incoming_gotos(flow, element)?;
    }
    check_reachability(flow)?;
    check_connectors(flow, connectors)?;
    Ok(())
}

fn violation(v: InvariantViolation) -> FlowError {
    FlowError::Invariant(v)
}

fn target_of(flow: &ElementMap, guid: &str, missing: &str) -> Result<(), FlowError> {
    if flow.contains_key(missing) {
        Ok(())
    } else {
        Err(violation(InvariantViolation::DanglingReference {
            guid: guid.to_string(),
            missing: missing.to_string(),
        }))
    }
}

fn check_links(flow: &ElementMap, element: &FlowElement) -> Result<(), FlowError> {
    let guid = &element.guid;
    if element.is_end() && (element.next.is_some() || element.children.is_some() || element.fault.is_some()) {
        return Err(violation(InvariantViolation::EndWithSuccessor(guid.clone())));
    }

    if let Some(next) = &element.next {
        target_of(flow, guid, next)?;
        let source = ConnectionSource::next(guid);
        if !is_goto_link(flow, &source, next) && flow[next].prev.as_ref() != Some(guid) {
            return Err(violation(InvariantViolation::LinkMismatch {
                guid: guid.clone(),
                other: next.clone(),
            }));
        }
    }

    if let Some(prev) = &element.prev {
        target_of(flow, guid, prev)?;
        let prev_element = &flow[prev];
        let linked = prev_element.next.as_ref() == Some(guid)
            && !is_goto_link(flow, &ConnectionSource::next(prev), guid);
        if !linked || element.parent.is_some() {
            return Err(violation(InvariantViolation::LinkMismatch {
                guid: guid.clone(),
                other: prev.clone(),
            }));
        }
    }

    if let (Some(parent), Some(index)) = (&element.parent, element.child_index) {
        target_of(flow, guid, parent)?;
        let source = ConnectionSource::with_child_index(parent, Some(index));
        let held = slot_target(flow, &source).ok().flatten();
        if held.as_ref() != Some(guid) {
            return Err(violation(InvariantViolation::ChildBackReference {
                parent: parent.clone(),
                child: guid.clone(),
                index: index.to_string(),
            }));
        }
    }
    Ok(())
}

fn check_branches(flow: &ElementMap, element: &FlowElement) -> Result<(), FlowError> {
    let guid = &element.guid;
    let Some(node_type) = element.node_type else {
        return Ok(());
    };

    let expected = node_type.branch_count(element.child_references.len());
    let actual = element.children.as_ref().map(Vec::len);
    if expected != actual {
        return Err(violation(InvariantViolation::BranchCount {
            guid: guid.clone(),
            actual: actual.unwrap_or(0),
            expected: expected.unwrap_or(0),
        }));
    }

    let mut slots: Vec<(ChildIndex, &Guid)> = Vec::new();
    if let Some(children) = &element.children {
        slots.extend(
            children
                .iter()
                .enumerate()
                .filter_map(|(i, slot)| slot.as_ref().map(|target| (ChildIndex::Branch(i), target))),
        );
    }
    if let Some(fault) = &element.fault {
        slots.push((ChildIndex::Fault, fault));
    }

    for (index, target) in slots {
        target_of(flow, guid, target)?;
        let source = ConnectionSource::with_child_index(guid, Some(index));
        if is_goto_link(flow, &source, target) {
            continue;
        }
        let head = &flow[target];
        if head.parent.as_ref() != Some(guid) || head.child_index != Some(index) || head.prev.is_some() {
            return Err(violation(InvariantViolation::ChildBackReference {
                parent: guid.clone(),
                child: target.clone(),
                index: index.to_string(),
            }));
        }
        let computed = compute_branch_terminal(flow, target)?;
        if computed != head.is_terminal {
            return Err(violation(InvariantViolation::TerminalMismatch {
                head: target.clone(),
                stored: head.is_terminal,
                computed,
            }));
        }
        let must_terminate = index == ChildIndex::Fault || node_type == NodeType::Root;
        if must_terminate && !computed {
            return Err(violation(InvariantViolation::UnterminatedBranch(target.clone())));
        }
    }
    Ok(())
}

fn check_incoming_gotos(flow: &ElementMap, element: &FlowElement) -> Result<(), FlowError> {
    for source in &element.incoming_goto {
        let held = match flow.get(&source.guid) {
            Some(_) => slot_target(flow, source).ok().flatten(),
            None => None,
        };
        if held.as_ref() != Some(&element.guid) {
            return Err(violation(InvariantViolation::GotoMismatch {
                from: source.clone(),
                target: element.guid.clone(),
            }));
        }
    }
    Ok(())
}

fn check_reachability(flow: &ElementMap) -> Result<(), FlowError> {
    if !flow.contains_key(ROOT_ELEMENT_GUID) {
        return Ok(());
    }
    let mut reached = AHashSet::new();
    let mut pending = vec![ROOT_ELEMENT_GUID.to_string()];
    while let Some(current) = pending.pop() {
        if !reached.insert(current.clone()) {
            continue;
        }
        let Some(element) = flow.get(&current) else {
            continue;
        };
        for slot in outgoing_slots(element) {
            if let Ok(Some(target)) = slot_target(flow, &slot) {
                if !is_goto_link(flow, &slot, &target) {
                    pending.push(target);
                }
            }
        }
    }

    let unreachable = flow
        .iter()
        .filter(|(guid, element)| element.node_type.is_some() && !reached.contains(*guid))
        .map(|(guid, _)| guid)
        .sorted()
        .next();
    match unreachable {
        Some(guid) => Err(violation(InvariantViolation::Unreachable(guid.clone()))),
        None => Ok(()),
    }
}

fn check_connectors(flow: &ElementMap, connectors: &[Connector]) -> Result<(), FlowError> {
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for connector in connectors {
        for endpoint in [&connector.source, &connector.target] {
            if !flow.contains_key(endpoint) {
                return Err(violation(InvariantViolation::OrphanedConnector {
                    connector: connector.guid.clone(),
                    missing: endpoint.clone(),
                }));
            }
        }
        *counts.entry(connector.source.as_str()).or_default() += 1;
    }

    for guid in flow.keys().sorted() {
        let element = &flow[guid];
        let actual = counts.get(guid.as_str()).copied().unwrap_or(0);
        if element.connector_count != actual {
            return Err(violation(InvariantViolation::ConnectorCount {
                guid: guid.clone(),
                stored: element.connector_count,
                actual,
            }));
        }
    }
    Ok(())
}
