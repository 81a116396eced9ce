use super::navigation::{find_first_element, resolve, resolve_mut};
use crate::error::FlowError;
use crate::model::{ChildIndex, ConnectorKey, ConnectorType, FlowElement, NodeType};
use crate::state::ElementMap;
use ahash::AHashSet;
use std::sync::Arc;

/// Marks the elements along each highlighted connector so the canvas can draw
/// merge points, loop-backs and fault paths.
pub fn decorate_canvas(flow: &mut ElementMap, connectors: &[ConnectorKey]) -> Result<(), FlowError> {
    for key in connectors {
        let Some(source) = flow.get(&key.source).map(Arc::clone) else {
            log::warn!("Skipping highlight of connector from missing element '{}'", key.source);
            continue;
        };
        match key.connector_type {
            ConnectorType::Fault => {
                resolve_mut(flow, &key.source, "highlighting")?
                    .highlight_info_mut()
                    .highlight_fault = true;
            }
            ConnectorType::LoopEnd => highlight_after(flow, &key.source)?,
            ConnectorType::LoopNext | ConnectorType::Immediate => highlight_branch(flow, &source, 0)?,
            ConnectorType::Default => {
                highlight_branch(flow, &source, source.child_references.len())?;
            }
            ConnectorType::Regular => match &key.child_source {
                Some(child) => {
                    let Some(position) = source.child_reference_guids().position(|c| c == child) else {
                        log::warn!("'{}' has no child '{}', skipping highlight", key.source, child);
                        continue;
                    };
                    let node_type = source.node_type.unwrap_or(NodeType::Leaf);
                    highlight_branch(flow, &source, node_type.branch_for_reference(position))?;
                }
                None => highlight_after(flow, &key.source)?,
            },
        }
    }
    Ok(())
}

/// Removes all decoration, leaving undecorated elements shared with the input.
pub fn clear_decoration(flow: &mut ElementMap) -> bool {
    let mut changed = false;
    for element in flow.values_mut() {
        if element.config.highlight_info.is_some() {
            Arc::make_mut(element).config.highlight_info = None;
            changed = true;
        }
    }
    changed
}

fn highlight_branch(flow: &mut ElementMap, parent: &FlowElement, index: usize) -> Result<(), FlowError> {
    let Some(children) = &parent.children else {
        return highlight_after(flow, &parent.guid);
    };
    let is_empty = children.get(index).is_some_and(Option::is_none);
    let is_loop = parent.node_type == Some(NodeType::Loop);

    let info = resolve_mut(flow, &parent.guid, "highlighting a branch")?.highlight_info_mut();
    info.add_branch_index(index);
    if !is_empty {
        return Ok(());
    }
    if is_loop {
        info.highlight_loop_back = true;
        return Ok(());
    }
    if info.add_merge_branch_index(index) {
        highlight_after(flow, &parent.guid)?;
    }
    Ok(())
}

/// Follows the path leaving `start` along its main line, marking every merge point
/// passed on the way up until an element with a `next` link is reached.
fn highlight_after(flow: &mut ElementMap, start: &str) -> Result<(), FlowError> {
    let mut visited = AHashSet::new();
    let mut current = start.to_string();
    loop {
        if !visited.insert(current.clone()) {
            return Err(FlowError::malformed(start, "highlight path revisits an element"));
        }
        let element = resolve(flow, &current, "highlighting")?;
        if element.is_end() {
            return Ok(());
        }
        if element.next.is_some() {
            resolve_mut(flow, &current, "highlighting")?
                .highlight_info_mut()
                .highlight_next = true;
            return Ok(());
        }

        let head = find_first_element(flow, &current)?;
        let head = resolve(flow, &head, "highlighting")?;
        let (Some(parent), Some(index)) = (head.parent.clone(), head.child_index) else {
            return Ok(());
        };
        let parent_type = resolve(flow, &parent, "highlighting")?.node_type;
        match (parent_type, index) {
            (Some(NodeType::Root), _) | (_, ChildIndex::Fault) => return Ok(()),
            (Some(NodeType::Loop), _) => {
                resolve_mut(flow, &parent, "highlighting")?
                    .highlight_info_mut()
                    .highlight_loop_back = true;
                return Ok(());
            }
            (_, ChildIndex::Branch(index)) => {
                let info = resolve_mut(flow, &parent, "highlighting")?.highlight_info_mut();
                if !info.add_merge_branch_index(index) {
                    return Ok(());
                }
            }
        }
        current = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_decoration_reports_whether_anything_changed() {
        let mut decorated = FlowElement::canvas("a", "Assignment");
        decorated.highlight_info_mut().highlight_next = true;
        let mut flow: ElementMap = [decorated, FlowElement::canvas("b", "Assignment")]
            .into_iter()
            .map(|e| (e.guid.clone(), Arc::new(e)))
            .collect();

        assert!(clear_decoration(&mut flow));
        assert!(!clear_decoration(&mut flow));
        assert!(flow["a"].config.highlight_info.is_none());
    }
}
