use super::linking::{link_chain, terminate_slot, unlink_element};
use super::navigation::{
    add_goto_source, find_last_element, find_parent_element, is_goto_link, outgoing_slots,
    remove_goto_source, resolve, resolve_mut, set_slot, slot_target,
};
use super::terminal::{compute_branch_terminal, is_branch_terminal, repair_at_slot};
use crate::error::FlowError;
use crate::model::{ChildIndex, ConnectionSource, Guid, GuidGenerator, NodeType};
use crate::state::ElementMap;
use ahash::AHashSet;
use itertools::Itertools;

/// Removes an element and everything it owns through child references
/// (outcomes, wait events, screen fields and their own children).
pub fn remove_with_owned(flow: &mut ElementMap, guid: &str) -> Vec<Guid> {
    let mut removed = Vec::new();
    let mut pending = vec![guid.to_string()];
    while let Some(current) = pending.pop() {
        if let Some(element) = flow.remove(&current) {
            pending.extend(element.child_reference_guids().cloned());
            removed.push(current);
        }
    }
    removed
}

/// Collects the chain starting at `head` plus everything nested in its branches.
fn collect_subtree(flow: &ElementMap, head: &str) -> Result<Vec<Guid>, FlowError> {
    let mut seen = AHashSet::new();
    let mut ordered = Vec::new();
    let mut pending = vec![head.to_string()];
    while let Some(current) = pending.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        let element = resolve(flow, &current, "collecting elements to delete")?;
        for slot in outgoing_slots(element) {
            if let Some(target) = slot_target(flow, &slot)? {
                if !is_goto_link(flow, &slot, &target) {
                    pending.push(target);
                }
            }
        }
        ordered.push(current);
    }
    Ok(ordered)
}

/// Deletes a detached chain and all of its nested branches.
///
/// Gotos leaving the deleted region are unregistered on their targets; gotos
/// entering it from outside are replaced by End elements.
pub fn delete_chain(flow: &mut ElementMap, head: &str, guids: &dyn GuidGenerator) -> Result<Vec<Guid>, FlowError> {
    let doomed = collect_subtree(flow, head)?;
    let doomed_set: AHashSet<&str> = doomed.iter().map(String::as_str).collect();

    let mut outgoing = Vec::new();
    let mut dangling = Vec::new();
    for guid in &doomed {
        let element = resolve(flow, guid, "deleting a chain")?;
        for slot in outgoing_slots(element) {
            if let Some(target) = slot_target(flow, &slot)? {
                if is_goto_link(flow, &slot, &target) {
                    outgoing.push((target, slot));
                }
            }
        }
        dangling.extend(
            element
                .incoming_goto
                .iter()
                .filter(|source| !doomed_set.contains(source.guid.as_str()))
                .cloned(),
        );
    }

    for (target, slot) in &outgoing {
        if flow.contains_key(target) {
            remove_goto_source(flow, target, slot)?;
        }
    }

    let mut removed = Vec::new();
    for guid in &doomed {
        removed.extend(remove_with_owned(flow, guid));
    }

    for source in dangling.into_iter().unique() {
        if !flow.contains_key(&source.guid) {
            continue;
        }
        set_slot(flow, &source, None)?;
        terminate_slot(flow, &source, guids)?;
    }

    log::debug!("Deleted chain headed by '{}' ({} elements)", head, removed.len());
    Ok(removed)
}

/// Deletes one branch of `parent`, leaving the slot empty.
pub fn delete_branch(
    flow: &mut ElementMap,
    parent: &str,
    index: ChildIndex,
    guids: &dyn GuidGenerator,
) -> Result<(), FlowError> {
    let source = ConnectionSource::with_child_index(parent, Some(index));
    match slot_target(flow, &source)? {
        None => {}
        Some(target) if is_goto_link(flow, &source, &target) => {
            remove_goto_source(flow, &target, &source)?;
            set_slot(flow, &source, None)?;
        }
        Some(head) => {
            set_slot(flow, &source, None)?;
            delete_chain(flow, &head, guids)?;
        }
    }
    Ok(())
}

/// Drops whatever follows `guid` in its branch.
pub fn remove_continuation(flow: &mut ElementMap, guid: &str, guids: &dyn GuidGenerator) -> Result<(), FlowError> {
    let source = ConnectionSource::next(guid);
    match slot_target(flow, &source)? {
        None => {}
        Some(target) if is_goto_link(flow, &source, &target) => {
            remove_goto_source(flow, &target, &source)?;
            set_slot(flow, &source, None)?;
        }
        Some(follower) => {
            set_slot(flow, &source, None)?;
            resolve_mut(flow, &follower, "removing a continuation")?.prev = None;
            delete_chain(flow, &follower, guids)?;
        }
    }
    Ok(())
}

/// Deletes a placed element from the layout.
///
/// All branches are deleted except `child_index_to_keep`, whose content takes the
/// element's place. A merging parent whose branches all terminated is replaced by an
/// End. Gotos into the element are redirected to its follower, or terminated when
/// there is none.
pub fn delete_element(
    flow: &mut ElementMap,
    guid: &str,
    child_index_to_keep: Option<usize>,
    guids: &dyn GuidGenerator,
) -> Result<Vec<Guid>, FlowError> {
    let element = resolve(flow, guid, "deleting an element")?;
    match element.node_type {
        Some(NodeType::Root) | Some(NodeType::Start) => {
            return Err(FlowError::invalid_operation(guid, "the root and start elements cannot be deleted"));
        }
        Some(NodeType::End) => {
            if let Some((parent, _)) = find_parent_element(flow, guid)? {
                if resolve(flow, &parent, "deleting an element")?.node_type == Some(NodeType::Root) {
                    return Err(FlowError::invalid_operation(guid, "the End of the main flow cannot be deleted"));
                }
            }
        }
        _ => {}
    }

    let element = resolve(flow, guid, "deleting an element")?;
    let anchor = match (&element.prev, &element.parent) {
        (Some(prev), _) => Some(ConnectionSource::next(prev)),
        (None, Some(parent)) => Some(ConnectionSource::with_child_index(parent, element.child_index)),
        (None, None) => None,
    };
    let branch_count = element.children.as_ref().map_or(0, Vec::len);
    let has_fault = element.fault.is_some();
    let terminal_parent = element.next.is_none()
        && branch_count > 0
        && element.node_type.is_some_and(NodeType::merges_branches)
        && (0..branch_count)
            .map(|index| is_branch_terminal(flow, guid, ChildIndex::Branch(index)))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .all(|terminal| terminal);

    for index in (0..branch_count).filter(|index| Some(*index) != child_index_to_keep) {
        delete_branch(flow, guid, ChildIndex::Branch(index), guids)?;
    }
    if has_fault {
        delete_branch(flow, guid, ChildIndex::Fault, guids)?;
    }

    match child_index_to_keep {
        Some(index) if index < branch_count => hoist_branch(flow, guid, index, guids)?,
        _ if terminal_parent => {
            terminate_slot(flow, &ConnectionSource::next(guid), guids)?;
        }
        _ => {}
    }

    redirect_incoming_gotos(flow, guid, guids)?;
    unlink_element(flow, guid)?;
    let removed = remove_with_owned(flow, guid);
    log::debug!("Deleted element '{}'", guid);

    if let Some(anchor) = anchor {
        repair_at_slot(flow, &anchor, guids)?;
    }
    Ok(removed)
}

/// Moves the content of branch `index` of `guid` right after it, so that unlinking
/// `guid` leaves the branch content in its place. A terminal branch replaces the
/// continuation instead of preceding it.
pub fn hoist_branch(flow: &mut ElementMap, guid: &str, index: usize, guids: &dyn GuidGenerator) -> Result<(), FlowError> {
    let branch = ConnectionSource::branch(guid, index);
    let Some(target) = slot_target(flow, &branch)? else {
        return Ok(());
    };

    if is_goto_link(flow, &branch, &target) {
        remove_goto_source(flow, &target, &branch)?;
        set_slot(flow, &branch, None)?;
        remove_continuation(flow, guid, guids)?;
        let next = ConnectionSource::next(guid);
        set_slot(flow, &next, Some(target.clone()))?;
        return add_goto_source(flow, &target, &next);
    }

    let head = target;
    let tail = find_last_element(flow, &head)?;
    if compute_branch_terminal(flow, &head)? {
        remove_continuation(flow, guid, guids)?;
    }
    set_slot(flow, &branch, None)?;
    {
        let head_element = resolve_mut(flow, &head, "keeping a branch")?;
        head_element.parent = None;
        head_element.child_index = None;
        head_element.is_terminal = false;
    }
    link_chain(flow, &ConnectionSource::next(guid), &head, &tail)
}

fn redirect_incoming_gotos(flow: &mut ElementMap, guid: &str, guids: &dyn GuidGenerator) -> Result<(), FlowError> {
    let element = resolve(flow, guid, "redirecting gotos")?;
    if element.incoming_goto.is_empty() {
        return Ok(());
    }
    let sources = element.incoming_goto.clone();
    let own_next = ConnectionSource::next(guid);
    let follower = element
        .next
        .clone()
        .filter(|next| !is_goto_link(flow, &own_next, next))
        .filter(|next| flow.get(next).is_some_and(|f| !f.is_end()));

    resolve_mut(flow, guid, "redirecting gotos")?.incoming_goto.clear();
    for source in sources {
        set_slot(flow, &source, None)?;
        match &follower {
            Some(follower) if *follower != source.guid => {
                set_slot(flow, &source, Some(follower.clone()))?;
                add_goto_source(flow, follower, &source)?;
            }
            _ => {
                terminate_slot(flow, &source, guids)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlowElement, SequentialGuidGenerator};
    use std::sync::Arc;

    #[test]
    fn remove_with_owned_follows_nested_child_references() {
        let screen = FlowElement::canvas("screen", "Screen").with_child_references(["section"]);
        let section = FlowElement::new("section", "SCREEN_FIELD").with_child_references(["field"]);
        let field = FlowElement::new("field", "SCREEN_FIELD");
        let other = FlowElement::new("other", "SCREEN_FIELD");
        let mut flow: ElementMap = [screen, section, field, other]
            .into_iter()
            .map(|e| (e.guid.clone(), Arc::new(e)))
            .collect();

        let mut removed = remove_with_owned(&mut flow, "screen");
        removed.sort();

        assert_eq!(removed, vec!["field", "screen", "section"]);
        assert!(flow.contains_key("other"));
    }

    #[test]
    fn delete_chain_terminates_gotos_from_outside() {
        let guids = SequentialGuidGenerator::new("end-");
        let mut b = FlowElement::canvas("b", "Assignment");
        b.node_type = Some(NodeType::Leaf);
        b.incoming_goto.push(ConnectionSource::next("x"));
        let mut x = FlowElement::canvas("x", "Assignment");
        x.node_type = Some(NodeType::Leaf);
        x.next = Some("b".into());
        let mut flow: ElementMap = [b, x]
            .into_iter()
            .map(|e| (e.guid.clone(), Arc::new(e)))
            .collect();

        let removed = delete_chain(&mut flow, "b", &guids).unwrap();

        assert_eq!(removed, vec!["b"]);
        assert_eq!(flow["x"].next.as_deref(), Some("end-0"));
        assert!(flow["end-0"].is_end());
        assert_eq!(flow["end-0"].prev.as_deref(), Some("x"));
    }
}
