use crate::error::FlowError;
use crate::model::{ChildIndex, ConnectionSource, FlowElement, Guid};
use crate::state::ElementMap;
use std::sync::Arc;

pub fn resolve<'a>(flow: &'a ElementMap, guid: &str, context: &str) -> Result<&'a FlowElement, FlowError> {
    flow.get(guid)
        .map(Arc::as_ref)
        .ok_or_else(|| FlowError::not_found(guid, context))
}

/// Mutable access to an element, copying it first if it is shared with another state.
pub fn resolve_mut<'a>(
    flow: &'a mut ElementMap,
    guid: &str,
    context: &str,
) -> Result<&'a mut FlowElement, FlowError> {
    flow.get_mut(guid)
        .map(Arc::make_mut)
        .ok_or_else(|| FlowError::not_found(guid, context))
}

/// Whether the link from `source` into `target` is a goto rather than a layout link.
pub fn is_goto_link(flow: &ElementMap, source: &ConnectionSource, target: &str) -> bool {
    flow.get(target)
        .is_some_and(|element| element.incoming_goto.contains(source))
}

/// Returns the guid currently held by a slot, goto or not.
pub fn slot_target(flow: &ElementMap, source: &ConnectionSource) -> Result<Option<Guid>, FlowError> {
    let element = resolve(flow, &source.guid, "reading a connection slot")?;
    match source.child_index {
        None => Ok(element.next.clone()),
        Some(ChildIndex::Fault) => Ok(element.fault.clone()),
        Some(ChildIndex::Branch(index)) => element
            .children
            .as_ref()
            .and_then(|children| children.get(index))
            .cloned()
            .ok_or_else(|| FlowError::invalid_operation(&source.guid, format!("has no branch {index}"))),
    }
}

pub(crate) fn set_slot(
    flow: &mut ElementMap,
    source: &ConnectionSource,
    value: Option<Guid>,
) -> Result<(), FlowError> {
    let element = resolve_mut(flow, &source.guid, "writing a connection slot")?;
    match source.child_index {
        None => element.next = value,
        Some(ChildIndex::Fault) => element.fault = value,
        Some(ChildIndex::Branch(index)) => {
            let slot = element
                .children
                .as_mut()
                .and_then(|children| children.get_mut(index))
                .ok_or_else(|| FlowError::invalid_operation(&source.guid, format!("has no branch {index}")))?;
            *slot = value;
        }
    }
    Ok(())
}

/// The head of a branch, or `None` when the branch is empty or holds a goto.
pub fn branch_head(flow: &ElementMap, parent: &str, index: ChildIndex) -> Result<Option<Guid>, FlowError> {
    let source = ConnectionSource::with_child_index(parent, Some(index));
    Ok(slot_target(flow, &source)?.filter(|target| !is_goto_link(flow, &source, target)))
}

/// Walks `prev` links back to the head of the branch containing `guid`.
pub fn find_first_element(flow: &ElementMap, guid: &str) -> Result<Guid, FlowError> {
    let mut current = resolve(flow, guid, "finding the head of its branch")?;
    for _ in 0..=flow.len() {
        match &current.prev {
            None => return Ok(current.guid.clone()),
            Some(prev) => current = resolve(flow, prev, "walking prev links")?,
        }
    }
    Err(FlowError::malformed(guid, "prev links form a cycle"))
}

/// Walks layout `next` links to the tail of the branch containing `guid`.
/// A goto ends the walk: its source is the tail.
pub fn find_last_element(flow: &ElementMap, guid: &str) -> Result<Guid, FlowError> {
    let mut current = resolve(flow, guid, "finding the tail of its branch")?;
    for _ in 0..=flow.len() {
        match &current.next {
            Some(next) if !is_goto_link(flow, &ConnectionSource::next(&current.guid), next) => {
                current = resolve(flow, next, "walking next links")?;
            }
            _ => return Ok(current.guid.clone()),
        }
    }
    Err(FlowError::malformed(guid, "next links form a cycle"))
}

/// The element owning the branch that contains `guid`, with the branch index.
pub fn find_parent_element(flow: &ElementMap, guid: &str) -> Result<Option<(Guid, ChildIndex)>, FlowError> {
    let head = find_first_element(flow, guid)?;
    let head = resolve(flow, &head, "finding the parent element")?;
    Ok(head.parent.clone().zip(head.child_index))
}

/// Guids of the main line of a branch, head first.
pub fn branch_elements(flow: &ElementMap, head: &str) -> Result<Vec<Guid>, FlowError> {
    let mut elements = vec![head.to_string()];
    let mut current = resolve(flow, head, "listing branch elements")?;
    while let Some(next) = &current.next {
        if is_goto_link(flow, &ConnectionSource::next(&current.guid), next) {
            break;
        }
        if elements.len() > flow.len() {
            return Err(FlowError::malformed(head, "next links form a cycle"));
        }
        elements.push(next.clone());
        current = resolve(flow, next, "listing branch elements")?;
    }
    Ok(elements)
}

/// Every outgoing slot of an element: `next`, each branch, then the fault slot.
pub fn outgoing_slots(element: &FlowElement) -> Vec<ConnectionSource> {
    let mut slots = vec![ConnectionSource::next(&element.guid)];
    if let Some(children) = &element.children {
        slots.extend((0..children.len()).map(|i| ConnectionSource::branch(&element.guid, i)));
    }
    if element.fault.is_some() {
        slots.push(ConnectionSource::fault(&element.guid));
    }
    slots
}

pub(crate) fn add_goto_source(flow: &mut ElementMap, target: &str, source: &ConnectionSource) -> Result<(), FlowError> {
    let target = resolve_mut(flow, target, "recording a goto")?;
    if !target.incoming_goto.contains(source) {
        target.incoming_goto.push(source.clone());
    }
    Ok(())
}

pub(crate) fn remove_goto_source(
    flow: &mut ElementMap,
    target: &str,
    source: &ConnectionSource,
) -> Result<(), FlowError> {
    let target = resolve_mut(flow, target, "removing a goto")?;
    target.incoming_goto.retain(|existing| existing != source);
    Ok(())
}

/// Re-points a goto recorded on `target` from one source slot to another.
pub(crate) fn move_goto_source(
    flow: &mut ElementMap,
    target: &str,
    from: &ConnectionSource,
    to: &ConnectionSource,
) -> Result<(), FlowError> {
    let target = resolve_mut(flow, target, "moving a goto")?;
    for existing in target.incoming_goto.iter_mut().filter(|existing| **existing == *from) {
        *existing = to.clone();
    }
    Ok(())
}
