use super::delete::remove_continuation;
use super::linking::terminate_slot;
use super::navigation::{
    branch_head, find_first_element, find_last_element, is_goto_link, move_goto_source, resolve,
    resolve_mut, set_slot, slot_target,
};
use crate::error::FlowError;
use crate::model::{ChildIndex, ConnectionSource, GuidGenerator, NodeType};
use crate::state::ElementMap;

/// Whether the branch starting at `head` never rejoins its parent's merge point.
///
/// A branch is terminal when it ends in an End element or a goto, or when its tail
/// is a merging parent all of whose branches are terminal.
pub fn compute_branch_terminal(flow: &ElementMap, head: &str) -> Result<bool, FlowError> {
    compute_at_depth(flow, head, 0)
}

fn compute_at_depth(flow: &ElementMap, head: &str, depth: usize) -> Result<bool, FlowError> {
    if depth > flow.len() {
        return Err(FlowError::malformed(head, "branches nest into themselves"));
    }
    let tail = find_last_element(flow, head)?;
    let tail_element = resolve(flow, &tail, "computing branch termination")?;
    if tail_element.is_end() || tail_element.next.is_some() {
        return Ok(true);
    }
    match (tail_element.node_type, &tail_element.children) {
        (Some(node_type), Some(children)) if node_type.merges_branches() && !children.is_empty() => {
            for (index, slot) in children.iter().enumerate() {
                let terminal = match slot {
                    None => false,
                    Some(target) if is_goto_link(flow, &ConnectionSource::branch(&tail, index), target) => true,
                    Some(target) => compute_at_depth(flow, target, depth + 1)?,
                };
                if !terminal {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Termination of one branch of `parent`, empty branches included.
pub fn is_branch_terminal(flow: &ElementMap, parent: &str, index: ChildIndex) -> Result<bool, FlowError> {
    let source = ConnectionSource::with_child_index(parent, Some(index));
    match slot_target(flow, &source)? {
        None => Ok(false),
        Some(target) if is_goto_link(flow, &source, &target) => Ok(true),
        Some(head) => compute_branch_terminal(flow, &head),
    }
}

fn refresh_head(flow: &mut ElementMap, head: &str) -> Result<bool, FlowError> {
    let terminal = compute_branch_terminal(flow, head)?;
    resolve_mut(flow, head, "refreshing branch termination")?.is_terminal = terminal;
    Ok(terminal)
}

/// Restores the merge structure of `parent` after one of its branches changed.
///
/// When no branch merges any more, the continuation after `parent` is unreachable and
/// is removed. When exactly one branch still merges, the continuation is moved to the
/// end of that branch.
pub fn restructure_on_terminal_merge(
    flow: &mut ElementMap,
    parent: &str,
    guids: &dyn GuidGenerator,
) -> Result<(), FlowError> {
    let element = resolve(flow, parent, "restructuring merged branches")?;
    let merges = element.node_type.is_some_and(NodeType::merges_branches);
    let branch_count = element.children.as_ref().map_or(0, Vec::len);
    let Some(continuation) = element.next.clone() else {
        return Ok(());
    };
    if !merges || branch_count == 0 {
        return Ok(());
    }

    let mut open = Vec::new();
    for index in 0..branch_count {
        if !is_branch_terminal(flow, parent, ChildIndex::Branch(index))? {
            open.push(index);
        }
    }

    match open.as_slice() {
        [] => {
            log::debug!("All branches of '{}' terminate, dropping its continuation", parent);
            remove_continuation(flow, parent, guids)
        }
        [index] => inline_continuation(flow, parent, *index, &continuation),
        _ => Ok(()),
    }
}

fn inline_continuation(flow: &mut ElementMap, parent: &str, index: usize, continuation: &str) -> Result<(), FlowError> {
    let from = ConnectionSource::next(parent);
    let is_goto = is_goto_link(flow, &from, continuation);
    let branch = ConnectionSource::branch(parent, index);
    log::debug!("Inlining continuation '{}' of '{}' into branch {}", continuation, parent, index);

    resolve_mut(flow, parent, "inlining a continuation")?.next = None;
    match slot_target(flow, &branch)? {
        None => {
            set_slot(flow, &branch, Some(continuation.to_string()))?;
            if is_goto {
                move_goto_source(flow, continuation, &from, &branch)?;
            } else {
                let head = resolve_mut(flow, continuation, "inlining a continuation")?;
                head.prev = None;
                head.parent = Some(parent.to_string());
                head.child_index = Some(ChildIndex::Branch(index));
            }
        }
        Some(head) => {
            let tail = find_last_element(flow, &head)?;
            resolve_mut(flow, &tail, "inlining a continuation")?.next = Some(continuation.to_string());
            if is_goto {
                move_goto_source(flow, continuation, &from, &ConnectionSource::next(&tail))?;
            } else {
                resolve_mut(flow, continuation, "inlining a continuation")?.prev = Some(tail);
            }
        }
    }

    if let Some(head) = branch_head(flow, parent, ChildIndex::Branch(index))? {
        refresh_head(flow, &head)?;
    }
    Ok(())
}

/// Walks from the branch containing `guid` up to the root, refreshing every branch
/// head's termination and restructuring each merging ancestor.
///
/// The main line and fault branches must terminate; an End is appended when they no
/// longer do.
pub fn repair_enclosing_branches(
    flow: &mut ElementMap,
    guid: &str,
    guids: &dyn GuidGenerator,
) -> Result<(), FlowError> {
    let mut current = guid.to_string();
    for _ in 0..=flow.len() {
        let head = find_first_element(flow, &current)?;
        let (parent, index) = {
            let head_element = resolve(flow, &head, "repairing enclosing branches")?;
            match (head_element.parent.clone(), head_element.child_index) {
                (Some(parent), Some(index)) => (parent, index),
                _ => return Ok(()),
            }
        };
        let terminal = refresh_head(flow, &head)?;
        let parent_type = resolve(flow, &parent, "repairing enclosing branches")?.node_type;

        match (parent_type, index) {
            (Some(NodeType::Root), _) | (_, ChildIndex::Fault) => {
                if !terminal {
                    let tail = find_last_element(flow, &head)?;
                    terminate_slot(flow, &ConnectionSource::next(&tail), guids)?;
                    refresh_head(flow, &head)?;
                }
                return Ok(());
            }
            (Some(NodeType::Loop), _) => return Ok(()),
            _ => {}
        }

        restructure_on_terminal_merge(flow, &parent, guids)?;
        current = parent;
    }
    Err(FlowError::malformed(guid, "parent links form a cycle"))
}

/// Repairs the branches around a slot whose content just changed.
pub fn repair_at_slot(
    flow: &mut ElementMap,
    slot: &ConnectionSource,
    guids: &dyn GuidGenerator,
) -> Result<(), FlowError> {
    let Some(index) = slot.child_index else {
        return repair_enclosing_branches(flow, &slot.guid, guids);
    };
    if let Some(head) = branch_head(flow, &slot.guid, index)? {
        return repair_enclosing_branches(flow, &head, guids);
    }
    if index == ChildIndex::Fault {
        return Ok(());
    }
    match resolve(flow, &slot.guid, "repairing a slot")?.node_type {
        Some(NodeType::Root) => Err(FlowError::invalid_operation(&slot.guid, "the main flow cannot be empty")),
        Some(NodeType::Loop) => repair_enclosing_branches(flow, &slot.guid, guids),
        _ => {
            restructure_on_terminal_merge(flow, &slot.guid, guids)?;
            repair_enclosing_branches(flow, &slot.guid, guids)
        }
    }
}
