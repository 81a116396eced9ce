//! Topology pass of the auto-layout canvas.
//!
//! Runs on the output of the flat elements reducer and maintains the layout links
//! (`prev`/`next`, branch heads, gotos, terminal flags). Unlike the flat reducer it
//! is strict: a guid the action depends on must exist, and structural requests the
//! layout cannot honor are reported as errors.

use super::ReducerContext;
use crate::actions::{Action, DeleteElementPayload, FixedCanvasSelectionPayload, PastePayload};
use crate::error::FlowError;
use crate::graph::{self, PasteRequest};
use crate::model::{
    ChildIndex, ConnectionSource, FlowElement, Guid, GuidGenerator, NodeType, ROOT_ELEMENT_GUID,
};
use crate::state::{ElementMap, Elements};
use ahash::AHashMap;
use itertools::Itertools;
use std::sync::Arc;

pub fn reduce(
    prev: &Elements,
    next: Elements,
    action: &Action,
    context: &ReducerContext,
) -> Result<Elements, FlowError> {
    let guids = context.guids.as_ref();
    match action {
        Action::AddStartElement(start) => with_flow(prev, next, |flow| place_start(flow, &start.guid, guids)),

        Action::AddCanvasElement(payload) | Action::AddEndElement(payload) => match &payload.alc_connection_source {
            Some(source) => with_flow(prev, next, |flow| place_element(flow, prev, &payload.element.guid, source, context)),
            None => Ok(next),
        },
        Action::AddDecisionWithOutcomes(payload)
        | Action::AddWaitWithWaitEvents(payload)
        | Action::AddScreenWithFields(payload) => match &payload.alc_connection_source {
            Some(source) => with_flow(prev, next, |flow| {
                place_element(flow, prev, &payload.canvas_element.guid, source, context)
            }),
            None => Ok(next),
        },

        Action::ModifyDecisionWithOutcomes(payload)
        | Action::ModifyWaitWithWaitEvents(payload)
        | Action::ModifyScreenWithFields(payload)
        | Action::ModifyStartWithScheduledPaths(payload) => {
            let guid = &payload.canvas_element.guid;
            let Some(before) = prev.get(guid).filter(|element| element.node_type.is_some()) else {
                return Ok(next);
            };
            let old_references: Vec<Guid> = before.child_reference_guids().cloned().collect();
            with_flow(prev, next, |flow| rebranch(flow, guid, &old_references, guids))
        }

        Action::DeleteElement(payload) => with_flow(prev, next, |flow| delete_elements(flow, prev, payload, guids)),

        Action::AddFault(target) => with_flow(prev, next, |flow| add_fault(flow, &target.guid, context)),
        Action::DeleteFault(target) => {
            let has_fault = next
                .get(&target.guid)
                .ok_or_else(|| FlowError::not_found(&target.guid, "deleting a fault branch"))?
                .fault
                .is_some();
            if !has_fault {
                return Ok(next);
            }
            with_flow(prev, next, |flow| graph::delete_branch(flow, &target.guid, ChildIndex::Fault, guids))
        }

        Action::CreateGotoConnection(payload) => with_flow(prev, next, |flow| {
            graph::create_goto(flow, &payload.source, &payload.target, payload.is_reroute, guids)
        }),
        Action::DeleteGotoConnection(source) => {
            with_flow(prev, next, |flow| graph::delete_goto(flow, source, guids).map(|_| ()))
        }
        Action::ResetGotos(payload) => with_flow(prev, next, |flow| {
            let present: Vec<Guid> = payload
                .guids
                .iter()
                .filter(|guid| flow.contains_key(*guid))
                .cloned()
                .collect();
            graph::reset_gotos(flow, &present, guids)
        }),

        Action::PasteOnFixedCanvas(payload) => with_flow(prev, next, |flow| paste(flow, payload, false, context)),
        Action::PasteCutElementOnFixedCanvas(payload) => with_flow(prev, next, |flow| paste(flow, payload, true, context)),

        Action::DecorateCanvas(payload) => {
            if payload.connectors_to_highlight.is_empty() && !is_decorated(&next) {
                return Ok(next);
            }
            with_flow(prev, next, |flow| {
                graph::clear_decoration(flow);
                graph::decorate_canvas(flow, &payload.connectors_to_highlight)
            })
        }
        Action::ClearCanvasDecoration if is_decorated(&next) => with_flow(prev, next, |flow| {
            graph::clear_decoration(flow);
            Ok(())
        }),

        Action::SelectionOnFixedCanvas(payload) => Ok(fixed_canvas_selection(next, payload)),
        _ => Ok(next),
    }
}

/// Runs a topology step on `next`. When the flat pass left the slice untouched and
/// the step changes nothing either, the input handle is returned as-is.
fn with_flow<F>(prev: &Elements, next: Elements, apply: F) -> Result<Elements, FlowError>
where
    F: FnOnce(&mut ElementMap) -> Result<(), FlowError>,
{
    if !next.ptr_eq(prev) {
        let mut next = next;
        apply(next.make_mut())?;
        return Ok(next);
    }
    let mut scratch = next.clone();
    apply(scratch.make_mut())?;
    if scratch.same_entries(&next) {
        Ok(next)
    } else {
        Ok(scratch)
    }
}

fn is_decorated(elements: &Elements) -> bool {
    elements
        .iter()
        .any(|(_, element)| element.config.highlight_info.is_some())
}

/// Places Start as the head of the main line, creating Root when needed, and
/// terminates the main line.
fn place_start(flow: &mut ElementMap, guid: &str, guids: &dyn GuidGenerator) -> Result<(), FlowError> {
    let start = graph::resolve(flow, guid, "placing the start element")?;
    if start.parent.is_some() {
        return Ok(());
    }
    let references = start.child_references.len();

    if !flow.contains_key(ROOT_ELEMENT_GUID) {
        flow.insert(ROOT_ELEMENT_GUID.to_string(), Arc::new(FlowElement::root_element()));
    }
    let main_line = ConnectionSource::branch(ROOT_ELEMENT_GUID, 0);
    if let Some(existing) = graph::slot_target(flow, &main_line)? {
        return Err(FlowError::invalid_operation(
            guid,
            format!("the flow already starts with '{existing}'"),
        ));
    }

    {
        let start = graph::resolve_mut(flow, guid, "placing the start element")?;
        start.clear_topology();
        start.node_type = Some(NodeType::Start);
        start.children = NodeType::Start.branch_count(references).map(|count| vec![None; count]);
    }
    graph::link_chain(flow, &main_line, guid, guid)?;
    graph::repair_enclosing_branches(flow, guid, guids)
}

/// Splices a newly added element in at `source`.
fn place_element(
    flow: &mut ElementMap,
    prev: &Elements,
    guid: &str,
    source: &ConnectionSource,
    context: &ReducerContext,
) -> Result<(), FlowError> {
    let guids = context.guids.as_ref();
    if prev.get(guid).is_some_and(|element| element.node_type.is_some()) {
        return Err(FlowError::invalid_operation(guid, "is already on the canvas"));
    }
    let element = graph::resolve(flow, guid, "placing an element")?;
    let node_type = context.registry.node_type_of(element)?;
    if matches!(node_type, NodeType::Root | NodeType::Start) {
        return Err(FlowError::invalid_operation(guid, "only ADD_START_ELEMENT places the start of a flow"));
    }
    let references = element.child_references.len();

    {
        let element = graph::resolve_mut(flow, guid, "placing an element")?;
        element.clear_topology();
        element.node_type = Some(node_type);
        element.children = node_type.branch_count(references).map(|count| vec![None; count]);
    }

    if node_type == NodeType::End {
        match source.child_index {
            None => graph::remove_continuation(flow, &source.guid, guids)?,
            Some(index) => graph::delete_branch(flow, &source.guid, index, guids)?,
        }
    }
    graph::link_chain(flow, source, guid, guid)?;
    log::debug!("Placed '{}' ({:?}) at {}", guid, node_type, source);
    graph::repair_enclosing_branches(flow, guid, guids)
}

/// Re-derives the branches of a parent after its child references changed.
///
/// A branch follows its child to the child's new position; branches of deleted
/// children are deleted and new children get empty branches. A Start that loses
/// its last scheduled path keeps the immediate path as its main line.
fn rebranch(flow: &mut ElementMap, guid: &str, old_references: &[Guid], guids: &dyn GuidGenerator) -> Result<(), FlowError> {
    let element = graph::resolve(flow, guid, "updating branches")?;
    let Some(node_type) = element.node_type else {
        return Ok(());
    };
    let new_references: Vec<Guid> = element.child_reference_guids().cloned().collect();
    let old_count = element.children.as_ref().map(Vec::len);
    let new_count = match (old_count, node_type.branch_count(new_references.len())) {
        (None, None) => return Ok(()),
        (Some(old_count), None) => return collapse_branches(flow, guid, old_count, guids),
        (_, Some(new_count)) => new_count,
    };
    let old_count = old_count.unwrap_or(0);
    if new_count == old_count && new_references == old_references {
        return Ok(());
    }

    let mut inherited = Vec::with_capacity(new_count);
    for branch in 0..new_count {
        let old_branch = match node_type.reference_for_branch(branch, new_references.len()) {
            Some(reference) => old_references
                .iter()
                .position(|old| *old == new_references[reference])
                .map(|position| node_type.branch_for_reference(position)),
            None if node_type == NodeType::Start => Some(0),
            None => Some(old_references.len()),
        };
        inherited.push(old_branch.filter(|old| *old < old_count));
    }

    for old in (0..old_count).filter(|old| !inherited.contains(&Some(*old))) {
        graph::delete_branch(flow, guid, ChildIndex::Branch(old), guids)?;
    }

    let old_children = graph::resolve(flow, guid, "updating branches")?
        .children
        .clone()
        .unwrap_or_default();
    let mut moves = Vec::new();
    for (new, old) in inherited.iter().enumerate() {
        let Some(old) = *old else {
            continue;
        };
        if let Some(target) = old_children.get(old).cloned().flatten() {
            let is_goto = graph::is_goto_link(flow, &ConnectionSource::branch(guid, old), &target);
            moves.push((new, old, target, is_goto));
        }
    }

    let mut children = vec![None; new_count];
    for (new, _, target, _) in &moves {
        children[*new] = Some(target.clone());
    }
    graph::resolve_mut(flow, guid, "updating branches")?.children = Some(children);

    let renumbered: AHashMap<usize, usize> = moves.iter().map(|(new, old, _, _)| (*old, *new)).collect();
    for (new, _, target, is_goto) in &moves {
        if !is_goto {
            graph::resolve_mut(flow, target, "updating branches")?.child_index = Some(ChildIndex::Branch(*new));
        }
    }
    let goto_targets: Vec<&Guid> = moves
        .iter()
        .filter(|(_, _, _, is_goto)| *is_goto)
        .map(|(_, _, target, _)| target)
        .unique()
        .collect();
    for target in goto_targets {
        let target = graph::resolve_mut(flow, target, "updating branches")?;
        for source in target.incoming_goto.iter_mut().filter(|source| source.guid == guid) {
            if let Some(ChildIndex::Branch(old)) = source.child_index {
                if let Some(new) = renumbered.get(&old) {
                    source.child_index = Some(ChildIndex::Branch(*new));
                }
            }
        }
    }

    log::debug!("Rebranched '{}': {} -> {} branches", guid, old_count, new_count);
    graph::restructure_on_terminal_merge(flow, guid, guids)?;
    graph::repair_enclosing_branches(flow, guid, guids)
}

/// Drops every branch but the first and moves the first one onto the main line.
fn collapse_branches(flow: &mut ElementMap, guid: &str, branch_count: usize, guids: &dyn GuidGenerator) -> Result<(), FlowError> {
    for index in 1..branch_count {
        graph::delete_branch(flow, guid, ChildIndex::Branch(index), guids)?;
    }
    if branch_count > 0 {
        graph::hoist_branch(flow, guid, 0, guids)?;
    }
    graph::resolve_mut(flow, guid, "collapsing branches")?.children = None;
    graph::repair_enclosing_branches(flow, guid, guids)
}

/// Deletes the placed elements among the selection.
///
/// The flat reducer has already dropped them; they are put back from the previous
/// slice so that their links can be repaired before they go for good.
fn delete_elements(
    flow: &mut ElementMap,
    prev: &Elements,
    payload: &DeleteElementPayload,
    guids: &dyn GuidGenerator,
) -> Result<(), FlowError> {
    let placed: Vec<&Guid> = payload
        .selected_elements
        .iter()
        .filter(|guid| prev.get(guid).is_some_and(|element| element.node_type.is_some()))
        .collect();
    for guid in &placed {
        if let Some(element) = prev.map().get(*guid) {
            flow.insert((*guid).clone(), Arc::clone(element));
        }
    }
    for guid in placed {
        if flow.contains_key(guid) {
            graph::delete_element(flow, guid, payload.child_index_to_keep, guids)?;
        }
    }
    Ok(())
}

fn add_fault(flow: &mut ElementMap, guid: &str, context: &ReducerContext) -> Result<(), FlowError> {
    let element = graph::resolve(flow, guid, "adding a fault branch")?;
    if element.fault.is_some() {
        return Ok(());
    }
    if element.node_type.is_none() {
        return Err(FlowError::invalid_operation(guid, "is not on the canvas"));
    }
    if !context.registry.config_for(element)?.supports_fault() {
        return Err(FlowError::invalid_operation(guid, "does not support a fault branch"));
    }
    graph::terminate_slot(flow, &ConnectionSource::fault(guid), context.guids.as_ref())?;
    Ok(())
}

fn paste(flow: &mut ElementMap, payload: &PastePayload, keep_names: bool, context: &ReducerContext) -> Result<(), FlowError> {
    let request = PasteRequest {
        canvas_element_guid_map: &payload.canvas_element_guid_map,
        child_element_guid_map: &payload.child_element_guid_map,
        cut_or_copied_canvas_elements: &payload.cut_or_copied_canvas_elements,
        cut_or_copied_child_elements: &payload.cut_or_copied_child_elements,
        top_cut_or_copied_guid: &payload.top_cut_or_copied_guid,
        bottom_cut_or_copied_guid: &payload.bottom_cut_or_copied_guid,
        source: &payload.source,
        keep_names,
    };
    graph::paste_elements(flow, &request, &context.registry, &context.naming, context.guids.as_ref())?;
    Ok(())
}

/// Recomputes selected and selectable flags of every placed canvas element.
///
/// An empty selectable list makes everything selectable, unless
/// `allow_all_disabled_elements` asks for everything to be disabled instead.
fn fixed_canvas_selection(elements: Elements, payload: &FixedCanvasSelectionPayload) -> Elements {
    let changes: Vec<(Guid, bool, bool)> = elements
        .iter()
        .filter(|(_, element)| element.is_canvas_element && element.node_type.is_some())
        .filter_map(|(guid, element)| {
            let selected = if payload.canvas_elements_to_select.contains(guid) {
                true
            } else if payload.canvas_elements_to_deselect.contains(guid) {
                false
            } else {
                element.config.is_selected
            };
            let selectable = if payload.selectable_guids.is_empty() {
                !payload.allow_all_disabled_elements
            } else {
                payload.selectable_guids.contains(guid)
            };
            let changed = selected != element.config.is_selected || selectable != element.config.is_selectable;
            changed.then(|| (guid.clone(), selected, selectable))
        })
        .collect();
    if changes.is_empty() {
        return elements;
    }

    let mut next = elements;
    let map = next.make_mut();
    for (guid, selected, selectable) in changes {
        if let Some(element) = map.get_mut(&guid) {
            let config = &mut Arc::make_mut(element).config;
            config.is_selected = selected;
            config.is_selectable = selectable;
        }
    }
    next
}
