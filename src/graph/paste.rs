use super::linking::{link_chain, terminate_slot};
use super::navigation::{find_last_element, is_goto_link, resolve, resolve_mut, slot_target};
use super::terminal::{compute_branch_terminal, repair_enclosing_branches, restructure_on_terminal_merge};
use crate::config::NamingConfig;
use crate::error::FlowError;
use crate::metadata::{DuplicateContext, ElementTypeRegistry, UniqueNamer};
use crate::model::{ChildIndex, ConnectionSource, FlowElement, Guid, GuidGenerator};
use crate::state::ElementMap;
use ahash::AHashMap;
use itertools::Itertools;
use std::sync::Arc;

/// A batch of copied (or cut) elements and where to put them.
pub struct PasteRequest<'a> {
    /// Original canvas element guid to the guid of its copy.
    pub canvas_element_guid_map: &'a AHashMap<Guid, Guid>,
    /// Original child element guid (outcome, field, ...) to the guid of its copy.
    pub child_element_guid_map: &'a AHashMap<Guid, Guid>,
    pub cut_or_copied_canvas_elements: &'a AHashMap<Guid, FlowElement>,
    pub cut_or_copied_child_elements: &'a AHashMap<Guid, FlowElement>,
    /// Original guid of the first element of the copied chain.
    pub top_cut_or_copied_guid: &'a str,
    /// Original guid of the last element of the copied chain.
    pub bottom_cut_or_copied_guid: &'a str,
    pub source: &'a ConnectionSource,
    /// Cut-paste keeps the original names.
    pub keep_names: bool,
}

struct PastedElement {
    element: FlowElement,
    children: Vec<FlowElement>,
    /// The original had a fault branch that did not survive the copy.
    lost_fault: bool,
}

/// Pastes a copied chain at `request.source` and returns the guids of the pasted
/// canvas elements.
///
/// Copies get unique names, lose every goto they had and are spliced in as a
/// single chain. A goto that occupied the insertion point leaves from the bottom
/// pasted element afterwards.
pub fn paste_elements(
    flow: &mut ElementMap,
    request: &PasteRequest<'_>,
    registry: &ElementTypeRegistry,
    naming: &NamingConfig,
    guids: &dyn GuidGenerator,
) -> Result<Vec<Guid>, FlowError> {
    let top = mapped(request.canvas_element_guid_map, request.top_cut_or_copied_guid)?;
    let bottom = mapped(request.canvas_element_guid_map, request.bottom_cut_or_copied_guid)?;

    let pasted = duplicate_batch(flow, request, registry, naming)?;
    let mut pasted_guids = Vec::with_capacity(pasted.len());
    let mut parents = Vec::new();
    for item in pasted {
        let guid = item.element.guid.clone();
        if item.element.children.is_some() || item.element.fault.is_some() || item.lost_fault {
            parents.push((guid.clone(), item.lost_fault));
        }
        for child in item.children {
            flow.insert(child.guid.clone(), Arc::new(child));
        }
        flow.insert(guid.clone(), Arc::new(item.element));
        pasted_guids.push(guid);
    }

    for (guid, lost_fault) in &parents {
        settle_branches(flow, guid, *lost_fault, guids)?;
    }

    let bottom_element = resolve(flow, &bottom, "pasting elements")?;
    if bottom_element.is_end() {
        if let Some(occupant) = slot_target(flow, request.source)? {
            return Err(FlowError::InvalidConnection {
                from: request.source.clone(),
                target: occupant,
                message: "a chain ending in an End element cannot be pasted before other elements".to_string(),
            });
        }
    }

    link_chain(flow, request.source, &top, &bottom)?;
    restructure_on_terminal_merge(flow, &bottom, guids)?;
    repair_enclosing_branches(flow, &top, guids)?;
    log::debug!("Pasted {} elements at {}", pasted_guids.len(), request.source);
    Ok(pasted_guids)
}

fn mapped(map: &AHashMap<Guid, Guid>, original: &str) -> Result<Guid, FlowError> {
    map.get(original)
        .cloned()
        .ok_or_else(|| FlowError::not_found(original, "looking up the guid of its copy"))
}

/// Copies every element of the batch, renaming and remapping it, without touching
/// the flow yet.
fn duplicate_batch(
    flow: &ElementMap,
    request: &PasteRequest<'_>,
    registry: &ElementTypeRegistry,
    naming: &NamingConfig,
) -> Result<Vec<PastedElement>, FlowError> {
    let clipboard: ElementMap = request
        .cut_or_copied_canvas_elements
        .values()
        .chain(request.cut_or_copied_child_elements.values())
        .map(|element| (element.guid.clone(), Arc::new(element.clone())))
        .collect();
    let guid_map = request.canvas_element_guid_map;

    let mut namer = UniqueNamer::new(flow, naming);
    let mut pasted = Vec::with_capacity(guid_map.len());
    for original_guid in guid_map.keys().sorted() {
        let Some(original) = request.cut_or_copied_canvas_elements.get(original_guid) else {
            log::warn!("Copied element '{}' is missing from the clipboard, skipping it", original_guid);
            continue;
        };
        let (new_name, new_label) = if request.keep_names {
            namer.reserve(original.name.as_deref(), original.label.as_deref());
            (original.name.clone(), original.label.clone())
        } else {
            (
                original.name.as_deref().map(|name| namer.dev_name(name)),
                original.label.as_deref().map(|label| namer.label(label)),
            )
        };

        let config = registry.config_for(original)?;
        let mut context = DuplicateContext {
            new_guid: guid_map[original_guid].clone(),
            new_name,
            new_label,
            child_guid_map: request.child_element_guid_map,
            elements: &clipboard,
            rename_children: !request.keep_names,
            namer: &mut namer,
        };
        let duplicated = config.duplicate(original, &mut context);

        let mut element = duplicated.element;
        let node_type = config.node_type();
        element.node_type = Some(node_type);
        element.connector_count = 0;
        let is_top = original_guid == request.top_cut_or_copied_guid;
        let is_bottom = original_guid == request.bottom_cut_or_copied_guid;

        let remap = |slot: ConnectionSource, target: &Option<Guid>| -> Option<Guid> {
            target
                .as_ref()
                .filter(|target| !is_goto_link(&clipboard, &slot, target))
                .and_then(|target| guid_map.get(target))
                .cloned()
        };

        if !is_top {
            element.prev = original.prev.as_ref().and_then(|prev| guid_map.get(prev)).cloned();
            element.parent = original.parent.as_ref().and_then(|parent| guid_map.get(parent)).cloned();
            element.child_index = element.parent.as_ref().and(original.child_index);
        }
        if !is_bottom {
            element.next = remap(ConnectionSource::next(original_guid), &original.next);
        }
        element.children = match &original.children {
            Some(children) => Some(
                children
                    .iter()
                    .enumerate()
                    .map(|(index, slot)| remap(ConnectionSource::branch(original_guid, index), slot))
                    .collect(),
            ),
            None => node_type
                .branch_count(element.child_references.len())
                .map(|count| vec![None; count]),
        };
        element.fault = remap(ConnectionSource::fault(original_guid), &original.fault);
        let lost_fault = original.fault.is_some() && element.fault.is_none();

        pasted.push(PastedElement {
            element,
            children: duplicated.children,
            lost_fault,
        });
    }
    Ok(pasted)
}

/// Recomputes branch termination of a pasted parent and terminates its fault branch.
fn settle_branches(
    flow: &mut ElementMap,
    guid: &str,
    lost_fault: bool,
    guids: &dyn GuidGenerator,
) -> Result<(), FlowError> {
    let element = resolve(flow, guid, "settling pasted branches")?;
    let heads: Vec<Guid> = element.children.iter().flatten().flatten().cloned().collect();
    let fault = element.fault.clone();

    for head in heads {
        let terminal = compute_branch_terminal(flow, &head)?;
        resolve_mut(flow, &head, "settling pasted branches")?.is_terminal = terminal;
    }

    match fault {
        Some(head) => {
            if !compute_branch_terminal(flow, &head)? {
                let tail = find_last_element(flow, &head)?;
                terminate_slot(flow, &ConnectionSource::next(&tail), guids)?;
            }
            let fault_head = resolve_mut(flow, &head, "settling pasted branches")?;
            fault_head.child_index = Some(ChildIndex::Fault);
            fault_head.is_terminal = true;
        }
        None if lost_fault => {
            terminate_slot(flow, &ConnectionSource::fault(guid), guids)?;
        }
        None => {}
    }
    Ok(())
}
