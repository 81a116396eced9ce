//! The flat elements reducer: element CRUD, compound parents with children,
//! connection-slot bookkeeping and selection.
//!
//! This reducer is permissive: an action naming a guid that is not in the slice
//! is a no-op (or creates the element, for the add/update family).

use super::ReducerContext;
use crate::actions::{Action, DeleteElementPayload, DuplicatePayload, ElementWithChildrenPayload};
use crate::graph::remove_with_owned;
use crate::metadata::{DuplicateContext, UniqueNamer, duplicate_element};
use crate::model::{AvailableConnection, ChildReference, Connector, ConnectorType, FlowElement, Guid};
use crate::state::Elements;
use itertools::Itertools;
use std::sync::Arc;

pub fn reduce(elements: &Elements, action: &Action, context: &ReducerContext) -> Elements {
    match action {
        Action::AddCanvasElement(payload) | Action::AddEndElement(payload) => upsert(elements, &payload.element),
        Action::UpdateCanvasElement(element)
        | Action::AddResource(element)
        | Action::UpdateResource(element)
        | Action::AddStartElement(element) => upsert(elements, element),

        Action::AddDecisionWithOutcomes(payload)
        | Action::AddWaitWithWaitEvents(payload)
        | Action::AddScreenWithFields(payload) => with_children(elements, payload, true, context),
        Action::ModifyDecisionWithOutcomes(payload)
        | Action::ModifyWaitWithWaitEvents(payload)
        | Action::ModifyScreenWithFields(payload)
        | Action::ModifyStartWithScheduledPaths(payload) => with_children(elements, payload, false, context),

        Action::DeleteElement(payload) => delete(elements, payload),
        Action::AddConnector(connector) => add_connector(elements, connector),

        Action::SelectOnCanvas(target) => set_selection(elements, |element| Some(element.guid == target.guid)),
        Action::ToggleOnCanvas(target) => set_selection(elements, |element| {
            (element.guid == target.guid).then_some(!element.config.is_selected)
        }),
        Action::DeselectOnCanvas => set_selection(elements, |_| Some(false)),
        Action::MarqueeSelectOnCanvas(payload) => set_selection(elements, |element| {
            if payload.canvas_elements_to_select.contains(&element.guid) {
                Some(true)
            } else if payload.canvas_elements_to_deselect.contains(&element.guid) {
                Some(false)
            } else {
                None
            }
        }),

        Action::DoDuplicate(payload) => duplicate(elements, payload, context),
        Action::UpdateFlow(state) => state.elements.clone(),
        _ => elements.clone(),
    }
}

/// Merges `payload` into the element with its guid, creating it when absent.
fn upsert(elements: &Elements, payload: &FlowElement) -> Elements {
    let element = match elements.get(&payload.guid) {
        Some(existing) => {
            let mut merged = existing.clone();
            merged.merge_from(payload);
            if merged == *existing {
                return elements.clone();
            }
            merged
        }
        None => payload.clone(),
    };
    let mut next = elements.clone();
    next.make_mut().insert(element.guid.clone(), Arc::new(element));
    next
}

fn with_children(
    elements: &Elements,
    payload: &ElementWithChildrenPayload,
    is_add: bool,
    context: &ReducerContext,
) -> Elements {
    let parent_payload = &payload.canvas_element;
    let config = context.registry.get(&parent_payload.element_type);
    if config.is_none() {
        log::warn!(
            "No metadata for element type '{}', '{}' gets a single REGULAR slot",
            parent_payload.element_type,
            parent_payload.guid
        );
    }
    let has_child_connections = config.is_some_and(|config| config.has_child_connections());
    let new_children: Vec<&Guid> = payload.child_elements.iter().map(|child| &child.guid).collect();
    let fixed = config.map_or_else(
        || vec![ConnectorType::Regular],
        |config| config.fixed_connections(!new_children.is_empty()),
    );

    let existing = elements.get(&parent_payload.guid);
    let fresh = is_add || existing.is_none();
    let old_children: Vec<Guid> = existing
        .map(|element| element.child_reference_guids().cloned().collect())
        .unwrap_or_default();
    let mut parent = match existing {
        Some(existing) => {
            let mut merged = existing.clone();
            merged.merge_from(parent_payload);
            merged
        }
        None => parent_payload.clone(),
    };
    parent.child_references = new_children
        .iter()
        .map(|guid| ChildReference {
            child_reference: (*guid).clone(),
        })
        .collect();

    if has_child_connections {
        if fresh {
            parent.available_connections = new_children
                .iter()
                .map(|guid| AvailableConnection::for_child(*guid))
                .chain(fixed.iter().map(|t| AvailableConnection::of_type(*t)))
                .collect();
        } else {
            for added in new_children.iter().copied().filter(|guid| !old_children.contains(guid)) {
                parent.available_connections.push(AvailableConnection::for_child(added));
            }
            for deleted in payload
                .deleted_child_elements
                .iter()
                .map(|child| &child.guid)
                .filter(|guid| old_children.contains(guid))
            {
                let open_slot = parent
                    .available_connections
                    .iter()
                    .position(|slot| slot.child_reference.as_ref() == Some(deleted));
                match open_slot {
                    Some(index) => {
                        parent.available_connections.remove(index);
                    }
                    None => parent.connector_count = parent.connector_count.saturating_sub(1),
                }
            }
            retype_fixed_slots(&mut parent, &fixed);
        }
        parent.max_connections = new_children.len() + fixed.len();
    } else {
        if fresh && parent.available_connections.is_empty() {
            parent.available_connections = fixed.iter().map(|t| AvailableConnection::of_type(*t)).collect();
        }
        parent.max_connections = fixed.len();
    }

    let mut next = elements.clone();
    let map = next.make_mut();
    for child in &payload.child_elements {
        let child = match map.get(&child.guid) {
            Some(existing) => {
                let mut merged = FlowElement::clone(existing);
                merged.merge_from(child);
                merged
            }
            None => child.clone(),
        };
        map.insert(child.guid.clone(), Arc::new(child));
    }
    for deleted in &payload.deleted_child_elements {
        remove_with_owned(map, &deleted.guid);
    }
    map.insert(parent.guid.clone(), Arc::new(parent));
    next
}

/// Switches open fixed slots between REGULAR and IMMEDIATE when the element's
/// fixed connections changed kind (a Start gaining or losing scheduled paths).
fn retype_fixed_slots(element: &mut FlowElement, fixed: &[ConnectorType]) {
    for slot in element
        .available_connections
        .iter_mut()
        .filter(|slot| slot.child_reference.is_none())
    {
        slot.connector_type = match slot.connector_type {
            ConnectorType::Regular if fixed.contains(&ConnectorType::Immediate) => ConnectorType::Immediate,
            ConnectorType::Immediate if fixed.contains(&ConnectorType::Regular) => ConnectorType::Regular,
            other => other,
        };
    }
}

fn delete(elements: &Elements, payload: &DeleteElementPayload) -> Elements {
    let affected = payload.selected_elements.iter().any(|guid| elements.contains(guid))
        || payload
            .connectors_to_delete
            .iter()
            .any(|connector| elements.contains(&connector.source));
    if !affected {
        return elements.clone();
    }

    let mut next = elements.clone();
    let map = next.make_mut();
    for guid in &payload.selected_elements {
        remove_with_owned(map, guid);
    }
    for connector in &payload.connectors_to_delete {
        let Some(source) = map.get_mut(&connector.source) else {
            continue;
        };
        let source = Arc::make_mut(source);
        source.connector_count = source.connector_count.saturating_sub(1);
        let slot = AvailableConnection {
            connector_type: connector.connector_type,
            child_reference: connector.child_source.clone(),
        };
        if !source.available_connections.contains(&slot) {
            source.available_connections.push(slot);
        }
    }
    next
}

fn add_connector(elements: &Elements, connector: &Connector) -> Elements {
    let Some(source) = elements.get(&connector.source) else {
        return elements.clone();
    };
    let mut source = source.clone();
    consume_slot(&mut source, connector.connector_type, connector.child_source.as_ref());
    source.connector_count += 1;

    let mut next = elements.clone();
    next.make_mut().insert(source.guid.clone(), Arc::new(source));
    next
}

/// Removes the open slot a new connector occupies: the child's slot when the
/// connector leaves from a child, otherwise the first slot of the connector's type.
fn consume_slot(element: &mut FlowElement, connector_type: ConnectorType, child_source: Option<&Guid>) {
    let position = match child_source {
        Some(child) => element
            .available_connections
            .iter()
            .position(|slot| slot.child_reference.as_ref() == Some(child)),
        None => element
            .available_connections
            .iter()
            .position(|slot| slot.connector_type == connector_type && slot.child_reference.is_none()),
    };
    if let Some(index) = position {
        element.available_connections.remove(index);
    }
}

/// Applies `selected` to every canvas element, returning the input untouched when
/// no flag changes.
fn set_selection<F>(elements: &Elements, selected: F) -> Elements
where
    F: Fn(&FlowElement) -> Option<bool>,
{
    let changes: Vec<(Guid, bool)> = elements
        .iter()
        .filter(|(_, element)| element.is_canvas_element)
        .filter_map(|(guid, element)| {
            selected(element)
                .filter(|value| *value != element.config.is_selected)
                .map(|value| (guid.clone(), value))
        })
        .collect();
    if changes.is_empty() {
        return elements.clone();
    }

    let mut next = elements.clone();
    let map = next.make_mut();
    for (guid, value) in changes {
        if let Some(element) = map.get_mut(&guid) {
            Arc::make_mut(element).config.is_selected = value;
        }
    }
    next
}

/// Free-form duplicate: copies get unique names, are selected in place of their
/// originals and own exactly the connectors duplicated with them.
fn duplicate(elements: &Elements, payload: &DuplicatePayload, context: &ReducerContext) -> Elements {
    let guid_map = &payload.canvas_element_guid_map;
    let mut copies = Vec::with_capacity(guid_map.len());
    {
        let mut namer = UniqueNamer::new(elements, &context.naming);
        for original_guid in guid_map.keys().sorted() {
            let Some(original) = elements.get(original_guid) else {
                log::warn!("Cannot duplicate missing element '{}'", original_guid);
                continue;
            };
            let config = context.registry.get(&original.element_type);
            let mut duplicate_context = DuplicateContext {
                new_guid: guid_map[original_guid].clone(),
                new_name: original.name.as_deref().map(|name| namer.dev_name(name)),
                new_label: original.label.as_deref().map(|label| namer.label(label)),
                child_guid_map: &payload.child_element_guid_map,
                elements: elements.map(),
                rename_children: true,
                namer: &mut namer,
            };
            let duplicated = match config {
                Some(config) => config.duplicate(original, &mut duplicate_context),
                None => duplicate_element(original, &mut duplicate_context),
            };

            let mut element = duplicated.element;
            element.config.is_selected = true;

            let has_children = !element.child_references.is_empty();
            let fixed = config.map_or_else(
                || vec![ConnectorType::Regular],
                |config| config.fixed_connections(has_children),
            );
            let child_slots: Vec<AvailableConnection> = if config.is_some_and(|c| c.has_child_connections()) {
                element.child_reference_guids().map(AvailableConnection::for_child).collect()
            } else {
                Vec::new()
            };
            element.available_connections = child_slots
                .into_iter()
                .chain(fixed.into_iter().map(AvailableConnection::of_type))
                .collect();
            element.connector_count = 0;
            for connector in payload
                .connectors_to_duplicate
                .iter()
                .filter(|c| c.source == *original_guid && guid_map.contains_key(&c.target))
            {
                let child_source = connector
                    .child_source
                    .as_ref()
                    .and_then(|child| payload.child_element_guid_map.get(child));
                consume_slot(&mut element, connector.connector_type, child_source);
                element.connector_count += 1;
            }

            copies.push(element);
            copies.extend(duplicated.children);
        }
    }
    if copies.is_empty() {
        return elements.clone();
    }

    let mut next = elements.clone();
    let map = next.make_mut();
    for original_guid in guid_map.keys() {
        if let Some(original) = map.get_mut(original_guid) {
            if original.config.is_selected {
                Arc::make_mut(original).config.is_selected = false;
            }
        }
    }
    for copy in copies {
        map.insert(copy.guid.clone(), Arc::new(copy));
    }
    next
}
