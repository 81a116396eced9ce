//! Common test utilities for building stores, elements and action payloads.
use nagare::graph::branch_elements;
use nagare::prelude::*;
use std::sync::Arc;

/// An empty auto-layout store with deterministic End guids (`end-0`, `end-1`, ...)
/// and invariant checks after every dispatch.
#[allow(dead_code)]
pub fn auto_layout_store() -> FlowStore {
    FlowStore::builder()
        .with_config(StoreConfig::default().with_assertions(true))
        .with_guid_generator(Arc::new(SequentialGuidGenerator::new("end-")))
        .build()
}

/// An auto-layout store whose main line is `start -> end-0`.
#[allow(dead_code)]
pub fn started_store() -> FlowStore {
    let mut store = auto_layout_store();
    store
        .dispatch(Action::AddStartElement(
            FlowElement::canvas("start", element_type::START).with_label("Start"),
        ))
        .expect("Failed to place the start element");
    store
}

/// A store on the free-form canvas, where connectors are drawn explicitly.
#[allow(dead_code)]
pub fn free_form_store() -> FlowStore {
    FlowStore::builder()
        .with_state(FlowState::default())
        .with_guid_generator(Arc::new(SequentialGuidGenerator::new("copy-")))
        .build()
}

/// An assignment element labelled after its guid.
#[allow(dead_code)]
pub fn leaf(guid: &str) -> FlowElement {
    FlowElement::canvas(guid, element_type::ASSIGNMENT).with_label(format!("Label {guid}"))
}

#[allow(dead_code)]
pub fn outcome(guid: &str) -> FlowElement {
    FlowElement::new(guid, element_type::OUTCOME).with_label(format!("Outcome {guid}"))
}

/// Payload adding or modifying a decision with the given outcomes, in branch order.
#[allow(dead_code)]
pub fn decision_payload(guid: &str, outcomes: &[&str], source: Option<ConnectionSource>) -> ElementWithChildrenPayload {
    ElementWithChildrenPayload {
        canvas_element: FlowElement::canvas(guid, element_type::DECISION)
            .with_label(format!("Decision {guid}"))
            .with_child_references(outcomes.iter().copied()),
        child_elements: outcomes.iter().map(|guid| outcome(guid)).collect(),
        deleted_child_elements: Vec::new(),
        alc_connection_source: source,
    }
}

/// Places a leaf of the given type at `source`.
#[allow(dead_code)]
pub fn place(store: &mut FlowStore, element: FlowElement, source: ConnectionSource) {
    let guid = element.guid.clone();
    store
        .dispatch(Action::AddCanvasElement(AddElementPayload {
            element,
            alc_connection_source: Some(source),
        }))
        .unwrap_or_else(|e| panic!("Failed to place '{guid}': {e}"));
}

/// Places a decision with the given outcomes at `source`.
#[allow(dead_code)]
pub fn place_decision(store: &mut FlowStore, guid: &str, outcomes: &[&str], source: ConnectionSource) {
    store
        .dispatch(Action::AddDecisionWithOutcomes(decision_payload(guid, outcomes, Some(source))))
        .unwrap_or_else(|e| panic!("Failed to place decision '{guid}': {e}"));
}

/// An auto-layout store with the main line `start -> a -> b -> ... -> end-0`.
#[allow(dead_code)]
pub fn store_with_main_line(guids: &[&str]) -> FlowStore {
    let mut store = started_store();
    let mut previous = "start".to_string();
    for guid in guids {
        place(&mut store, leaf(guid), ConnectionSource::next(&previous));
        previous = guid.to_string();
    }
    store
}

/// Guids of the main line, Start first.
#[allow(dead_code)]
pub fn main_line(store: &FlowStore) -> Vec<String> {
    branch_elements(store.state().elements.map(), "start").expect("Failed to walk the main line")
}

#[allow(dead_code)]
pub fn element<'a>(store: &'a FlowStore, guid: &str) -> &'a FlowElement {
    store
        .state()
        .elements
        .get(guid)
        .unwrap_or_else(|| panic!("Element '{guid}' is missing"))
}

/// Whether two slot lists hold the same entries regardless of order.
#[allow(dead_code)]
pub fn same_slots(left: &[AvailableConnection], right: &[AvailableConnection]) -> bool {
    left.len() == right.len()
        && left.iter().all(|slot| {
            left.iter().filter(|s| *s == slot).count() == right.iter().filter(|s| *s == slot).count()
        })
}
