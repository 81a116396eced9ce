use super::UniqueNamer;
use crate::model::{ChildReference, ElementConfig, FlowElement, Guid};
use crate::state::ElementMap;
use ahash::AHashMap;

/// Everything a duplicate factory needs to copy one canvas element.
pub struct DuplicateContext<'a, 'n> {
    pub new_guid: Guid,
    pub new_name: Option<String>,
    pub new_label: Option<String>,
    /// Maps original child element guids (outcomes, fields, ...) to their copies.
    pub child_guid_map: &'a AHashMap<Guid, Guid>,
    /// The elements slice the original lives in.
    pub elements: &'a ElementMap,
    /// Whether copied child elements receive fresh names.
    pub rename_children: bool,
    pub namer: &'a mut UniqueNamer<'n>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatedElement {
    pub element: FlowElement,
    /// Copies of the owned child elements, nested children included.
    pub children: Vec<FlowElement>,
}

/// Default duplicate factory: copies the element, detaches it from the layout and
/// deep-copies every owned child element that has an entry in the child guid map.
pub fn duplicate_element(source: &FlowElement, context: &mut DuplicateContext<'_, '_>) -> DuplicatedElement {
    let mut element = source.clone();
    element.guid = context.new_guid.clone();
    if context.new_name.is_some() {
        element.name = context.new_name.clone();
    }
    if context.new_label.is_some() {
        element.label = context.new_label.clone();
    }
    element.config = ElementConfig {
        has_error: source.config.has_error,
        ..ElementConfig::default()
    };
    element.clear_topology();

    let mut children = Vec::new();
    element.child_references = copy_children(source, context, &mut children);
    element.available_connections.retain_mut(|slot| match &slot.child_reference {
        None => true,
        Some(original) => match context.child_guid_map.get(original) {
            Some(copy) => {
                slot.child_reference = Some(copy.clone());
                true
            }
            None => false,
        },
    });

    DuplicatedElement { element, children }
}

fn copy_children(
    owner: &FlowElement,
    context: &mut DuplicateContext<'_, '_>,
    out: &mut Vec<FlowElement>,
) -> Vec<ChildReference> {
    let guid_map = context.child_guid_map;
    let elements = context.elements;
    let mut references = Vec::with_capacity(owner.child_references.len());
    for original in owner.child_reference_guids() {
        let Some(copy_guid) = guid_map.get(original) else {
            log::warn!("No copy guid for child '{}' of '{}', dropping it", original, owner.guid);
            continue;
        };
        references.push(ChildReference {
            child_reference: copy_guid.clone(),
        });
        let Some(child) = elements.get(original) else {
            continue;
        };

        let mut copy = FlowElement::clone(child);
        copy.guid = copy_guid.clone();
        copy.config = ElementConfig::default();
        copy.clear_topology();
        if context.rename_children {
            copy.name = copy.name.as_deref().map(|name| context.namer.dev_name(name));
            copy.label = copy.label.as_deref().map(|label| context.namer.label(label));
        }
        copy.child_references = copy_children(child, context, out);
        out.push(copy);
    }
    references
}
