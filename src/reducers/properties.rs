use crate::actions::{Action, PropertiesPatch};
use crate::state::FlowProperties;
use std::sync::Arc;

/// `graph_changed` tells whether the element or connector slices moved; graph actions
/// that left both alone do not mark the flow dirty.
pub fn reduce(properties: &Arc<FlowProperties>, action: &Action, graph_changed: bool) -> Arc<FlowProperties> {
    match action {
        Action::UpdateFlow(state) => Arc::clone(&state.properties),
        Action::AddResource(resource) => modify(properties, |p| {
            p.last_inserted_resource = Some(resource.guid.clone());
            p.has_unsaved_changes = true;
        }),
        Action::UpdateProperties(patch) => modify(properties, |p| {
            apply(p, patch);
            p.has_unsaved_changes = true;
        }),
        Action::UpdatePropertiesAfterSaving(patch) => modify(properties, |p| {
            apply(p, patch);
            p.has_unsaved_changes = false;
        }),
        Action::UpdateIsAutoLayoutCanvasProperty(enabled) => {
            modify(properties, |p| p.is_auto_layout_canvas = *enabled)
        }
        action if action.mutates_graph() && graph_changed => {
            modify(properties, |p| p.has_unsaved_changes = true)
        }
        _ => Arc::clone(properties),
    }
}

fn apply(properties: &mut FlowProperties, patch: &PropertiesPatch) {
    if let Some(label) = &patch.label {
        properties.label = Some(label.clone());
    }
    if let Some(name) = &patch.name {
        properties.name = Some(name.clone());
    }
    if let Some(process_type) = &patch.process_type {
        properties.process_type = Some(process_type.clone());
    }
}

/// Applies `change` to a copy, keeping the original handle when nothing changed.
fn modify<F>(properties: &Arc<FlowProperties>, change: F) -> Arc<FlowProperties>
where
    F: FnOnce(&mut FlowProperties),
{
    let mut next = FlowProperties::clone(properties);
    change(&mut next);
    if next == **properties {
        Arc::clone(properties)
    } else {
        Arc::new(next)
    }
}
