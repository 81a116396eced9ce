//! The connectors slice: selection, highlight and the connector list of the
//! free-form canvas, kept in step with the elements slice.

use super::ReducerContext;
use crate::actions::{Action, DuplicatePayload, ElementWithChildrenPayload};
use crate::model::{Connector, ConnectorConfig, ConnectorType, Guid};
use crate::state::{Connectors, Elements};
use ahash::AHashSet;

/// Reduces the connector list. `elements` is the elements slice this action
/// produced.
pub fn reduce(connectors: &Connectors, action: &Action, elements: &Elements, context: &ReducerContext) -> Connectors {
    match action {
        Action::SelectOnCanvas(target) => update(connectors, |connector, config| {
            config.is_selected = connector.guid == target.guid;
        }),
        Action::ToggleOnCanvas(target) => update(connectors, |connector, config| {
            if connector.guid == target.guid {
                config.is_selected = !config.is_selected;
            }
        }),
        Action::DeselectOnCanvas => update(connectors, |_, config| config.is_selected = false),
        Action::MarqueeSelectOnCanvas(payload) => update(connectors, |connector, config| {
            if payload.connectors_to_select.contains(&connector.guid) {
                config.is_selected = true;
            } else if payload.connectors_to_deselect.contains(&connector.guid) {
                config.is_selected = false;
            }
        }),

        Action::AddConnector(connector) => {
            if connectors.get(&connector.guid).is_some() {
                return connectors.clone();
            }
            let mut next = connectors.clone();
            next.make_mut().push(connector.clone());
            next
        }
        Action::DeleteElement(payload) => {
            let listed: AHashSet<&Guid> = payload.connectors_to_delete.iter().map(|c| &c.guid).collect();
            retain(connectors, |connector| {
                !listed.contains(&connector.guid)
                    && elements.contains(&connector.source)
                    && elements.contains(&connector.target)
            })
        }

        Action::ModifyDecisionWithOutcomes(payload)
        | Action::ModifyWaitWithWaitEvents(payload)
        | Action::ModifyScreenWithFields(payload) => relabel_children(connectors, payload, None),
        Action::ModifyStartWithScheduledPaths(payload) => {
            let first_path_type = if payload.child_elements.is_empty() {
                ConnectorType::Regular
            } else {
                ConnectorType::Immediate
            };
            relabel_children(connectors, payload, Some(first_path_type))
        }

        Action::DoDuplicate(payload) => duplicate(connectors, payload, context),

        Action::DecorateCanvas(payload) => update(connectors, |connector, config| {
            config.is_highlighted = payload
                .connectors_to_highlight
                .iter()
                .any(|key| connector.matches_key(key));
        }),
        Action::ClearCanvasDecoration => update(connectors, |_, config| config.is_highlighted = false),

        Action::UpdateFlow(state) => state.connectors.clone(),
        _ => connectors.clone(),
    }
}

/// Applies `change` to a copy of every connector's config, returning the input
/// untouched when no config changes.
fn update<F>(connectors: &Connectors, change: F) -> Connectors
where
    F: Fn(&Connector, &mut ConnectorConfig),
{
    let changes: Vec<(usize, ConnectorConfig)> = connectors
        .iter()
        .enumerate()
        .filter_map(|(index, connector)| {
            let mut config = connector.config.clone();
            change(connector, &mut config);
            (config != connector.config).then_some((index, config))
        })
        .collect();
    if changes.is_empty() {
        return connectors.clone();
    }

    let mut next = connectors.clone();
    let list = next.make_mut();
    for (index, config) in changes {
        list[index].config = config;
    }
    next
}

fn retain<F>(connectors: &Connectors, keep: F) -> Connectors
where
    F: Fn(&Connector) -> bool,
{
    if connectors.iter().all(&keep) {
        return connectors.clone();
    }
    connectors.iter().filter(|&connector| keep(connector)).cloned().collect()
}

/// Drops connectors of deleted children, relabels those of surviving children and
/// optionally retypes the parent's connector that does not leave from a child.
fn relabel_children(
    connectors: &Connectors,
    payload: &ElementWithChildrenPayload,
    parent_type: Option<ConnectorType>,
) -> Connectors {
    let parent = &payload.canvas_element.guid;
    let deleted: AHashSet<&Guid> = payload.deleted_child_elements.iter().map(|c| &c.guid).collect();
    let kept = retain(connectors, |connector| {
        connector
            .child_source
            .as_ref()
            .is_none_or(|child| !deleted.contains(child))
    });

    let changes: Vec<(usize, Connector)> = kept
        .iter()
        .enumerate()
        .filter(|(_, connector)| connector.source == *parent)
        .filter_map(|(index, connector)| {
            let mut changed = connector.clone();
            match &connector.child_source {
                Some(child) => {
                    let label = payload
                        .child_elements
                        .iter()
                        .find(|element| element.guid == *child)
                        .and_then(|element| element.label.clone());
                    if label.is_some() {
                        changed.label = label;
                    }
                }
                None => match (connector.connector_type, parent_type) {
                    (ConnectorType::Regular | ConnectorType::Immediate, Some(connector_type)) => {
                        changed.connector_type = connector_type;
                    }
                    _ => {}
                },
            }
            (changed != *connector).then_some((index, changed))
        })
        .collect();
    if changes.is_empty() {
        return kept;
    }

    let mut next = kept;
    let list = next.make_mut();
    for (index, connector) in changes {
        list[index] = connector;
    }
    next
}

/// Copies connectors between duplicated elements; copies are selected in place of
/// their originals.
fn duplicate(connectors: &Connectors, payload: &DuplicatePayload, context: &ReducerContext) -> Connectors {
    let guid_map = &payload.canvas_element_guid_map;
    let copies: Vec<Connector> = payload
        .connectors_to_duplicate
        .iter()
        .filter_map(|original| {
            let source = guid_map.get(&original.source)?;
            let target = guid_map.get(&original.target)?;
            let mut copy = original.clone();
            copy.guid = context.guids.next_guid();
            copy.source = source.clone();
            copy.target = target.clone();
            copy.child_source = original
                .child_source
                .as_ref()
                .map(|child| payload.child_element_guid_map.get(child).unwrap_or(child).clone());
            copy.config = ConnectorConfig {
                is_selected: true,
                is_highlighted: false,
            };
            Some(copy)
        })
        .collect();
    if copies.is_empty() {
        return connectors.clone();
    }

    let originals: AHashSet<&Guid> = payload.connectors_to_duplicate.iter().map(|c| &c.guid).collect();
    let mut next = connectors.clone();
    let list = next.make_mut();
    for connector in list.iter_mut().filter(|c| originals.contains(&c.guid)) {
        connector.config.is_selected = false;
    }
    list.extend(copies);
    next
}
