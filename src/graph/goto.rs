use super::linking::terminate_slot;
use super::navigation::{
    add_goto_source, is_goto_link, outgoing_slots, remove_goto_source, resolve, set_slot, slot_target,
};
use super::terminal::repair_at_slot;
use crate::error::FlowError;
use crate::model::{ConnectionSource, Guid, GuidGenerator, NodeType};
use crate::state::ElementMap;

fn invalid(source: &ConnectionSource, target: &str, message: &str) -> FlowError {
    FlowError::InvalidConnection {
        from: source.clone(),
        target: target.to_string(),
        message: message.to_string(),
    }
}

/// Points `source` at an existing element through a goto.
///
/// The slot must currently end in an End element, which is removed, or be empty. With
/// `is_reroute` the slot must already hold a goto, which is moved to the new target.
pub fn create_goto(
    flow: &mut ElementMap,
    source: &ConnectionSource,
    target: &str,
    is_reroute: bool,
    guids: &dyn GuidGenerator,
) -> Result<(), FlowError> {
    let target_type = resolve(flow, target, "creating a goto")?.node_type;
    match target_type {
        Some(NodeType::End) | Some(NodeType::Root) | Some(NodeType::Start) | None => {
            return Err(invalid(source, target, "target cannot receive a goto"));
        }
        _ if source.guid == target => return Err(invalid(source, target, "an element cannot go to itself")),
        _ => {}
    }

    let current = slot_target(flow, source)?;
    if is_reroute {
        let Some(previous) = current.filter(|current| is_goto_link(flow, source, current)) else {
            return Err(invalid(source, target, "there is no goto to reroute"));
        };
        remove_goto_source(flow, &previous, source)?;
    } else if let Some(occupant) = current {
        let occupant_element = resolve(flow, &occupant, "creating a goto")?;
        if !occupant_element.is_end() || is_goto_link(flow, source, &occupant) {
            return Err(invalid(source, target, "the slot is already connected"));
        }
        flow.remove(&occupant);
    }

    set_slot(flow, source, Some(target.to_string()))?;
    add_goto_source(flow, target, source)?;
    log::debug!("Created goto {} -> '{}'", source, target);
    repair_at_slot(flow, source, guids)
}

/// Replaces the goto leaving `source` with a new End element.
pub fn delete_goto(flow: &mut ElementMap, source: &ConnectionSource, guids: &dyn GuidGenerator) -> Result<Guid, FlowError> {
    let target = slot_target(flow, source)?
        .filter(|target| is_goto_link(flow, source, target))
        .ok_or_else(|| invalid(source, "", "there is no goto to delete"))?;
    remove_goto_source(flow, &target, source)?;
    set_slot(flow, source, None)?;
    let end = terminate_slot(flow, source, guids)?;
    log::debug!("Deleted goto {} -> '{}'", source, target);
    repair_at_slot(flow, source, guids)?;
    Ok(end)
}

/// Deletes every goto entering or leaving the given elements.
pub fn reset_gotos(flow: &mut ElementMap, elements: &[Guid], guids: &dyn GuidGenerator) -> Result<(), FlowError> {
    for guid in elements {
        let element = resolve(flow, guid, "resetting gotos")?;
        let mut sources = element.incoming_goto.clone();
        for slot in outgoing_slots(element) {
            if let Some(target) = slot_target(flow, &slot)? {
                if is_goto_link(flow, &slot, &target) {
                    sources.push(slot);
                }
            }
        }
        for source in sources {
            let still_goto = slot_target(flow, &source)?
                .is_some_and(|target| is_goto_link(flow, &source, &target));
            if still_goto {
                delete_goto(flow, &source, guids)?;
            }
        }
    }
    Ok(())
}
