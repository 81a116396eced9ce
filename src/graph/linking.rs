use super::navigation::{
    is_goto_link, move_goto_source, remove_goto_source, resolve, resolve_mut, set_slot, slot_target,
};
use super::terminal::compute_branch_terminal;
use crate::error::FlowError;
use crate::model::{ConnectionSource, FlowElement, Guid, GuidGenerator};
use crate::state::ElementMap;
use std::sync::Arc;

/// Splices the chain `top..=bottom` into `source`.
///
/// Whatever occupied the slot is re-attached after `bottom`: a layout follower becomes
/// `bottom.next`, a goto moves so that it leaves from `bottom` instead.
pub fn link_chain(flow: &mut ElementMap, source: &ConnectionSource, top: &str, bottom: &str) -> Result<(), FlowError> {
    let occupant = slot_target(flow, source)?;
    let occupant_is_goto = occupant
        .as_deref()
        .is_some_and(|target| is_goto_link(flow, source, target));

    set_slot(flow, source, Some(top.to_string()))?;
    {
        let head = resolve_mut(flow, top, "linking a chain")?;
        match source.child_index {
            None => {
                head.prev = Some(source.guid.clone());
                head.parent = None;
                head.child_index = None;
                head.is_terminal = false;
            }
            Some(index) => {
                head.prev = None;
                head.parent = Some(source.guid.clone());
                head.child_index = Some(index);
            }
        }
    }

    match occupant {
        Some(target) if occupant_is_goto => {
            resolve_mut(flow, bottom, "linking a chain")?.next = Some(target.clone());
            move_goto_source(flow, &target, source, &ConnectionSource::next(bottom))?;
        }
        Some(follower) => {
            resolve_mut(flow, bottom, "linking a chain")?.next = Some(follower.clone());
            let follower = resolve_mut(flow, &follower, "linking a chain")?;
            follower.prev = Some(bottom.to_string());
            follower.parent = None;
            follower.child_index = None;
            follower.is_terminal = false;
        }
        None => resolve_mut(flow, bottom, "linking a chain")?.next = None,
    }

    if source.child_index.is_some() {
        let terminal = compute_branch_terminal(flow, top)?;
        resolve_mut(flow, top, "linking a chain")?.is_terminal = terminal;
    }
    Ok(())
}

/// Takes a single element out of its chain, handing its slot to its follower.
///
/// The element's own branches must already have been dealt with. A goto leaving the
/// element moves to the slot that pointed at it.
pub fn unlink_element(flow: &mut ElementMap, guid: &str) -> Result<(), FlowError> {
    let element = resolve(flow, guid, "unlinking an element")?;
    let own_next = ConnectionSource::next(guid);
    let next = element.next.clone();
    let next_is_goto = next
        .as_deref()
        .is_some_and(|target| is_goto_link(flow, &own_next, target));
    let was_terminal = element.is_terminal;
    let incoming = match (&element.prev, &element.parent) {
        (Some(prev), _) => Some(ConnectionSource::next(prev)),
        (None, Some(parent)) => Some(ConnectionSource::with_child_index(parent, element.child_index)),
        (None, None) => None,
    };

    match (&incoming, &next) {
        (Some(slot), Some(next)) => {
            set_slot(flow, slot, Some(next.clone()))?;
            if next_is_goto {
                move_goto_source(flow, next, &own_next, slot)?;
            } else {
                let follower = resolve_mut(flow, next, "unlinking an element")?;
                match slot.child_index {
                    None => follower.prev = Some(slot.guid.clone()),
                    Some(index) => {
                        follower.prev = None;
                        follower.parent = Some(slot.guid.clone());
                        follower.child_index = Some(index);
                        follower.is_terminal = was_terminal;
                    }
                }
            }
        }
        (Some(slot), None) => set_slot(flow, slot, None)?,
        (None, Some(next)) if next_is_goto => remove_goto_source(flow, next, &own_next)?,
        (None, Some(next)) => resolve_mut(flow, next, "unlinking an element")?.prev = None,
        (None, None) => {}
    }

    let element = resolve_mut(flow, guid, "unlinking an element")?;
    element.prev = None;
    element.next = None;
    element.parent = None;
    element.child_index = None;
    element.is_terminal = false;
    Ok(())
}

/// Puts a freshly synthesized End element into an empty slot.
pub fn terminate_slot(
    flow: &mut ElementMap,
    source: &ConnectionSource,
    guids: &dyn GuidGenerator,
) -> Result<Guid, FlowError> {
    if let Some(occupant) = slot_target(flow, source)? {
        return Err(FlowError::InvalidConnection {
            from: source.clone(),
            target: occupant,
            message: "cannot terminate a slot that is already connected".to_string(),
        });
    }
    let end = FlowElement::end_element(guids.next_guid());
    let guid = end.guid.clone();
    flow.insert(guid.clone(), Arc::new(end));
    link_chain(flow, source, &guid, &guid)?;
    log::debug!("Terminated {} with End '{}'", source, guid);
    Ok(guid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeType, SequentialGuidGenerator};

    fn leaf(guid: &str) -> FlowElement {
        let mut element = FlowElement::canvas(guid, "Assignment");
        element.node_type = Some(NodeType::Leaf);
        element
    }

    fn flow_of(elements: Vec<FlowElement>) -> ElementMap {
        elements
            .into_iter()
            .map(|element| (element.guid.clone(), Arc::new(element)))
            .collect()
    }

    #[test]
    fn link_chain_inserts_between_element_and_follower() {
        let mut a = leaf("a");
        let mut c = leaf("c");
        a.next = Some("c".into());
        c.prev = Some("a".into());
        let mut flow = flow_of(vec![a, leaf("b"), c]);

        link_chain(&mut flow, &ConnectionSource::next("a"), "b", "b").unwrap();

        assert_eq!(flow["a"].next.as_deref(), Some("b"));
        assert_eq!(flow["b"].prev.as_deref(), Some("a"));
        assert_eq!(flow["b"].next.as_deref(), Some("c"));
        assert_eq!(flow["c"].prev.as_deref(), Some("b"));
    }

    #[test]
    fn link_chain_moves_a_goto_to_the_bottom_element() {
        let mut a = leaf("a");
        let mut target = leaf("target");
        a.next = Some("target".into());
        target.incoming_goto.push(ConnectionSource::next("a"));
        let mut flow = flow_of(vec![a, leaf("b"), target]);

        link_chain(&mut flow, &ConnectionSource::next("a"), "b", "b").unwrap();

        assert_eq!(flow["b"].next.as_deref(), Some("target"));
        assert_eq!(flow["target"].incoming_goto, vec![ConnectionSource::next("b")]);
        assert_eq!(flow["target"].prev, None);
    }

    #[test]
    fn unlink_element_reparents_the_follower_of_a_branch_head() {
        let mut decision = FlowElement::canvas("d", "Decision");
        decision.node_type = Some(NodeType::Decision);
        decision.children = Some(vec![Some("a".into())]);
        let mut a = leaf("a");
        a.parent = Some("d".into());
        a.child_index = Some(crate::model::ChildIndex::Branch(0));
        a.next = Some("b".into());
        let mut b = leaf("b");
        b.prev = Some("a".into());
        let mut flow = flow_of(vec![decision, a, b]);

        unlink_element(&mut flow, "a").unwrap();

        assert_eq!(flow["d"].children, Some(vec![Some("b".to_string())]));
        assert_eq!(flow["b"].parent.as_deref(), Some("d"));
        assert_eq!(flow["b"].prev, None);
    }

    #[test]
    fn terminate_slot_rejects_connected_slots() {
        let mut a = leaf("a");
        a.next = Some("b".into());
        let mut b = leaf("b");
        b.prev = Some("a".into());
        let mut flow = flow_of(vec![a, b]);
        let guids = SequentialGuidGenerator::new("end-");

        assert!(terminate_slot(&mut flow, &ConnectionSource::next("a"), &guids).is_err());
        let end = terminate_slot(&mut flow, &ConnectionSource::next("b"), &guids).unwrap();
        assert_eq!(end, "end-0");
        assert!(flow["end-0"].is_end());
    }
}
