//! Auto-layout reducer tests
//!
//! Placement, deletion, faults, rebranching and merge restructuring on the
//! auto-layout canvas. Every store here checks the layout invariants after each
//! dispatch, so a passing dispatch also means a consistent graph.
mod common;
use common::*;
use nagare::prelude::*;

#[cfg(test)]
mod auto_layout_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_start_heads_a_terminated_main_line() {
        let store = started_store();

        let root = element(&store, ROOT_ELEMENT_GUID);
        assert_eq!(root.children, Some(vec![Some("start".to_string())]));

        let start = element(&store, "start");
        assert_eq!(start.node_type, Some(NodeType::Start));
        assert_eq!(start.parent.as_deref(), Some(ROOT_ELEMENT_GUID));
        assert_eq!(start.child_index, Some(ChildIndex::Branch(0)));
        assert!(start.is_terminal);
        assert!(element(&store, "end-0").is_end());
        assert_eq!(main_line(&store), vec!["start", "end-0"]);
    }

    #[test]
    fn test_a_second_start_is_rejected() {
        let mut store = started_store();
        let before = store.state().clone();

        let result = store.dispatch(Action::AddStartElement(FlowElement::canvas("start2", element_type::START)));

        assert!(matches!(result, Err(FlowError::InvalidOperation { .. })));
        assert!(store.state().ptr_eq(&before));
    }

    #[test]
    fn test_elements_are_spliced_before_their_follower() {
        let mut store = store_with_main_line(&["a", "c"]);
        place(&mut store, leaf("b"), ConnectionSource::next("a"));

        assert_eq!(main_line(&store), vec!["start", "a", "b", "c", "end-0"]);
        assert_eq!(element(&store, "c").prev.as_deref(), Some("b"));
    }

    #[test]
    fn test_placing_an_element_twice_is_rejected() {
        let mut store = store_with_main_line(&["a"]);

        let result = store.dispatch(Action::AddCanvasElement(AddElementPayload {
            element: leaf("a"),
            alc_connection_source: Some(ConnectionSource::next("start")),
        }));

        assert!(matches!(result, Err(FlowError::InvalidOperation { .. })));
        assert_eq!(main_line(&store), vec!["start", "a", "end-0"]);
    }

    #[test]
    fn test_placing_at_a_missing_element_is_rejected() {
        let mut store = started_store();

        let result = store.dispatch(Action::AddCanvasElement(AddElementPayload {
            element: leaf("a"),
            alc_connection_source: Some(ConnectionSource::next("ghost")),
        }));

        assert!(matches!(result, Err(FlowError::ElementNotFound { .. })));
        assert!(!store.state().elements.contains("a"));
    }

    #[test]
    fn test_an_end_drops_the_rest_of_the_branch() {
        let mut store = store_with_main_line(&["a", "b"]);

        store
            .dispatch(Action::AddEndElement(AddElementPayload {
                element: FlowElement::canvas("e", element_type::END),
                alc_connection_source: Some(ConnectionSource::next("a")),
            }))
            .expect("Failed to add the End");

        assert_eq!(main_line(&store), vec!["start", "a", "e"]);
        assert!(!store.state().elements.contains("b"));
        assert!(!store.state().elements.contains("end-0"));
    }

    #[test]
    fn test_leaves_are_placed_into_branches() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1"], ConnectionSource::next("start"));
        place(&mut store, leaf("x"), ConnectionSource::branch("d", 0));

        let decision = element(&store, "d");
        assert_eq!(decision.children, Some(vec![Some("x".to_string()), None]));
        let x = element(&store, "x");
        assert_eq!(x.parent.as_deref(), Some("d"));
        assert_eq!(x.child_index, Some(ChildIndex::Branch(0)));
        assert!(!x.is_terminal);
        assert_eq!(main_line(&store), vec!["start", "d", "end-0"]);
    }

    #[test]
    fn test_deleting_a_decision_keeps_one_branch() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1"], ConnectionSource::next("start"));
        place(&mut store, leaf("x"), ConnectionSource::branch("d", 0));
        place(&mut store, leaf("y"), ConnectionSource::branch("d", 1));

        store
            .dispatch(Action::DeleteElement(DeleteElementPayload {
                selected_elements: vec!["d".to_string()],
                connectors_to_delete: Vec::new(),
                element_type: Some(element_type::DECISION.to_string()),
                child_index_to_keep: Some(0),
            }))
            .expect("Failed to delete the decision");

        assert_eq!(main_line(&store), vec!["start", "x", "end-0"]);
        let elements = &store.state().elements;
        for gone in ["d", "o1", "y"] {
            assert!(!elements.contains(gone), "'{gone}' should be deleted");
        }
        let x = element(&store, "x");
        assert_eq!(x.parent, None);
        assert_eq!(x.child_index, None);
    }

    #[test]
    fn test_deleting_a_leaf_reconnects_its_neighbours() {
        let mut store = store_with_main_line(&["a", "b", "c"]);

        store
            .dispatch(Action::DeleteElement(DeleteElementPayload {
                selected_elements: vec!["b".to_string()],
                connectors_to_delete: Vec::new(),
                element_type: None,
                child_index_to_keep: None,
            }))
            .expect("Failed to delete b");

        assert_eq!(main_line(&store), vec!["start", "a", "c", "end-0"]);
        assert_eq!(element(&store, "c").prev.as_deref(), Some("a"));
    }

    #[test]
    fn test_the_main_line_end_cannot_be_deleted() {
        let mut store = store_with_main_line(&["a"]);

        let result = store.dispatch(Action::DeleteElement(DeleteElementPayload {
            selected_elements: vec!["end-0".to_string()],
            connectors_to_delete: Vec::new(),
            element_type: None,
            child_index_to_keep: None,
        }));

        assert!(matches!(result, Err(FlowError::InvalidOperation { .. })));
        assert!(store.state().elements.contains("end-0"));
    }

    #[test]
    fn test_fault_branches_are_added_and_removed() {
        let mut store = started_store();
        place(
            &mut store,
            FlowElement::canvas("r", element_type::RECORD_CREATE).with_label("Create"),
            ConnectionSource::next("start"),
        );

        store
            .dispatch(Action::AddFault(ElementRef::new("r")))
            .expect("Failed to add the fault");
        let fault = element(&store, "r").fault.clone().expect("Fault branch missing");
        let fault_head = element(&store, &fault);
        assert!(fault_head.is_end());
        assert!(fault_head.is_terminal);
        assert_eq!(fault_head.child_index, Some(ChildIndex::Fault));

        store
            .dispatch(Action::DeleteFault(ElementRef::new("r")))
            .expect("Failed to delete the fault");
        assert_eq!(element(&store, "r").fault, None);
        assert!(!store.state().elements.contains(&fault));
    }

    #[test]
    fn test_wait_keeps_its_fault_branch_out_of_children() {
        let mut store = started_store();
        store
            .dispatch(Action::AddWaitWithWaitEvents(ElementWithChildrenPayload {
                canvas_element: FlowElement::canvas("w", element_type::WAIT)
                    .with_label("Pause")
                    .with_child_references(["e1"]),
                child_elements: vec![FlowElement::new("e1", element_type::WAIT_EVENT).with_label("Event")],
                deleted_child_elements: Vec::new(),
                alc_connection_source: Some(ConnectionSource::next("start")),
            }))
            .expect("Failed to place the wait");

        store
            .dispatch(Action::AddFault(ElementRef::new("w")))
            .expect("Failed to add the fault");

        let wait = element(&store, "w");
        assert_eq!(wait.children, Some(vec![None, None]));
        assert_eq!(wait.max_connections, 3);
        let fault = wait.fault.clone().expect("Fault branch missing");
        assert_eq!(element(&store, &fault).child_index, Some(ChildIndex::Fault));
        assert_eq!(main_line(&store), vec!["start", "w", "end-0"]);
    }

    #[test]
    fn test_fault_on_an_unsupported_type_is_rejected() {
        let mut store = store_with_main_line(&["a"]);

        let result = store.dispatch(Action::AddFault(ElementRef::new("a")));

        assert!(matches!(result, Err(FlowError::InvalidOperation { .. })));
        assert_eq!(element(&store, "a").fault, None);
    }

    #[test]
    fn test_terminating_a_branch_inlines_the_continuation() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1"], ConnectionSource::next("start"));

        store
            .dispatch(Action::AddEndElement(AddElementPayload {
                element: FlowElement::canvas("e", element_type::END),
                alc_connection_source: Some(ConnectionSource::branch("d", 0)),
            }))
            .expect("Failed to terminate branch 0");

        let decision = element(&store, "d");
        assert_eq!(decision.next, None);
        assert_eq!(
            decision.children,
            Some(vec![Some("e".to_string()), Some("end-0".to_string())])
        );
        let end = element(&store, "end-0");
        assert_eq!(end.parent.as_deref(), Some("d"));
        assert_eq!(end.child_index, Some(ChildIndex::Branch(1)));
        assert!(element(&store, "start").is_terminal);
    }

    #[test]
    fn test_new_outcomes_move_existing_branches() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1"], ConnectionSource::next("start"));
        place(&mut store, leaf("x"), ConnectionSource::branch("d", 0));

        store
            .dispatch(Action::ModifyDecisionWithOutcomes(decision_payload("d", &["o0", "o1"], None)))
            .expect("Failed to modify the decision");

        let decision = element(&store, "d");
        assert_eq!(decision.children, Some(vec![None, Some("x".to_string()), None]));
        assert_eq!(element(&store, "x").child_index, Some(ChildIndex::Branch(1)));
        assert_eq!(decision.max_connections, 3);
    }

    #[test]
    fn test_removing_an_outcome_deletes_its_branch() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1", "o2"], ConnectionSource::next("start"));
        place(&mut store, leaf("x"), ConnectionSource::branch("d", 0));
        place(&mut store, leaf("y"), ConnectionSource::branch("d", 1));

        let mut payload = decision_payload("d", &["o2"], None);
        payload.deleted_child_elements = vec![outcome("o1")];
        store
            .dispatch(Action::ModifyDecisionWithOutcomes(payload))
            .expect("Failed to modify the decision");

        let decision = element(&store, "d");
        assert_eq!(decision.children, Some(vec![Some("y".to_string()), None]));
        assert!(!store.state().elements.contains("x"));
        assert_eq!(element(&store, "y").child_index, Some(ChildIndex::Branch(0)));
    }

    #[test]
    fn test_scheduled_paths_branch_the_start_element() {
        let mut store = store_with_main_line(&["a"]);
        let path = FlowElement::new("p1", element_type::SCHEDULED_PATH).with_label("Later");
        let payload = ElementWithChildrenPayload {
            canvas_element: FlowElement::canvas("start", element_type::START).with_child_references(["p1"]),
            child_elements: vec![path],
            deleted_child_elements: Vec::new(),
            alc_connection_source: None,
        };
        store
            .dispatch(Action::ModifyStartWithScheduledPaths(payload))
            .expect("Failed to add a scheduled path");

        let start = element(&store, "start");
        assert_eq!(start.children.as_ref().map(Vec::len), Some(2));
        assert!(
            start
                .available_connections
                .iter()
                .all(|slot| slot.connector_type != ConnectorType::Regular || slot.child_reference.is_some())
        );

        let payload = ElementWithChildrenPayload {
            canvas_element: FlowElement::canvas("start", element_type::START),
            child_elements: Vec::new(),
            deleted_child_elements: vec![FlowElement::new("p1", element_type::SCHEDULED_PATH)],
            alc_connection_source: None,
        };
        store
            .dispatch(Action::ModifyStartWithScheduledPaths(payload))
            .expect("Failed to remove the scheduled path");

        let start = element(&store, "start");
        assert_eq!(start.children, None);
        assert!(!store.state().elements.contains("p1"));
        assert_eq!(main_line(&store), vec!["start", "a", "end-0"]);
    }

    #[test]
    fn test_derived_connectors_follow_the_layout() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1"], ConnectionSource::next("start"));
        place(&mut store, leaf("x"), ConnectionSource::branch("d", 0));

        let connectors = store.derived_connectors().expect("Failed to derive connectors");
        let summary: Vec<(String, String, ConnectorType)> = connectors
            .iter()
            .map(|c| (c.guid.clone(), c.target.clone(), c.connector_type))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("d:0".to_string(), "x".to_string(), ConnectorType::Regular),
                ("d:1".to_string(), "end-0".to_string(), ConnectorType::Default),
                ("d:next".to_string(), "end-0".to_string(), ConnectorType::Regular),
                ("start:next".to_string(), "d".to_string(), ConnectorType::Regular),
                ("x:next".to_string(), "end-0".to_string(), ConnectorType::Regular),
            ]
        );
        assert_eq!(connectors[0].child_source.as_deref(), Some("o1"));
    }
}
