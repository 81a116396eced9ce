//! Paste tests on the auto-layout canvas
mod common;
use common::*;
use nagare::prelude::*;

#[cfg(test)]
mod paste_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ahash::AHashMap;

    fn copied(guid: &str, kind: &str, node_type: NodeType) -> FlowElement {
        let mut element = FlowElement::canvas(guid, kind);
        element.node_type = Some(node_type);
        element
    }

    fn guid_map(pairs: &[(&str, &str)]) -> AHashMap<Guid, Guid> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn clipboard(elements: Vec<FlowElement>) -> AHashMap<Guid, FlowElement> {
        elements.into_iter().map(|e| (e.guid.clone(), e)).collect()
    }

    /// Two chained copies of "My Step", ready to be pasted under new guids.
    fn two_step_payload(source: ConnectionSource) -> PastePayload {
        let mut first = copied("orig1", element_type::ASSIGNMENT, NodeType::Leaf)
            .with_name("My_Step")
            .with_label("My Step");
        let mut second = first.clone();
        second.guid = "orig2".to_string();
        first.next = Some("orig2".to_string());
        second.prev = Some("orig1".to_string());

        PastePayload {
            canvas_element_guid_map: guid_map(&[("orig1", "p1"), ("orig2", "p2")]),
            child_element_guid_map: AHashMap::new(),
            cut_or_copied_canvas_elements: clipboard(vec![first, second]),
            cut_or_copied_child_elements: AHashMap::new(),
            top_cut_or_copied_guid: "orig1".to_string(),
            bottom_cut_or_copied_guid: "orig2".to_string(),
            source,
        }
    }

    #[test]
    fn test_pasted_copies_get_unique_names() {
        let mut store = started_store();
        place(
            &mut store,
            leaf("a").with_name("my_step").with_label("My Step"),
            ConnectionSource::next("start"),
        );
        place(&mut store, leaf("b").with_label("My Step 0 copy"), ConnectionSource::next("a"));

        store
            .dispatch(Action::PasteOnFixedCanvas(two_step_payload(ConnectionSource::next("start"))))
            .expect("Failed to paste");

        let p1 = element(&store, "p1");
        let p2 = element(&store, "p2");
        assert_eq!(p1.label.as_deref(), Some("My Step 1 copy"));
        assert_eq!(p1.name.as_deref(), Some("My_Step_0"));
        assert_eq!(p2.label.as_deref(), Some("My Step 2 copy"));
        assert_eq!(p2.name.as_deref(), Some("My_Step_1"));
        assert_eq!(main_line(&store), vec!["start", "p1", "p2", "a", "b", "end-0"]);
    }

    #[test]
    fn test_cut_paste_keeps_names() {
        let mut store = store_with_main_line(&["a"]);
        let cut = copied("cut", element_type::ASSIGNMENT, NodeType::Leaf)
            .with_name("Cut_Step")
            .with_label("Cut Step");
        let payload = PastePayload {
            canvas_element_guid_map: guid_map(&[("cut", "pasted")]),
            child_element_guid_map: AHashMap::new(),
            cut_or_copied_canvas_elements: clipboard(vec![cut]),
            cut_or_copied_child_elements: AHashMap::new(),
            top_cut_or_copied_guid: "cut".to_string(),
            bottom_cut_or_copied_guid: "cut".to_string(),
            source: ConnectionSource::next("a"),
        };

        store
            .dispatch(Action::PasteCutElementOnFixedCanvas(payload))
            .expect("Failed to paste");

        let pasted = element(&store, "pasted");
        assert_eq!(pasted.name.as_deref(), Some("Cut_Step"));
        assert_eq!(pasted.label.as_deref(), Some("Cut Step"));
        assert_eq!(main_line(&store), vec!["start", "a", "pasted", "end-0"]);
    }

    #[test]
    fn test_end_terminated_chain_needs_an_empty_slot() {
        let mut store = store_with_main_line(&["a"]);
        let before = store.state().clone();
        let mut step = copied("x", element_type::ASSIGNMENT, NodeType::Leaf).with_label("Step");
        let mut end = copied("e", element_type::END, NodeType::End);
        step.next = Some("e".to_string());
        end.prev = Some("x".to_string());
        let payload = PastePayload {
            canvas_element_guid_map: guid_map(&[("x", "x2"), ("e", "e2")]),
            child_element_guid_map: AHashMap::new(),
            cut_or_copied_canvas_elements: clipboard(vec![step, end]),
            cut_or_copied_child_elements: AHashMap::new(),
            top_cut_or_copied_guid: "x".to_string(),
            bottom_cut_or_copied_guid: "e".to_string(),
            source: ConnectionSource::next("start"),
        };

        let result = store.dispatch(Action::PasteOnFixedCanvas(payload));

        assert!(matches!(result, Err(FlowError::InvalidConnection { .. })));
        assert!(store.state().ptr_eq(&before));
        assert!(!store.state().elements.contains("x2"));
    }

    #[test]
    fn test_pasting_a_decision_remaps_its_branches() {
        let mut store = started_store();
        let mut decision = copied("dorig", element_type::DECISION, NodeType::Decision)
            .with_label("Check")
            .with_child_references(["oorig"]);
        decision.children = Some(vec![Some("xorig".to_string()), None]);
        let mut inner = copied("xorig", element_type::ASSIGNMENT, NodeType::Leaf).with_label("Inner");
        inner.parent = Some("dorig".to_string());
        inner.child_index = Some(ChildIndex::Branch(0));
        let payload = PastePayload {
            canvas_element_guid_map: guid_map(&[("dorig", "d2"), ("xorig", "x2")]),
            child_element_guid_map: guid_map(&[("oorig", "o2")]),
            cut_or_copied_canvas_elements: clipboard(vec![decision, inner]),
            cut_or_copied_child_elements: clipboard(vec![outcome("oorig")]),
            top_cut_or_copied_guid: "dorig".to_string(),
            bottom_cut_or_copied_guid: "dorig".to_string(),
            source: ConnectionSource::next("start"),
        };

        store
            .dispatch(Action::PasteOnFixedCanvas(payload))
            .expect("Failed to paste");

        let pasted = element(&store, "d2");
        assert_eq!(pasted.children, Some(vec![Some("x2".to_string()), None]));
        assert_eq!(pasted.child_reference_guids().cloned().collect::<Vec<_>>(), vec!["o2"]);
        let x2 = element(&store, "x2");
        assert_eq!(x2.parent.as_deref(), Some("d2"));
        assert_eq!(x2.child_index, Some(ChildIndex::Branch(0)));
        assert_eq!(element(&store, "o2").element_type, element_type::OUTCOME);
        assert_eq!(main_line(&store), vec!["start", "d2", "end-0"]);
    }

    #[test]
    fn test_copies_of_fault_elements_get_a_terminated_fault() {
        let mut store = started_store();
        let mut original = copied("rorig", element_type::RECORD_CREATE, NodeType::Leaf).with_label("Create");
        original.fault = Some("fault-end".to_string());
        let payload = PastePayload {
            canvas_element_guid_map: guid_map(&[("rorig", "r2")]),
            child_element_guid_map: AHashMap::new(),
            cut_or_copied_canvas_elements: clipboard(vec![original]),
            cut_or_copied_child_elements: AHashMap::new(),
            top_cut_or_copied_guid: "rorig".to_string(),
            bottom_cut_or_copied_guid: "rorig".to_string(),
            source: ConnectionSource::next("start"),
        };

        store
            .dispatch(Action::PasteOnFixedCanvas(payload))
            .expect("Failed to paste");

        let fault = element(&store, "r2").fault.clone().expect("Copy should keep a fault branch");
        let fault_head = element(&store, &fault);
        assert!(fault_head.is_end());
        assert_eq!(fault_head.child_index, Some(ChildIndex::Fault));
        assert_eq!(main_line(&store), vec!["start", "r2", "end-0"]);
    }
}
