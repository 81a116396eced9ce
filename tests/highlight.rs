//! Canvas decoration tests
mod common;
use common::*;
use nagare::prelude::*;

#[cfg(test)]
mod highlight_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decorate(store: &mut FlowStore, keys: Vec<ConnectorKey>) {
        store
            .dispatch(Action::DecorateCanvas(DecorateCanvasPayload {
                connectors_to_highlight: keys,
            }))
            .expect("Failed to decorate the canvas");
    }

    #[test]
    fn test_empty_branch_highlights_the_merge() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1"], ConnectionSource::next("start"));

        decorate(
            &mut store,
            vec![ConnectorKey::new("d", ConnectorType::Regular).with_child_source("o1")],
        );

        let info = element(&store, "d")
            .config
            .highlight_info
            .clone()
            .expect("Decision should be decorated");
        assert_eq!(info.branch_indexes_to_highlight, vec![0]);
        assert_eq!(info.merge_branch_indexes_to_highlight, vec![0]);
        assert!(info.highlight_next);
    }

    #[test]
    fn test_nested_merges_propagate_to_the_outer_decision() {
        let mut store = started_store();
        place_decision(&mut store, "d1", &["o1"], ConnectionSource::next("start"));
        place_decision(&mut store, "d2", &["o2"], ConnectionSource::branch("d1", 0));

        decorate(&mut store, vec![ConnectorKey::new("d2", ConnectorType::Default)]);

        let inner = element(&store, "d2").config.highlight_info.clone().expect("d2 should be decorated");
        assert_eq!(inner.branch_indexes_to_highlight, vec![1]);
        assert_eq!(inner.merge_branch_indexes_to_highlight, vec![1]);
        assert!(!inner.highlight_next);

        let outer = element(&store, "d1").config.highlight_info.clone().expect("d1 should be decorated");
        assert_eq!(outer.merge_branch_indexes_to_highlight, vec![0]);
        assert!(outer.highlight_next);
    }

    #[test]
    fn test_fault_and_next_highlights() {
        let mut store = started_store();
        place(
            &mut store,
            FlowElement::canvas("r", element_type::RECORD_CREATE).with_label("Create"),
            ConnectionSource::next("start"),
        );
        store
            .dispatch(Action::AddFault(ElementRef::new("r")))
            .expect("Failed to add the fault");

        decorate(
            &mut store,
            vec![
                ConnectorKey::new("r", ConnectorType::Fault),
                ConnectorKey::new("start", ConnectorType::Regular),
            ],
        );

        let r = element(&store, "r").config.highlight_info.clone().expect("r should be decorated");
        assert!(r.highlight_fault);
        assert!(!r.highlight_next);
        let start = element(&store, "start").config.highlight_info.clone().expect("start should be decorated");
        assert!(start.highlight_next);
    }

    #[test]
    fn test_redecorating_replaces_the_previous_decoration() {
        let mut store = store_with_main_line(&["a", "b"]);
        decorate(&mut store, vec![ConnectorKey::new("a", ConnectorType::Regular)]);
        decorate(&mut store, vec![ConnectorKey::new("b", ConnectorType::Regular)]);

        assert!(element(&store, "a").config.highlight_info.is_none());
        assert!(element(&store, "b").config.highlight_info.is_some());
    }

    #[test]
    fn test_clearing_removes_all_decoration() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1"], ConnectionSource::next("start"));
        decorate(&mut store, vec![ConnectorKey::new("d", ConnectorType::Default)]);

        store
            .dispatch(Action::ClearCanvasDecoration)
            .expect("Failed to clear the decoration");

        assert!(
            store
                .state()
                .elements
                .iter()
                .all(|(_, element)| element.config.highlight_info.is_none())
        );
    }

    #[test]
    fn test_empty_decoration_of_a_clean_canvas_changes_nothing() {
        let mut store = store_with_main_line(&["a"]);
        let before = store.state().clone();

        decorate(&mut store, Vec::new());
        store
            .dispatch(Action::ClearCanvasDecoration)
            .expect("Failed to clear the decoration");

        assert!(store.state().ptr_eq(&before));
    }

    #[test]
    fn test_decoration_is_not_undoable() {
        let mut store = store_with_main_line(&["a"]);
        let can_undo_before = store.can_undo();
        decorate(&mut store, vec![ConnectorKey::new("a", ConnectorType::Regular)]);

        store.dispatch(Action::Undo).expect("Failed to undo");

        assert!(can_undo_before);
        assert!(!store.state().elements.contains("a"));
    }
}
