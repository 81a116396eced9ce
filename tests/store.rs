//! Store tests: history, configuration, wire format and invariant checking.
mod common;
use common::*;
use nagare::prelude::*;
use nagare::state::ElementMap;
use serde_json::json;
use std::sync::Arc;

#[cfg(test)]
mod store_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_undo_and_redo() {
        let mut store = store_with_main_line(&["a"]);
        let with_a = store.state().clone();

        store.dispatch(Action::Undo).expect("Failed to undo");
        assert!(!store.state().elements.contains("a"));
        assert!(store.can_redo());

        store.dispatch(Action::Redo).expect("Failed to redo");
        assert!(store.state().ptr_eq(&with_a));
        assert!(!store.can_redo());
    }

    #[test]
    fn test_a_new_action_clears_redo() {
        let mut store = store_with_main_line(&["a"]);
        store.dispatch(Action::Undo).expect("Failed to undo");
        assert!(store.can_redo());

        place(&mut store, leaf("b"), ConnectionSource::next("start"));

        assert!(!store.can_redo());
        assert_eq!(main_line(&store), vec!["start", "b", "end-0"]);
    }

    #[test]
    fn test_undo_on_empty_history_keeps_the_state() {
        let mut store = auto_layout_store();
        let before = store.state().clone();

        store.dispatch(Action::Undo).expect("Failed to undo");
        store.dispatch(Action::Redo).expect("Failed to redo");

        assert!(store.state().ptr_eq(&before));
    }

    #[test]
    fn test_selection_is_not_recorded() {
        let mut store = store_with_main_line(&["a"]);
        store
            .dispatch(Action::SelectOnCanvas(ElementRef::new("a")))
            .expect("Failed to select");

        store.dispatch(Action::Undo).expect("Failed to undo");

        assert!(!store.state().elements.contains("a"));
    }

    #[test]
    fn test_update_flow_replaces_state_and_clears_history() {
        let mut store = store_with_main_line(&["a"]);
        let replacement = store_with_main_line(&["x", "y"]).state().clone();

        store
            .dispatch(Action::UpdateFlow(replacement.clone()))
            .expect("Failed to update the flow");

        assert!(store.state().ptr_eq(&replacement));
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }

    #[test]
    fn test_clear_undo_redo() {
        let mut store = store_with_main_line(&["a"]);
        store.dispatch(Action::ClearUndoRedo).expect("Failed to clear history");
        assert!(!store.can_undo());
    }

    #[test]
    fn test_undo_limit_drops_the_oldest_snapshots() {
        let config = StoreConfig {
            undo_limit: 1,
            ..StoreConfig::default().with_assertions(true)
        };
        let mut store = FlowStore::builder()
            .with_config(config)
            .with_guid_generator(Arc::new(SequentialGuidGenerator::new("end-")))
            .build();
        store
            .dispatch(Action::AddStartElement(FlowElement::canvas("start", element_type::START)))
            .expect("Failed to add start");
        place(&mut store, leaf("a"), ConnectionSource::next("start"));

        store.dispatch(Action::Undo).expect("Failed to undo");
        assert!(!store.state().elements.contains("a"));
        assert!(!store.can_undo());

        store.dispatch(Action::Undo).expect("Failed to undo");
        assert!(store.state().elements.contains("start"));
    }

    #[test]
    fn test_toggling_auto_layout_is_undoable() {
        let mut store = started_store();
        store
            .dispatch(Action::UpdateIsAutoLayoutCanvasProperty(false))
            .expect("Failed to switch canvas");
        assert!(!store.state().properties.is_auto_layout_canvas);

        store.dispatch(Action::Undo).expect("Failed to undo");
        assert!(store.state().properties.is_auto_layout_canvas);
    }

    #[test]
    fn test_unsaved_changes_flag() {
        let mut store = started_store();
        assert!(store.state().properties.has_unsaved_changes);

        store
            .dispatch(Action::UpdatePropertiesAfterSaving(PropertiesPatch {
                name: Some("My_Flow".to_string()),
                ..PropertiesPatch::default()
            }))
            .expect("Failed to save");
        assert!(!store.state().properties.has_unsaved_changes);
        assert_eq!(store.state().properties.name.as_deref(), Some("My_Flow"));

        store
            .dispatch(Action::SelectOnCanvas(ElementRef::new("start")))
            .expect("Failed to select");
        assert!(!store.state().properties.has_unsaved_changes);

        place(&mut store, leaf("a"), ConnectionSource::next("start"));
        assert!(store.state().properties.has_unsaved_changes);
    }

    #[test]
    fn test_resources_are_tracked_in_properties() {
        let mut store = started_store();
        store
            .dispatch(Action::AddResource(FlowElement::new("var", "Variable").with_name("total")))
            .expect("Failed to add the resource");

        assert_eq!(store.state().properties.last_inserted_resource.as_deref(), Some("var"));
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_wire_format_actions() {
        let mut store = started_store();
        let actions: Vec<Action> = serde_json::from_value(json!([
            {
                "type": "ADD_DECISION_WITH_OUTCOMES",
                "payload": {
                    "canvasElement": {
                        "guid": "d",
                        "elementType": "Decision",
                        "isCanvasElement": true,
                        "childReferences": [{"childReference": "o1"}]
                    },
                    "childElements": [{"guid": "o1", "elementType": "OUTCOME", "label": "Yes"}],
                    "alcConnectionSource": {"guid": "start"}
                }
            },
            {
                "type": "ADD_CANVAS_ELEMENT",
                "payload": {
                    "element": {"guid": "x", "elementType": "Assignment", "isCanvasElement": true, "formula": "1 + 1"},
                    "alcConnectionSource": {"guid": "d", "childIndex": 1}
                }
            }
        ]))
        .expect("Failed to parse actions");

        for action in actions {
            store.dispatch(action).expect("Failed to dispatch");
        }

        let x = element(&store, "x");
        assert_eq!(x.parent.as_deref(), Some("d"));
        assert_eq!(x.child_index, Some(ChildIndex::Branch(1)));
        assert_eq!(x.properties.get("formula"), Some(&json!("1 + 1")));
        assert_eq!(element(&store, "d").children, Some(vec![None, Some("x".to_string())]));
    }

    #[test]
    fn test_state_survives_serialization() {
        let mut store = started_store();
        place_decision(&mut store, "d", &["o1"], ConnectionSource::next("start"));
        place(&mut store, leaf("x"), ConnectionSource::branch("d", 0));

        let json = serde_json::to_string(store.state()).expect("Failed to serialize");
        let restored: FlowState = serde_json::from_str(&json).expect("Failed to deserialize");

        assert_eq!(restored, *store.state());
        let reloaded = FlowStore::builder().with_state(restored).build();
        assert!(reloaded.check_invariants().is_ok());
    }

    #[test]
    fn test_derived_connectors_of_a_simple_flow() {
        let store = store_with_main_line(&["a"]);

        let connectors = store.derived_connectors().expect("Failed to derive connectors");
        let edges: Vec<(&str, &str, &str)> = connectors
            .iter()
            .map(|c| (c.guid.as_str(), c.source.as_str(), c.target.as_str()))
            .collect();

        assert_eq!(edges, vec![("a:next", "a", "end-0"), ("start:next", "start", "a")]);
        assert!(store.state().connectors.is_empty());
    }

    #[test]
    fn test_invariant_violations_are_not_committed() {
        let base = started_store();
        let mut map: ElementMap = base.state().elements.map().clone();
        let mut orphan = FlowElement::canvas("orphan", element_type::ASSIGNMENT);
        orphan.node_type = Some(NodeType::Leaf);
        map.insert("orphan".to_string(), Arc::new(orphan));
        let broken = FlowState {
            elements: Elements::new(map),
            ..base.state().clone()
        };
        let mut store = FlowStore::builder()
            .with_config(StoreConfig::default().with_assertions(true))
            .with_state(broken)
            .build();
        let before = store.state().clone();

        let result = store.dispatch(Action::AddResource(FlowElement::new("var", "Variable")));

        assert_eq!(
            result.err(),
            Some(FlowError::Invariant(InvariantViolation::Unreachable("orphan".to_string())))
        );
        assert!(store.state().ptr_eq(&before));
        assert!(!store.can_undo());
    }

    #[test]
    fn test_assertions_can_be_disabled() {
        let base = started_store();
        let mut map: ElementMap = base.state().elements.map().clone();
        let mut orphan = FlowElement::canvas("orphan", element_type::ASSIGNMENT);
        orphan.node_type = Some(NodeType::Leaf);
        map.insert("orphan".to_string(), Arc::new(orphan));
        let broken = FlowState {
            elements: Elements::new(map),
            ..base.state().clone()
        };
        let mut store = FlowStore::builder()
            .with_config(StoreConfig::default().with_assertions(false))
            .with_state(broken)
            .build();

        store
            .dispatch(Action::AddResource(FlowElement::new("var", "Variable")))
            .expect("Unchecked dispatch should succeed");
        assert!(store.check_invariants().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config = StoreConfig::from_json(
            r#"{"assertInvariants": true, "undoLimit": 5, "naming": {"copyLabelTemplate": "Copy of {label} ({n})"}}"#,
        )
        .expect("Failed to parse config");

        assert!(config.assert_invariants);
        assert_eq!(config.undo_limit, 5);
        assert_eq!(config.naming.copy_label_template, "Copy of {label} ({n})");
        assert_eq!(config.naming.max_label_length, NamingConfig::default().max_label_length);
    }

    #[test]
    fn test_config_errors() {
        assert!(matches!(StoreConfig::from_json("not json"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            StoreConfig::from_file("does/not/exist.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_copy_label_template_needs_a_counter() {
        let result = StoreConfig::from_json(r#"{"naming": {"copyLabelTemplate": "Copy of {label}"}}"#);

        assert!(matches!(
            result,
            Err(ConfigError::CopyLabelTemplate { template }) if template == "Copy of {label}"
        ));
    }

    #[test]
    fn test_copy_label_template_is_used_for_duplicates() {
        let config = StoreConfig::from_json(r#"{"naming": {"copyLabelTemplate": "Copy of {label} ({n})"}}"#)
            .expect("Failed to parse config");
        let mut store = FlowStore::builder()
            .with_config(config)
            .with_state(FlowState::default())
            .build();
        store
            .dispatch(Action::AddCanvasElement(AddElementPayload {
                element: leaf("a"),
                alc_connection_source: None,
            }))
            .expect("Failed to add a");

        store
            .dispatch(Action::DoDuplicate(DuplicatePayload {
                canvas_element_guid_map: [("a".to_string(), "a2".to_string())].into_iter().collect(),
                child_element_guid_map: Default::default(),
                connectors_to_duplicate: Vec::new(),
            }))
            .expect("Failed to duplicate");

        assert_eq!(element(&store, "a2").label.as_deref(), Some("Copy of Label a (0)"));
    }
}
