//! The action vocabulary dispatched to the store.
//!
//! On the wire an action is `{"type": "ADD_CANVAS_ELEMENT", "payload": {...}}`;
//! payload fields are camelCase.

use crate::model::{ConnectionSource, Connector, ConnectorKey, FlowElement, Guid};
use crate::state::FlowState;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    AddCanvasElement(AddElementPayload),
    UpdateCanvasElement(FlowElement),
    AddResource(FlowElement),
    UpdateResource(FlowElement),
    AddStartElement(FlowElement),
    AddEndElement(AddElementPayload),
    DeleteElement(DeleteElementPayload),
    AddConnector(Connector),

    AddDecisionWithOutcomes(ElementWithChildrenPayload),
    ModifyDecisionWithOutcomes(ElementWithChildrenPayload),
    AddWaitWithWaitEvents(ElementWithChildrenPayload),
    ModifyWaitWithWaitEvents(ElementWithChildrenPayload),
    AddScreenWithFields(ElementWithChildrenPayload),
    ModifyScreenWithFields(ElementWithChildrenPayload),
    ModifyStartWithScheduledPaths(ElementWithChildrenPayload),

    AddFault(ElementRef),
    DeleteFault(ElementRef),
    CreateGotoConnection(CreateGotoPayload),
    DeleteGotoConnection(ConnectionSource),
    ResetGotos(ResetGotosPayload),

    PasteOnFixedCanvas(PastePayload),
    PasteCutElementOnFixedCanvas(PastePayload),
    DoDuplicate(DuplicatePayload),

    SelectionOnFixedCanvas(FixedCanvasSelectionPayload),
    SelectOnCanvas(ElementRef),
    ToggleOnCanvas(ElementRef),
    DeselectOnCanvas,
    MarqueeSelectOnCanvas(MarqueeSelectPayload),

    DecorateCanvas(DecorateCanvasPayload),
    ClearCanvasDecoration,

    UpdateFlow(FlowState),
    UpdateProperties(PropertiesPatch),
    UpdatePropertiesAfterSaving(PropertiesPatch),
    UpdateIsAutoLayoutCanvasProperty(bool),

    Undo,
    Redo,
    ClearUndoRedo,
}

impl Action {
    /// Whether the action changes the flow definition itself, as opposed to view
    /// state such as selection and highlighting.
    pub fn mutates_graph(&self) -> bool {
        !matches!(
            self,
            Action::SelectionOnFixedCanvas(_)
                | Action::SelectOnCanvas(_)
                | Action::ToggleOnCanvas(_)
                | Action::DeselectOnCanvas
                | Action::MarqueeSelectOnCanvas(_)
                | Action::DecorateCanvas(_)
                | Action::ClearCanvasDecoration
                | Action::UpdateFlow(_)
                | Action::UpdatePropertiesAfterSaving(_)
                | Action::UpdateIsAutoLayoutCanvasProperty(_)
                | Action::Undo
                | Action::Redo
                | Action::ClearUndoRedo
        )
    }

    /// Whether the store records a snapshot before applying the action.
    pub fn is_undoable(&self) -> bool {
        self.mutates_graph() || matches!(self, Action::UpdateIsAutoLayoutCanvasProperty(_))
    }

    /// The wire name of the action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::AddCanvasElement(_) => "ADD_CANVAS_ELEMENT",
            Action::UpdateCanvasElement(_) => "UPDATE_CANVAS_ELEMENT",
            Action::AddResource(_) => "ADD_RESOURCE",
            Action::UpdateResource(_) => "UPDATE_RESOURCE",
            Action::AddStartElement(_) => "ADD_START_ELEMENT",
            Action::AddEndElement(_) => "ADD_END_ELEMENT",
            Action::DeleteElement(_) => "DELETE_ELEMENT",
            Action::AddConnector(_) => "ADD_CONNECTOR",
            Action::AddDecisionWithOutcomes(_) => "ADD_DECISION_WITH_OUTCOMES",
            Action::ModifyDecisionWithOutcomes(_) => "MODIFY_DECISION_WITH_OUTCOMES",
            Action::AddWaitWithWaitEvents(_) => "ADD_WAIT_WITH_WAIT_EVENTS",
            Action::ModifyWaitWithWaitEvents(_) => "MODIFY_WAIT_WITH_WAIT_EVENTS",
            Action::AddScreenWithFields(_) => "ADD_SCREEN_WITH_FIELDS",
            Action::ModifyScreenWithFields(_) => "MODIFY_SCREEN_WITH_FIELDS",
            Action::ModifyStartWithScheduledPaths(_) => "MODIFY_START_WITH_SCHEDULED_PATHS",
            Action::AddFault(_) => "ADD_FAULT",
            Action::DeleteFault(_) => "DELETE_FAULT",
            Action::CreateGotoConnection(_) => "CREATE_GOTO_CONNECTION",
            Action::DeleteGotoConnection(_) => "DELETE_GOTO_CONNECTION",
            Action::ResetGotos(_) => "RESET_GOTOS",
            Action::PasteOnFixedCanvas(_) => "PASTE_ON_FIXED_CANVAS",
            Action::PasteCutElementOnFixedCanvas(_) => "PASTE_CUT_ELEMENT_ON_FIXED_CANVAS",
            Action::DoDuplicate(_) => "DO_DUPLICATE",
            Action::SelectionOnFixedCanvas(_) => "SELECTION_ON_FIXED_CANVAS",
            Action::SelectOnCanvas(_) => "SELECT_ON_CANVAS",
            Action::ToggleOnCanvas(_) => "TOGGLE_ON_CANVAS",
            Action::DeselectOnCanvas => "DESELECT_ON_CANVAS",
            Action::MarqueeSelectOnCanvas(_) => "MARQUEE_SELECT_ON_CANVAS",
            Action::DecorateCanvas(_) => "DECORATE_CANVAS",
            Action::ClearCanvasDecoration => "CLEAR_CANVAS_DECORATION",
            Action::UpdateFlow(_) => "UPDATE_FLOW",
            Action::UpdateProperties(_) => "UPDATE_PROPERTIES",
            Action::UpdatePropertiesAfterSaving(_) => "UPDATE_PROPERTIES_AFTER_SAVING",
            Action::UpdateIsAutoLayoutCanvasProperty(_) => "UPDATE_IS_AUTO_LAYOUT_CANVAS_PROPERTY",
            Action::Undo => "UNDO",
            Action::Redo => "REDO",
            Action::ClearUndoRedo => "CLEAR_UNDO_REDO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddElementPayload {
    pub element: FlowElement,
    /// Where to place the element on the auto-layout canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alc_connection_source: Option<ConnectionSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteElementPayload {
    pub selected_elements: Vec<Guid>,
    #[serde(default)]
    pub connectors_to_delete: Vec<Connector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// Branch whose content replaces a deleted parent element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_index_to_keep: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementWithChildrenPayload {
    pub canvas_element: FlowElement,
    /// The new child elements, in branch order.
    #[serde(default)]
    pub child_elements: Vec<FlowElement>,
    #[serde(default)]
    pub deleted_child_elements: Vec<FlowElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alc_connection_source: Option<ConnectionSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    pub guid: Guid,
}

impl ElementRef {
    pub fn new(guid: impl Into<Guid>) -> Self {
        Self { guid: guid.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGotoPayload {
    pub source: ConnectionSource,
    pub target: Guid,
    #[serde(default)]
    pub is_reroute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetGotosPayload {
    pub guids: Vec<Guid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastePayload {
    pub canvas_element_guid_map: AHashMap<Guid, Guid>,
    #[serde(default)]
    pub child_element_guid_map: AHashMap<Guid, Guid>,
    pub cut_or_copied_canvas_elements: AHashMap<Guid, FlowElement>,
    #[serde(default)]
    pub cut_or_copied_child_elements: AHashMap<Guid, FlowElement>,
    pub top_cut_or_copied_guid: Guid,
    pub bottom_cut_or_copied_guid: Guid,
    pub source: ConnectionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatePayload {
    pub canvas_element_guid_map: AHashMap<Guid, Guid>,
    #[serde(default)]
    pub child_element_guid_map: AHashMap<Guid, Guid>,
    #[serde(default)]
    pub connectors_to_duplicate: Vec<Connector>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FixedCanvasSelectionPayload {
    pub canvas_elements_to_select: Vec<Guid>,
    pub canvas_elements_to_deselect: Vec<Guid>,
    /// Elements that may be selected next; empty means all or none, see
    /// `allow_all_disabled_elements`.
    pub selectable_guids: Vec<Guid>,
    pub allow_all_disabled_elements: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarqueeSelectPayload {
    pub canvas_elements_to_select: Vec<Guid>,
    pub canvas_elements_to_deselect: Vec<Guid>,
    pub connectors_to_select: Vec<Guid>,
    pub connectors_to_deselect: Vec<Guid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecorateCanvasPayload {
    pub connectors_to_highlight: Vec<ConnectorKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertiesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
}
