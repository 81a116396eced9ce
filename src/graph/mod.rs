//! Auto-layout graph algorithms.
//!
//! Every function here works on a mutable [`ElementMap`] that the caller has
//! already made unique (copy-on-write), and keeps the structural invariants of the
//! flow: branch heads point back at their parent, `prev`/`next` agree, goto links
//! are recorded on their target and every branch head knows whether its branch
//! terminates.

mod assertions;
mod connectors;
mod delete;
mod goto;
mod highlight;
mod linking;
mod navigation;
mod paste;
mod terminal;

pub use assertions::assert_auto_layout_state;
pub use connectors::{derive_connectors, successor_after};
pub use delete::{
    delete_branch, delete_chain, delete_element, hoist_branch, remove_continuation, remove_with_owned,
};
pub use goto::{create_goto, delete_goto, reset_gotos};
pub use highlight::{clear_decoration, decorate_canvas};
pub use linking::{link_chain, terminate_slot, unlink_element};
pub use navigation::{
    branch_elements, branch_head, find_first_element, find_last_element, find_parent_element,
    is_goto_link, outgoing_slots, resolve, resolve_mut, slot_target,
};
pub use paste::{PasteRequest, paste_elements};
pub use terminal::{
    compute_branch_terminal, is_branch_terminal, repair_at_slot, repair_enclosing_branches,
    restructure_on_terminal_merge,
};
