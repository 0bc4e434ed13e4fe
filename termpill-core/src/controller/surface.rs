//! MenuSurface: the rendering region a pill controller draws its menus into
//!
//! The controller never renders directly. It describes what should be shown
//! as a [`MenuView`] and hands it to the surface. A surface that has been
//! torn down or superseded reports `is_attached() == false`, and late async
//! content is then dropped instead of drawn.

use serde_json::Value;
use smallvec::SmallVec;

use crate::config::{PickerMode, PromptOption};
use crate::handlers::EditorView;

/// Contextual choices offered when an existing pill is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PillAction {
    Edit,
    Replace,
    Remove,
    CancelGrouping,
}

impl PillAction {
    pub const fn label(self) -> &'static str {
        match self {
            PillAction::Edit => "Edit",
            PillAction::Replace => "Replace",
            PillAction::Remove => "Remove",
            PillAction::CancelGrouping => "Cancel grouping",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuView {
    /// Term tree or a fixed prompt list.
    TermPicker {
        mode: PickerMode,
        disable_terms: Vec<String>,
        filter: Option<Value>,
        active_cohort: Option<usize>,
        prompt_options: Vec<PromptOption>,
    },
    PillActions {
        options: SmallVec<[PillAction; 4]>,
    },
    Editor(EditorView),
}

pub trait MenuSurface: Send + Sync {
    /// Drop whatever is currently shown.
    fn clear(&self);

    fn show(&self, view: MenuView);

    fn hide(&self);

    fn is_attached(&self) -> bool;
}
