//! Pill state owned by one PillController

use serde_json::Value;
use smallvec::SmallVec;

use crate::model::q::Q;
use crate::model::term::Term;
use crate::model::tw::TermWrapper;

/// What the open menu is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MenuPurpose {
    /// Choosing a term (placeholder click or Replace)
    Selecting = 0,
    /// Edit / Replace / Remove / Cancel-grouping choices
    Actions = 1,
    /// Type-specific editor
    Editing = 2,
}

/// Editing lifecycle of one pill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PillPhase {
    #[default]
    NoTerm,
    TermSelected,
    MenuOpen(MenuPurpose),
}

impl PillPhase {
    pub fn is_menu_open(self) -> bool {
        matches!(self, PillPhase::MenuOpen(_))
    }
}

/// Snapshot of a pill. Replaced as a whole on each commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PillState {
    pub term: Option<Term>,
    pub q: Q,
    pub id: Option<String>,
    pub has_error: bool,
    /// Term ids the picker must not offer
    pub disable_terms: SmallVec<[String; 4]>,
    pub filter: Option<Value>,
    pub active_cohort: Option<usize>,
}

impl PillState {
    /// New state adopting a resolved wrapper, keeping picker context.
    #[must_use]
    pub fn adopt(&self, tw: &TermWrapper) -> Self {
        Self {
            term: Some(tw.term.clone()),
            q: tw.q.clone(),
            id: Some(tw.id.clone()),
            has_error: false,
            disable_terms: self.disable_terms.clone(),
            filter: self.filter.clone(),
            active_cohort: self.active_cohort,
        }
    }

    /// New state with the term removed, keeping picker context.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self {
            term: None,
            q: Q::default(),
            id: None,
            has_error: false,
            disable_terms: self.disable_terms.clone(),
            filter: self.filter.clone(),
            active_cohort: self.active_cohort,
        }
    }

    #[must_use]
    pub fn with_error(&self) -> Self {
        Self {
            has_error: true,
            ..self.clone()
        }
    }

    pub fn has_term(&self) -> bool {
        self.term.is_some()
    }

    /// Current content as a resolved wrapper, when complete.
    pub fn to_term_wrapper(&self) -> Option<TermWrapper> {
        Some(TermWrapper {
            term: self.term.clone()?,
            q: self.q.clone(),
            id: self.id.clone()?,
            is_atomic: true,
        })
    }
}
