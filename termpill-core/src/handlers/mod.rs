//! Per-term-type handlers
//!
//! A handler is the policy for one canonical term kind: pill naming, status
//! summary, q validation, q completion and the type-specific editor. Handlers
//! hold no per-pill state; everything they need is passed in by reference.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::controller::surface::{MenuSurface, MenuView};
use crate::error::{PillError, PillResult};
use crate::model::q::{Q, QMode};
use crate::model::term::{
    BinConfig, SnpEntry, TYPE_CATEGORICAL, TYPE_CONDITION, TYPE_DATE, TYPE_FLOAT, TYPE_INTEGER,
    TYPE_SAMPLELST, TYPE_SNPLST, Term,
};
use crate::vocab::api::{CategorySummary, VocabApi};

pub mod bins;
pub mod categorical;
pub mod condition;
pub mod numeric;
pub mod samplelst;
pub mod snplst;

pub mod utils;
pub use utils::*;

/// Canonical handler tag. Several raw term types may share one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum HandlerKind {
    Categorical = 0,
    Numeric = 1,
    Condition = 2,
    #[serde(rename = "snplst")]
    SnpList = 3,
    #[serde(rename = "samplelst")]
    SampleList = 4,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 5] = [
        HandlerKind::Categorical,
        HandlerKind::Numeric,
        HandlerKind::Condition,
        HandlerKind::SnpList,
        HandlerKind::SampleList,
    ];

    /// Map a raw `term.type` to its handler kind.
    pub fn from_term_type(term_type: &str) -> PillResult<Self> {
        match term_type {
            TYPE_CATEGORICAL => Ok(HandlerKind::Categorical),
            TYPE_INTEGER | TYPE_FLOAT | TYPE_DATE => Ok(HandlerKind::Numeric),
            TYPE_CONDITION => Ok(HandlerKind::Condition),
            TYPE_SNPLST => Ok(HandlerKind::SnpList),
            TYPE_SAMPLELST => Ok(HandlerKind::SampleList),
            "" => Err(PillError::structural("term.type", "missing term type")),
            other => Err(PillError::handler_load(other, "no handler for this term type")),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            HandlerKind::Categorical => "categorical",
            HandlerKind::Numeric => "numeric",
            HandlerKind::Condition => "condition",
            HandlerKind::SnpList => "snplst",
            HandlerKind::SampleList => "samplelst",
        }
    }

    /// Dictionary terms are identified by id and require a name.
    pub const fn is_dictionary(self) -> bool {
        matches!(
            self,
            HandlerKind::Categorical | HandlerKind::Numeric | HandlerKind::Condition
        )
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = PillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HandlerKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| PillError::handler_load(s, "unknown handler kind"))
    }
}

/// Default q per handler kind, applied before type defaults.
pub type DefaultQ = EnumMap<HandlerKind, Option<Q>>;

/// Pill name abbreviation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameOptions {
    /// Longest name shown before truncation, in characters
    pub max_length: usize,
    pub ellipsis: String,
}

impl Default for NameOptions {
    fn default() -> Self {
        Self {
            max_length: 25,
            ellipsis: "...".to_string(),
        }
    }
}

/// Short summary shown next to the pill name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PillStatus {
    pub text: Option<String>,
    pub bgcolor: Option<&'static str>,
}

impl PillStatus {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            bgcolor: None,
        }
    }

    #[must_use]
    pub fn with_bgcolor(mut self, color: &'static str) -> Self {
        self.bgcolor = Some(color);
        self
    }
}

/// Handler-specific editor content.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorContent {
    Bins {
        default_bins: Option<BinConfig>,
    },
    Groupset {
        categories: Vec<CategorySummary>,
        predefined: Vec<String>,
    },
    Condition {
        grades: Vec<String>,
    },
    SnpList {
        snps: Vec<SnpEntry>,
    },
    SampleList {
        groups: Vec<(String, usize)>,
    },
}

/// Editor description rendered into the pill's menu surface.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorView {
    pub kind: HandlerKind,
    pub term: Term,
    pub q: Q,
    pub modes: SmallVec<[QMode; 4]>,
    pub content: EditorContent,
}

#[async_trait]
pub trait Handler: Send + Sync + fmt::Debug {
    fn kind(&self) -> HandlerKind;

    /// Modes this handler accepts in `q.mode`.
    fn supported_modes(&self) -> &'static [QMode];

    fn get_pill_name(&self, term: &Term, opts: &NameOptions) -> String {
        truncate_name(term.display_name(), opts)
    }

    fn get_pill_status(&self, term: &Term, q: &Q) -> PillStatus;

    /// Reject q that does not fit this term.
    fn validate_q(&self, term: &Term, q: &Q) -> PillResult<()>;

    /// Complete q in place. Running it again on the result changes nothing.
    async fn fill_tw(
        &self,
        term: &mut Term,
        q: &mut Q,
        vocab: &dyn VocabApi,
        default_q: Option<&Q>,
    ) -> PillResult<()>;

    /// Editor content that needs no remote data.
    fn editor_view(&self, term: &Term, q: &Q) -> EditorView;

    /// Render the editor. A surface detached while content was loading makes
    /// this a no-op.
    async fn show_edit_menu(
        &self,
        surface: &dyn MenuSurface,
        term: &Term,
        q: &Q,
        _vocab: &dyn VocabApi,
    ) -> PillResult<()> {
        if surface.is_attached() {
            surface.show(MenuView::Editor(self.editor_view(term, q)));
        }
        Ok(())
    }
}

/// Shared mode check used by every handler's `validate_q`.
pub(crate) fn check_mode(handler: &dyn Handler, term: &Term, q: &Q) -> PillResult<()> {
    match q.mode {
        Some(mode) if !handler.supported_modes().contains(&mode) => Err(PillError::type_mismatch(
            term.term_type.as_str(),
            format!("mode '{}' is not supported", mode.as_str()),
        )),
        _ => Ok(()),
    }
}
