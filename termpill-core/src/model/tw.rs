//! Term wrappers: the sparse input form and the resolved form

use serde::{Deserialize, Serialize};

use crate::handlers::HandlerKind;
use crate::model::q::Q;
use crate::model::term::Term;

/// Possibly partial `{id, term, q, $id}` as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTermWrapper {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<Term>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<Q>,

    #[serde(rename = "$id", default, skip_serializing_if = "Option::is_none")]
    pub dollar_id: Option<String>,
}

impl RawTermWrapper {
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn from_term(term: Term) -> Self {
        Self {
            term: Some(term),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_q(mut self, q: Q) -> Self {
        self.q = Some(q);
        self
    }

    /// Id of a dictionary term still to be fetched.
    pub fn pending_term_id(&self) -> Option<&str> {
        match self.term {
            None => self.id.as_deref(),
            Some(_) => None,
        }
    }
}

impl From<TermWrapper> for RawTermWrapper {
    fn from(tw: TermWrapper) -> Self {
        Self {
            id: tw.term.id.clone(),
            term: Some(tw.term),
            q: Some(tw.q),
            dollar_id: Some(tw.id),
        }
    }
}

/// Fully resolved wrapper. Rebuilt on every resolve, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermWrapper {
    pub term: Term,

    pub q: Q,

    #[serde(rename = "$id")]
    pub id: String,

    #[serde(rename = "isAtomic", default)]
    pub is_atomic: bool,
}

/// The part of a term that determines wrapper identity.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TermIdentity<'a> {
    Dictionary {
        id: &'a str,
        #[serde(rename = "type")]
        term_type: &'a str,
    },
    Inline(&'a Term),
}

impl<'a> TermIdentity<'a> {
    pub fn of(term: &'a Term, kind: HandlerKind) -> Self {
        match (&term.id, kind.is_dictionary()) {
            (Some(id), true) => TermIdentity::Dictionary {
                id,
                term_type: &term.term_type,
            },
            _ => TermIdentity::Inline(term),
        }
    }
}

/// Content hashed into `$id`.
#[derive(Debug, Serialize)]
pub struct IdentityContent<'a> {
    pub term: TermIdentity<'a>,
    pub q: &'a Q,
}
