//! TermWrapperResolver: raw `{id, term, q}` into a complete [`TermWrapper`]
//!
//! Resolution order for one wrapper:
//! 1. hydrate the term from the vocabulary when only an id (or a nameless
//!    dictionary term) is given
//! 2. structural checks, handler lookup
//! 3. default q, handler `fill_tw`, handler `validate_q`
//! 4. content-addressed `$id` unless the caller supplied one
//!
//! Errors are returned, never swallowed. The batch entry point hydrates every
//! wrapper with a single vocabulary call and reports each item separately.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument};
use twid::IdentityHasher;

use crate::controller::handler_registry::HandlerRegistry;
use crate::error::{PillError, PillResult};
use crate::handlers::{DefaultQ, HandlerKind};
use crate::model::term::Term;
use crate::model::tw::{IdentityContent, RawTermWrapper, TermIdentity, TermWrapper};
use crate::vocab::api::VocabApi;

#[derive(Debug, Clone)]
pub struct TermWrapperResolver {
    registry: Arc<HandlerRegistry>,
    hasher: Arc<IdentityHasher>,
}

/// Id to fetch from the vocabulary before `raw` can be resolved.
fn hydration_id(raw: &RawTermWrapper) -> Option<&str> {
    match &raw.term {
        None => raw.id.as_deref(),
        Some(term) if term.name.is_none() => {
            let dictionary = HandlerKind::from_term_type(&term.term_type)
                .is_ok_and(HandlerKind::is_dictionary);
            term.id.as_deref().filter(|_| dictionary)
        }
        Some(_) => None,
    }
}

/// Attach the fetched term, or fail when the vocabulary has nothing for it.
fn attach_term(raw: &mut RawTermWrapper, fetched: &HashMap<String, Term>) -> PillResult<()> {
    let Some(id) = hydration_id(raw).map(str::to_owned) else {
        return Ok(());
    };

    match (fetched.get(&id), raw.term.is_some()) {
        (Some(term), _) => {
            raw.term = Some(term.clone());
            Ok(())
        }
        (None, true) => Err(PillError::structural(
            "term.name",
            format!("term '{id}' has no name and is not in the vocabulary"),
        )),
        (None, false) => Err(PillError::structural(
            "term",
            format!("no term found for id '{id}'"),
        )),
    }
}

impl TermWrapperResolver {
    pub fn new(registry: Arc<HandlerRegistry>, hasher: Arc<IdentityHasher>) -> Self {
        Self { registry, hasher }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn hasher(&self) -> &IdentityHasher {
        &self.hasher
    }

    /// Resolve one raw wrapper.
    #[instrument(skip_all, fields(id = ?raw.id))]
    pub async fn fill_term_wrapper(
        &self,
        mut raw: RawTermWrapper,
        vocab: &dyn VocabApi,
        default_q: &DefaultQ,
    ) -> PillResult<TermWrapper> {
        if let Some(id) = hydration_id(&raw).map(str::to_owned) {
            let fetched = vocab.get_terms(std::slice::from_ref(&id)).await?;
            attach_term(&mut raw, &fetched)?;
        }
        self.resolve(raw, vocab, default_q).await
    }

    /// Resolve a list of raw wrappers with one batched term fetch.
    ///
    /// The outer error is the batched fetch failing; each item then carries
    /// its own result.
    #[instrument(skip_all, fields(count = raws.len()))]
    pub async fn fill_tw_lst(
        &self,
        mut raws: Vec<RawTermWrapper>,
        vocab: &dyn VocabApi,
        default_q: &DefaultQ,
    ) -> PillResult<Vec<PillResult<TermWrapper>>> {
        let mut ids: Vec<String> = Vec::new();
        for raw in &raws {
            if let Some(id) = hydration_id(raw) {
                if !ids.iter().any(|known| known == id) {
                    ids.push(id.to_string());
                }
            }
        }

        let fetched = if ids.is_empty() {
            HashMap::new()
        } else {
            debug!(terms = ids.len(), "Hydrating dictionary terms");
            vocab.get_terms(&ids).await?
        };

        let attached: Vec<PillResult<()>> = raws
            .iter_mut()
            .map(|raw| attach_term(raw, &fetched))
            .collect();

        let pending = raws.into_iter().zip(attached).map(|(raw, attached)| async move {
            attached?;
            self.resolve(raw, vocab, default_q).await
        });
        Ok(join_all(pending).await)
    }

    /// Give `tw` a fresh `$id` so it can be told apart from other
    /// occurrences of the same configuration in one view.
    pub fn mark_occurrence(&self, tw: &mut TermWrapper) -> PillResult<()> {
        let kind = HandlerKind::from_term_type(&tw.term.term_type)?;
        tw.id = self.hasher.unique_id(&IdentityContent {
            term: TermIdentity::of(&tw.term, kind),
            q: &tw.q,
        });
        Ok(())
    }

    async fn resolve(
        &self,
        raw: RawTermWrapper,
        vocab: &dyn VocabApi,
        default_q: &DefaultQ,
    ) -> PillResult<TermWrapper> {
        let RawTermWrapper {
            id,
            term,
            q,
            dollar_id,
        } = raw;

        let mut term =
            term.ok_or_else(|| PillError::structural("term", "neither term nor id given"))?;
        if term.id.is_none() {
            term.id = id;
        }
        if term.term_type.is_empty() {
            return Err(PillError::structural("term.type", "missing term type"));
        }

        let handler = self.registry.get_handler(&term.term_type).await?;
        let kind = handler.kind();
        if kind.is_dictionary() && term.id.is_none() {
            return Err(PillError::structural(
                "term.id",
                format!("{} term has no id", term.term_type),
            ));
        }
        if kind.is_dictionary() && term.name.is_none() {
            return Err(PillError::structural(
                "term.name",
                format!("{} term has no name", term.term_type),
            ));
        }

        let mut q = q.unwrap_or_default();
        handler
            .fill_tw(&mut term, &mut q, vocab, default_q[kind].as_ref())
            .await?;
        handler.validate_q(&term, &q)?;
        if let Some(field) = q.non_finite_field() {
            return Err(PillError::structural(
                format!("q.{field}"),
                "number must be finite",
            ));
        }

        let id = match dollar_id {
            Some(id) => id,
            None => self.hasher.content_id(&IdentityContent {
                term: TermIdentity::of(&term, kind),
                q: &q,
            }),
        };
        debug!(marker = "TW_RESOLVED", kind = %kind, tw_id = %id, "Resolved term wrapper");

        Ok(TermWrapper {
            term,
            q,
            id,
            is_atomic: true,
        })
    }
}

impl Default for TermWrapperResolver {
    fn default() -> Self {
        Self::new(
            Arc::new(HandlerRegistry::new()),
            Arc::new(IdentityHasher::default()),
        )
    }
}
