//! PillController: one term pill's editing lifecycle
//!
//! ```text
//! NoTerm ──click_placeholder──▶ MenuOpen(Selecting) ──pick_term──▶ TermSelected
//! TermSelected ──click_pill──▶ MenuOpen(Actions) ──Edit──▶ MenuOpen(Editing)
//! MenuOpen(_) ──commit──▶ TermSelected        MenuOpen(_) ──cancel──▶ prior phase
//! ```
//!
//! State is replaced as a whole on every successful commit and published
//! through an [`ArcSwap`] so readers never block the controller. Every
//! mutating operation takes `&mut self`; a host sharing one controller
//! between tasks wraps it in `tokio::sync::Mutex`, which queues callers in
//! order.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use smallvec::{SmallVec, smallvec};
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, PickerConfig, PickerMode};
use crate::controller::handler_registry::HandlerRegistry;
use crate::controller::resolver::TermWrapperResolver;
use crate::controller::surface::{MenuSurface, MenuView, PillAction};
use crate::error::{PillError, PillResult};
use crate::handlers::{DefaultQ, NameOptions, PillStatus};
use crate::model::pill_state::{MenuPurpose, PillPhase, PillState};
use crate::model::q::Q;
use crate::model::term::Term;
use crate::model::tw::{RawTermWrapper, TermWrapper};
use crate::vocab::api::VocabApi;

/// Receives every committed wrapper; `None` means the term was removed.
pub type CommitCallback = Box<dyn FnMut(Option<TermWrapper>) + Send>;

/// Name and status shown on a pill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PillLabel {
    pub name: String,
    pub status: PillStatus,
}

pub struct PillController {
    resolver: TermWrapperResolver,
    vocab: Arc<dyn VocabApi>,
    surface: Arc<dyn MenuSurface>,
    callback: CommitCallback,

    state: Arc<ArcSwap<PillState>>,
    phase: PillPhase,
    /// Phase to return to when an open menu is cancelled
    prior_phase: PillPhase,
    suppress_auto_hide: bool,

    naming: NameOptions,
    picker: PickerConfig,
    default_q: DefaultQ,
}

impl PillController {
    pub fn new(
        vocab: Arc<dyn VocabApi>,
        surface: Arc<dyn MenuSurface>,
        callback: CommitCallback,
    ) -> Self {
        Self {
            resolver: TermWrapperResolver::default(),
            vocab,
            surface,
            callback,
            state: Arc::new(ArcSwap::from_pointee(PillState::default())),
            phase: PillPhase::NoTerm,
            prior_phase: PillPhase::NoTerm,
            suppress_auto_hide: false,
            naming: NameOptions::default(),
            picker: PickerConfig::default(),
            default_q: DefaultQ::default(),
        }
    }

    /// Apply naming, picker, hasher and default q settings.
    pub fn with_config(mut self, config: &Config) -> PillResult<Self> {
        config.hasher.validate()?;
        self.default_q = config.default_q_table()?;
        self.naming = config.naming.clone();
        self.picker = config.picker.clone();
        self.resolver = TermWrapperResolver::new(
            Arc::clone(self.resolver.registry()),
            Arc::new(twid::IdentityHasher::new(config.hasher.clone())),
        );
        Ok(self)
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: TermWrapperResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        self.resolver.registry()
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<PillState> {
        self.state.load_full()
    }

    /// Shared handle for readers that outlive a borrow of the controller.
    pub fn state_handle(&self) -> Arc<ArcSwap<PillState>> {
        Arc::clone(&self.state)
    }

    pub fn phase(&self) -> PillPhase {
        self.phase
    }

    fn update_state(&self, update: impl FnOnce(&mut PillState)) {
        let mut next = PillState::clone(&self.state.load());
        update(&mut next);
        self.state.store(Arc::new(next));
    }

    fn current_term(&self) -> PillResult<(Term, Q)> {
        let state = self.state.load();
        let term = state
            .term
            .clone()
            .ok_or_else(|| PillError::structural("term", "pill has no term"))?;
        Ok((term, state.q.clone()))
    }

    /// Enter a menu phase, remembering where to return on cancel.
    fn open_menu(&mut self, purpose: MenuPurpose) {
        if !self.phase.is_menu_open() {
            self.prior_phase = self.phase;
        }
        self.phase = PillPhase::MenuOpen(purpose);
        self.surface.clear();
    }

    fn settled_phase(&self) -> PillPhase {
        if self.state.load().has_term() {
            PillPhase::TermSelected
        } else {
            PillPhase::NoTerm
        }
    }

    /// Resolve a host-supplied wrapper and adopt it, or clear the pill.
    ///
    /// The commit callback is not fired; the host already knows the value.
    #[instrument(skip_all)]
    pub async fn main(&mut self, raw: Option<RawTermWrapper>) -> PillResult<()> {
        let Some(raw) = raw else {
            self.update_state(|s| *s = s.cleared());
            if !self.phase.is_menu_open() {
                self.phase = PillPhase::NoTerm;
            }
            return Ok(());
        };

        match self
            .resolver
            .fill_term_wrapper(raw, self.vocab.as_ref(), &self.default_q)
            .await
        {
            Ok(tw) => {
                self.update_state(|s| *s = s.adopt(&tw));
                if !self.phase.is_menu_open() {
                    self.phase = PillPhase::TermSelected;
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve term wrapper");
                self.update_state(|s| s.has_error = true);
                Err(e)
            }
        }
    }

    /// Open the term picker from the empty placeholder.
    pub fn click_placeholder(&mut self) {
        self.open_menu(MenuPurpose::Selecting);
        self.show_picker();
    }

    fn show_picker(&self) {
        let state = self.state.load();
        let prompt = self.picker.mode == PickerMode::Prompt && !self.picker.prompt_options.is_empty();

        self.surface.show(MenuView::TermPicker {
            mode: if prompt { PickerMode::Prompt } else { PickerMode::Tree },
            disable_terms: state.disable_terms.to_vec(),
            filter: state.filter.clone(),
            active_cohort: state.active_cohort,
            prompt_options: if prompt {
                self.picker.prompt_options.clone()
            } else {
                Vec::new()
            },
        });
    }

    /// Open the contextual menu of a filled pill.
    pub fn click_pill(&mut self) {
        let state = self.state.load_full();
        if !state.has_term() {
            self.click_placeholder();
            return;
        }

        self.open_menu(MenuPurpose::Actions);
        let mut options: SmallVec<[PillAction; 4]> =
            smallvec![PillAction::Edit, PillAction::Replace, PillAction::Remove];
        if state.q.grouping_in_use() {
            options.push(PillAction::CancelGrouping);
        }
        self.surface.show(MenuView::PillActions { options });
    }

    pub async fn select_action(&mut self, action: PillAction) -> PillResult<()> {
        debug!(action = action.label(), "Pill action selected");
        match action {
            PillAction::Edit => self.open_editor().await,
            PillAction::Replace => {
                self.open_menu(MenuPurpose::Selecting);
                self.show_picker();
                Ok(())
            }
            PillAction::Remove => {
                self.remove();
                Ok(())
            }
            PillAction::CancelGrouping => self.cancel_grouping().await,
        }
    }

    /// Render the handler's editor for the current term.
    ///
    /// A failed load flags the error and closes the menu as `cancel` would.
    async fn open_editor(&mut self) -> PillResult<()> {
        let (term, q) = self.current_term()?;
        self.open_menu(MenuPurpose::Editing);

        let shown = async {
            let handler = self.resolver.registry().get_handler(&term.term_type).await?;
            handler
                .show_edit_menu(self.surface.as_ref(), &term, &q, self.vocab.as_ref())
                .await
        }
        .await;

        if let Err(e) = &shown {
            warn!(error = %e, "Editor failed to load");
            self.update_state(|s| s.has_error = true);
            self.cancel();
        }
        shown
    }

    fn remove(&mut self) {
        self.update_state(|s| *s = s.cleared());
        self.phase = PillPhase::NoTerm;
        self.suppress_auto_hide = false;
        self.surface.hide();
        info!("Pill term removed");
        (self.callback)(None);
    }

    /// Commit a term chosen in the picker with a fresh q.
    pub async fn pick_term(&mut self, term: Term) -> PillResult<()> {
        let raw = RawTermWrapper {
            id: term.id.clone(),
            term: Some(term),
            ..Default::default()
        };
        self.commit(raw).await
    }

    /// Commit the editor's result.
    pub async fn commit_edit(&mut self, term: Term, q: Q) -> PillResult<()> {
        let raw = RawTermWrapper {
            id: term.id.clone(),
            term: Some(term),
            q: Some(q),
            dollar_id: None,
        };
        self.commit(raw).await
    }

    /// Drop any grouping and commit plain values.
    pub async fn cancel_grouping(&mut self) -> PillResult<()> {
        let (term, _) = self.current_term()?;
        self.commit_edit(term, Q::ungrouped()).await
    }

    #[instrument(skip_all, fields(term_id = ?raw.id))]
    async fn commit(&mut self, raw: RawTermWrapper) -> PillResult<()> {
        let tw = match self
            .resolver
            .fill_term_wrapper(raw, self.vocab.as_ref(), &self.default_q)
            .await
        {
            Ok(tw) => tw,
            Err(e) => {
                warn!(error = %e, "Commit rejected");
                self.update_state(|s| s.has_error = true);
                return Err(e);
            }
        };

        self.update_state(|s| *s = s.adopt(&tw));
        if std::mem::take(&mut self.suppress_auto_hide) {
            debug!("Keeping menu open after commit");
        } else {
            self.phase = PillPhase::TermSelected;
            self.surface.hide();
        }

        info!(tw_id = %tw.id, "Pill committed");
        (self.callback)(Some(tw));
        Ok(())
    }

    /// Close the open menu and return to the phase before it opened.
    pub fn cancel(&mut self) {
        if self.phase.is_menu_open() {
            self.phase = if self.prior_phase.is_menu_open() {
                self.settled_phase()
            } else {
                self.prior_phase
            };
        }
        self.surface.hide();
    }

    /// Keep the menu open across the next commit only.
    pub fn suppress_next_auto_hide(&mut self) {
        self.suppress_auto_hide = true;
    }

    pub fn set_disable_terms(&mut self, ids: Vec<String>) {
        self.update_state(|s| s.disable_terms = ids.into());
    }

    pub fn set_filter(&mut self, filter: Option<Value>) {
        self.update_state(|s| s.filter = filter);
    }

    pub fn set_active_cohort(&mut self, cohort: Option<usize>) {
        self.update_state(|s| s.active_cohort = cohort);
    }

    /// Name and status for the current term, if any.
    pub async fn pill_label(&self) -> PillResult<Option<PillLabel>> {
        let state = self.state.load_full();
        let Some(term) = state.term.as_ref() else {
            return Ok(None);
        };

        let handler = self.resolver.registry().get_handler(&term.term_type).await?;
        Ok(Some(PillLabel {
            name: handler.get_pill_name(term, &self.naming),
            status: handler.get_pill_status(term, &state.q),
        }))
    }
}

impl fmt::Debug for PillController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PillController")
            .field("phase", &self.phase)
            .field("prior_phase", &self.prior_phase)
            .field("suppress_auto_hide", &self.suppress_auto_hide)
            .field("state", &self.state.load_full())
            .finish_non_exhaustive()
    }
}
