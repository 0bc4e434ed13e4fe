//! Categorical handler

use async_trait::async_trait;
use smallvec::SmallVec;
use tracing::debug;

use super::{EditorContent, EditorView, Handler, HandlerKind, PillStatus, check_mode};
use crate::controller::surface::{MenuSurface, MenuView};
use crate::error::{PillError, PillResult};
use crate::model::q::{Group, GroupSet, GroupValue, Q, QGroupSetting, QMode, QType};
use crate::model::term::Term;
use crate::vocab::api::{CategorySummary, VocabApi};

const MODES: &[QMode] = &[QMode::Discrete, QMode::Binary];

#[derive(Debug, Default)]
pub struct CategoricalHandler;

/// Categories known from the term itself.
fn local_categories(term: &Term) -> Vec<CategorySummary> {
    term.computable_values()
        .map(|(key, v)| CategorySummary {
            key: key.clone(),
            label: v.label.clone(),
            samplecount: 0,
        })
        .collect()
}

fn group_value(cat: &CategorySummary) -> GroupValue {
    GroupValue {
        key: cat.key.clone(),
        label: cat.label.clone(),
    }
}

/// First category against all others.
fn binary_groupset(categories: &[CategorySummary]) -> Option<GroupSet> {
    let (first, rest) = categories.split_first()?;
    if rest.is_empty() {
        return None;
    }

    Some(GroupSet {
        name: None,
        groups: vec![
            Group {
                name: first.label.clone().unwrap_or_else(|| first.key.clone()),
                values: vec![group_value(first)],
                uncomputable: None,
            },
            Group {
                name: "Others".to_string(),
                values: rest.iter().map(group_value).collect(),
                uncomputable: None,
            },
        ],
    })
}

/// q.type implied by the current groupsetting.
fn derived_type(q: &Q) -> QType {
    match q.groupsetting.as_ref().filter(|gs| gs.inuse) {
        Some(gs) if gs.predefined_groupset_idx.is_some() => QType::PredefinedGroupset,
        Some(gs) if gs.customset.is_some() => QType::CustomGroupset,
        _ => QType::Values,
    }
}

fn predefined_names(term: &Term) -> Vec<String> {
    term.groupsetting
        .as_ref()
        .filter(|gs| !gs.disabled)
        .map(|gs| {
            gs.lst
                .iter()
                .enumerate()
                .map(|(i, set)| set.name.clone().unwrap_or_else(|| format!("Groupset {}", i + 1)))
                .collect()
        })
        .unwrap_or_default()
}

impl CategoricalHandler {
    fn groupset_view(&self, term: &Term, q: &Q, categories: Vec<CategorySummary>) -> EditorView {
        EditorView {
            kind: self.kind(),
            term: term.clone(),
            q: q.clone(),
            modes: SmallVec::from_slice(MODES),
            content: EditorContent::Groupset {
                categories,
                predefined: predefined_names(term),
            },
        }
    }
}

#[async_trait]
impl Handler for CategoricalHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Categorical
    }

    fn supported_modes(&self) -> &'static [QMode] {
        MODES
    }

    fn get_pill_status(&self, term: &Term, q: &Q) -> PillStatus {
        let groups = match q.groupsetting.as_ref().filter(|gs| gs.inuse) {
            Some(QGroupSetting {
                predefined_groupset_idx: Some(idx),
                ..
            }) => term.predefined_groupset(*idx).map(GroupSet::computable_groups),
            Some(QGroupSetting {
                customset: Some(set),
                ..
            }) => Some(set.computable_groups()),
            _ => None,
        };

        groups.map_or_else(PillStatus::none, |n| PillStatus::text(format!("{n} groups")))
    }

    fn validate_q(&self, term: &Term, q: &Q) -> PillResult<()> {
        check_mode(self, term, q)?;

        if let Some(t) = q.q_type.filter(|t| t.is_bin()) {
            return Err(PillError::type_mismatch(
                term.term_type.as_str(),
                format!("type '{}' does not apply to categorical terms", t.as_str()),
            ));
        }

        let idx = q
            .groupsetting
            .as_ref()
            .filter(|gs| gs.inuse)
            .and_then(|gs| gs.predefined_groupset_idx);
        if let Some(idx) = idx {
            if term.predefined_groupset(idx).is_none() {
                return Err(PillError::type_mismatch(
                    term.term_type.as_str(),
                    format!("no predefined groupset at index {idx}"),
                ));
            }
        }
        Ok(())
    }

    async fn fill_tw(
        &self,
        term: &mut Term,
        q: &mut Q,
        vocab: &dyn VocabApi,
        default_q: Option<&Q>,
    ) -> PillResult<()> {
        if let Some(defaults) = default_q {
            q.merge_defaults(defaults);
        }
        let mode = *q.mode.get_or_insert(QMode::Discrete);

        let grouped = q.groupsetting.as_ref().is_some_and(|gs| {
            gs.inuse && (gs.customset.is_some() || gs.predefined_groupset_idx.is_some())
        });
        if mode == QMode::Binary && !grouped {
            let mut categories = local_categories(term);
            if categories.is_empty() {
                categories = vocab.get_categories(term, None, &[]).await?;
            }

            let set = binary_groupset(&categories).ok_or_else(|| {
                PillError::type_mismatch(
                    term.term_type.as_str(),
                    "binary mode needs at least two categories",
                )
            })?;
            debug!(term_id = ?term.id, "Built binary groupset");

            q.groupsetting = Some(QGroupSetting {
                inuse: true,
                predefined_groupset_idx: None,
                customset: Some(set),
            });
        }

        q.q_type = Some(derived_type(q));
        Ok(())
    }

    fn editor_view(&self, term: &Term, q: &Q) -> EditorView {
        self.groupset_view(term, q, local_categories(term))
    }

    async fn show_edit_menu(
        &self,
        surface: &dyn MenuSurface,
        term: &Term,
        q: &Q,
        vocab: &dyn VocabApi,
    ) -> PillResult<()> {
        let categories = vocab
            .get_categories(term, None, std::slice::from_ref(q))
            .await?;

        if !surface.is_attached() {
            debug!(term_id = ?term.id, "Surface detached, dropping editor");
            return Ok(());
        }
        surface.show(MenuView::Editor(self.groupset_view(term, q, categories)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::term::{TYPE_CATEGORICAL, TermGroupSetting, TermValue};
    use crate::vocab::dictionary::{DictionaryDocument, DictionaryVocab};

    fn sex() -> Term {
        let mut term = Term::new("sex", TYPE_CATEGORICAL).with_name("Sex");
        for (key, label) in [("1", "Male"), ("2", "Female")] {
            term.values.insert(
                key.into(),
                TermValue {
                    label: Some(label.into()),
                    ..Default::default()
                },
            );
        }
        term
    }

    fn vocab() -> DictionaryVocab {
        DictionaryVocab::new(DictionaryDocument::default())
    }

    #[tokio::test]
    async fn test_empty_q_is_plain_values() {
        let mut term = sex();
        let mut q = Q::default();
        CategoricalHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();

        assert_eq!(q.mode, Some(QMode::Discrete));
        assert_eq!(q.q_type, Some(QType::Values));
        assert!(q.groupsetting.is_none());
    }

    #[tokio::test]
    async fn test_binary_builds_two_groups() {
        let mut term = sex();
        let mut q = Q::with_mode(QMode::Binary);
        CategoricalHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();

        assert_eq!(q.q_type, Some(QType::CustomGroupset));
        let set = q.groupsetting.as_ref().unwrap().customset.as_ref().unwrap();
        assert_eq!(set.groups.len(), 2);
        assert_eq!(set.groups[0].name, "Male");
        assert_eq!(
            CategoricalHandler.get_pill_status(&term, &q).text.as_deref(),
            Some("2 groups")
        );

        let once = q.clone();
        CategoricalHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();
        assert_eq!(q, once);
    }

    #[tokio::test]
    async fn test_binary_keeps_predefined_groupset() {
        let mut term = sex();
        term.groupsetting = Some(TermGroupSetting {
            disabled: false,
            lst: vec![GroupSet {
                name: Some("Male vs Female".into()),
                groups: vec![
                    Group {
                        name: "M".into(),
                        values: vec![GroupValue { key: "1".into(), label: None }],
                        uncomputable: None,
                    },
                    Group {
                        name: "F".into(),
                        values: vec![GroupValue { key: "2".into(), label: None }],
                        uncomputable: None,
                    },
                ],
            }],
        });
        let mut q = Q {
            mode: Some(QMode::Binary),
            groupsetting: Some(QGroupSetting {
                inuse: true,
                predefined_groupset_idx: Some(0),
                customset: None,
            }),
            ..Default::default()
        };
        let groupsetting = q.groupsetting.clone();

        CategoricalHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();

        assert_eq!(q.groupsetting, groupsetting);
        assert_eq!(q.q_type, Some(QType::PredefinedGroupset));
        assert!(CategoricalHandler.validate_q(&term, &q).is_ok());
        assert_eq!(
            CategoricalHandler.get_pill_status(&term, &q).text.as_deref(),
            Some("2 groups")
        );
    }

    #[tokio::test]
    async fn test_binary_needs_two_categories() {
        let mut term = Term::new("race", TYPE_CATEGORICAL);
        let mut q = Q::with_mode(QMode::Binary);
        assert!(matches!(
            CategoricalHandler
                .fill_tw(&mut term, &mut q, &vocab(), None)
                .await,
            Err(PillError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_ungrouped_q_left_unchanged() {
        let mut term = sex();
        let mut q = Q::ungrouped();
        CategoricalHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();
        assert_eq!(q, Q::ungrouped());
    }

    #[test]
    fn test_predefined_groupset_index_checked() {
        let mut term = sex();
        term.groupsetting = Some(TermGroupSetting {
            disabled: false,
            lst: vec![GroupSet::default()],
        });
        let q = |idx| Q {
            groupsetting: Some(QGroupSetting {
                inuse: true,
                predefined_groupset_idx: Some(idx),
                customset: None,
            }),
            ..Default::default()
        };

        assert!(CategoricalHandler.validate_q(&term, &q(0)).is_ok());
        assert!(CategoricalHandler.validate_q(&term, &q(3)).is_err());
    }

    #[test]
    fn test_continuous_rejected() {
        assert!(matches!(
            CategoricalHandler.validate_q(&sex(), &Q::with_mode(QMode::Continuous)),
            Err(PillError::TypeMismatch { .. })
        ));
    }
}
