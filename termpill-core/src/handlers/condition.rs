//! Condition handler: graded adverse-event terms

use async_trait::async_trait;
use smallvec::SmallVec;

use super::{EditorContent, EditorView, Handler, HandlerKind, PillStatus, check_mode};
use crate::error::{PillError, PillResult};
use crate::model::q::{ConditionBarBy, ConditionValueBy, Q, QMode, QType};
use crate::model::term::Term;
use crate::vocab::api::VocabApi;

const MODES: &[QMode] = &[QMode::Discrete, QMode::Binary, QMode::Cuminc, QMode::Cox];

/// Highest grade in the grading scale.
const MAX_GRADE: u8 = 5;

/// Grade cutoff used when a mode needs one and none is given.
const DEFAULT_BREAK: u8 = 3;

#[derive(Debug, Default)]
pub struct ConditionHandler;

fn value_by_label(value_by: ConditionValueBy) -> &'static str {
    match value_by {
        ConditionValueBy::MaxGrade => "Max grade",
        ConditionValueBy::MostRecent => "Most recent",
        ConditionValueBy::ComputableGrade => "Any grade",
    }
}

#[async_trait]
impl Handler for ConditionHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Condition
    }

    fn supported_modes(&self) -> &'static [QMode] {
        MODES
    }

    fn get_pill_status(&self, _term: &Term, q: &Q) -> PillStatus {
        if let Some(set) = q
            .groupsetting
            .as_ref()
            .filter(|gs| gs.inuse)
            .and_then(|gs| gs.customset.as_ref())
        {
            return PillStatus::text(format!("{} groups", set.computable_groups()));
        }
        if q.bar_by == Some(ConditionBarBy::Children) {
            return PillStatus::text("Sub-condition");
        }
        q.value_by
            .map_or_else(PillStatus::none, |v| PillStatus::text(value_by_label(v)))
    }

    fn validate_q(&self, term: &Term, q: &Q) -> PillResult<()> {
        check_mode(self, term, q)?;

        if let Some(t) = q.q_type.filter(|t| t.is_bin()) {
            return Err(PillError::type_mismatch(
                term.term_type.as_str(),
                format!("type '{}' does not apply to condition terms", t.as_str()),
            ));
        }
        if let Some(grade) = q.breaks.iter().flatten().find(|g| **g > MAX_GRADE) {
            return Err(PillError::type_mismatch(
                term.term_type.as_str(),
                format!("grade break {grade} is above {MAX_GRADE}"),
            ));
        }
        Ok(())
    }

    async fn fill_tw(
        &self,
        _term: &mut Term,
        q: &mut Q,
        _vocab: &dyn VocabApi,
        default_q: Option<&Q>,
    ) -> PillResult<()> {
        if let Some(defaults) = default_q {
            q.merge_defaults(defaults);
        }

        let mode = *q.mode.get_or_insert(QMode::Discrete);
        q.value_by.get_or_insert(ConditionValueBy::MaxGrade);
        q.bar_by.get_or_insert(ConditionBarBy::Grade);

        if mode != QMode::Discrete && q.breaks.as_ref().is_none_or(Vec::is_empty) {
            q.breaks = Some(vec![DEFAULT_BREAK]);
        }

        let grouped = q
            .groupsetting
            .as_ref()
            .is_some_and(|gs| gs.inuse && gs.customset.is_some());
        q.q_type = Some(if grouped {
            QType::CustomGroupset
        } else {
            QType::Values
        });
        Ok(())
    }

    fn editor_view(&self, term: &Term, q: &Q) -> EditorView {
        let mut grades: Vec<String> = term
            .computable_values()
            .map(|(key, v)| v.label.clone().unwrap_or_else(|| key.clone()))
            .collect();
        if grades.is_empty() {
            grades = (0..=MAX_GRADE).map(|g| format!("Grade {g}")).collect();
        }

        EditorView {
            kind: self.kind(),
            term: term.clone(),
            q: q.clone(),
            modes: SmallVec::from_slice(MODES),
            content: EditorContent::Condition { grades },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::term::TYPE_CONDITION;
    use crate::vocab::dictionary::{DictionaryDocument, DictionaryVocab};

    fn cardiac() -> Term {
        Term::new("Arrhythmias", TYPE_CONDITION).with_name("Arrhythmias")
    }

    #[tokio::test]
    async fn test_defaults_filled_once() {
        let vocab = DictionaryVocab::new(DictionaryDocument::default());
        let mut term = cardiac();
        let mut q = Q::default();
        ConditionHandler
            .fill_tw(&mut term, &mut q, &vocab, None)
            .await
            .unwrap();

        assert_eq!(q.mode, Some(QMode::Discrete));
        assert_eq!(q.value_by, Some(ConditionValueBy::MaxGrade));
        assert_eq!(q.bar_by, Some(ConditionBarBy::Grade));
        assert_eq!(q.q_type, Some(QType::Values));
        assert!(q.breaks.is_none());
        assert_eq!(
            ConditionHandler.get_pill_status(&term, &q).text.as_deref(),
            Some("Max grade")
        );

        let once = q.clone();
        ConditionHandler
            .fill_tw(&mut term, &mut q, &vocab, None)
            .await
            .unwrap();
        assert_eq!(q, once);
    }

    #[tokio::test]
    async fn test_cuminc_gets_grade_break() {
        let vocab = DictionaryVocab::new(DictionaryDocument::default());
        let mut term = cardiac();
        let mut q = Q::with_mode(QMode::Cuminc);
        ConditionHandler
            .fill_tw(&mut term, &mut q, &vocab, None)
            .await
            .unwrap();
        assert_eq!(q.breaks, Some(vec![DEFAULT_BREAK]));
    }

    #[test]
    fn test_validate() {
        let term = cardiac();
        assert!(ConditionHandler.validate_q(&term, &Q::with_mode(QMode::Cox)).is_ok());
        assert!(
            ConditionHandler
                .validate_q(&term, &Q::with_mode(QMode::Spline))
                .is_err()
        );

        let bad_break = Q {
            breaks: Some(vec![9]),
            ..Default::default()
        };
        assert!(ConditionHandler.validate_q(&term, &bad_break).is_err());
    }
}
