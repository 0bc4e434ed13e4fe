//! Numeric handler: integer, float and date terms

use async_trait::async_trait;
use smallvec::SmallVec;
use tracing::debug;

use super::bins::{binary_bins, derive_default_bins, is_valid_bin_scheme};
use super::{EditorContent, EditorView, Handler, HandlerKind, PillStatus, check_mode, format_number};
use crate::error::{PillError, PillResult};
use crate::model::q::{Knot, Q, QMode, QType};
use crate::model::term::Term;
use crate::vocab::api::VocabApi;

const MODES: &[QMode] = &[
    QMode::Discrete,
    QMode::Continuous,
    QMode::Binary,
    QMode::Spline,
];

const MEDIAN: [u8; 1] = [50];
const SPLINE_KNOT_PERCENTILES: [u8; 4] = [5, 35, 65, 95];

#[derive(Debug, Default)]
pub struct NumericHandler;

impl NumericHandler {
    async fn fill_binary(term: &Term, q: &mut Q, vocab: &dyn VocabApi) -> PillResult<()> {
        let split = q.q_type == Some(QType::CustomBin) && q.lst.as_ref().is_some_and(|l| l.len() == 2);
        if split {
            return Ok(());
        }

        let term_id = term.id.as_deref().unwrap_or_default();
        let median = vocab
            .get_percentile(term_id, &MEDIAN)
            .await?
            .first()
            .copied()
            .ok_or_else(|| PillError::vocab("getPercentile", "no median returned"))?;

        q.q_type = Some(QType::CustomBin);
        q.lst = Some(binary_bins(median));
        Ok(())
    }

    async fn fill_spline(term: &Term, q: &mut Q, vocab: &dyn VocabApi) -> PillResult<()> {
        if q.knots.as_ref().is_some_and(|k| !k.is_empty()) {
            return Ok(());
        }

        let term_id = term.id.as_deref().unwrap_or_default();
        let values = vocab.get_percentile(term_id, &SPLINE_KNOT_PERCENTILES).await?;
        q.knots = Some(values.into_iter().map(|value| Knot { value }).collect());
        Ok(())
    }
}

#[async_trait]
impl Handler for NumericHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Numeric
    }

    fn supported_modes(&self) -> &'static [QMode] {
        MODES
    }

    fn get_pill_status(&self, _term: &Term, q: &Q) -> PillStatus {
        match q.mode.unwrap_or(QMode::Discrete) {
            QMode::Continuous => PillStatus::text("continuous"),
            QMode::Spline => PillStatus::text("cubic spline"),
            QMode::Binary => PillStatus::text("binary"),
            QMode::Discrete => match (q.q_type, q.bin_size, q.lst.as_ref()) {
                (Some(QType::CustomBin), _, Some(lst)) => PillStatus::text(format!("{} bins", lst.len())),
                (_, Some(size), _) => PillStatus::text(format!("bin size={}", format_number(size))),
                _ => PillStatus::none(),
            },
            _ => PillStatus::none(),
        }
    }

    fn validate_q(&self, term: &Term, q: &Q) -> PillResult<()> {
        check_mode(self, term, q)?;
        match q.q_type {
            Some(t) if t.is_groupset() || t == QType::Values => Err(PillError::type_mismatch(
                term.term_type.as_str(),
                format!("type '{}' does not apply to numeric terms", t.as_str()),
            )),
            _ => Ok(()),
        }
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

        match mode {
            QMode::Discrete if !is_valid_bin_scheme(q) => {
                if term.bins.is_none() {
                    term.bins = Some(derive_default_bins(term, vocab).await?);
                }
                if let Some(bins) = term.bins.as_ref() {
                    debug!(term_id = ?term.id, "Applying default bins");
                    q.apply_bins(&bins.default);
                }
            }
            QMode::Binary => Self::fill_binary(term, q, vocab).await?,
            QMode::Spline => Self::fill_spline(term, q, vocab).await?,
            // continuous uses raw values; unsupported modes are left for validate_q
            _ => {}
        }
        Ok(())
    }

    fn editor_view(&self, term: &Term, q: &Q) -> EditorView {
        EditorView {
            kind: self.kind(),
            term: term.clone(),
            q: q.clone(),
            modes: SmallVec::from_slice(MODES),
            content: EditorContent::Bins {
                default_bins: term.bins.as_ref().map(|b| b.default.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::q::BinBoundary;
    use crate::model::term::TYPE_INTEGER;
    use crate::vocab::dictionary::{DictionaryDocument, DictionaryVocab};

    fn vocab() -> DictionaryVocab {
        let mut doc = DictionaryDocument::default();
        doc.values
            .insert("agedx".into(), (0..=100).map(f64::from).collect());
        DictionaryVocab::new(doc)
    }

    fn agedx() -> Term {
        Term::new("agedx", TYPE_INTEGER).with_name("Age at diagnosis")
    }

    #[tokio::test]
    async fn test_empty_q_gets_discrete_default_bins() {
        let mut term = agedx();
        let mut q = Q::default();
        NumericHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();

        let preset = term.bins.as_ref().unwrap().default.clone();
        assert_eq!(q.mode, Some(QMode::Discrete));
        assert_eq!(q.q_type, Some(preset.bin_type));
        assert_eq!(q.bin_size, preset.bin_size);
        assert!(is_valid_bin_scheme(&q));
    }

    #[tokio::test]
    async fn test_valid_bins_are_not_clobbered() {
        let mut term = agedx();
        let mut q = Q {
            mode: Some(QMode::Discrete),
            q_type: Some(QType::RegularBin),
            bin_size: Some(3.0),
            first_bin: Some(BinBoundary {
                start: Some(1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let before = q.clone();

        NumericHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();
        assert_eq!(q, before);
    }

    #[tokio::test]
    async fn test_valid_q_needs_no_percentiles() {
        let empty = DictionaryVocab::new(DictionaryDocument::default());
        let mut term = agedx();
        let mut q = Q {
            mode: Some(QMode::Discrete),
            q_type: Some(QType::RegularBin),
            bin_size: Some(5.0),
            first_bin: Some(BinBoundary {
                startunbounded: Some(true),
                stop: Some(10.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let before = q.clone();

        NumericHandler
            .fill_tw(&mut term, &mut q, &empty, None)
            .await
            .unwrap();
        assert_eq!(q, before);
        assert!(term.bins.is_none());

        let mut continuous = Q::with_mode(QMode::Continuous);
        NumericHandler
            .fill_tw(&mut term, &mut continuous, &empty, None)
            .await
            .unwrap();
        assert!(term.bins.is_none());
    }

    #[tokio::test]
    async fn test_fill_is_idempotent() {
        let v = vocab();
        for mode in [QMode::Discrete, QMode::Binary, QMode::Spline, QMode::Continuous] {
            let mut term = agedx();
            let mut q = Q::with_mode(mode);
            NumericHandler.fill_tw(&mut term, &mut q, &v, None).await.unwrap();
            let once = (term.clone(), q.clone());

            NumericHandler.fill_tw(&mut term, &mut q, &v, None).await.unwrap();
            assert_eq!((term, q), once, "mode {mode:?}");
        }
    }

    #[tokio::test]
    async fn test_binary_splits_at_median() {
        let mut term = agedx();
        let mut q = Q::with_mode(QMode::Binary);
        NumericHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();

        let lst = q.lst.unwrap();
        assert_eq!(q.q_type, Some(QType::CustomBin));
        assert_eq!(lst.len(), 2);
        assert_eq!(lst[0].stop, Some(50.0));
        assert_eq!(lst[1].start, Some(50.0));
    }

    #[tokio::test]
    async fn test_spline_knots_from_percentiles() {
        let mut term = agedx();
        let mut q = Q::with_mode(QMode::Spline);
        NumericHandler
            .fill_tw(&mut term, &mut q, &vocab(), None)
            .await
            .unwrap();

        let knots: Vec<f64> = q.knots.unwrap().iter().map(|k| k.value).collect();
        assert_eq!(knots, vec![5.0, 35.0, 65.0, 95.0]);
        assert_eq!(
            NumericHandler.get_pill_status(&term, &Q::with_mode(QMode::Spline)).text.as_deref(),
            Some("cubic spline")
        );
    }

    #[tokio::test]
    async fn test_default_q_applied_before_type_defaults() {
        let mut term = agedx();
        let mut q = Q::default();
        let defaults = Q::with_mode(QMode::Continuous);
        NumericHandler
            .fill_tw(&mut term, &mut q, &vocab(), Some(&defaults))
            .await
            .unwrap();

        assert_eq!(q.mode, Some(QMode::Continuous));
        assert!(q.bin_size.is_none());
    }

    #[test]
    fn test_status_text() {
        let term = agedx();
        let q = Q {
            bin_size: Some(5.0),
            ..Default::default()
        };
        assert_eq!(
            NumericHandler.get_pill_status(&term, &q).text.as_deref(),
            Some("bin size=5")
        );
    }

    #[test]
    fn test_groupset_rejected() {
        let q = Q {
            q_type: Some(QType::PredefinedGroupset),
            ..Default::default()
        };
        assert!(matches!(
            NumericHandler.validate_q(&agedx(), &q),
            Err(PillError::TypeMismatch { .. })
        ));
        assert!(
            NumericHandler
                .validate_q(&agedx(), &Q::with_mode(QMode::Cox))
                .is_err()
        );
    }
}
