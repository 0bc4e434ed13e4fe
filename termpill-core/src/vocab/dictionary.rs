//! DictionaryVocab: in-process vocabulary loaded from a JSON document
//!
//! Document layout:
//! ```json
//! {
//!   "terms":      { "<id>": <Term> },
//!   "values":     { "<numeric term id>": [1.0, 2.5, ...] },
//!   "snps":       { "<rsid>": { "chr": "chr1", "pos": 1, "alleles": [...], "gt2count": {...} } },
//!   "categories": { "<term id>": [ { "key": "M", "samplecount": 10 } ] }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs as TokioFs;
use tracing::{debug, info};

use crate::error::{PillError, PillResult};
use crate::model::q::Q;
use crate::model::term::{AlleleCount, Term};
use crate::vocab::api::{CategorySummary, SnpValidation, ValidatedSnp, VocabApi};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnpRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<u64>,

    #[serde(default)]
    pub alleles: Vec<AlleleCount>,

    #[serde(default)]
    pub gt2count: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryDocument {
    #[serde(default)]
    pub terms: HashMap<String, Term>,

    #[serde(default)]
    pub values: HashMap<String, Vec<f64>>,

    #[serde(default)]
    pub snps: HashMap<String, SnpRecord>,

    #[serde(default)]
    pub categories: HashMap<String, Vec<CategorySummary>>,
}

#[derive(Debug, Default)]
pub struct DictionaryVocab {
    doc: DictionaryDocument,
    term_fetches: AtomicU64,
}

impl DictionaryVocab {
    pub fn new(doc: DictionaryDocument) -> Self {
        Self {
            doc,
            term_fetches: AtomicU64::new(0),
        }
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> PillResult<Self> {
        let path = path.as_ref();
        let text = TokioFs::read_to_string(path).await.map_err(|e| {
            PillError::vocab("load", format!("cannot read {}: {e}", path.display()))
        })?;
        let doc: DictionaryDocument = serde_json::from_str(&text)?;

        info!(
            path = %path.display(),
            terms = doc.terms.len(),
            snps = doc.snps.len(),
            "Loaded dictionary vocabulary"
        );
        Ok(Self::new(doc))
    }

    /// Number of `get_terms` calls served so far
    pub fn term_fetches(&self) -> u64 {
        self.term_fetches.load(Ordering::Relaxed)
    }

    pub fn document(&self) -> &DictionaryDocument {
        &self.doc
    }
}

/// Nearest-rank percentile over sorted values.
fn nearest_rank(sorted: &[f64], percentile: u8) -> f64 {
    let p = f64::from(percentile.min(100)) / 100.0;
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[async_trait]
impl VocabApi for DictionaryVocab {
    async fn get_terms(&self, ids: &[String]) -> PillResult<HashMap<String, Term>> {
        self.term_fetches.fetch_add(1, Ordering::Relaxed);
        debug!(count = ids.len(), "Dictionary term fetch");

        Ok(ids
            .iter()
            .filter_map(|id| self.doc.terms.get(id).map(|t| (id.clone(), t.clone())))
            .collect())
    }

    async fn get_percentile(&self, term_id: &str, percentiles: &[u8]) -> PillResult<Vec<f64>> {
        let mut values: Vec<f64> = self
            .doc
            .values
            .get(term_id)
            .map(|v| v.iter().copied().filter(|x| x.is_finite()).collect())
            .unwrap_or_default();

        if values.is_empty() {
            return Err(PillError::vocab(
                "getPercentile",
                format!("no numeric values for term '{term_id}'"),
            ));
        }

        values.sort_by(f64::total_cmp);
        Ok(percentiles
            .iter()
            .map(|p| nearest_rank(&values, *p))
            .collect())
    }

    async fn validate_snps(&self, text: &str) -> PillResult<SnpValidation> {
        let mut rsids: Vec<&str> = text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();

        let snps = rsids
            .iter()
            .map(|rsid| match self.doc.snps.get(*rsid) {
                Some(rec) => ValidatedSnp {
                    rsid: rsid.to_string(),
                    invalid: false,
                    chr: rec.chr.clone(),
                    pos: rec.pos,
                    alleles: rec.alleles.clone(),
                    gt2count: rec.gt2count.clone(),
                },
                None => ValidatedSnp {
                    rsid: rsid.to_string(),
                    invalid: true,
                    ..Default::default()
                },
            })
            .collect();

        rsids.sort_unstable();
        let cacheid = twid::IdentityHasher::default().content_id(&rsids);

        Ok(SnpValidation { cacheid, snps })
    }

    async fn get_categories(
        &self,
        term: &Term,
        _filter: Option<&Value>,
        _qlst: &[Q],
    ) -> PillResult<Vec<CategorySummary>> {
        if let Some(cats) = term.id.as_ref().and_then(|id| self.doc.categories.get(id)) {
            return Ok(cats.clone());
        }

        Ok(term
            .computable_values()
            .map(|(key, v)| CategorySummary {
                key: key.clone(),
                label: v.label.clone(),
                samplecount: 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::term::TYPE_INTEGER;
    use serde_json::json;

    fn vocab() -> DictionaryVocab {
        let doc: DictionaryDocument = serde_json::from_value(json!({
            "terms": {
                "agedx": {"id": "agedx", "type": "integer", "name": "Age at diagnosis"}
            },
            "values": {"agedx": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]},
            "snps": {
                "rs1": {"chr": "chr1", "pos": 100, "alleles": [{"allele": "A", "count": 5, "isRef": true}]}
            },
            "categories": {"sex": [{"key": "1", "label": "Male", "samplecount": 3}]}
        }))
        .unwrap();
        DictionaryVocab::new(doc)
    }

    #[tokio::test]
    async fn test_get_terms_skips_unknown_ids() {
        let v = vocab();
        let terms = v
            .get_terms(&["agedx".to_string(), "nope".to_string()])
            .await
            .unwrap();

        assert_eq!(terms.len(), 1);
        assert_eq!(terms["agedx"].term_type, TYPE_INTEGER);
        assert_eq!(v.term_fetches(), 1);
    }

    #[tokio::test]
    async fn test_percentiles_nearest_rank() {
        let v = vocab();
        let p = v.get_percentile("agedx", &[0, 50, 90, 100]).await.unwrap();
        assert_eq!(p, vec![1.0, 5.0, 9.0, 10.0]);

        assert!(matches!(
            v.get_percentile("missing", &[50]).await,
            Err(PillError::Vocab { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_snps_flags_unknown() {
        let v = vocab();
        let res = v.validate_snps("rs1, rs404\nrs1").await.unwrap();

        assert_eq!(res.snps.len(), 3);
        assert!(!res.snps[0].invalid);
        assert_eq!(res.snps[0].alleles.len(), 1);
        assert!(res.snps[1].invalid);
        assert!(res.cacheid.starts_with("tw"));
    }

    #[tokio::test]
    async fn test_categories_fall_back_to_term_values() {
        let v = vocab();
        let sex = Term::new("sex", "categorical");
        assert_eq!(v.get_categories(&sex, None, &[]).await.unwrap().len(), 1);

        let mut race = Term::new("race", "categorical");
        race.values.insert("W".into(), Default::default());
        let cats = v.get_categories(&race, None, &[]).await.unwrap();
        assert_eq!(cats[0].key, "W");
    }
}
