//! VocabApi: the remote vocabulary collaborator
//!
//! All calls are treated as pure remote calls. Retry and backoff belong to
//! the implementation, not to the resolver.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PillResult;
use crate::model::q::Q;
use crate::model::term::{AlleleCount, Term};

/// Outcome for one token submitted to `validate_snps`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidatedSnp {
    #[serde(alias = "snpid")]
    pub rsid: String,

    #[serde(default)]
    pub invalid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alleles: Vec<AlleleCount>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gt2count: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnpValidation {
    pub cacheid: String,
    pub snps: Vec<ValidatedSnp>,
}

/// Sample count for one category of a term.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategorySummary {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub samplecount: u64,
}

#[async_trait]
pub trait VocabApi: Send + Sync {
    /// Fetch dictionary terms by id. Ids not found are absent from the map.
    async fn get_terms(&self, ids: &[String]) -> PillResult<HashMap<String, Term>>;

    /// Values at the given percentiles, in request order.
    async fn get_percentile(&self, term_id: &str, percentiles: &[u8]) -> PillResult<Vec<f64>>;

    /// Validate whitespace/comma separated SNP ids against the variant store.
    async fn validate_snps(&self, text: &str) -> PillResult<SnpValidation>;

    /// Category sample counts under an optional filter.
    async fn get_categories(
        &self,
        term: &Term,
        filter: Option<&Value>,
        qlst: &[Q],
    ) -> PillResult<Vec<CategorySummary>>;
}
