//! Term: descriptor of one selectable variable
//!
//! Dictionary terms (categorical, numeric, condition) are identified by `id`
//! and fetched from the vocabulary. Non-dictionary terms (`snplst`,
//! `samplelst`) carry their whole content inline. Fields this crate does not
//! interpret are kept in `extra` so a term round-trips unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::q::{BinBoundary, CustomBin, GroupSet, QType};

pub const TYPE_CATEGORICAL: &str = "categorical";
pub const TYPE_INTEGER: &str = "integer";
pub const TYPE_FLOAT: &str = "float";
pub const TYPE_DATE: &str = "date";
pub const TYPE_CONDITION: &str = "condition";
pub const TYPE_SNPLST: &str = "snplst";
pub const TYPE_SAMPLELST: &str = "samplelst";

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Term {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default)]
    pub term_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<TermBins>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, TermValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupsetting: Option<TermGroupSetting>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snps: Vec<SnpEntry>,

    /// Server-side cache handle for a validated SNP list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacheid: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Term {
    pub fn new(id: impl Into<String>, term_type: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            term_type: term_type.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.term_type.as_str(),
            TYPE_INTEGER | TYPE_FLOAT | TYPE_DATE
        )
    }

    /// Values usable as categories, excluding uncomputable ones.
    pub fn computable_values(&self) -> impl Iterator<Item = (&String, &TermValue)> {
        self.values.iter().filter(|(_, v)| !v.uncomputable)
    }

    pub fn predefined_groupset(&self, idx: usize) -> Option<&GroupSet> {
        self.groupsetting
            .as_ref()
            .filter(|gs| !gs.disabled)
            .and_then(|gs| gs.lst.get(idx))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub uncomputable: bool,

    /// Member samples, for sample-list groups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermGroupSetting {
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lst: Vec<GroupSet>,
}

/// Numeric term bin presets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermBins {
    pub default: BinConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less: Option<BinConfig>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A complete bin scheme as stored on a term.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BinConfig {
    #[serde(rename = "type")]
    pub bin_type: QType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_size: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_bin: Option<BinBoundary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_bin: Option<BinBoundary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lst: Option<Vec<CustomBin>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startinclusive: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopinclusive: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounding: Option<String>,
}

/// One variant in a SNP list term.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnpEntry {
    #[serde(alias = "snpid")]
    pub rsid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alleles: Vec<AlleleCount>,

    /// Genotype to sample count
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gt2count: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_allele: Option<String>,

    /// Rejected by the variant store
    #[serde(default, skip_serializing_if = "is_false")]
    pub invalid: bool,
}

impl SnpEntry {
    pub fn new(rsid: impl Into<String>) -> Self {
        Self {
            rsid: rsid.into(),
            ..Default::default()
        }
    }

    /// Carries either a validation summary or a rejection flag.
    pub fn is_validated(&self) -> bool {
        self.invalid || !self.alleles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlleleCount {
    pub allele: String,

    pub count: u64,

    #[serde(rename = "isRef", default, skip_serializing_if = "is_false")]
    pub is_ref: bool,
}
