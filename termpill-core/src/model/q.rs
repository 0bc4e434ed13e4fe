//! Q: query settings controlling how a term's values are consumed
//!
//! A single struct covers every term type; each handler reads the fields
//! relevant to it and leaves the others absent. Absent fields are never
//! serialized, so an empty `Q` serializes to `{}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::term::BinConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QMode {
    Discrete,
    Continuous,
    Binary,
    Spline,
    Cuminc,
    Cox,
}

impl QMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            QMode::Discrete => "discrete",
            QMode::Continuous => "continuous",
            QMode::Binary => "binary",
            QMode::Spline => "spline",
            QMode::Cuminc => "cuminc",
            QMode::Cox => "cox",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QType {
    Values,
    #[default]
    RegularBin,
    CustomBin,
    PredefinedGroupset,
    CustomGroupset,
}

impl QType {
    pub const fn as_str(self) -> &'static str {
        match self {
            QType::Values => "values",
            QType::RegularBin => "regular-bin",
            QType::CustomBin => "custom-bin",
            QType::PredefinedGroupset => "predefined-groupset",
            QType::CustomGroupset => "custom-groupset",
        }
    }

    pub const fn is_bin(self) -> bool {
        matches!(self, QType::RegularBin | QType::CustomBin)
    }

    pub const fn is_groupset(self) -> bool {
        matches!(self, QType::PredefinedGroupset | QType::CustomGroupset)
    }
}

/// Boundary of the first or last bin of a regular bin scheme.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BinBoundary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startunbounded: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopunbounded: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_percentile: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_percentile: Option<u8>,
}

impl BinBoundary {
    pub fn is_start_unbounded(&self) -> bool {
        self.startunbounded.unwrap_or(false)
    }
}

/// One explicit interval of a custom bin scheme.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomBin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startunbounded: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopunbounded: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startinclusive: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopinclusive: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knot {
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupValue {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<GroupValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncomputable: Option<bool>,
}

/// A partition of a term's values into named groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub groups: Vec<Group>,
}

impl GroupSet {
    /// Groups that take part in analysis.
    pub fn computable_groups(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| !g.uncomputable.unwrap_or(false))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QGroupSetting {
    pub inuse: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predefined_groupset_idx: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customset: Option<GroupSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValueBy {
    MaxGrade,
    MostRecent,
    ComputableGrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionBarBy {
    Grade,
    Children,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Q {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<QMode>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub q_type: Option<QType>,

    // numeric
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

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knots: Option<Vec<Knot>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,

    // categorical, condition, samplelst
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupsetting: Option<QGroupSetting>,

    #[serde(
        rename = "hiddenValues",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub hidden_values: BTreeMap<String, u8>,

    #[serde(rename = "reuseId", default, skip_serializing_if = "Option::is_none")]
    pub reuse_id: Option<String>,

    // condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_by: Option<ConditionValueBy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_by: Option<ConditionBarBy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaks: Option<Vec<u8>>,

    // snplst
    #[serde(rename = "alleleType", default, skip_serializing_if = "Option::is_none")]
    pub allele_type: Option<u8>,

    #[serde(
        rename = "geneticModel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub genetic_model: Option<u8>,

    #[serde(
        rename = "missingGenotype",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub missing_genotype: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacheid: Option<String>,

    #[serde(rename = "isAtomic", default, skip_serializing_if = "Option::is_none")]
    pub is_atomic: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Q {
    pub fn with_mode(mode: QMode) -> Self {
        Self {
            mode: Some(mode),
            ..Default::default()
        }
    }

    /// Settings left after the user drops any grouping: plain values.
    pub fn ungrouped() -> Self {
        Self {
            mode: Some(QMode::Discrete),
            q_type: Some(QType::Values),
            groupsetting: Some(QGroupSetting::default()),
            ..Default::default()
        }
    }

    pub fn grouping_in_use(&self) -> bool {
        self.groupsetting.as_ref().is_some_and(|gs| gs.inuse)
            || self.q_type.is_some_and(QType::is_groupset)
    }

    /// First numeric field holding NaN or an infinity, if any.
    ///
    /// JSON has no encoding for these, so they cannot take part in an id.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        let bad = |v: Option<f64>| v.is_some_and(|v| !v.is_finite());
        let bad_boundary =
            |b: &Option<BinBoundary>| b.as_ref().is_some_and(|b| bad(b.start) || bad(b.stop));

        if bad(self.bin_size) {
            Some("bin_size")
        } else if bad(self.scale) {
            Some("scale")
        } else if bad_boundary(&self.first_bin) {
            Some("first_bin")
        } else if bad_boundary(&self.last_bin) {
            Some("last_bin")
        } else if self
            .lst
            .iter()
            .flatten()
            .any(|bin| bad(bin.start) || bad(bin.stop))
        {
            Some("lst")
        } else if self.knots.iter().flatten().any(|k| !k.value.is_finite()) {
            Some("knots")
        } else {
            None
        }
    }

    /// Overwrite the bin fields with a term-level preset.
    pub fn apply_bins(&mut self, preset: &BinConfig) {
        self.q_type = Some(preset.bin_type);
        self.bin_size = preset.bin_size;
        self.first_bin = preset.first_bin.clone();
        self.last_bin = preset.last_bin.clone();
        self.lst = preset.lst.clone();
        self.startinclusive = preset.startinclusive;
        self.stopinclusive = preset.stopinclusive;
        if preset.rounding.is_some() {
            self.rounding = preset.rounding.clone();
        }
    }

    /// Copy every field set in `defaults` that is unset here.
    pub fn merge_defaults(&mut self, defaults: &Q) {
        macro_rules! fill {
            ($($field:ident),* $(,)?) => {
                $(
                    if self.$field.is_none() {
                        self.$field = defaults.$field.clone();
                    }
                )*
            };
        }

        fill!(
            mode,
            q_type,
            bin_size,
            first_bin,
            last_bin,
            lst,
            startinclusive,
            stopinclusive,
            rounding,
            knots,
            scale,
            groupsetting,
            reuse_id,
            value_by,
            bar_by,
            breaks,
            allele_type,
            genetic_model,
            missing_genotype,
        );

        for (key, value) in &defaults.hidden_values {
            self.hidden_values.entry(key.clone()).or_insert(*value);
        }
        for (key, value) in &defaults.extra {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_finite_numbers_reported() {
        assert_eq!(Q::default().non_finite_field(), None);

        let q = Q {
            bin_size: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(q.non_finite_field(), Some("bin_size"));

        let q = Q {
            lst: Some(vec![CustomBin {
                stop: Some(f64::INFINITY),
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert_eq!(q.non_finite_field(), Some("lst"));

        let q = Q {
            knots: Some(vec![Knot { value: f64::NEG_INFINITY }]),
            ..Default::default()
        };
        assert_eq!(q.non_finite_field(), Some("knots"));
    }

    #[test]
    fn test_empty_q_serializes_to_empty_object() {
        assert_eq!(serde_json::to_value(Q::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_ungrouped_shape() {
        assert_eq!(
            serde_json::to_value(Q::ungrouped()).unwrap(),
            json!({"mode": "discrete", "type": "values", "groupsetting": {"inuse": false}})
        );
    }

    #[test]
    fn test_wire_names() {
        let q: Q = serde_json::from_value(json!({
            "mode": "spline",
            "type": "custom-bin",
            "hiddenValues": {"unknown": 1},
            "reuseId": "saved-1",
            "alleleType": 0,
            "custom_field": [1, 2]
        }))
        .unwrap();

        assert_eq!(q.mode, Some(QMode::Spline));
        assert_eq!(q.q_type, Some(QType::CustomBin));
        assert_eq!(q.hidden_values.get("unknown"), Some(&1));
        assert_eq!(q.reuse_id.as_deref(), Some("saved-1"));
        assert_eq!(q.allele_type, Some(0));
        assert_eq!(q.extra.get("custom_field"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_merge_defaults_keeps_existing_fields() {
        let mut q = Q::with_mode(QMode::Continuous);
        let defaults = Q {
            mode: Some(QMode::Discrete),
            bin_size: Some(10.0),
            ..Default::default()
        };

        q.merge_defaults(&defaults);
        assert_eq!(q.mode, Some(QMode::Continuous));
        assert_eq!(q.bin_size, Some(10.0));
    }

    #[test]
    fn test_grouping_in_use() {
        assert!(!Q::ungrouped().grouping_in_use());

        let q = Q {
            q_type: Some(QType::CustomGroupset),
            ..Default::default()
        };
        assert!(q.grouping_in_use());
    }
}
