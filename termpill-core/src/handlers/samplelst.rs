//! Sample list handler: user-defined sample groups carried inline

use async_trait::async_trait;
use serde_json::Value;
use smallvec::SmallVec;

use super::{EditorContent, EditorView, Handler, HandlerKind, PillStatus, check_mode};
use crate::error::{PillError, PillResult};
use crate::model::q::{Group, GroupSet, GroupValue, Q, QGroupSetting, QMode, QType};
use crate::model::term::{Term, TermValue};
use crate::vocab::api::VocabApi;

const MODES: &[QMode] = &[QMode::Discrete];

#[derive(Debug, Default)]
pub struct SampleListHandler;

/// Key of one sample entry: `sampleId`, `sample`, or the scalar itself.
fn sample_key(entry: &Value) -> Option<String> {
    let scalar = match entry {
        Value::Object(map) => map.get("sampleId").or_else(|| map.get("sample"))?,
        other => other,
    };
    match scalar {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn group_of(key: &str, value: &TermValue) -> Group {
    Group {
        name: value.label.clone().unwrap_or_else(|| key.to_string()),
        values: value
            .list
            .iter()
            .filter_map(sample_key)
            .map(|key| GroupValue { key, label: None })
            .collect(),
        uncomputable: value.uncomputable.then_some(true),
    }
}

#[async_trait]
impl Handler for SampleListHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::SampleList
    }

    fn supported_modes(&self) -> &'static [QMode] {
        MODES
    }

    fn get_pill_status(&self, term: &Term, _q: &Q) -> PillStatus {
        let samples: usize = term.values.values().map(|v| v.list.len()).sum();
        match term.values.len() {
            0 => PillStatus::none(),
            1 => PillStatus::text(format!("{samples} samples")),
            n => PillStatus::text(format!("{n} groups")),
        }
    }

    fn validate_q(&self, term: &Term, q: &Q) -> PillResult<()> {
        check_mode(self, term, q)?;
        match q.q_type {
            Some(t) if t != QType::CustomGroupset => Err(PillError::type_mismatch(
                term.term_type.as_str(),
                format!("type '{}' does not apply to sample lists", t.as_str()),
            )),
            _ => Ok(()),
        }
    }

    async fn fill_tw(
        &self,
        term: &mut Term,
        q: &mut Q,
        _vocab: &dyn VocabApi,
        default_q: Option<&Q>,
    ) -> PillResult<()> {
        if term.values.is_empty() {
            return Err(PillError::structural("term.values", "sample list has no groups"));
        }

        if let Some(defaults) = default_q {
            q.merge_defaults(defaults);
        }
        q.mode.get_or_insert(QMode::Discrete);
        q.q_type = Some(QType::CustomGroupset);

        let has_customset = q
            .groupsetting
            .as_ref()
            .is_some_and(|gs| gs.inuse && gs.customset.is_some());
        if !has_customset {
            q.groupsetting = Some(QGroupSetting {
                inuse: true,
                predefined_groupset_idx: None,
                customset: Some(GroupSet {
                    name: None,
                    groups: term.values.iter().map(|(k, v)| group_of(k, v)).collect(),
                }),
            });
        }
        Ok(())
    }

    fn editor_view(&self, term: &Term, q: &Q) -> EditorView {
        let groups = term
            .values
            .iter()
            .map(|(key, v)| (v.label.clone().unwrap_or_else(|| key.clone()), v.list.len()))
            .collect();

        EditorView {
            kind: self.kind(),
            term: term.clone(),
            q: q.clone(),
            modes: SmallVec::from_slice(MODES),
            content: EditorContent::SampleList { groups },
        }
    }
}
