//! SNP list handler
//!
//! A SNP list term carries its variants inline. Filling it validates the
//! list against the variant store once: every entry ends up either with an
//! allele/genotype summary or flagged `invalid`. Partial rejection is kept
//! in-band; only a list where nothing survives is an error.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use tracing::{info, warn};

use super::{EditorContent, EditorView, Handler, HandlerKind, PillStatus, check_mode};
use crate::error::{PillError, PillResult};
use crate::model::q::{Q, QMode, QType};
use crate::model::term::{SnpEntry, Term};
use crate::vocab::api::{ValidatedSnp, VocabApi};

const MODES: &[QMode] = &[QMode::Discrete];

static RSID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^rs\d+$").expect("rsid pattern is valid"));

#[derive(Debug, Default)]
pub struct SnpListHandler;

fn needs_validation(term: &Term) -> bool {
    term.cacheid.is_none() || term.snps.iter().any(|s| !s.is_validated())
}

fn reject(entry: &mut SnpEntry) {
    entry.invalid = true;
    entry.alleles.clear();
    entry.gt2count.clear();
}

fn accept(entry: &mut SnpEntry, result: &ValidatedSnp) {
    entry.invalid = false;
    entry.chr = result.chr.clone().or(entry.chr.take());
    entry.pos = result.pos.or(entry.pos);
    entry.alleles = result.alleles.clone();
    entry.gt2count = result.gt2count.clone();
    if entry.effect_allele.is_none() {
        entry.effect_allele = entry
            .alleles
            .iter()
            .find(|a| !a.is_ref)
            .map(|a| a.allele.clone());
    }
}

fn counts(term: &Term) -> (usize, usize) {
    let invalid = term.snps.iter().filter(|s| s.invalid).count();
    (term.snps.len(), invalid)
}

impl SnpListHandler {
    async fn validate_entries(term: &mut Term, vocab: &dyn VocabApi) -> PillResult<()> {
        for entry in term.snps.iter_mut().filter(|s| !RSID.is_match(&s.rsid)) {
            reject(entry);
        }

        let query: Vec<&str> = term
            .snps
            .iter()
            .filter(|s| RSID.is_match(&s.rsid))
            .map(|s| s.rsid.as_str())
            .collect();

        if !query.is_empty() {
            let response = vocab.validate_snps(&query.join("\n")).await?;
            let by_rsid: HashMap<String, &ValidatedSnp> = response
                .snps
                .iter()
                .map(|s| (s.rsid.to_ascii_lowercase(), s))
                .collect();

            for entry in term.snps.iter_mut().filter(|s| RSID.is_match(&s.rsid)) {
                match by_rsid.get(&entry.rsid.to_ascii_lowercase()) {
                    Some(result) if !result.invalid => accept(entry, result),
                    _ => reject(entry),
                }
            }
            term.cacheid = Some(response.cacheid);
        }

        let (total, invalid) = counts(term);
        if invalid == total {
            warn!(total, "Every SNP in the list was rejected");
            return Err(PillError::RemoteValidation {
                rejected: term.snps.iter().map(|s| s.rsid.clone()).collect(),
            });
        }

        info!(
            marker = "SNP_VALIDATION",
            total,
            invalid,
            cacheid = ?term.cacheid,
            "Validated SNP list"
        );
        Ok(())
    }
}

#[async_trait]
impl Handler for SnpListHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::SnpList
    }

    fn supported_modes(&self) -> &'static [QMode] {
        MODES
    }

    fn get_pill_name(&self, term: &Term, opts: &super::NameOptions) -> String {
        match term.name.as_deref() {
            Some(name) => super::truncate_name(name, opts),
            None => super::truncate_name(&format!("{} SNPs", term.snps.len()), opts),
        }
    }

    fn get_pill_status(&self, term: &Term, _q: &Q) -> PillStatus {
        match counts(term) {
            (0, _) => PillStatus::none(),
            (total, 0) => PillStatus::text(format!("{total} SNPs")),
            (total, invalid) => {
                PillStatus::text(format!("{total} SNPs ({invalid} invalid)")).with_bgcolor("#ffe5e5")
            }
        }
    }

    fn validate_q(&self, term: &Term, q: &Q) -> PillResult<()> {
        check_mode(self, term, q)?;

        let checks = [
            ("alleleType", q.allele_type, 1),
            ("geneticModel", q.genetic_model, 3),
            ("missingGenotype", q.missing_genotype, 1),
        ];
        for (field, value, max) in checks {
            if let Some(v) = value.filter(|v| *v > max) {
                return Err(PillError::type_mismatch(
                    term.term_type.as_str(),
                    format!("{field} must be at most {max}, got {v}"),
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
        if term.snps.is_empty() {
            return Err(PillError::structural("term.snps", "SNP list is empty"));
        }
        if needs_validation(term) {
            Self::validate_entries(term, vocab).await?;
        }

        if let Some(defaults) = default_q {
            q.merge_defaults(defaults);
        }
        q.mode.get_or_insert(QMode::Discrete);
        q.q_type.get_or_insert(QType::Values);
        q.allele_type.get_or_insert(0);
        q.genetic_model.get_or_insert(0);
        q.missing_genotype.get_or_insert(0);
        q.cacheid.clone_from(&term.cacheid);
        Ok(())
    }

    fn editor_view(&self, term: &Term, q: &Q) -> EditorView {
        EditorView {
            kind: self.kind(),
            term: term.clone(),
            q: q.clone(),
            modes: SmallVec::from_slice(MODES),
            content: EditorContent::SnpList {
                snps: term.snps.clone(),
            },
        }
    }
}
