//! Bin scheme validation and default bin derivation for numeric terms

use tracing::debug;

use crate::error::PillResult;
use crate::model::q::{BinBoundary, CustomBin, Q, QType};
use crate::model::term::{BinConfig, TYPE_INTEGER, Term, TermBins};
use crate::vocab::api::VocabApi;

/// Percentiles sampled to size default bins.
const RANGE_PERCENTILES: [u8; 2] = [5, 95];

/// Target number of bins between the 5th and 95th percentile.
const TARGET_BINS: f64 = 5.0;

/// Whether `q` already holds a usable bin scheme.
///
/// Valid when q is a custom-bin scheme with a bin list, or when it has a
/// finite bin size and a first bin whose boundary is set on the side that
/// is bounded.
pub fn is_valid_bin_scheme(q: &Q) -> bool {
    if q.q_type == Some(QType::CustomBin) && q.lst.is_some() {
        return true;
    }

    let (Some(bin_size), Some(first_bin)) = (q.bin_size, q.first_bin.as_ref()) else {
        return false;
    };
    if !bin_size.is_finite() {
        return false;
    }

    boundary_is_consistent(first_bin)
}

fn boundary_is_consistent(first_bin: &BinBoundary) -> bool {
    if first_bin.is_start_unbounded() {
        first_bin.stop_percentile.is_some() || first_bin.stop.is_some_and(f64::is_finite)
    } else {
        first_bin.start_percentile.is_some() || first_bin.start.is_some_and(f64::is_finite)
    }
}

/// Round `raw` up to 1, 2 or 5 times a power of ten.
pub fn nice_bin_size(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }

    let magnitude = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .map(|step| step * magnitude)
        .find(|size| *size >= raw)
        .unwrap_or(10.0 * magnitude)
}

/// Compute a regular-bin preset from the term's value distribution.
pub async fn derive_default_bins(term: &Term, vocab: &dyn VocabApi) -> PillResult<TermBins> {
    let term_id = term.id.as_deref().unwrap_or_default();
    let values = vocab.get_percentile(term_id, &RANGE_PERCENTILES).await?;
    let (lo, hi) = match values.as_slice() {
        [lo, hi, ..] => (*lo, *hi),
        [only] => (*only, *only),
        [] => (0.0, 0.0),
    };

    let mut bin_size = nice_bin_size((hi - lo) / TARGET_BINS);
    if term.term_type == TYPE_INTEGER {
        bin_size = bin_size.max(1.0);
    }
    let stop = (lo / bin_size).ceil() * bin_size;

    debug!(term_id, lo, hi, bin_size, "Derived default bins");

    Ok(TermBins {
        default: BinConfig {
            bin_type: QType::RegularBin,
            bin_size: Some(bin_size),
            startinclusive: Some(true),
            first_bin: Some(BinBoundary {
                startunbounded: Some(true),
                stop: Some(stop),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Two bins split at `cutoff`: below, and at or above.
pub fn binary_bins(cutoff: f64) -> Vec<CustomBin> {
    vec![
        CustomBin {
            startunbounded: Some(true),
            stop: Some(cutoff),
            stopinclusive: Some(false),
            label: Some(format!("<{}", super::format_number(cutoff))),
            ..Default::default()
        },
        CustomBin {
            start: Some(cutoff),
            startinclusive: Some(true),
            stopunbounded: Some(true),
            label: Some(format!("≥{}", super::format_number(cutoff))),
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(bin_size: f64, first_bin: BinBoundary) -> Q {
        Q {
            q_type: Some(QType::RegularBin),
            bin_size: Some(bin_size),
            first_bin: Some(first_bin),
            ..Default::default()
        }
    }

    #[test]
    fn test_custom_bin_with_list_is_valid() {
        let q = Q {
            q_type: Some(QType::CustomBin),
            lst: Some(vec![]),
            ..Default::default()
        };
        assert!(is_valid_bin_scheme(&q));

        let no_list = Q {
            q_type: Some(QType::CustomBin),
            ..Default::default()
        };
        assert!(!is_valid_bin_scheme(&no_list));
    }

    #[test]
    fn test_unbounded_start_needs_stop() {
        let ok = regular(
            5.0,
            BinBoundary {
                startunbounded: Some(true),
                stop: Some(10.0),
                ..Default::default()
            },
        );
        assert!(is_valid_bin_scheme(&ok));

        let by_percentile = regular(
            5.0,
            BinBoundary {
                startunbounded: Some(true),
                stop_percentile: Some(10),
                ..Default::default()
            },
        );
        assert!(is_valid_bin_scheme(&by_percentile));

        let start_only = regular(
            5.0,
            BinBoundary {
                startunbounded: Some(true),
                start: Some(0.0),
                ..Default::default()
            },
        );
        assert!(!is_valid_bin_scheme(&start_only));
    }

    #[test]
    fn test_bounded_start_needs_start() {
        let ok = regular(
            5.0,
            BinBoundary {
                start: Some(0.0),
                ..Default::default()
            },
        );
        assert!(is_valid_bin_scheme(&ok));

        let stop_only = regular(
            5.0,
            BinBoundary {
                stop: Some(10.0),
                ..Default::default()
            },
        );
        assert!(!is_valid_bin_scheme(&stop_only));
    }

    #[test]
    fn test_non_finite_bin_size_is_invalid() {
        let q = regular(
            f64::NAN,
            BinBoundary {
                start: Some(0.0),
                ..Default::default()
            },
        );
        assert!(!is_valid_bin_scheme(&q));
        assert!(!is_valid_bin_scheme(&Q::default()));
    }

    #[test]
    fn test_nice_bin_size() {
        assert_eq!(nice_bin_size(3.2), 5.0);
        assert_eq!(nice_bin_size(0.7), 1.0);
        assert_eq!(nice_bin_size(12.0), 20.0);
        assert_eq!(nice_bin_size(0.0), 1.0);
        assert_eq!(nice_bin_size(100.0), 100.0);
    }

    #[test]
    fn test_binary_bins_labels() {
        let bins = binary_bins(42.0);
        assert_eq!(bins[0].label.as_deref(), Some("<42"));
        assert_eq!(bins[1].label.as_deref(), Some("≥42"));
    }
}
