//! Score consistency checks.
//!
//! Officially a routine's total is D + E minus penalties. Each record is
//! labelled with a [`ScoreCheck`] so spreadsheet users can filter rows
//! whose printed total does not reconcile.

use crate::models::{ScoreCheck, ScoreRecord};
use tracing::{debug, warn};

/// Counts of flagged records after checking
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    pub incomplete: usize,
    pub mismatched: usize,
    pub penalised: usize,
}

/// Classify one record; `tolerance` is in thousandths of a point
pub fn check_record(record: &ScoreRecord, tolerance: i64) -> ScoreCheck {
    let (Some(d), Some(e), Some(total)) = (record.d_score, record.e_score, record.total_score)
    else {
        return ScoreCheck::Incomplete;
    };

    if d.is_negative() || e.is_negative() {
        return ScoreCheck::Mismatch;
    }

    let components = d.thousandths() + e.thousandths();
    let total = total.thousandths();
    if (components - total).abs() <= tolerance {
        return ScoreCheck::Ok;
    }

    match record.penalty {
        // Penalties are printed either signed (-0.300) or as a bare deduction (0.300)
        Some(penalty) if (components - penalty.thousandths().abs() - total).abs() <= tolerance => {
            ScoreCheck::Penalty
        }
        _ => ScoreCheck::Mismatch,
    }
}

/// Label every record in place and summarise the flags
pub fn apply_checks(records: &mut [ScoreRecord], tolerance: i64) -> CheckSummary {
    let mut summary = CheckSummary::default();

    for record in records.iter_mut() {
        record.score_check = check_record(record, tolerance);
        match record.score_check {
            ScoreCheck::Incomplete => summary.incomplete += 1,
            ScoreCheck::Mismatch => {
                summary.mismatched += 1;
                warn!(
                    "{} ({}) on {}: total {} does not reconcile with D {} + E {}",
                    record.gymnast_name,
                    record.country,
                    record.apparatus,
                    shown(record.total_score),
                    shown(record.d_score),
                    shown(record.e_score),
                );
            }
            ScoreCheck::Penalty => summary.penalised += 1,
            ScoreCheck::Ok => {}
        }
    }

    debug!("Score checks: {:?}", summary);
    summary
}

/// Score as printed, `-` when absent
fn shown(score: Option<crate::models::Score>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}
