//! Core data structures for score extraction.
//!
//! Defines the apparatus vocabulary, the exact decimal score type, the flat
//! output record, and run statistics shared by all three parsers.

use crate::constants::{SCORE_SCALE, apparatus_labels};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Women's artistic gymnastics apparatus, in Olympic rotation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Apparatus {
    Vault,
    UnevenBars,
    BalanceBeam,
    FloorExercise,
}

impl Apparatus {
    /// All apparatus in rotation order
    pub const ALL: [Apparatus; 4] = [
        Apparatus::Vault,
        Apparatus::UnevenBars,
        Apparatus::BalanceBeam,
        Apparatus::FloorExercise,
    ];

    /// Standard two-letter code
    pub fn code(&self) -> &'static str {
        match self {
            Apparatus::Vault => "VT",
            Apparatus::UnevenBars => "UB",
            Apparatus::BalanceBeam => "BB",
            Apparatus::FloorExercise => "FX",
        }
    }

    /// Full display name
    pub fn name(&self) -> &'static str {
        match self {
            Apparatus::Vault => "Vault",
            Apparatus::UnevenBars => "Uneven Bars",
            Apparatus::BalanceBeam => "Balance Beam",
            Apparatus::FloorExercise => "Floor Exercise",
        }
    }

    /// Position in the rotation (0-based)
    pub fn index(&self) -> usize {
        match self {
            Apparatus::Vault => 0,
            Apparatus::UnevenBars => 1,
            Apparatus::BalanceBeam => 2,
            Apparatus::FloorExercise => 3,
        }
    }

    fn labels(&self) -> &'static [&'static str] {
        match self {
            Apparatus::Vault => apparatus_labels::VAULT,
            Apparatus::UnevenBars => apparatus_labels::UNEVEN_BARS,
            Apparatus::BalanceBeam => apparatus_labels::BALANCE_BEAM,
            Apparatus::FloorExercise => apparatus_labels::FLOOR_EXERCISE,
        }
    }

    /// Recognize a source label such as "Balance Beam", "BB" or "Women's Vault"
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let normalized = normalized
            .strip_prefix("women's ")
            .or_else(|| normalized.strip_prefix("men's "))
            .unwrap_or(&normalized);

        Self::ALL
            .into_iter()
            .find(|apparatus| apparatus.labels().contains(&normalized))
    }
}

impl fmt::Display for Apparatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Exact decimal score as printed in the source PDF.
///
/// Stores the digits as an integer mantissa together with the number of
/// decimal places, so `14.000` and `-0.3` display exactly as they were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Score {
    mantissa: i64,
    places: u32,
}

impl Score {
    /// Build a score from a mantissa and its decimal places (`15766, 3` is 15.766)
    pub fn new(mantissa: i64, places: u32) -> Self {
        Self { mantissa, places }
    }

    /// Value in thousandths of a point, rounded half away from zero
    pub fn thousandths(&self) -> i64 {
        if self.places <= SCORE_SCALE {
            self.mantissa * 10i64.pow(SCORE_SCALE - self.places)
        } else {
            let divisor = 10i64.pow(self.places - SCORE_SCALE);
            let half = divisor / 2;
            if self.mantissa >= 0 {
                (self.mantissa + half) / divisor
            } else {
                (self.mantissa - half) / divisor
            }
        }
    }

    /// Approximate floating-point value
    pub fn as_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.places as i32)
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    /// Number of decimal places printed in the source
    pub fn places(&self) -> u32 {
        self.places
    }
}

impl FromStr for Score {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = if let Some(rest) = s.strip_prefix(['-', '\u{2212}']) {
            (true, rest)
        } else if let Some(rest) = s.strip_prefix('+') {
            (false, rest)
        } else {
            (false, s)
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (digits, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() && frac_part.is_empty()
            || !all_digits(int_part)
            || !all_digits(frac_part)
            || int_part.len() + frac_part.len() > 15
        {
            return Err(format!("not a decimal number: '{}'", s));
        }

        let mut mantissa: i64 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            mantissa = mantissa * 10 + i64::from(b - b'0');
        }
        if negative {
            mantissa = -mantissa;
        }

        Ok(Self {
            mantissa,
            places: frac_part.len() as u32,
        })
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let magnitude = self.mantissa.unsigned_abs();
        if self.places == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        let divisor = 10u64.pow(self.places);
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            magnitude / divisor,
            magnitude % divisor,
            width = self.places as usize
        )
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Consistency of a record's total against its component scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCheck {
    /// D + E matches the total within tolerance
    Ok,
    /// D + E + penalty matches the total
    Penalty,
    /// The total diverges and no captured penalty explains it
    Mismatch,
    /// D, E or total is missing
    #[default]
    Incomplete,
}

impl fmt::Display for ScoreCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScoreCheck::Ok => "ok",
            ScoreCheck::Penalty => "penalty",
            ScoreCheck::Mismatch => "mismatch",
            ScoreCheck::Incomplete => "incomplete",
        };
        f.write_str(label)
    }
}

/// One gymnast's result on one apparatus
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub gymnast_name: String,
    pub country: String,
    pub apparatus: Apparatus,
    pub d_score: Option<Score>,
    pub e_score: Option<Score>,
    pub penalty: Option<Score>,
    pub total_score: Option<Score>,
    /// Rank in the table the record came from (final rank or all-around rank)
    pub rank: Option<u32>,
    pub bib: Option<u32>,
    pub team: Option<String>,
    pub team_rank: Option<u32>,
    /// Attempt number for apparatus with several routines per final (vault)
    pub attempt: Option<u32>,
    pub apparatus_rank: Option<u32>,
    pub all_around_total: Option<Score>,
    pub score_check: ScoreCheck,
}

impl ScoreRecord {
    /// Create a record with identity set and every score empty
    pub fn new(
        gymnast_name: impl Into<String>,
        country: impl Into<String>,
        apparatus: Apparatus,
    ) -> Self {
        Self {
            gymnast_name: gymnast_name.into(),
            country: country.into(),
            apparatus,
            d_score: None,
            e_score: None,
            penalty: None,
            total_score: None,
            rank: None,
            bib: None,
            team: None,
            team_rank: None,
            attempt: None,
            apparatus_rank: None,
            all_around_total: None,
            score_check: ScoreCheck::Incomplete,
        }
    }

    /// True when D, E and total are all present
    pub fn is_complete(&self) -> bool {
        self.d_score.is_some() && self.e_score.is_some() && self.total_score.is_some()
    }
}

/// Competition format handled by a parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFormat {
    EventFinals,
    TeamAllAround,
    IndividualAllAround,
}

impl ResultFormat {
    pub fn description(&self) -> &'static str {
        match self {
            ResultFormat::EventFinals => "event finals",
            ResultFormat::TeamAllAround => "team all-around",
            ResultFormat::IndividualAllAround => "individual all-around",
        }
    }
}

/// Processing statistics
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub pages_read: usize,
    pub lines_read: usize,
    pub records_written: usize,
    pub records_skipped: usize,
    pub records_incomplete: usize,
    pub records_mismatched: usize,
    pub records_penalised: usize,
    pub aggregates_excluded: usize,
    pub output_path: PathBuf,
    pub processing_time_ms: u128,
}
