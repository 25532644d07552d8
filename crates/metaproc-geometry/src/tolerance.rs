/// Result of comparing a counted polycount against the declared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceCheck {
    /// Counted polygons do not exceed the declared count.
    Exact,
    /// Some excess, but no more than the allowed fraction.
    WithinTolerance { diff: u64 },
    Exceeded { diff: u64 },
}

impl ToleranceCheck {
    pub fn is_exceeded(&self) -> bool {
        matches!(self, ToleranceCheck::Exceeded { .. })
    }
}

/// Compare `counted` against `declared` with `error_bp` basis points of slack.
///
/// Only excess is penalised: a model with fewer polygons than declared is
/// always accepted. The allowed excess is `declared * error_bp / 10000`,
/// kept fractional so that two decimal places of percent are honoured.
pub fn check_tolerance(declared: u64, counted: u64, error_bp: u32) -> ToleranceCheck {
    let diff = counted.saturating_sub(declared);
    if diff == 0 {
        return ToleranceCheck::Exact;
    }

    let max_diff = declared as f64 * f64::from(error_bp) / 10_000.0;
    if diff as f64 > max_diff {
        ToleranceCheck::Exceeded { diff }
    } else {
        ToleranceCheck::WithinTolerance { diff }
    }
}
