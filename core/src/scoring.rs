use serde::Serialize;

use crate::oracle::AdvisoryVerdict;

const SUSPICIOUS_BASE: u32 = 2;
const MALICIOUS_BASE: u32 = 5;
const PER_CATEGORY: u32 = 1;
const ADVISORY_UNSAFE: u32 = 3;

/// Rule-layer verdict, a pure function of the distinct matched-category
/// count. The bucketing exists to bound advisory-classifier invocation to the
/// ambiguous single-signal case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleVerdict {
    Safe,
    Suspicious,
    Malicious,
}

impl RuleVerdict {
    pub fn from_signal_count(count: usize) -> Self {
        match count {
            0 => Self::Safe,
            1 => Self::Suspicious,
            _ => Self::Malicious,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Suspicious => "SUSPICIOUS",
            Self::Malicious => "MALICIOUS",
        }
    }
}

/// Combine rule verdict, category count, and advisory verdict into the base
/// risk score. Every contribution is additive; the advisory can only raise
/// the score, never lower it. The behavioral contribution is added on top by
/// the orchestrator. Pure and deterministic.
pub fn base_risk(verdict: RuleVerdict, category_count: usize, advisory: AdvisoryVerdict) -> u32 {
    let mut score = match verdict {
        RuleVerdict::Safe => 0,
        RuleVerdict::Suspicious => SUSPICIOUS_BASE,
        RuleVerdict::Malicious => MALICIOUS_BASE,
    };
    score += category_count as u32 * PER_CATEGORY;
    if advisory == AdvisoryVerdict::Unsafe {
        score += ADVISORY_UNSAFE;
    }
    score
}
