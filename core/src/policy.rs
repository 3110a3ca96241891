use serde::Serialize;

const MONITOR_THRESHOLD: u32 = 3;
const DECEIVE_THRESHOLD: u32 = 6;
const THROTTLE_THRESHOLD: u32 = 9;

/// Policy action, ordered by ascending risk. Allow and Monitor both forward
/// to the origin; Deceive and Throttle both serve a fake response, Throttle
/// additionally delaying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Monitor,
    Deceive,
    Throttle,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Monitor => "MONITOR",
            Self::Deceive => "DECEIVE",
            Self::Throttle => "THROTTLE",
        }
    }

    /// True for the actions that serve a fake response instead of forwarding.
    pub fn is_deceptive(self) -> bool {
        matches!(self, Self::Deceive | Self::Throttle)
    }
}

/// Map a risk score to a decision over fixed half-open intervals. Total
/// function: every non-negative score maps to exactly one action.
pub fn decide(score: u32) -> Decision {
    if score < MONITOR_THRESHOLD {
        Decision::Allow
    } else if score < DECEIVE_THRESHOLD {
        Decision::Monitor
    } else if score < THROTTLE_THRESHOLD {
        Decision::Deceive
    } else {
        Decision::Throttle
    }
}
