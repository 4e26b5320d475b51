use serde::{Deserialize, Serialize};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

/// Conversion from a selected star value to the cell value that gets
/// stored. The historical deployments disagreed on which conversion is
/// authoritative, so it is an explicit configuration choice rather than a
/// hardcoded rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Stored value is the star value itself.
    #[default]
    Direct,
    /// Star values are rescaled so the largest menu entry stores as 10.
    Proportional,
    /// Star values are hours spent (half-hour granularity up to 8h).
    Hours,
}

impl ScoringPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "proportional" => Some(Self::Proportional),
            "hours" => Some(Self::Hours),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Proportional => "proportional",
            Self::Hours => "hours",
        }
    }

    /// Star values offered on the rating keyboard, ascending, without the
    /// implicit "none" (0) entry the menu always carries.
    pub fn star_menu(self) -> &'static [f64] {
        match self {
            Self::Direct | Self::Proportional => &[1.0, 2.0, 3.0, 4.0, 5.0],
            Self::Hours => &[0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        }
    }

    /// The value written to the table for a selected star count.
    pub fn stored_value(self, stars: f64) -> f64 {
        let converted = match self {
            Self::Direct | Self::Hours => stars,
            Self::Proportional => {
                let max = self
                    .star_menu()
                    .last()
                    .copied()
                    .unwrap_or(SCORE_MAX);
                stars * SCORE_MAX / max
            }
        };
        clamp_score(converted)
    }
}

/// Clamps a score into the closed [0, 10] interval. Idempotent.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(SCORE_MIN, SCORE_MAX)
}

#[cfg(test)]
mod tests {
    use super::{ScoringPolicy, clamp_score};

    #[test]
    fn clamp_is_bounded_and_idempotent() {
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(42.0), 10.0);
        assert_eq!(clamp_score(7.5), 7.5);
        assert_eq!(clamp_score(clamp_score(42.0)), clamp_score(42.0));
    }

    #[test]
    fn direct_stores_the_star_value() {
        assert_eq!(ScoringPolicy::Direct.stored_value(3.0), 3.0);
        assert_eq!(ScoringPolicy::Direct.stored_value(0.0), 0.0);
    }

    #[test]
    fn proportional_maps_full_menu_to_ten() {
        assert_eq!(ScoringPolicy::Proportional.stored_value(5.0), 10.0);
        assert_eq!(ScoringPolicy::Proportional.stored_value(1.0), 2.0);
    }

    #[test]
    fn hours_store_as_is_but_clamped() {
        assert_eq!(ScoringPolicy::Hours.stored_value(0.5), 0.5);
        assert_eq!(ScoringPolicy::Hours.stored_value(8.0), 8.0);
        assert_eq!(ScoringPolicy::Hours.stored_value(12.0), 10.0);
    }

    #[test]
    fn policy_names_round_trip() {
        for policy in [
            ScoringPolicy::Direct,
            ScoringPolicy::Proportional,
            ScoringPolicy::Hours,
        ] {
            assert_eq!(ScoringPolicy::parse(policy.name()), Some(policy));
        }
        assert_eq!(ScoringPolicy::parse("nope"), None);
    }
}
