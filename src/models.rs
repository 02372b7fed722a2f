use serde::{Deserialize, Serialize};

/// Post-release opinion vote. The set is closed: summaries report a count
/// for every value even when no rows exist.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteValue {
    Bad,
    Average,
    Good,
    Masterpiece,
}

impl VoteValue {
    pub const ALL: [VoteValue; 4] = [
        VoteValue::Bad,
        VoteValue::Average,
        VoteValue::Good,
        VoteValue::Masterpiece,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VoteValue::Bad => "bad",
            VoteValue::Average => "average",
            VoteValue::Good => "good",
            VoteValue::Masterpiece => "masterpiece",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bad" => Some(VoteValue::Bad),
            "average" => Some(VoteValue::Average),
            "good" => Some(VoteValue::Good),
            "masterpiece" => Some(VoteValue::Masterpiece),
            _ => None,
        }
    }
}

/// Pre-release sentiment, only valid while a movie is unreleased.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypeValue {
    Excited,
    NotExcited,
}

impl HypeValue {
    pub fn as_str(self) -> &'static str {
        match self {
            HypeValue::Excited => "excited",
            HypeValue::NotExcited => "not_excited",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "excited" => Some(HypeValue::Excited),
            "not_excited" => Some(HypeValue::NotExcited),
            _ => None,
        }
    }
}

/// Per-value tallies with every vote value always present.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct VoteCounts {
    pub bad: u64,
    pub average: u64,
    pub good: u64,
    pub masterpiece: u64,
}

impl VoteCounts {
    pub fn get(&self, value: VoteValue) -> u64 {
        match value {
            VoteValue::Bad => self.bad,
            VoteValue::Average => self.average,
            VoteValue::Good => self.good,
            VoteValue::Masterpiece => self.masterpiece,
        }
    }

    pub fn set(&mut self, value: VoteValue, count: u64) {
        match value {
            VoteValue::Bad => self.bad = count,
            VoteValue::Average => self.average = count,
            VoteValue::Good => self.good = count,
            VoteValue::Masterpiece => self.masterpiece = count,
        }
    }

    pub fn total(&self) -> u64 {
        self.bad + self.average + self.good + self.masterpiece
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct VotePercents {
    pub bad: u8,
    pub average: u8,
    pub good: u8,
    pub masterpiece: u8,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct VoteSummary {
    pub counts: VoteCounts,
    pub total: u64,
    pub percents: VotePercents,
}

impl VoteSummary {
    /// Percentages are rounded independently, so they need not sum to 100.
    pub fn from_counts(counts: VoteCounts) -> Self {
        let total = counts.total();
        let percents = VotePercents {
            bad: percent(counts.bad, total),
            average: percent(counts.average, total),
            good: percent(counts.good, total),
            masterpiece: percent(counts.masterpiece, total),
        };
        Self { counts, total, percents }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct HypeSummary {
    pub excited: u64,
    pub not_excited: u64,
    pub score: u8,
    pub not_excited_percent: u8,
}

impl HypeSummary {
    /// `not_excited_percent` is the complement of the score rather than an
    /// independently rounded value, so the pair always sums to 100.
    pub fn from_totals(excited: u64, not_excited: u64) -> Self {
        let score = percent(excited, excited + not_excited);
        Self { excited, not_excited, score, not_excited_percent: 100 - score }
    }
}

/// Halves round to even, matching the upstream aggregation (12.5 -> 12).
pub fn percent(part: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round_ties_even() as u8
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Liked,
    Latest,
}

/// Assist modes accepted by the text-rewrite collaborator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    Rewrite,
    Shorten,
    Funny,
    Roast,
    Professional,
    Hype,
    Savage1star,
}

impl RewriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RewriteMode::Rewrite => "rewrite",
            RewriteMode::Shorten => "shorten",
            RewriteMode::Funny => "funny",
            RewriteMode::Roast => "roast",
            RewriteMode::Professional => "professional",
            RewriteMode::Hype => "hype",
            RewriteMode::Savage1star => "savage_1star",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_values_round_trip() {
        for v in VoteValue::ALL {
            assert_eq!(VoteValue::parse(v.as_str()), Some(v));
        }
        assert_eq!(VoteValue::parse("meh"), None);
    }

    #[test]
    fn summary_includes_absent_values() {
        let mut counts = VoteCounts::default();
        counts.set(VoteValue::Bad, 1);
        counts.set(VoteValue::Good, 1);
        assert_eq!(counts.get(VoteValue::Bad), 1);
        assert_eq!(counts.get(VoteValue::Average), 0);

        let summary = VoteSummary::from_counts(counts);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.percents.bad, 50);
        assert_eq!(summary.percents.good, 50);
        assert_eq!(summary.percents.average, 0);
        assert_eq!(summary.percents.masterpiece, 0);
    }

    #[test]
    fn percent_rounds_halves_to_even() {
        assert_eq!(percent(1, 8), 12); // 12.5
        assert_eq!(percent(3, 8), 38); // 37.5
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(0, 7), 0);
        assert_eq!(percent(5, 0), 0);
    }

    #[test]
    fn empty_summary_is_all_zero() {
        let summary = VoteSummary::from_counts(VoteCounts::default());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.percents, VotePercents::default());
    }

    #[test]
    fn hype_pair_always_sums_to_100() {
        let hype = HypeSummary::from_totals(3, 1);
        assert_eq!(hype.score, 75);
        assert_eq!(hype.not_excited_percent, 25);

        // 1/3 rounds to 33; the complement takes the remainder.
        let hype = HypeSummary::from_totals(1, 2);
        assert_eq!(hype.score, 33);
        assert_eq!(hype.not_excited_percent, 67);

        let hype = HypeSummary::from_totals(0, 0);
        assert_eq!(hype.score, 0);
        assert_eq!(hype.not_excited_percent, 100);
    }
}
