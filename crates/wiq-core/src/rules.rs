use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Dimension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    What,
    Who,
    Why,
    How,
    Done,
    Edge,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::What => "what",
            Dimension::Who => "who",
            Dimension::Why => "why",
            Dimension::How => "how",
            Dimension::Done => "done",
            Dimension::Edge => "edge",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::What => "WHAT (actions)",
            Dimension::Who => "WHO (actors)",
            Dimension::Why => "WHY (business context)",
            Dimension::How => "HOW (implementation detail)",
            Dimension::Done => "DONE (testability)",
            Dimension::Edge => "EDGE (exception handling)",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ladder
// ---------------------------------------------------------------------------

/// `(minimum count, points)` steps, highest threshold first.
pub type Ladder = &'static [(usize, u32)];

/// Points for `count` on a ladder: the first step whose threshold is met.
pub fn ladder_points(ladder: Ladder, count: usize) -> u32 {
    ladder
        .iter()
        .find(|(threshold, _)| count >= *threshold)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

pub const DESCRIPTION_SUBSTANCE: Ladder = &[(50, 12), (30, 9), (15, 6), (5, 3)];
pub const AC_SUBSTANCE: Ladder = &[(50, 13), (30, 10), (15, 7), (5, 4)];

// ---------------------------------------------------------------------------
// DimensionRule
// ---------------------------------------------------------------------------

/// One qualitative dimension: a vocabulary whose whole-word occurrences are
/// counted, and the ladder turning that count into points.
pub struct DimensionRule {
    pub dimension: Dimension,
    pub max_points: u32,
    pub vocabulary: &'static [&'static str],
    pub ladder: Ladder,
}

pub const DIMENSION_RULES: &[DimensionRule] = &[
    DimensionRule {
        dimension: Dimension::What,
        max_points: 15,
        vocabulary: &[
            "shall", "must", "will", "should", "can", "allow", "enable", "provide", "display",
            "show", "create", "update", "delete", "send", "receive", "process", "validate",
            "calculate",
        ],
        ladder: &[(5, 15), (3, 10), (1, 5)],
    },
    DimensionRule {
        dimension: Dimension::Who,
        max_points: 10,
        vocabulary: &[
            "user",
            "admin",
            "administrator",
            "system",
            "customer",
            "inspector",
            "manager",
            "operator",
            "technician",
            "as a",
        ],
        ladder: &[(2, 10), (1, 5)],
    },
    DimensionRule {
        dimension: Dimension::Why,
        max_points: 10,
        vocabulary: &[
            "so that",
            "in order to",
            "because",
            "to enable",
            "to allow",
            "to ensure",
            "to support",
            "requirement",
            "compliance",
            "business",
        ],
        ladder: &[(2, 10), (1, 5)],
    },
    DimensionRule {
        dimension: Dimension::How,
        max_points: 20,
        vocabulary: &[
            "when", "if", "then", "click", "select", "enter", "navigate", "button", "field",
            "screen", "page", "form", "api", "endpoint", "database", "table",
        ],
        ladder: &[(8, 20), (5, 15), (3, 10), (1, 5)],
    },
    DimensionRule {
        dimension: Dimension::Done,
        max_points: 15,
        vocabulary: &[
            "verify", "confirm", "check", "test", "ensure", "validate", "expected", "result",
            "outcome", "success", "fail", "error", "given", "when", "then",
        ],
        ladder: &[(5, 15), (3, 10), (1, 5)],
    },
    DimensionRule {
        dimension: Dimension::Edge,
        max_points: 5,
        vocabulary: &[
            "error",
            "exception",
            "invalid",
            "fail",
            "edge case",
            "boundary",
            "limit",
            "maximum",
            "minimum",
            "timeout",
            "retry",
        ],
        ladder: &[(2, 5), (1, 3)],
    },
];

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A dimension rule with its vocabulary compiled into one case-insensitive,
/// whole-word alternation.
pub struct CompiledRule {
    pub rule: &'static DimensionRule,
    pattern: Regex,
}

impl CompiledRule {
    fn compile(rule: &'static DimensionRule) -> Self {
        let alternatives: Vec<String> = rule
            .vocabulary
            .iter()
            .map(|term| {
                term.split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .collect();
        let source = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
        let pattern = Regex::new(&source).expect("vocabulary terms are escaped");
        Self { rule, pattern }
    }

    /// Every non-overlapping occurrence counts, repeats included.
    pub fn count_matches(&self, text: &str) -> usize {
        self.pattern.find_iter(text).count()
    }

    pub fn points(&self, text: &str) -> (usize, u32) {
        let count = self.count_matches(text);
        (count, ladder_points(self.rule.ladder, count))
    }
}

static COMPILED: OnceLock<Vec<CompiledRule>> = OnceLock::new();

pub fn compiled_rules() -> &'static [CompiledRule] {
    COMPILED.get_or_init(|| DIMENSION_RULES.iter().map(CompiledRule::compile).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(dimension: Dimension) -> &'static CompiledRule {
        compiled_rules()
            .iter()
            .find(|r| r.rule.dimension == dimension)
            .unwrap()
    }

    #[test]
    fn qualitative_max_is_75() {
        let total: u32 = DIMENSION_RULES.iter().map(|r| r.max_points).sum();
        assert_eq!(total, 75);
        for r in DIMENSION_RULES {
            assert_eq!(r.ladder[0].1, r.max_points, "{}", r.dimension);
        }
    }

    #[test]
    fn quantitative_max_is_25() {
        assert_eq!(DESCRIPTION_SUBSTANCE[0].1 + AC_SUBSTANCE[0].1, 25);
    }

    #[test]
    fn description_substance_steps() {
        let cases = [
            (0, 0),
            (4, 0),
            (5, 3),
            (14, 3),
            (15, 6),
            (29, 6),
            (30, 9),
            (49, 9),
            (50, 12),
            (500, 12),
        ];
        for (words, points) in cases {
            assert_eq!(ladder_points(DESCRIPTION_SUBSTANCE, words), points, "{words} words");
        }
    }

    #[test]
    fn ac_substance_steps() {
        let cases = [(0, 0), (4, 0), (5, 4), (15, 7), (30, 10), (50, 13)];
        for (words, points) in cases {
            assert_eq!(ladder_points(AC_SUBSTANCE, words), points, "{words} words");
        }
    }

    #[test]
    fn matching_is_whole_word() {
        let what = rule(Dimension::What);
        // "canvas", "showcase" and "updated" must not count
        assert_eq!(what.count_matches("canvas showcase updated"), 0);
        assert_eq!(what.count_matches("can show update"), 3);
    }

    #[test]
    fn matching_is_case_insensitive_and_counts_repeats() {
        let what = rule(Dimension::What);
        assert_eq!(what.count_matches("MUST must Must"), 3);
    }

    #[test]
    fn multi_word_terms() {
        let who = rule(Dimension::Who);
        assert_eq!(who.count_matches("As a planner"), 1);
        let why = rule(Dimension::Why);
        assert_eq!(why.count_matches("so  that we can, in order to comply"), 2);
        let edge = rule(Dimension::Edge);
        assert_eq!(edge.count_matches("an edge case and an edge"), 1);
    }

    #[test]
    fn points_follow_ladder() {
        let how = rule(Dimension::How);
        assert_eq!(how.points("nothing relevant"), (0, 0));
        assert_eq!(how.points("click"), (1, 5));
        assert_eq!(how.points("click select enter"), (3, 10));
        assert_eq!(how.points("click select enter button field"), (5, 15));
        assert_eq!(
            how.points("click select enter button field screen page form"),
            (8, 20)
        );
    }

    #[test]
    fn edge_ladder() {
        let edge = rule(Dimension::Edge);
        assert_eq!(edge.points("timeout"), (1, 3));
        assert_eq!(edge.points("timeout and retry"), (2, 5));
    }
}
