use crate::rules::{self, Dimension};
use crate::text;
use crate::types::{Grade, WorkItemType, PRELIM_PREFIX};
use crate::work_item::WorkItem;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const RATIONALE_AC_SHORT: &str = "AC too short (<15 words)";
pub const RATIONALE_DESC_SHORT: &str = "Description too short (<10 words)";
pub const RATIONALE_NO_CONTENT: &str = "No Description or AC";
pub const RATIONALE_STANDARD: &str = "Standard scoring";

pub const AC_MIN_WORDS: usize = 15;
pub const DESCRIPTION_MIN_WORDS: usize = 10;
pub const DEFAULT_PRELIM_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub matches: usize,
    pub points: u32,
    pub max_points: u32,
}

/// Full intermediate state of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub description_words: usize,
    pub ac_words: usize,
    pub description_points: u32,
    pub ac_points: u32,
    pub dimensions: Vec<DimensionScore>,
    /// Sum of all contributions before the no-content override.
    pub raw_score: u32,
    /// Final numeric score.
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap: Option<Grade>,
    pub uncapped_grade: Grade,
    pub grade: Grade,
    pub rationale: Vec<String>,
}

// ---------------------------------------------------------------------------
// Critical caps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalCap {
    pub cap: Option<Grade>,
    /// Both fields empty: the score is forced to zero.
    pub zero_score: bool,
    pub rationale: Vec<&'static str>,
}

/// Evaluate the three length checks in order. A short description on an item
/// already capped at C for its AC drops straight to F.
pub fn critical_cap(description_words: usize, ac_words: usize) -> CriticalCap {
    let mut cap = None;
    let mut rationale = Vec::new();
    let mut zero_score = false;

    if ac_words < AC_MIN_WORDS {
        cap = Some(Grade::C);
        rationale.push(RATIONALE_AC_SHORT);
    }
    if description_words < DESCRIPTION_MIN_WORDS {
        cap = Some(if cap == Some(Grade::C) { Grade::F } else { Grade::D });
        rationale.push(RATIONALE_DESC_SHORT);
    }
    if description_words == 0 && ac_words == 0 {
        cap = Some(Grade::F);
        zero_score = true;
        rationale.push(RATIONALE_NO_CONTENT);
    }

    CriticalCap {
        cap,
        zero_score,
        rationale,
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score normalized text. `description` and `acceptance_criteria` must already
/// be passed through [`text::normalize`].
pub fn score_text(title: &str, description: &str, acceptance_criteria: &str) -> ScoreBreakdown {
    let description_words = text::word_count(description);
    let ac_words = text::word_count(acceptance_criteria);

    let description_points = rules::ladder_points(rules::DESCRIPTION_SUBSTANCE, description_words);
    let ac_points = rules::ladder_points(rules::AC_SUBSTANCE, ac_words);

    let combined = format!("{title} {description} {acceptance_criteria}");
    let dimensions: Vec<DimensionScore> = rules::compiled_rules()
        .iter()
        .map(|compiled| {
            let (matches, points) = compiled.points(&combined);
            DimensionScore {
                dimension: compiled.rule.dimension,
                matches,
                points,
                max_points: compiled.rule.max_points,
            }
        })
        .collect();

    let raw_score =
        description_points + ac_points + dimensions.iter().map(|d| d.points).sum::<u32>();

    let critical = critical_cap(description_words, ac_words);
    let score = if critical.zero_score { 0 } else { raw_score };

    let uncapped_grade = Grade::from_score(score);
    let mut rationale: Vec<String> = critical.rationale.iter().map(|r| r.to_string()).collect();
    let grade = match critical.cap {
        Some(cap) if cap < uncapped_grade => {
            rationale.push(format!("Capped at {cap}"));
            cap
        }
        _ => uncapped_grade,
    };
    if rationale.is_empty() {
        rationale.push(RATIONALE_STANDARD.to_string());
    }

    ScoreBreakdown {
        description_words,
        ac_words,
        description_points,
        ac_points,
        dimensions,
        raw_score,
        score,
        cap: critical.cap,
        uncapped_grade,
        grade,
        rationale,
    }
}

/// True when the item starts more than `threshold_days` after `today`.
pub fn is_prelim(start_date: Option<NaiveDate>, today: NaiveDate, threshold_days: i64) -> bool {
    match start_date {
        Some(start) => (start - today).num_days() > threshold_days,
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Per-run result for one work item. Derived, never persisted as state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: u64,
    pub work_item_type: WorkItemType,
    pub title: String,
    pub state: String,
    pub created_by: String,
    pub area_path: String,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    /// Final grade label, "Prelim: "-prefixed when `prelim` is set.
    pub grade: String,
    pub base_grade: Grade,
    pub score: u32,
    pub rationale: String,
    pub prelim: bool,
    pub description_words: usize,
    pub ac_words: usize,
}

/// Applies the scoring rules with an explicit Prelim threshold.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    pub prelim_days: i64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            prelim_days: DEFAULT_PRELIM_DAYS,
        }
    }
}

impl Scorer {
    pub fn new(prelim_days: i64) -> Self {
        Self { prelim_days }
    }

    pub fn breakdown(&self, item: &WorkItem) -> ScoreBreakdown {
        score_text(
            &item.title,
            &item.description_text(),
            &item.acceptance_criteria_text(),
        )
    }

    pub fn assess(&self, item: &WorkItem, today: NaiveDate) -> Assessment {
        let breakdown = self.breakdown(item);
        let prelim = is_prelim(item.start_date, today, self.prelim_days);
        let grade = if prelim {
            format!("{PRELIM_PREFIX}{}", breakdown.grade)
        } else {
            breakdown.grade.to_string()
        };

        Assessment {
            id: item.id,
            work_item_type: item.work_item_type.clone(),
            title: item.title.clone(),
            state: item.state.clone(),
            created_by: item.created_by.clone(),
            area_path: item.area_path.clone(),
            start_date: item.start_date,
            target_date: item.target_date,
            grade,
            base_grade: breakdown.grade,
            score: breakdown.score,
            rationale: breakdown.rationale.join("; "),
            prelim,
            description_words: breakdown.description_words,
            ac_words: breakdown.ac_words,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_item_is_zero_f() {
        let b = score_text("Add export button", "", "");
        assert_eq!(b.score, 0);
        assert_eq!(b.grade, Grade::F);
        assert!(b.rationale.iter().any(|r| r == RATIONALE_NO_CONTENT));
        // Title matches still count toward the raw score
        assert!(b.raw_score > 0);
    }

    #[test]
    fn empty_item_records_every_cap_reason() {
        let b = score_text("", "", "");
        assert_eq!(
            b.rationale,
            vec![RATIONALE_AC_SHORT, RATIONALE_DESC_SHORT, RATIONALE_NO_CONTENT]
        );
        assert_eq!(b.cap, Some(Grade::F));
    }

    #[test]
    fn short_description_with_plain_ac_scores_f() {
        // 9-word description, 20-word AC, no vocabulary anywhere
        let b = score_text("Sample", &words(9), &words(20));
        assert_eq!(b.description_points, 3);
        assert_eq!(b.ac_points, 7);
        assert!(b.dimensions.iter().all(|d| d.points == 0));
        assert_eq!(b.score, 10);
        assert_eq!(b.cap, Some(Grade::D));
        assert_eq!(b.uncapped_grade, Grade::F);
        assert_eq!(b.grade, Grade::F);
        assert_eq!(b.rationale, vec![RATIONALE_DESC_SHORT]);
    }

    #[test]
    fn short_ac_caps_b_to_c() {
        let description = format!(
            "shall must will should can user customer because compliance click select enter {}",
            words(28)
        );
        let b = score_text("Sample", &description, &words(12));
        assert_eq!(b.description_words, 40);
        assert_eq!(b.ac_words, 12);
        assert_eq!(b.description_points, 9);
        assert_eq!(b.ac_points, 4);
        assert_eq!(b.score, 58);
        assert_eq!(b.uncapped_grade, Grade::B);
        assert_eq!(b.grade, Grade::C);
        assert_eq!(b.rationale, vec![RATIONALE_AC_SHORT.to_string(), "Capped at C".to_string()]);
    }

    #[test]
    fn short_ac_and_short_description_caps_at_f() {
        let cap = critical_cap(5, 5);
        assert_eq!(cap.cap, Some(Grade::F));
        assert!(!cap.zero_score);
        assert_eq!(cap.rationale, vec![RATIONALE_AC_SHORT, RATIONALE_DESC_SHORT]);
    }

    #[test]
    fn short_description_alone_caps_at_d() {
        let cap = critical_cap(9, 15);
        assert_eq!(cap.cap, Some(Grade::D));
        assert_eq!(cap.rationale, vec![RATIONALE_DESC_SHORT]);
    }

    #[test]
    fn no_caps_when_long_enough() {
        let cap = critical_cap(10, 15);
        assert_eq!(cap.cap, None);
        assert!(cap.rationale.is_empty());
    }

    #[test]
    fn well_written_story_scores_a() {
        let title = "Inspector can export inspection results";
        let description = "As a field inspector I want to export completed inspections \
            so that the compliance manager can review results because audits require it. \
            The system shall provide an export button on the inspection screen. \
            When the user will click the button the api endpoint should create a file \
            and send it by email. The page must display progress and show the result \
            in the database table for every inspection in the selected period.";
        let ac = "Given an inspection is complete, when the inspector will click export, \
            then the system must create a CSV file. Verify the file contains every field. \
            Confirm the expected outcome is a success message. If the export fails an \
            error is shown with a retry option and the timeout limit is respected. \
            Check that invalid date ranges are rejected with a validation error.";
        let b = score_text(title, &text::normalize(description), &text::normalize(ac));
        assert!(b.description_words >= 50);
        assert!(b.ac_words >= 50);
        assert_eq!(b.score, 100);
        assert_eq!(b.grade, Grade::A);
        assert_eq!(b.rationale, vec![RATIONALE_STANDARD]);
    }

    #[test]
    fn prelim_threshold() {
        let today = date(2026, 1, 1);
        assert!(!is_prelim(None, today, 7));
        assert!(!is_prelim(Some(date(2026, 1, 8)), today, 7));
        assert!(is_prelim(Some(date(2026, 1, 9)), today, 7));
        assert!(!is_prelim(Some(date(2025, 12, 1)), today, 7));
    }

    #[test]
    fn assess_prefixes_prelim_grade() {
        let item = WorkItem {
            id: 42,
            work_item_type: WorkItemType::Feature,
            title: "Later work".to_string(),
            description: String::new(),
            acceptance_criteria: String::new(),
            created_by: "Jane Doe".to_string(),
            state: "New".to_string(),
            area_path: "Proj".to_string(),
            start_date: Some(date(2026, 2, 1)),
            target_date: None,
        };
        let a = Scorer::default().assess(&item, date(2026, 1, 1));
        assert!(a.prelim);
        assert_eq!(a.grade, "Prelim: F");
        assert_eq!(a.base_grade, Grade::F);
        assert_eq!(a.score, 0);
        assert!(a.rationale.contains(RATIONALE_NO_CONTENT));

        let imminent = Scorer::default().assess(&item, date(2026, 1, 28));
        assert!(!imminent.prelim);
        assert_eq!(imminent.grade, "F");
    }

    #[test]
    fn assess_joins_rationale_with_semicolons() {
        let item = WorkItem {
            id: 1,
            work_item_type: WorkItemType::UserStory,
            title: String::new(),
            description: "<p>short</p>".to_string(),
            acceptance_criteria: String::new(),
            created_by: "(Unknown)".to_string(),
            state: String::new(),
            area_path: String::new(),
            start_date: None,
            target_date: None,
        };
        let a = Scorer::default().assess(&item, date(2026, 1, 1));
        assert_eq!(a.rationale, format!("{RATIONALE_AC_SHORT}; {RATIONALE_DESC_SHORT}"));
        assert_eq!(a.description_words, 1);
        assert_eq!(a.ac_words, 0);
    }

    #[test]
    fn custom_prelim_window() {
        let scorer = Scorer::new(30);
        assert_eq!(scorer.prelim_days, 30);
        let today = date(2026, 1, 1);
        assert!(!is_prelim(Some(date(2026, 1, 20)), today, scorer.prelim_days));
    }
}
