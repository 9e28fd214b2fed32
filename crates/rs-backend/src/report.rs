//! Survey report aggregation.
//!
//! A [`SurveyReport`] is recomputed from the full set of stored records on
//! every request. Nothing here is cached or maintained incrementally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{SurveyRecord, YesNo};

/// Report key for the goal question.
pub const Q_SET_GOAL: &str = "q_set_goal";

/// Report key for the progress question.
pub const Q_MADE_PROGRESS: &str = "q_made_progress";

/// Yes/no tallies for one question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCounts {
    /// Number of "yes" answers.
    pub yes: u64,
    /// Number of "no" answers.
    pub no: u64,
}

impl AnswerCounts {
    /// Count one answer.
    pub fn record(&mut self, answer: YesNo) {
        match answer {
            YesNo::Yes => self.yes += 1,
            YesNo::No => self.no += 1,
        }
    }

    /// Total valid answers counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.yes + self.no
    }
}

/// Aggregate statistics over all survey responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyReport {
    /// Number of responses read.
    pub total_responses: u64,
    /// Responses per organization label.
    pub organization_breakdown: BTreeMap<String, u64>,
    /// Answer tallies per question.
    pub question_stats: BTreeMap<String, AnswerCounts>,
    /// Answer tallies per question, then per organization.
    pub question_stats_by_org: BTreeMap<String, BTreeMap<String, AnswerCounts>>,
}

impl SurveyReport {
    /// Answer tallies for a question, if present.
    #[must_use]
    pub fn question(&self, name: &str) -> Option<AnswerCounts> {
        self.question_stats.get(name).copied()
    }

    /// Answer tallies for a question within one organization, if present.
    #[must_use]
    pub fn question_for_org(&self, name: &str, org: &str) -> Option<AnswerCounts> {
        self.question_stats_by_org
            .get(name)
            .and_then(|by_org| by_org.get(org))
            .copied()
    }
}

/// Tabulate survey records into a report.
///
/// Answers are matched case-insensitively after trimming; anything that is not
/// yes/no is skipped for that question but the response still counts toward
/// `total_responses` and its organization. Organization labels are tallied
/// exactly as stored, including ones outside [`crate::record::Organization`].
#[must_use]
pub fn aggregate(records: &[SurveyRecord]) -> SurveyReport {
    let mut report = SurveyReport::default();
    if records.is_empty() {
        return report;
    }

    for question in [Q_SET_GOAL, Q_MADE_PROGRESS] {
        report
            .question_stats
            .insert(question.to_string(), AnswerCounts::default());
        report
            .question_stats_by_org
            .insert(question.to_string(), BTreeMap::new());
    }

    for record in records {
        report.total_responses += 1;
        *report
            .organization_breakdown
            .entry(record.organization.clone())
            .or_insert(0) += 1;

        for (question, raw) in [
            (Q_SET_GOAL, &record.q_set_goal),
            (Q_MADE_PROGRESS, &record.q_made_progress),
        ] {
            let by_org = report
                .question_stats_by_org
                .entry(question.to_string())
                .or_default()
                .entry(record.organization.clone())
                .or_default();

            if let Some(answer) = YesNo::parse_lenient(raw) {
                by_org.record(answer);
                report
                    .question_stats
                    .entry(question.to_string())
                    .or_default()
                    .record(answer);
            }
        }
    }

    report
}
