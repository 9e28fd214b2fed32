//! Record types for survey responses and stories.
//!
//! Records are immutable once written. A [`SurveyRecord`] keeps the stored
//! strings as-is so that rows edited by hand in the medium still load; the
//! typed [`YesNo`] and [`Organization`] enums only guard the request side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format used for `datetime_submitted` on every record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Length of a formatted submission timestamp.
pub const TIMESTAMP_LEN: usize = 23;

/// Render a submission timestamp, e.g. `2024-01-15 10:30:00 UTC`.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Answer to a yes/no survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    /// Yes.
    Yes,
    /// No.
    No,
}

impl YesNo {
    /// The stored string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    /// Leniently parse a stored answer: surrounding whitespace and case are
    /// ignored, anything other than yes/no yields `None`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("yes") {
            Some(Self::Yes)
        } else if trimmed.eq_ignore_ascii_case("no") {
            Some(Self::No)
        } else {
            None
        }
    }
}

impl std::fmt::Display for YesNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization a survey response is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Organization {
    /// Relief Society.
    #[serde(rename = "relief society")]
    ReliefSociety,
    /// Elders Quorum.
    #[serde(rename = "elders quorum")]
    EldersQuorum,
    /// Young Men.
    #[serde(rename = "young mens")]
    YoungMens,
    /// Young Women.
    #[serde(rename = "young womens")]
    YoungWomens,
}

impl Organization {
    /// All organizations, in display order.
    pub const ALL: [Self; 4] = [
        Self::ReliefSociety,
        Self::EldersQuorum,
        Self::YoungMens,
        Self::YoungWomens,
    ];

    /// The stored string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReliefSociety => "relief society",
            Self::EldersQuorum => "elders quorum",
            Self::YoungMens => "young mens",
            Self::YoungWomens => "young womens",
        }
    }
}

impl std::fmt::Display for Organization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated survey submission, as received from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySubmission {
    /// Did you set a goal?
    pub q_set_goal: YesNo,
    /// Did you make progress this week?
    pub q_made_progress: YesNo,
    /// The responder's organization.
    pub organization: Organization,
}

/// One stored survey response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyRecord {
    /// When the response was submitted (`YYYY-MM-DD HH:MM:SS UTC`).
    pub datetime_submitted: String,
    /// Stored answer to the goal question.
    pub q_set_goal: String,
    /// Stored answer to the progress question.
    pub q_made_progress: String,
    /// Stored organization label.
    pub organization: String,
}

impl SurveyRecord {
    /// Column names, in storage order.
    pub const FIELDS: [&'static str; 4] = [
        "datetime_submitted",
        "q_set_goal",
        "q_made_progress",
        "organization",
    ];

    /// Build a record from a validated submission.
    #[must_use]
    pub fn new(datetime_submitted: String, submission: SurveySubmission) -> Self {
        Self {
            datetime_submitted,
            q_set_goal: submission.q_set_goal.as_str().to_string(),
            q_made_progress: submission.q_made_progress.as_str().to_string(),
            organization: submission.organization.as_str().to_string(),
        }
    }

    /// Build a record from a stored row, or `None` if the row is too short.
    ///
    /// Extra trailing cells are ignored.
    #[must_use]
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Option<Self> {
        match row {
            [ts, goal, progress, org, ..] => Some(Self {
                datetime_submitted: ts.as_ref().to_string(),
                q_set_goal: goal.as_ref().to_string(),
                q_made_progress: progress.as_ref().to_string(),
                organization: org.as_ref().to_string(),
            }),
            _ => None,
        }
    }

    /// The row written to the medium.
    #[must_use]
    pub fn to_row(&self) -> [&str; 4] {
        [
            self.datetime_submitted.as_str(),
            self.q_set_goal.as_str(),
            self.q_made_progress.as_str(),
            self.organization.as_str(),
        ]
    }
}

/// One stored story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRecord {
    /// When the story was submitted (`YYYY-MM-DD HH:MM:SS UTC`).
    pub datetime_submitted: String,
    /// Free-form story text. May be empty.
    pub content: String,
}

impl StoryRecord {
    /// Column names, in storage order.
    pub const FIELDS: [&'static str; 2] = ["datetime_submitted", "content"];

    /// Create a new story record.
    #[must_use]
    pub fn new(datetime_submitted: String, content: String) -> Self {
        Self {
            datetime_submitted,
            content,
        }
    }

    /// Build a record from a stored row, or `None` if the row is too short.
    #[must_use]
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Option<Self> {
        match row {
            [ts, content, ..] => Some(Self::new(
                ts.as_ref().to_string(),
                content.as_ref().to_string(),
            )),
            _ => None,
        }
    }

    /// The row written to the medium.
    #[must_use]
    pub fn to_row(&self) -> [&str; 2] {
        [self.datetime_submitted.as_str(), self.content.as_str()]
    }
}

/// Request body for a new story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryCreate {
    /// The story text.
    pub content: String,
}
