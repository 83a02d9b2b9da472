//! Canonical course document: the shape the importer writes and the
//! translator reads back.

pub mod normalize;
pub mod schema;

use serde::{Deserialize, Serialize};

pub use normalize::normalize;

/// Index key for one course offering: `{catalog_number}_{term}`.
pub fn document_id(catalog_number: &str, term: &str) -> String {
    format!("{catalog_number}_{term}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Graduate,
    Undergraduate,
}

impl CourseLevel {
    /// Graduate when the first digit of the catalog number is 4 or 5.
    ///
    /// Subject prefixes are skipped, so `"507"` and `"CSE507"` both map to
    /// [`CourseLevel::Graduate`].
    pub fn from_catalog_number(catalog_number: &str) -> Self {
        match catalog_number.chars().find(char::is_ascii_digit) {
            Some('4' | '5') => CourseLevel::Graduate,
            _ => CourseLevel::Undergraduate,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CourseLevel::Graduate => "graduate",
            CourseLevel::Undergraduate => "undergraduate",
        }
    }
}

/// Seat counts for one term. `available` is `capacity - enrolled` and may be
/// negative when the upstream feed reports over-enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub term: String,
    pub enrolled: i64,
    pub capacity: i64,
    pub available: i64,
}

impl Availability {
    pub fn new(term: impl Into<String>, enrolled: i64, capacity: i64) -> Self {
        Self {
            term: term.into(),
            enrolled,
            capacity,
            available: capacity - enrolled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDocument {
    pub catalog_number: String,
    pub course_name: String,
    pub description: String,
    pub department: String,
    pub subject: String,
    pub course_level: CourseLevel,
    pub credits_min: i64,
    pub credits_max: i64,
    pub instructors: Vec<String>,
    pub schedule_days: String,
    pub start_time: String,
    pub end_time: String,
    /// Omitted when the feed has no date; an empty string would be rejected
    /// by the `date` mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub availability: Vec<Availability>,
    pub campus: String,
    pub academic_group: String,
    pub instruction_mode: String,
    pub facility: String,
    pub prerequisites: String,
    pub grading_basis: String,
    pub class_status: String,
    pub component: String,
}
