use serde::Serialize;
use serde_json::Value;

/// One search hit, flattened for API callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub catalog_number: String,
    pub course_name: String,
    pub description: String,
    pub department: String,
    pub course_level: String,
    /// `"{credits_min}-{credits_max}"`.
    pub credits: String,
    pub schedule_days: String,
    pub start_time: String,
    pub end_time: String,
    pub availability: Vec<Value>,
    pub prerequisites: String,
    pub grading_basis: String,
    pub facility: String,
    pub academic_group: String,
    /// Term of the first availability entry only.
    pub term: String,
}

impl ResultView {
    pub fn from_source(source: &Value) -> Self {
        let availability = match source.get("availability") {
            Some(Value::Array(entries)) => entries.clone(),
            _ => Vec::new(),
        };
        let term = availability
            .first()
            .and_then(|entry| entry.get("term"))
            .and_then(scalar)
            .unwrap_or_else(|| "N/A".to_string());

        Self {
            catalog_number: text_or(source, "catalog_number", ""),
            course_name: text_or(source, "course_name", ""),
            description: text_or(source, "description", ""),
            department: text_or(source, "department", ""),
            course_level: text_or(source, "course_level", ""),
            credits: format!(
                "{}-{}",
                credit(source.get("credits_min")),
                credit(source.get("credits_max"))
            ),
            schedule_days: text_or(source, "schedule_days", ""),
            start_time: text_or(source, "start_time", ""),
            end_time: text_or(source, "end_time", ""),
            availability,
            prerequisites: text_or(source, "prerequisites", "None"),
            grading_basis: text_or(source, "grading_basis", "Standard"),
            facility: text_or(source, "facility", "Not specified"),
            academic_group: text_or(source, "academic_group", "Not specified"),
            term,
        }
    }
}

fn text_or(source: &Value, key: &str, default: &str) -> String {
    source
        .get(key)
        .and_then(scalar)
        .unwrap_or_else(|| default.to_string())
}

/// Strings as-is, numbers and booleans rendered; null, arrays, and objects
/// count as absent.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn credit(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().parse::<f64>().is_ok() => s.trim().to_string(),
        _ => "0".to_string(),
    }
}
