//! Field table for the course index.
//!
//! The same table produces the Elasticsearch mapping, the field listing in
//! the translation prompt, and the field whitelist used when validating
//! generated queries.

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Keyword,
    Text,
    Integer,
    Date,
    Nested,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Date => "date",
            FieldType::Nested => "nested",
        }
    }
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldType,
    pub description: &'static str,
    pub properties: &'static [Field],
}

const fn field(name: &'static str, kind: FieldType, description: &'static str) -> Field {
    Field {
        name,
        kind,
        description,
        properties: &[],
    }
}

pub const AVAILABILITY: &str = "availability";

const AVAILABILITY_FIELDS: &[Field] = &[
    field(
        "term",
        FieldType::Keyword,
        "Academic term code: \"2\" + two-digit year + season digit (1 spring, 4 summer, 7 fall). Fall 2024 is \"2247\", Spring 2024 is \"2241\".",
    ),
    field("enrolled", FieldType::Integer, "Number of students enrolled."),
    field("capacity", FieldType::Integer, "Total seat capacity."),
    field(
        "available",
        FieldType::Integer,
        "Seats available (capacity - enrolled).",
    ),
];

pub const COURSE_FIELDS: &[Field] = &[
    field(
        "catalog_number",
        FieldType::Keyword,
        "Catalog number of the course. Example: \"CSE507\".",
    ),
    field(
        "course_name",
        FieldType::Text,
        "Full course title. Example: \"Image Processing and Analysis\".",
    ),
    field("description", FieldType::Text, "Detailed course description."),
    field(
        "department",
        FieldType::Text,
        "Department offering the course. Example: \"Computer Science and Engineering\".",
    ),
    field("subject", FieldType::Keyword, "Subject code. Example: \"CSE\"."),
    field(
        "course_level",
        FieldType::Keyword,
        "Either \"graduate\" or \"undergraduate\".",
    ),
    field(
        "credits_min",
        FieldType::Integer,
        "Minimum credit hours. Example: 3.",
    ),
    field(
        "credits_max",
        FieldType::Integer,
        "Maximum credit hours. Example: 3.",
    ),
    field(
        "instructors",
        FieldType::Text,
        "Instructor names. Example: [\"Jianming Liang\"].",
    ),
    field(
        "schedule_days",
        FieldType::Keyword,
        "Meeting days, e.g. \"M\", \"T\", \"W\", \"Th\", \"F\" or combinations such as \"MW\".",
    ),
    field(
        "start_time",
        FieldType::Keyword,
        "Class start time in 12-hour format. Example: \"12:00 PM\".",
    ),
    field(
        "end_time",
        FieldType::Keyword,
        "Class end time in 12-hour format. Example: \"1:15 PM\".",
    ),
    field(
        "start_date",
        FieldType::Date,
        "First day of class, format \"YYYY-MM-DD\".",
    ),
    field(
        "end_date",
        FieldType::Date,
        "Last day of class, format \"YYYY-MM-DD\".",
    ),
    Field {
        name: AVAILABILITY,
        kind: FieldType::Nested,
        description: "Per-term seat availability. Query with a nested query on path \"availability\".",
        properties: AVAILABILITY_FIELDS,
    },
    field("campus", FieldType::Keyword, "Campus code. Example: \"TEMPE\"."),
    field(
        "academic_group",
        FieldType::Text,
        "College or school offering the course. Example: \"Ira A. Fulton Schools of Engineering\".",
    ),
    field(
        "instruction_mode",
        FieldType::Keyword,
        "Instruction mode code: \"P\" (in person), \"O\" (online), \"HY\" (hybrid), etc.",
    ),
    field(
        "facility",
        FieldType::Text,
        "Building or room where the class meets.",
    ),
    field("prerequisites", FieldType::Text, "Enrollment requirements."),
    field("grading_basis", FieldType::Text, "Grading scheme."),
    field(
        "class_status",
        FieldType::Keyword,
        "Class status code: \"A\" (active), etc.",
    ),
    field(
        "component",
        FieldType::Keyword,
        "Class component: \"LEC\" (lecture), \"LAB\" (laboratory), \"SEM\" (seminar), etc.",
    ),
];

/// Request body for `PUT /{index}`.
pub fn index_mapping() -> Value {
    json!({ "mappings": { "properties": properties(COURSE_FIELDS) } })
}

fn properties(fields: &[Field]) -> Value {
    let mut props = Map::new();
    for f in fields {
        let mut def = json!({ "type": f.kind.as_str() });
        if !f.properties.is_empty() {
            def["properties"] = properties(f.properties);
        }
        props.insert(f.name.to_string(), def);
    }
    Value::Object(props)
}

/// Resolve a dotted field path such as `"campus"` or `"availability.term"`.
pub fn lookup(path: &str) -> Option<&'static Field> {
    let mut fields = COURSE_FIELDS;
    let mut found = None;
    for segment in path.split('.') {
        let f = fields.iter().find(|f| f.name == segment)?;
        fields = f.properties;
        found = Some(f);
    }
    found
}

/// Human-readable field listing embedded in the translation prompt.
pub fn describe() -> String {
    let mut out = String::new();
    for f in COURSE_FIELDS {
        out.push_str(&format!(
            "- {} ({}): {}\n",
            f.name,
            f.kind.as_str(),
            f.description
        ));
        for sub in f.properties {
            out.push_str(&format!(
                "    - {}.{} ({}): {}\n",
                f.name,
                sub.name,
                sub.kind.as_str(),
                sub.description
            ));
        }
    }
    out
}
