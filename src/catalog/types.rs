use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::course::document_id;

/// Response from the class search endpoint. Entries stay untyped so one bad
/// record cannot fail the whole page; see [`RawClass::from_entry`].
#[derive(Deserialize, Debug, Default)]
pub struct ClassListing {
    #[serde(default, deserialize_with = "null_default")]
    pub classes: Vec<Value>,
}

/// One class section as returned by the listing: `{ "CLAS": {..}, "seatInfo": {..} }`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawClass {
    #[serde(rename = "CLAS", default, deserialize_with = "null_default")]
    pub class: ClassInfo,
    #[serde(rename = "seatInfo", default, deserialize_with = "null_default")]
    pub seats: SeatInfo,
}

/// Upstream values arrive as strings, numbers, or null depending on the
/// field and the record, so every scalar goes through a lenient decoder.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ClassInfo {
    #[serde(rename = "CATALOGNBR", default, deserialize_with = "opt_string")]
    pub catalog_number: Option<String>,
    #[serde(rename = "CRSEID", default, deserialize_with = "opt_string")]
    pub course_id: Option<String>,
    #[serde(rename = "STRM", default, deserialize_with = "opt_string")]
    pub term: Option<String>,
    #[serde(rename = "SUBJECT", default, deserialize_with = "opt_string")]
    pub subject: Option<String>,
    #[serde(rename = "CAMPUS", default, deserialize_with = "opt_string")]
    pub campus: Option<String>,
    #[serde(rename = "DAYLIST", default, deserialize_with = "opt_string")]
    pub days: Option<String>,
    #[serde(rename = "STARTTIME", default, deserialize_with = "opt_string")]
    pub start_time: Option<String>,
    #[serde(rename = "ENDTIME", default, deserialize_with = "opt_string")]
    pub end_time: Option<String>,
    #[serde(rename = "STARTDATE", default, deserialize_with = "opt_string")]
    pub start_date: Option<String>,
    #[serde(rename = "ENDDATE", default, deserialize_with = "opt_string")]
    pub end_date: Option<String>,
    #[serde(rename = "UNITSMINIMUM", default, deserialize_with = "int_or_zero")]
    pub units_min: i64,
    #[serde(rename = "UNITSMAXIMUM", default, deserialize_with = "int_or_zero")]
    pub units_max: i64,
    #[serde(rename = "INSTRUCTORSLIST", default, deserialize_with = "names")]
    pub instructors: Option<Vec<String>>,
    #[serde(rename = "INSTRUCTIONMODE", default, deserialize_with = "opt_string")]
    pub instruction_mode: Option<String>,
    #[serde(rename = "FACILITYID", default, deserialize_with = "opt_string")]
    pub facility: Option<String>,
    #[serde(rename = "CLASSSTAT", default, deserialize_with = "opt_string")]
    pub status: Option<String>,
    #[serde(rename = "COMPONENTPRIMARY", default, deserialize_with = "opt_string")]
    pub component: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SeatInfo {
    #[serde(rename = "ENRL_TOT", default, deserialize_with = "int_or_zero")]
    pub enrolled: i64,
    #[serde(rename = "ENRL_CAP", default, deserialize_with = "int_or_zero")]
    pub capacity: i64,
}

/// First element of the course lookup response.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Enrichment {
    #[serde(rename = "COURSETITLELONG", default, deserialize_with = "opt_string")]
    pub title: Option<String>,
    #[serde(rename = "DESCRLONG", default, deserialize_with = "opt_string")]
    pub description: Option<String>,
    #[serde(rename = "SUBJECTDESCR", default, deserialize_with = "opt_string")]
    pub subject_description: Option<String>,
    #[serde(rename = "GRADINGBASISDESCR", default, deserialize_with = "opt_string")]
    pub grading_basis: Option<String>,
    #[serde(rename = "COLLEGEMAP", default)]
    pub colleges: Option<Vec<CollegeEntry>>,
}

impl Enrichment {
    /// College info of the first college mapping, if any.
    pub fn college(&self) -> Option<&CollegeInfo> {
        self.colleges
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.info.as_ref())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CollegeEntry {
    #[serde(rename = "INFO", default)]
    pub info: Option<CollegeInfo>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CollegeInfo {
    #[serde(rename = "DESCRFORMAL", default, deserialize_with = "opt_string")]
    pub formal_name: Option<String>,
    #[serde(rename = "ENROLLREQ", default, deserialize_with = "opt_string")]
    pub enroll_requirement: Option<String>,
}

/// Composite key used for the enrichment lookup and the document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIdentity {
    pub catalog_number: String,
    pub course_id: String,
    pub subject: String,
    pub term: String,
}

impl ClassIdentity {
    pub fn document_id(&self) -> String {
        document_id(&self.catalog_number, &self.term)
    }
}

impl RawClass {
    /// Decode one listing entry.
    pub fn from_entry(entry: &Value) -> Result<Self, serde_json::Error> {
        RawClass::deserialize(entry)
    }

    /// `None` when the record has no catalog number or term.
    pub fn identity(&self) -> Option<ClassIdentity> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Some(ClassIdentity {
            catalog_number: non_empty(&self.class.catalog_number)?,
            term: non_empty(&self.class.term)?,
            course_id: self.class.course_id.clone().unwrap_or_default(),
            subject: self.class.subject.clone().unwrap_or_default(),
        })
    }
}

fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Instructor names; null or non-string entries are dropped.
fn names<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(s)) => Some(vec![s]),
        _ => None,
    })
}

fn int_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    })
}
