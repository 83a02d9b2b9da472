//! Typed form of a generated search body.
//!
//! Model output is parsed into [`StructuredQuery`], checked against the
//! course field table, and serialized back with [`StructuredQuery::to_body`].
//! Anything outside the supported subset of the query DSL is rejected rather
//! than forwarded.

use serde_json::{Map, Value};

use crate::course::schema::{self, FieldType};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object for {0}")]
    NotAnObject(&'static str),

    #[error("search body has no \"query\"")]
    MissingQuery,

    #[error("unsupported top-level key \"{0}\"")]
    UnsupportedKey(String),

    #[error("unsupported query clause \"{0}\"")]
    UnsupportedClause(String),

    #[error("a query clause must have exactly one key, found {0}")]
    AmbiguousClause(usize),

    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    #[error("field \"{field}\" must be queried inside a nested \"{path}\" clause")]
    OutsideNestedPath { field: String, path: String },

    #[error("invalid \"{clause}\" clause: {reason}")]
    InvalidClause {
        clause: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredQuery {
    pub query: Clause,
    pub size: Option<u64>,
    pub from: Option<u64>,
    pub sort: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Bool(BoolQuery),
    Term { field: String, value: Value },
    Terms { field: String, values: Vec<Value>, boost: Option<Value> },
    Match { field: String, params: Value },
    MatchPhrase { field: String, params: Value },
    /// Options are kept verbatim; `fields` has already been validated.
    MultiMatch(Map<String, Value>),
    Range { field: String, bounds: Map<String, Value> },
    Exists { field: String },
    MatchAll(Map<String, Value>),
    Nested {
        path: String,
        query: Box<Clause>,
        options: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Clause>,
    pub filter: Vec<Clause>,
    pub should: Vec<Clause>,
    pub must_not: Vec<Clause>,
    pub minimum_should_match: Option<Value>,
    pub boost: Option<Value>,
}

const RANGE_KEYS: &[&str] = &["gt", "gte", "lt", "lte", "format", "boost"];
const NESTED_OPTIONS: &[&str] = &["score_mode", "ignore_unmapped"];

impl StructuredQuery {
    /// Strict JSON parse followed by structural validation.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, QueryError> {
        let body = value.as_object().ok_or(QueryError::NotAnObject("search body"))?;

        let mut query = None;
        let mut size = None;
        let mut from = None;
        let mut sort = None;
        for (key, value) in body {
            match key.as_str() {
                "query" => query = Some(parse_clause(value, None)?),
                "size" => size = Some(non_negative("size", value)?),
                "from" => from = Some(non_negative("from", value)?),
                "sort" => {
                    validate_sort(value)?;
                    sort = Some(value.clone());
                }
                other => return Err(QueryError::UnsupportedKey(other.to_string())),
            }
        }

        Ok(Self {
            query: query.ok_or(QueryError::MissingQuery)?,
            size,
            from,
            sort,
        })
    }

    /// Search body sent to `POST /{index}/_search`.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".into(), self.query.to_value());
        if let Some(size) = self.size {
            body.insert("size".into(), size.into());
        }
        if let Some(from) = self.from {
            body.insert("from".into(), from.into());
        }
        if let Some(sort) = &self.sort {
            body.insert("sort".into(), sort.clone());
        }
        Value::Object(body)
    }
}

impl Clause {
    pub fn to_value(&self) -> Value {
        let (name, inner) = match self {
            Clause::Bool(b) => ("bool", b.to_value()),
            Clause::Term { field, value } => ("term", single(field, value.clone())),
            Clause::Terms {
                field,
                values,
                boost,
            } => {
                let mut m = Map::new();
                m.insert(field.clone(), Value::Array(values.clone()));
                if let Some(boost) = boost {
                    m.insert("boost".into(), boost.clone());
                }
                ("terms", Value::Object(m))
            }
            Clause::Match { field, params } => ("match", single(field, params.clone())),
            Clause::MatchPhrase { field, params } => {
                ("match_phrase", single(field, params.clone()))
            }
            Clause::MultiMatch(options) => ("multi_match", Value::Object(options.clone())),
            Clause::Range { field, bounds } => {
                ("range", single(field, Value::Object(bounds.clone())))
            }
            Clause::Exists { field } => ("exists", single("field", field.clone().into())),
            Clause::MatchAll(options) => ("match_all", Value::Object(options.clone())),
            Clause::Nested {
                path,
                query,
                options,
            } => {
                let mut m = options.clone();
                m.insert("path".into(), path.clone().into());
                m.insert("query".into(), query.to_value());
                ("nested", Value::Object(m))
            }
        };
        single(name, inner)
    }
}

impl BoolQuery {
    fn to_value(&self) -> Value {
        let mut m = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("filter", &self.filter),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                m.insert(
                    key.into(),
                    Value::Array(clauses.iter().map(Clause::to_value).collect()),
                );
            }
        }
        if let Some(msm) = &self.minimum_should_match {
            m.insert("minimum_should_match".into(), msm.clone());
        }
        if let Some(boost) = &self.boost {
            m.insert("boost".into(), boost.clone());
        }
        Value::Object(m)
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut m = Map::new();
    m.insert(key.to_string(), value);
    Value::Object(m)
}

fn non_negative(key: &'static str, value: &Value) -> Result<u64, QueryError> {
    value.as_u64().ok_or_else(|| QueryError::InvalidClause {
        clause: key,
        reason: format!("expected a non-negative integer, got {value}"),
    })
}

/// `scope` is the enclosing nested path, if any.
fn parse_clause(value: &Value, scope: Option<&str>) -> Result<Clause, QueryError> {
    let obj = value.as_object().ok_or(QueryError::NotAnObject("query clause"))?;
    if obj.len() != 1 {
        return Err(QueryError::AmbiguousClause(obj.len()));
    }
    let Some((name, body)) = obj.iter().next() else {
        return Err(QueryError::AmbiguousClause(0));
    };

    match name.as_str() {
        "bool" => parse_bool(body, scope).map(Clause::Bool),
        "term" => {
            let (field, value) = field_entry("term", body)?;
            check_field(&field, scope)?;
            Ok(Clause::Term { field, value })
        }
        "terms" => parse_terms(body, scope),
        "match" => {
            let (field, params) = field_entry("match", body)?;
            check_field(&field, scope)?;
            Ok(Clause::Match { field, params })
        }
        "match_phrase" => {
            let (field, params) = field_entry("match_phrase", body)?;
            check_field(&field, scope)?;
            Ok(Clause::MatchPhrase { field, params })
        }
        "multi_match" => parse_multi_match(body, scope),
        "range" => parse_range(body, scope),
        "exists" => {
            let field = body
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("exists", "expected {\"field\": \"<name>\"}"))?;
            check_field(field, scope)?;
            Ok(Clause::Exists {
                field: field.to_string(),
            })
        }
        "match_all" => {
            let options = body.as_object().ok_or(QueryError::NotAnObject("match_all"))?;
            Ok(Clause::MatchAll(options.clone()))
        }
        "nested" => parse_nested(body, scope),
        other => Err(QueryError::UnsupportedClause(other.to_string())),
    }
}

fn parse_bool(body: &Value, scope: Option<&str>) -> Result<BoolQuery, QueryError> {
    let obj = body.as_object().ok_or(QueryError::NotAnObject("bool"))?;
    let mut out = BoolQuery::default();
    for (key, value) in obj {
        let slot = match key.as_str() {
            "must" => &mut out.must,
            "filter" => &mut out.filter,
            "should" => &mut out.should,
            "must_not" => &mut out.must_not,
            "minimum_should_match" => {
                out.minimum_should_match = Some(value.clone());
                continue;
            }
            "boost" => {
                out.boost = Some(value.clone());
                continue;
            }
            other => return Err(invalid("bool", format!("unknown key \"{other}\""))),
        };
        match value {
            Value::Array(items) => {
                for item in items {
                    slot.push(parse_clause(item, scope)?);
                }
            }
            single => slot.push(parse_clause(single, scope)?),
        }
    }
    Ok(out)
}

fn parse_terms(body: &Value, scope: Option<&str>) -> Result<Clause, QueryError> {
    let obj = body.as_object().ok_or(QueryError::NotAnObject("terms"))?;
    let boost = obj.get("boost").cloned();
    let mut fields = obj.iter().filter(|(k, _)| k.as_str() != "boost");
    let (Some((field, values)), None) = (fields.next(), fields.next()) else {
        return Err(invalid("terms", "expected exactly one field"));
    };
    let values = values
        .as_array()
        .ok_or_else(|| invalid("terms", format!("values for \"{field}\" must be a list")))?;
    check_field(field, scope)?;
    Ok(Clause::Terms {
        field: field.clone(),
        values: values.clone(),
        boost,
    })
}

fn parse_multi_match(body: &Value, scope: Option<&str>) -> Result<Clause, QueryError> {
    let obj = body.as_object().ok_or(QueryError::NotAnObject("multi_match"))?;
    if !obj.contains_key("query") {
        return Err(invalid("multi_match", "missing \"query\""));
    }
    if let Some(fields) = obj.get("fields") {
        let fields = fields
            .as_array()
            .ok_or_else(|| invalid("multi_match", "\"fields\" must be a list"))?;
        for f in fields {
            let name = f
                .as_str()
                .ok_or_else(|| invalid("multi_match", "field names must be strings"))?;
            // "course_name^2" boosts course_name.
            let base = name.split_once('^').map_or(name, |(base, _)| base);
            check_field(base, scope)?;
        }
    }
    Ok(Clause::MultiMatch(obj.clone()))
}

fn parse_range(body: &Value, scope: Option<&str>) -> Result<Clause, QueryError> {
    let (field, bounds) = field_entry("range", body)?;
    check_field(&field, scope)?;
    let bounds = bounds
        .as_object()
        .ok_or_else(|| invalid("range", format!("bounds for \"{field}\" must be an object")))?;
    if let Some(key) = bounds.keys().find(|k| !RANGE_KEYS.contains(&k.as_str())) {
        return Err(invalid("range", format!("unknown bound \"{key}\"")));
    }
    if !bounds.keys().any(|k| matches!(k.as_str(), "gt" | "gte" | "lt" | "lte")) {
        return Err(invalid("range", "no bound given"));
    }
    Ok(Clause::Range {
        field,
        bounds: bounds.clone(),
    })
}

fn parse_nested(body: &Value, scope: Option<&str>) -> Result<Clause, QueryError> {
    let obj = body.as_object().ok_or(QueryError::NotAnObject("nested"))?;
    if let Some(outer) = scope {
        return Err(invalid("nested", format!("already inside nested \"{outer}\"")));
    }
    let path = obj
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("nested", "missing \"path\""))?;
    match schema::lookup(path) {
        Some(f) if f.kind == FieldType::Nested => {}
        Some(_) => return Err(invalid("nested", format!("\"{path}\" is not a nested field"))),
        None => return Err(QueryError::UnknownField(path.to_string())),
    }
    let inner = obj
        .get("query")
        .ok_or_else(|| invalid("nested", "missing \"query\""))?;
    let query = parse_clause(inner, Some(path))?;

    let mut options = Map::new();
    for (key, value) in obj {
        match key.as_str() {
            "path" | "query" => {}
            k if NESTED_OPTIONS.contains(&k) => {
                options.insert(key.clone(), value.clone());
            }
            other => return Err(invalid("nested", format!("unknown key \"{other}\""))),
        }
    }

    Ok(Clause::Nested {
        path: path.to_string(),
        query: Box::new(query),
        options,
    })
}

/// Leaf clauses of the form `{"<field>": <params>}`.
fn field_entry(clause: &'static str, body: &Value) -> Result<(String, Value), QueryError> {
    let obj = body.as_object().ok_or(QueryError::NotAnObject(clause))?;
    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some((field, params)), None) => Ok((field.clone(), params.clone())),
        _ => Err(invalid(clause, "expected exactly one field")),
    }
}

/// Top-level fields are legal outside nested clauses; `path.sub` fields only
/// inside a nested clause on `path`.
fn check_field(name: &str, scope: Option<&str>) -> Result<(), QueryError> {
    let field = schema::lookup(name).ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
    let parent = name.split_once('.').map(|(parent, _)| parent);

    match (parent, scope) {
        (Some(parent), Some(path)) if parent == path => Ok(()),
        (Some(parent), _) => Err(QueryError::OutsideNestedPath {
            field: name.to_string(),
            path: parent.to_string(),
        }),
        (None, Some(path)) => Err(invalid(
            "nested",
            format!("field \"{name}\" is not under path \"{path}\""),
        )),
        (None, None) if field.kind == FieldType::Nested => Err(QueryError::OutsideNestedPath {
            field: name.to_string(),
            path: name.to_string(),
        }),
        (None, None) => Ok(()),
    }
}

fn validate_sort(value: &Value) -> Result<(), QueryError> {
    match value {
        Value::Array(items) => items.iter().try_for_each(validate_sort),
        Value::String(name) => sort_field(name),
        Value::Object(obj) => obj.keys().try_for_each(|name| sort_field(name)),
        other => Err(invalid("sort", format!("unexpected value {other}"))),
    }
}

fn sort_field(name: &str) -> Result<(), QueryError> {
    if matches!(name, "_score" | "_doc") {
        return Ok(());
    }
    match schema::lookup(name) {
        Some(f) if f.kind != FieldType::Nested => Ok(()),
        Some(_) => Err(invalid("sort", format!("cannot sort on \"{name}\""))),
        None => Err(QueryError::UnknownField(name.to_string())),
    }
}

fn invalid(clause: &'static str, reason: impl Into<String>) -> QueryError {
    QueryError::InvalidClause {
        clause,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bool_with_nested_availability() {
        let raw = r#"{
            "query": {
                "bool": {
                    "must": [
                        { "term": { "course_level": "graduate" } },
                        { "match": { "department": "Computer Science" } }
                    ],
                    "filter": {
                        "nested": {
                            "path": "availability",
                            "query": { "range": { "availability.available": { "gt": 0 } } }
                        }
                    }
                }
            },
            "size": 20
        }"#;
        let q = StructuredQuery::parse(raw).unwrap();
        assert_eq!(q.size, Some(20));
        let Clause::Bool(b) = &q.query else {
            panic!("expected bool, got {:?}", q.query);
        };
        assert_eq!(b.must.len(), 2);
        assert!(matches!(&b.filter[0], Clause::Nested { path, .. } if path == "availability"));
    }

    #[test]
    fn to_body_normalizes_single_clauses_to_lists() {
        let q = StructuredQuery::parse(
            r#"{"query":{"bool":{"must":{"term":{"subject":"CSE"}}}}}"#,
        )
        .unwrap();
        assert_eq!(
            q.to_body(),
            json!({ "query": { "bool": { "must": [ { "term": { "subject": "CSE" } } ] } } })
        );
    }

    #[test]
    fn to_body_keeps_leaf_parameters() {
        let input = json!({
            "query": {
                "bool": {
                    "must": [
                        { "match": { "description": { "query": "image analysis", "operator": "and" } } },
                        { "terms": { "schedule_days": ["MW", "TTh"], "boost": 2 } },
                        { "range": { "start_date": { "gte": "2024-08-01", "format": "yyyy-MM-dd" } } },
                        { "exists": { "field": "prerequisites" } }
                    ],
                    "should": [ { "match_phrase": { "course_name": "machine learning" } } ],
                    "minimum_should_match": 1
                }
            },
            "from": 10,
            "sort": [ { "credits_max": "desc" }, "_score" ]
        });
        let q = StructuredQuery::from_value(&input).unwrap();
        assert_eq!(q.to_body(), input);
    }

    #[test]
    fn non_json_is_a_parse_error() {
        let err = StructuredQuery::parse("Here is your query: {}").unwrap_err();
        assert!(matches!(err, QueryError::Json(_)));
    }

    #[test]
    fn fenced_output_is_not_repaired() {
        let err = StructuredQuery::parse("```json\n{\"query\":{\"match_all\":{}}}\n```").unwrap_err();
        assert!(matches!(err, QueryError::Json(_)));
    }

    #[test]
    fn missing_query_is_rejected() {
        assert!(matches!(
            StructuredQuery::parse(r#"{"size": 5}"#),
            Err(QueryError::MissingQuery)
        ));
    }

    #[test]
    fn aggregations_are_rejected() {
        let err = StructuredQuery::parse(
            r#"{"query":{"match_all":{}},"aggs":{"by_subject":{"terms":{"field":"subject"}}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedKey(k) if k == "aggs"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = StructuredQuery::parse(r#"{"query":{"term":{"subject.keyword":"CSE"}}}"#)
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownField(f) if f == "subject.keyword"));

        let err = StructuredQuery::parse(r#"{"query":{"match":{"title":"databases"}}}"#)
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownField(f) if f == "title"));
    }

    #[test]
    fn nested_sub_field_outside_nested_clause_is_rejected() {
        let err = StructuredQuery::parse(r#"{"query":{"term":{"availability.term":"2247"}}}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::OutsideNestedPath { ref field, ref path }
                if field == "availability.term" && path == "availability"
        ));
    }

    #[test]
    fn top_level_field_inside_nested_clause_is_rejected() {
        let raw = r#"{"query":{"nested":{"path":"availability","query":{"term":{"campus":"TEMPE"}}}}}"#;
        assert!(matches!(
            StructuredQuery::parse(raw),
            Err(QueryError::InvalidClause { clause: "nested", .. })
        ));
    }

    #[test]
    fn nested_path_must_be_a_nested_field() {
        let raw = r#"{"query":{"nested":{"path":"campus","query":{"match_all":{}}}}}"#;
        assert!(matches!(
            StructuredQuery::parse(raw),
            Err(QueryError::InvalidClause { clause: "nested", .. })
        ));
    }

    #[test]
    fn multi_match_accepts_boosted_fields() {
        let raw = r#"{"query":{"multi_match":{"query":"robotics","fields":["course_name^2","description"]}}}"#;
        let q = StructuredQuery::parse(raw).unwrap();
        assert!(matches!(q.query, Clause::MultiMatch(_)));

        let raw = r#"{"query":{"multi_match":{"query":"robotics","fields":["summary^2"]}}}"#;
        assert!(matches!(
            StructuredQuery::parse(raw),
            Err(QueryError::UnknownField(f)) if f == "summary"
        ));
    }

    #[test]
    fn range_requires_a_bound() {
        let raw = r#"{"query":{"range":{"credits_min":{"format":"x"}}}}"#;
        assert!(matches!(
            StructuredQuery::parse(raw),
            Err(QueryError::InvalidClause { clause: "range", .. })
        ));
    }

    #[test]
    fn clause_with_two_keys_is_rejected() {
        let raw = r#"{"query":{"term":{"subject":"CSE"},"match":{"course_name":"ai"}}}"#;
        assert!(matches!(
            StructuredQuery::parse(raw),
            Err(QueryError::AmbiguousClause(2))
        ));
    }

    #[test]
    fn unsupported_clause_is_rejected() {
        let raw = r#"{"query":{"script":{"script":"doc['credits_min'].value > 3"}}}"#;
        assert!(matches!(
            StructuredQuery::parse(raw),
            Err(QueryError::UnsupportedClause(c)) if c == "script"
        ));
    }

    #[test]
    fn negative_size_is_rejected() {
        let raw = r#"{"query":{"match_all":{}},"size":-1}"#;
        assert!(matches!(
            StructuredQuery::parse(raw),
            Err(QueryError::InvalidClause { clause: "size", .. })
        ));
    }
}
