use crate::catalog::types::{Enrichment, RawClass};

use super::{Availability, CourseDocument, CourseLevel};

/// Map a listing record plus its enrichment onto a [`CourseDocument`].
///
/// Returns `None` when enrichment is absent or the record has no identity;
/// such records are never indexed, not even partially.
pub fn normalize(raw: &RawClass, enrichment: Option<&Enrichment>) -> Option<CourseDocument> {
    let identity = raw.identity()?;
    let enrichment = enrichment?;
    let class = &raw.class;
    let college = enrichment.college();

    Some(CourseDocument {
        course_level: CourseLevel::from_catalog_number(&identity.catalog_number),
        course_name: text(&enrichment.title),
        description: text(&enrichment.description),
        department: text(&enrichment.subject_description),
        subject: identity.subject.clone(),
        credits_min: class.units_min,
        credits_max: class.units_max,
        instructors: class.instructors.clone().unwrap_or_default(),
        schedule_days: text(&class.days),
        start_time: text(&class.start_time),
        end_time: text(&class.end_time),
        start_date: date(&class.start_date),
        end_date: date(&class.end_date),
        availability: vec![Availability::new(
            identity.term.clone(),
            raw.seats.enrolled,
            raw.seats.capacity,
        )],
        campus: text(&class.campus),
        academic_group: college.map(|c| text(&c.formal_name)).unwrap_or_default(),
        instruction_mode: text(&class.instruction_mode),
        facility: text(&class.facility),
        prerequisites: college
            .map(|c| text(&c.enroll_requirement))
            .unwrap_or_default(),
        grading_basis: text(&enrichment.grading_basis),
        class_status: text(&class.status),
        component: text(&class.component),
        catalog_number: identity.catalog_number,
    })
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cse507() -> RawClass {
        serde_json::from_value(json!({
            "CLAS": {
                "CATALOGNBR": "CSE507",
                "CRSEID": "104532",
                "STRM": "2247",
                "SUBJECT": "CSE",
                "CAMPUS": "TEMPE",
                "DAYLIST": "MW",
                "STARTTIME": "12:00 PM",
                "ENDTIME": "1:15 PM",
                "STARTDATE": "2024-08-22",
                "ENDDATE": "",
                "UNITSMINIMUM": "3",
                "UNITSMAXIMUM": "3",
                "INSTRUCTORSLIST": ["Jianming Liang"],
                "INSTRUCTIONMODE": "P",
                "FACILITYID": "BYENG210",
                "CLASSSTAT": "A",
                "COMPONENTPRIMARY": "LEC"
            },
            "seatInfo": { "ENRL_TOT": 20, "ENRL_CAP": 30 }
        }))
        .unwrap()
    }

    fn enrichment() -> Enrichment {
        serde_json::from_value(json!({
            "COURSETITLELONG": "Image Processing and Analysis",
            "DESCRLONG": "Digital image fundamentals.",
            "SUBJECTDESCR": "Computer Science and Engineering",
            "GRADINGBASISDESCR": "Standard Grades",
            "COLLEGEMAP": [{ "INFO": {
                "DESCRFORMAL": "Ira A. Fulton Schools of Engineering",
                "ENROLLREQ": "Graduate student"
            }}]
        }))
        .unwrap()
    }

    #[test]
    fn maps_every_field() {
        let doc = normalize(&cse507(), Some(&enrichment())).unwrap();

        assert_eq!(doc.catalog_number, "CSE507");
        assert_eq!(doc.course_name, "Image Processing and Analysis");
        assert_eq!(doc.description, "Digital image fundamentals.");
        assert_eq!(doc.department, "Computer Science and Engineering");
        assert_eq!(doc.subject, "CSE");
        assert_eq!(doc.course_level, CourseLevel::Graduate);
        assert_eq!((doc.credits_min, doc.credits_max), (3, 3));
        assert_eq!(doc.instructors, vec!["Jianming Liang".to_string()]);
        assert_eq!(doc.schedule_days, "MW");
        assert_eq!(doc.start_time, "12:00 PM");
        assert_eq!(doc.end_time, "1:15 PM");
        assert_eq!(doc.start_date.as_deref(), Some("2024-08-22"));
        assert_eq!(doc.end_date, None);
        assert_eq!(doc.campus, "TEMPE");
        assert_eq!(doc.academic_group, "Ira A. Fulton Schools of Engineering");
        assert_eq!(doc.instruction_mode, "P");
        assert_eq!(doc.facility, "BYENG210");
        assert_eq!(doc.prerequisites, "Graduate student");
        assert_eq!(doc.grading_basis, "Standard Grades");
        assert_eq!(doc.class_status, "A");
        assert_eq!(doc.component, "LEC");
    }

    #[test]
    fn cse507_availability_scenario() {
        let doc = normalize(&cse507(), Some(&enrichment())).unwrap();
        assert_eq!(
            doc.availability,
            vec![Availability {
                term: "2247".into(),
                enrolled: 20,
                capacity: 30,
                available: 10,
            }]
        );
    }

    #[test]
    fn absent_enrichment_yields_no_document() {
        assert!(normalize(&cse507(), None).is_none());
    }

    #[test]
    fn record_without_identity_yields_no_document() {
        assert!(normalize(&RawClass::default(), Some(&enrichment())).is_none());
    }

    #[test]
    fn missing_college_map_leaves_fields_empty() {
        let enrichment: Enrichment =
            serde_json::from_value(json!({ "COURSETITLELONG": "Seminar" })).unwrap();
        let doc = normalize(&cse507(), Some(&enrichment)).unwrap();
        assert_eq!(doc.academic_group, "");
        assert_eq!(doc.prerequisites, "");
        assert_eq!(doc.description, "");
    }

    #[test]
    fn empty_dates_are_omitted_from_json() {
        let doc = normalize(&cse507(), Some(&enrichment())).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["start_date"], "2024-08-22");
        assert!(json.get("end_date").is_none());
        assert_eq!(json["course_level"], "graduate");
    }

    #[test]
    fn normalize_is_deterministic() {
        let a = normalize(&cse507(), Some(&enrichment()));
        let b = normalize(&cse507(), Some(&enrichment()));
        assert_eq!(a, b);
    }
}
