use std::fmt;

/// Fixed query parameters for the class listing request.
///
/// Only campus, term, level, online selection, and subject vary; the rest
/// mirror the catalog UI's defaults (no honors or promo sections, all search
/// types, refined results).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    pub campus: String,
    pub term: String,
    pub level: String,
    /// `A` (all), `C` (campus only), or `O` (online only).
    pub campus_or_online: String,
    pub subject: Option<String>,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            campus: "TEMPE".to_string(),
            term: "2247".to_string(),
            level: "grad".to_string(),
            campus_or_online: "A".to_string(),
            subject: None,
        }
    }
}

impl ListingFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("refine", "Y".to_string()),
            ("campusOrOnlineSelection", self.campus_or_online.clone()),
            ("honors", "F".to_string()),
            ("campus", self.campus.clone()),
            ("promod", "F".to_string()),
            ("level", self.level.clone()),
            ("searchType", "all".to_string()),
        ];
        if let Some(subject) = self.subject.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("subject", subject.clone()));
        }
        pairs.push(("term", self.term.clone()));
        pairs
    }
}

impl fmt::Display for ListingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "campus={} term={} level={} online={}",
            self.campus, self.term, self.level, self.campus_or_online
        )?;
        if let Some(subject) = &self.subject {
            write!(f, " subject={subject}")?;
        }
        Ok(())
    }
}
