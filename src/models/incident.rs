use serde::{Deserialize, Serialize};

use crate::{SwarmbotError, SwarmbotResult};

/// Marker that identifies tracker issues in free-text input (`OHSS-102`).
pub const DEFAULT_TRACKER_MARKER: &str = "OHSS";

/// Backend an incident lives in. Also identifies the backend in pressure readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncidentSource {
    #[serde(rename = "pagerduty")]
    PagingSystem,
    #[serde(rename = "jira")]
    IssueTracker,
}

impl IncidentSource {
    pub const ALL: [IncidentSource; 2] = [IncidentSource::PagingSystem, IncidentSource::IssueTracker];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSource::PagingSystem => "pagerduty",
            IncidentSource::IssueTracker => "jira",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "pagerduty" | "pd" => Some(IncidentSource::PagingSystem),
            "jira" => Some(IncidentSource::IssueTracker),
            _ => None,
        }
    }
}

impl std::fmt::Display for IncidentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to one incident in one backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentRef {
    pub source: IncidentSource,
    pub id: String,
}

impl IncidentRef {
    pub fn new(source: IncidentSource, id: impl Into<String>) -> Self {
        Self {
            source,
            id: id.into(),
        }
    }

    pub fn paging(id: impl Into<String>) -> Self {
        Self::new(IncidentSource::PagingSystem, id)
    }

    pub fn tracker(id: impl Into<String>) -> Self {
        Self::new(IncidentSource::IssueTracker, id)
    }

    /// Parse slash-command text into a reference.
    ///
    /// Explicit `pagerduty:ID`, `pd:ID` and `jira:KEY` forms are preferred.
    /// Bare text falls back to marker sniffing: anything containing
    /// `tracker_marker` is a tracker issue, everything else is a paging
    /// incident. The fallback is a content heuristic, not a structural parse.
    ///
    /// Ids are limited to ASCII letters, digits, `-` and `_`, since they end
    /// up in backend URL paths.
    pub fn parse(text: &str, tracker_marker: &str) -> SwarmbotResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SwarmbotError::InvalidIncidentRef(String::new()));
        }
        if text.split_whitespace().count() > 1 {
            return Err(SwarmbotError::InvalidIncidentRef(text.to_string()));
        }

        if let Some((prefix, id)) = text.split_once(':') {
            if let Some(source) = IncidentSource::from_prefix(prefix) {
                if !is_valid_id(id) {
                    return Err(SwarmbotError::InvalidIncidentRef(text.to_string()));
                }
                return Ok(Self::new(source, id));
            }
        }

        if !is_valid_id(text) {
            return Err(SwarmbotError::InvalidIncidentRef(text.to_string()));
        }

        if !tracker_marker.is_empty() && text.contains(tracker_marker) {
            Ok(Self::tracker(text))
        } else {
            Ok(Self::paging(text))
        }
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl std::fmt::Display for IncidentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_routes_to_tracker() {
        let incident = IncidentRef::parse("OHSS-102", DEFAULT_TRACKER_MARKER).unwrap();
        assert_eq!(incident, IncidentRef::tracker("OHSS-102"));
    }

    #[test]
    fn test_plain_id_routes_to_paging() {
        let incident = IncidentRef::parse("INC0045", DEFAULT_TRACKER_MARKER).unwrap();
        assert_eq!(incident, IncidentRef::paging("INC0045"));
    }

    #[test]
    fn test_explicit_prefix_wins_over_marker() {
        let incident = IncidentRef::parse("pd:OHSSLIKE1", DEFAULT_TRACKER_MARKER).unwrap();
        assert_eq!(incident.source, IncidentSource::PagingSystem);
        assert_eq!(incident.id, "OHSSLIKE1");

        let incident = IncidentRef::parse("jira:SREP-7", DEFAULT_TRACKER_MARKER).unwrap();
        assert_eq!(incident, IncidentRef::tracker("SREP-7"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let incident = IncidentRef::parse("  Q1W2E3 \n", DEFAULT_TRACKER_MARKER).unwrap();
        assert_eq!(incident.id, "Q1W2E3");
    }

    #[test]
    fn test_empty_and_multi_word_text_rejected() {
        assert!(matches!(
            IncidentRef::parse("   ", DEFAULT_TRACKER_MARKER),
            Err(SwarmbotError::InvalidIncidentRef(_))
        ));
        assert!(IncidentRef::parse("OHSS-1 OHSS-2", DEFAULT_TRACKER_MARKER).is_err());
        assert!(IncidentRef::parse("jira:", DEFAULT_TRACKER_MARKER).is_err());
    }

    #[test]
    fn test_path_characters_rejected() {
        for text in [
            "OHSS-1/../x",
            "jira:a?b",
            "OHSS-1/../../../api/2/user?username=admin#",
            "pd:Q1#frag",
            "OHSS-1%2F..",
            "jira:../OHSS-1",
        ] {
            assert!(
                matches!(
                    IncidentRef::parse(text, DEFAULT_TRACKER_MARKER),
                    Err(SwarmbotError::InvalidIncidentRef(_))
                ),
                "{} should be rejected",
                text
            );
        }
        assert!(IncidentRef::parse("OHSS_7-b", DEFAULT_TRACKER_MARKER).is_ok());
    }

    #[test]
    fn test_source_serialization() {
        let serialized = serde_json::to_string(&IncidentSource::PagingSystem).unwrap();
        assert_eq!(serialized, "\"pagerduty\"");
        let source: IncidentSource = serde_json::from_str("\"jira\"").unwrap();
        assert_eq!(source, IncidentSource::IssueTracker);
    }
}
