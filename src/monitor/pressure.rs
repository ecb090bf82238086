//! Pressure evaluation.
//!
//! Pressure is "hit" for a backend when its open count is strictly greater
//! than its threshold. The overall result is the OR across every backend
//! that has a threshold configured.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clients::Backends;
use crate::config::Settings;
use crate::models::IncidentSource;
use crate::SwarmbotResult;

/// Decide whether any backend is over its threshold.
///
/// A backend with a threshold but no count (its fetch failed) is not hit.
pub fn evaluate(
    counts: &HashMap<IncidentSource, usize>,
    thresholds: &HashMap<IncidentSource, usize>,
) -> bool {
    thresholds.iter().any(|(source, threshold)| {
        counts
            .get(source)
            .is_some_and(|count| is_over_threshold(*count, *threshold))
    })
}

#[inline]
pub fn is_over_threshold(count: usize, threshold: usize) -> bool {
    count > threshold
}

/// One backend's contribution to a pressure check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendReading {
    pub source: IncidentSource,
    pub threshold: usize,
    pub count: Option<usize>,
    pub error: Option<String>,
}

impl BackendReading {
    pub fn is_hit(&self) -> bool {
        self.count
            .is_some_and(|count| is_over_threshold(count, self.threshold))
    }
}

/// Outcome of one poll across all backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressureReport {
    pub readings: Vec<BackendReading>,
    pub hit: bool,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl PressureReport {
    pub fn from_readings(readings: Vec<BackendReading>) -> Self {
        let counts: HashMap<_, _> = readings
            .iter()
            .filter_map(|r| r.count.map(|count| (r.source, count)))
            .collect();
        let thresholds: HashMap<_, _> = readings.iter().map(|r| (r.source, r.threshold)).collect();

        Self {
            hit: evaluate(&counts, &thresholds),
            readings,
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn reading(&self, source: IncidentSource) -> Option<&BackendReading> {
        self.readings.iter().find(|r| r.source == source)
    }

    pub fn errors(&self) -> impl Iterator<Item = &BackendReading> {
        self.readings.iter().filter(|r| r.error.is_some())
    }
}

impl std::fmt::Display for PressureReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for reading in &self.readings {
            match (&reading.count, &reading.error) {
                (Some(count), _) => writeln!(
                    f,
                    "{:<10} {:>3} open (threshold {}){}",
                    reading.source,
                    count,
                    reading.threshold,
                    if reading.is_hit() { "  <-- pressure" } else { "" }
                )?,
                (None, Some(error)) => writeln!(f, "{:<10} unavailable: {}", reading.source, error)?,
                (None, None) => writeln!(f, "{:<10} not checked", reading.source)?,
            }
        }
        write!(f, "pressure hit: {}", self.hit)
    }
}

/// Fetches open counts from every backend and evaluates them
#[derive(Clone)]
pub struct PressureProbe {
    backends: Backends,
    settings: Arc<Settings>,
}

impl PressureProbe {
    pub fn new(backends: Backends, settings: Arc<Settings>) -> Self {
        Self { backends, settings }
    }

    /// Poll both backends. A failing backend is recorded in its reading and
    /// does not stop the other from being read.
    pub async fn check(&self) -> PressureReport {
        let thresholds = self.settings.thresholds();

        let (paging, tracker) = tokio::join!(self.paging_count(), self.tracker_count());

        let readings = [
            (IncidentSource::PagingSystem, paging),
            (IncidentSource::IssueTracker, tracker),
        ]
        .into_iter()
        .map(|(source, result)| {
            let threshold = thresholds.get(&source).copied().unwrap_or(usize::MAX);
            match result {
                Ok(count) => {
                    debug!(%source, count, threshold, "Read open incident count");
                    BackendReading {
                        source,
                        threshold,
                        count: Some(count),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(%source, error = %e, "Failed to check pressure");
                    BackendReading {
                        source,
                        threshold,
                        count: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();

        PressureReport::from_readings(readings)
    }

    async fn paging_count(&self) -> SwarmbotResult<usize> {
        let primary = self.backends.paging.primary_on_call().await?;
        let incidents = self.backends.paging.incidents_for_user(&primary.id).await?;
        Ok(incidents.len())
    }

    async fn tracker_count(&self) -> SwarmbotResult<usize> {
        let issues = self
            .backends
            .tracker
            .search_issues(&self.settings.jira.jql_query)
            .await?;
        Ok(issues.len())
    }
}
