//! Google Calendar API v3 operation wrappers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::token_cache::TokenCache;
use super::{execute, ConnectorError, ResourceFamily};

const CALENDAR_BASE: &str = "https://www.googleapis.com/calendar/v3/calendars/primary";
const DEFAULT_MAX_RESULTS: u32 = 50;

/// Time zone sent with timed events when the caller doesn't specify one.
pub const DEFAULT_TIME_ZONE: &str = "America/Phoenix";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<EventRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRaw {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventDateTime>,
    end: Option<EventDateTime>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl EventDateTime {
    fn display(&self) -> String {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    html_link: Option<String>,
}

// ============================================================================
// Public shapes
// ============================================================================

/// Input for event creation. `start`/`end` are RFC 3339 datetimes for
/// timed events, or `YYYY-MM-DD` dates when `all_day` is set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHandle {
    pub success: bool,
    pub event_id: String,
    pub html_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    pub events: Vec<EventSummary>,
    pub total_count: usize,
}

// ============================================================================
// Client
// ============================================================================

/// Handle bound to Calendar API v3 for the primary calendar.
pub struct CalendarClient {
    http: reqwest::Client,
    access_token: String,
}

impl CalendarClient {
    /// Client factory: token cache first, then a handle for the calendar
    /// family.
    pub async fn connect(cache: &TokenCache) -> Result<Self, ConnectorError> {
        let access_token = cache.get_access_token(ResourceFamily::Calendar).await?;
        Ok(Self {
            http: reqwest::Client::new(),
            access_token,
        })
    }

    /// Insert an event. Not idempotent: re-invoking creates a duplicate.
    pub async fn create_event(&self, input: &EventInput) -> Result<EventHandle, ConnectorError> {
        let request = self
            .http
            .post(format!("{}/events", CALENDAR_BASE))
            .bearer_auth(&self.access_token)
            .json(&event_payload(input));
        let resp = execute("calendar create_event", request).await?;
        let inserted: InsertResponse = resp.json().await?;
        log::info!("created event {} ({})", input.summary, inserted.id);

        Ok(EventHandle {
            success: true,
            event_id: inserted.id,
            html_link: inserted.html_link,
        })
    }

    /// List upcoming events in chronological order. `time_min` defaults
    /// to now.
    pub async fn list_events(
        &self,
        max_results: Option<u32>,
        time_min: Option<DateTime<Utc>>,
    ) -> Result<EventList, ConnectorError> {
        let max_results = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let time_min = time_min.unwrap_or_else(Utc::now);

        let request = self
            .http
            .get(format!("{}/events", CALENDAR_BASE))
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", max_results.to_string()),
            ]);
        let resp = execute("calendar list_events", request).await?;
        let list: EventListResponse = resp.json().await?;
        Ok(summarize_events(list))
    }
}

// ============================================================================
// Mapping helpers
// ============================================================================

/// Build the insert payload: `date` fields for all-day events, `dateTime`
/// plus an explicit time zone otherwise.
fn event_payload(input: &EventInput) -> serde_json::Value {
    let mut payload = if input.all_day {
        json!({
            "summary": input.summary,
            "start": { "date": input.start },
            "end": { "date": input.end },
        })
    } else {
        let tz = input.time_zone.as_deref().unwrap_or(DEFAULT_TIME_ZONE);
        json!({
            "summary": input.summary,
            "start": { "dateTime": input.start, "timeZone": tz },
            "end": { "dateTime": input.end, "timeZone": tz },
        })
    };
    if let Some(description) = &input.description {
        payload["description"] = json!(description);
    }
    payload
}

fn summarize_events(list: EventListResponse) -> EventList {
    let events: Vec<EventSummary> = list
        .items
        .into_iter()
        .map(|item| EventSummary {
            id: item.id,
            summary: item.summary.unwrap_or_else(|| "(No title)".to_string()),
            start: item.start.as_ref().map(EventDateTime::display).unwrap_or_default(),
            end: item.end.as_ref().map(EventDateTime::display).unwrap_or_default(),
            location: item.location,
        })
        .collect();
    let total_count = events.len();
    EventList {
        events,
        total_count,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_event_payload_uses_default_time_zone() {
        let input = EventInput {
            summary: "Sync with Jane".to_string(),
            description: None,
            start: "2026-08-06T10:00:00-07:00".to_string(),
            end: "2026-08-06T10:30:00-07:00".to_string(),
            time_zone: None,
            all_day: false,
        };
        let payload = event_payload(&input);
        assert_eq!(payload["start"]["dateTime"], "2026-08-06T10:00:00-07:00");
        assert_eq!(payload["start"]["timeZone"], "America/Phoenix");
        assert_eq!(payload["end"]["timeZone"], "America/Phoenix");
        assert!(payload.get("description").is_none());
    }

    #[test]
    fn test_timed_event_payload_honors_explicit_time_zone() {
        let input = EventInput {
            summary: "Standup".to_string(),
            description: Some("Daily".to_string()),
            start: "2026-08-06T09:00:00-04:00".to_string(),
            end: "2026-08-06T09:15:00-04:00".to_string(),
            time_zone: Some("America/New_York".to_string()),
            all_day: false,
        };
        let payload = event_payload(&input);
        assert_eq!(payload["start"]["timeZone"], "America/New_York");
        assert_eq!(payload["description"], "Daily");
    }

    #[test]
    fn test_all_day_event_payload_uses_date_fields() {
        let input = EventInput {
            summary: "Offsite".to_string(),
            description: None,
            start: "2026-08-10".to_string(),
            end: "2026-08-11".to_string(),
            time_zone: None,
            all_day: true,
        };
        let payload = event_payload(&input);
        assert_eq!(payload["start"]["date"], "2026-08-10");
        assert_eq!(payload["end"]["date"], "2026-08-11");
        assert!(payload["start"].get("dateTime").is_none());
        assert!(payload["start"].get("timeZone").is_none());
    }

    #[test]
    fn test_summarize_events_maps_timed_and_all_day() {
        let list: EventListResponse = serde_json::from_str(
            r#"{"items": [
                {
                    "id": "e1",
                    "summary": "Standup",
                    "start": {"dateTime": "2026-08-06T09:00:00-07:00"},
                    "end": {"dateTime": "2026-08-06T09:15:00-07:00"},
                    "location": "Meet"
                },
                {
                    "id": "e2",
                    "start": {"date": "2026-08-10"},
                    "end": {"date": "2026-08-11"}
                }
            ]}"#,
        )
        .unwrap();
        let summary = summarize_events(list);
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.events[0].start, "2026-08-06T09:00:00-07:00");
        assert_eq!(summary.events[0].location.as_deref(), Some("Meet"));
        assert_eq!(summary.events[1].summary, "(No title)");
        assert_eq!(summary.events[1].start, "2026-08-10");
    }

    #[test]
    fn test_summarize_events_empty() {
        let list: EventListResponse = serde_json::from_str(r#"{}"#).unwrap();
        let summary = summarize_events(list);
        assert!(summary.events.is_empty());
        assert_eq!(summary.total_count, 0);
    }

    #[test]
    fn test_event_input_deserializes_with_defaults() {
        let input: EventInput = serde_json::from_str(
            r#"{"summary": "Lunch", "start": "2026-08-06T12:00:00-07:00", "end": "2026-08-06T13:00:00-07:00"}"#,
        )
        .unwrap();
        assert!(!input.all_day);
        assert!(input.time_zone.is_none());
        assert!(input.description.is_none());
    }
}
