//! Google Calendar client for CRM event scheduling.
//!
//! Mutations on opportunities can schedule follow-up events on a shared
//! calendar; the dashboard shows a this-week summary and weekly views mark
//! public holidays. Per-calendar read failures degrade to empty results so
//! one misconfigured calendar id cannot break a whole page.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Calendar API
const CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3/calendars";

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default event length when no end time is given, in minutes
const DEFAULT_EVENT_DURATION_MINUTES: i64 = 60;

/// Number of today's events surfaced in the dashboard summary
const TODAY_EVENTS_PREVIEW: usize = 3;

// ============================================================================
// Wire types
// ============================================================================

/// Start or end of a calendar event. All-day events carry `date`, timed
/// events carry `date_time`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// Calendar date this boundary falls on, whichever representation is used
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.or_else(|| self.date_time.map(|dt| dt.date_naive()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

/// When a new event takes place. All-day events span one calendar day.
#[derive(Debug, Clone)]
pub enum EventWhen {
    AllDay(NaiveDate),
    Timed {
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
}

/// Input for [`CalendarClient::create_event`]
#[derive(Debug, Clone)]
pub struct CalendarEventInput {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub when: EventWhen,
}

/// Reference to a created event
#[derive(Debug, Clone)]
pub struct CreatedEvent {
    pub event_id: Option<String>,
    pub event_url: Option<String>,
}

/// Dashboard summary of the current week
#[derive(Debug, Clone, Default)]
pub struct WeekSummary {
    pub today_count: usize,
    pub week_count: usize,
    pub today_events: Vec<CalendarEvent>,
}

// ============================================================================
// Calendar client
// ============================================================================

/// Client for the shared CRM calendar plus the regional holiday calendar.
#[derive(Clone)]
pub struct CalendarClient {
    client: Client,
    token: Arc<String>,
    calendar_id: String,
    holiday_calendar_id: Option<String>,
    timezone: Option<String>,
}

impl CalendarClient {
    pub fn new(
        calendar_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            token: Arc::new(token.into()),
            calendar_id: calendar_id.into(),
            holiday_calendar_id: None,
            timezone: None,
        })
    }

    pub fn with_holiday_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.holiday_calendar_id = Some(calendar_id.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/{}/events", CALENDAR_BASE_URL, calendar_id)
    }

    /// Create an event on the CRM calendar.
    pub async fn create_event(&self, input: CalendarEventInput) -> Result<CreatedEvent, ApiError> {
        let (start, end) = match input.when {
            EventWhen::AllDay(date) => {
                // All-day events are exclusive of the end date
                let end_date = date + TimeDelta::days(1);
                (
                    EventTime { date: Some(date), ..Default::default() },
                    EventTime { date: Some(end_date), ..Default::default() },
                )
            }
            EventWhen::Timed { start, end } => {
                let end = end.unwrap_or(start + TimeDelta::minutes(DEFAULT_EVENT_DURATION_MINUTES));
                (
                    EventTime {
                        date_time: Some(start),
                        time_zone: self.timezone.clone(),
                        ..Default::default()
                    },
                    EventTime {
                        date_time: Some(end),
                        time_zone: self.timezone.clone(),
                        ..Default::default()
                    },
                )
            }
        };

        let event = CalendarEvent {
            summary: Some(input.title),
            description: input.description,
            location: input.location,
            start,
            end,
            ..Default::default()
        };

        let response = self
            .client
            .post(self.events_url(&self.calendar_id))
            .bearer_auth(self.token.as_str())
            .json(&event)
            .send()
            .await?;
        let response = super::check_response(response).await?;

        let created: CalendarEvent = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        debug!(event_id = ?created.id, "Calendar event created");
        Ok(CreatedEvent {
            event_id: created.id,
            event_url: created.html_link,
        })
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, ApiError> {
        let response = self
            .client
            .get(self.events_url(calendar_id))
            .query(&[
                ("timeMin", start.to_rfc3339()),
                ("timeMax", end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .bearer_auth(self.token.as_str())
            .send()
            .await?;
        let response = super::check_response(response).await?;

        let body: EventListResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(body.items)
    }

    /// All events in `[start, end]` on the given calendar, defaulting to the
    /// CRM calendar. A failing calendar yields an empty list rather than an
    /// error so composite views keep rendering.
    pub async fn events_for_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        calendar_id: Option<&str>,
    ) -> Vec<CalendarEvent> {
        let target = calendar_id.unwrap_or(&self.calendar_id);
        match self.list_events(target, start, end).await {
            Ok(events) => events,
            Err(e) => {
                warn!(calendar = target, error = %e, "Calendar read failed");
                Vec::new()
            }
        }
    }

    /// Summary of this week's events for the dashboard.
    pub async fn this_week_summary(&self) -> WeekSummary {
        let today = Utc::now().date_naive();
        let (start, end) = week_bounds(today);

        let events = self.events_for_period(start, end, None).await;
        summarize_week(events, today)
    }

    /// Public holidays in `[start, end]`, keyed by date.
    /// Empty when no holiday calendar is configured or the read fails.
    pub async fn holidays_for_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HashMap<NaiveDate, String> {
        let Some(ref calendar_id) = self.holiday_calendar_id else {
            return HashMap::new();
        };

        let mut holidays = HashMap::new();
        for event in self.events_for_period(start, end, Some(calendar_id)).await {
            if let (Some(date), Some(summary)) = (event.start.date, event.summary) {
                holidays.insert(date, summary);
            }
        }
        holidays
    }
}

/// Sunday 00:00 through Saturday 24:00 of the week containing `today`, UTC.
fn week_bounds(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_from_sunday = today.weekday().num_days_from_sunday() as i64;
    let week_start = today - TimeDelta::days(days_from_sunday);
    let week_end = week_start + TimeDelta::days(7);
    (
        week_start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
        week_end.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
    )
}

fn summarize_week(events: Vec<CalendarEvent>, today: NaiveDate) -> WeekSummary {
    let week_count = events.len();
    let today_events: Vec<CalendarEvent> = events
        .into_iter()
        .filter(|e| e.start.day() == Some(today))
        .collect();

    WeekSummary {
        today_count: today_events.len(),
        week_count,
        today_events: today_events.into_iter().take(TODAY_EVENTS_PREVIEW).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed_event(day: NaiveDate) -> CalendarEvent {
        CalendarEvent {
            start: EventTime {
                date_time: day.and_hms_opt(9, 30, 0).map(|dt| dt.and_utc()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_week_bounds_starts_sunday() {
        // 2024-05-15 is a Wednesday
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let (start, end) = week_bounds(today);
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 5, 12).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2024, 5, 19).unwrap());
    }

    #[test]
    fn test_summarize_week_counts_today_and_caps_preview() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let other = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();

        let mut events: Vec<CalendarEvent> = (0..5).map(|_| timed_event(today)).collect();
        events.push(timed_event(other));

        let summary = summarize_week(events, today);
        assert_eq!(summary.week_count, 6);
        assert_eq!(summary.today_count, 5);
        assert_eq!(summary.today_events.len(), TODAY_EVENTS_PREVIEW);
    }

    #[test]
    fn test_all_day_event_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let time = EventTime { date: Some(date), ..Default::default() };
        assert_eq!(time.day(), Some(date));
    }
}
