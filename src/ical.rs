use chrono::NaiveDateTime;
use icalendar::{Calendar, Component, Event, EventLike};

/// Flattened view of a session for calendar export, resolved by the handler
/// from the catalog and the directory.
#[derive(Debug, Clone)]
pub struct ScheduleEvent {
    pub title: String,
    pub instructor: String,
    pub venue: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Clone)]
pub struct ScheduleExporter {
    calendar_name: String,
}

impl ScheduleExporter {
    pub fn new(calendar_name: String) -> Self {
        Self { calendar_name }
    }

    pub fn generate(&self, events: &[ScheduleEvent]) -> Vec<u8> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name(&self.calendar_name);

        for item in events {
            let mut event = Event::new();
            event.summary(&item.title);
            event.starts(item.start);
            event.ends(item.end);
            event.location(&item.venue);
            event.description(&format!("Instructor: {}", item.instructor));
            event.uid(&format!(
                "{}-{}-studio-booking",
                item.start.format("%Y%m%dT%H%M%S"),
                item.title.replace(' ', "-")
            ));
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    #[test]
    fn test_generate_single_session() {
        let exporter = ScheduleExporter::new("Studio Schedule".to_string());
        let event = ScheduleEvent {
            title: "Morning flow".to_string(),
            instructor: "Kim".to_string(),
            venue: "Hall A".to_string(),
            start: NaiveDateTime::parse_from_str("2026-01-05 06:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            end: NaiveDateTime::parse_from_str("2026-01-05 07:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        };
        let bytes = exporter.generate(&[event]);
        let body = String::from_utf8(bytes).unwrap();
        assert!(body.contains("BEGIN:VEVENT"));
        assert!(body.contains("Morning flow"));
        assert!(body.contains("Instructor: Kim"));
    }

    #[test]
    fn test_generate_empty() {
        let exporter = ScheduleExporter::new("Studio Schedule".to_string());
        let bytes = exporter.generate(&[]);
        assert!(bytes.is_empty());
    }
}
