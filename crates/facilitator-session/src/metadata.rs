use facilitator_core::{AgendaItem, MeetingStyle};

use crate::error::{Result, SessionError};

/// Parsed room metadata: the agenda the meeting was joined with, and the
/// facilitation style override (defaults to moderate if absent).
#[derive(Debug, Clone)]
pub struct RoomMetadata {
    pub agenda: Vec<AgendaItem>,
    pub style: MeetingStyle,
}

/// Parses the room-creation metadata blob the control plane hands the
/// engine on join. Shape: `{"agenda": [{"topic": str, "minutes": number}, ...], "style"?: str}`.
///
/// `agenda` is required and must be non-empty; `style` defaults to
/// `moderate` when absent or unrecognised.
pub fn parse_room_metadata(raw: &serde_json::Value) -> Result<RoomMetadata> {
    let agenda_value = raw.get("agenda").ok_or(SessionError::MissingField("agenda"))?;
    let agenda_array =
        agenda_value.as_array().ok_or_else(|| SessionError::MalformedField {
            field: "agenda",
            reason: "expected an array".to_string(),
        })?;

    if agenda_array.is_empty() {
        return Err(SessionError::MalformedField { field: "agenda", reason: "must not be empty".to_string() });
    }

    let mut agenda = Vec::with_capacity(agenda_array.len());
    for (index, entry) in agenda_array.iter().enumerate() {
        let topic = entry.get("topic").and_then(|v| v.as_str()).ok_or_else(|| SessionError::MalformedField {
            field: "agenda",
            reason: format!("item {index} missing a string \"topic\""),
        })?;
        let minutes = entry.get("minutes").and_then(|v| v.as_f64()).ok_or_else(|| SessionError::MalformedField {
            field: "agenda",
            reason: format!("item {index} missing a numeric \"minutes\""),
        })?;
        if minutes <= 0.0 {
            return Err(SessionError::MalformedField {
                field: "agenda",
                reason: format!("item {index} has non-positive \"minutes\""),
            });
        }
        agenda.push(AgendaItem::new(index as u32 + 1, topic, minutes));
    }

    let style = raw
        .get("style")
        .and_then(|v| v.as_str())
        .map(parse_style)
        .unwrap_or(MeetingStyle::Moderate);

    Ok(RoomMetadata { agenda, style })
}

fn parse_style(raw: &str) -> MeetingStyle {
    match raw.to_lowercase().as_str() {
        "gentle" => MeetingStyle::Gentle,
        "chatting" => MeetingStyle::Chatting,
        _ => MeetingStyle::Moderate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_agenda_and_explicit_style() {
        let raw = serde_json::json!({
            "agenda": [{"topic": "Opening", "minutes": 5}, {"topic": "Deep dive", "minutes": 20}],
            "style": "gentle",
        });
        let metadata = parse_room_metadata(&raw).unwrap();
        assert_eq!(metadata.agenda.len(), 2);
        assert_eq!(metadata.agenda[0].topic, "Opening");
        assert_eq!(metadata.agenda[1].id, 2);
        assert_eq!(metadata.style, MeetingStyle::Gentle);
    }

    #[test]
    fn missing_style_defaults_to_moderate() {
        let raw = serde_json::json!({ "agenda": [{"topic": "Opening", "minutes": 5}] });
        let metadata = parse_room_metadata(&raw).unwrap();
        assert_eq!(metadata.style, MeetingStyle::Moderate);
    }

    #[test]
    fn missing_agenda_is_an_error() {
        let raw = serde_json::json!({ "style": "moderate" });
        assert!(matches!(parse_room_metadata(&raw), Err(SessionError::MissingField("agenda"))));
    }

    #[test]
    fn empty_agenda_is_an_error() {
        let raw = serde_json::json!({ "agenda": [] });
        assert!(parse_room_metadata(&raw).is_err());
    }

    #[test]
    fn unrecognised_style_falls_back_to_moderate() {
        let raw = serde_json::json!({ "agenda": [{"topic": "Opening", "minutes": 5}], "style": "aggressive" });
        let metadata = parse_room_metadata(&raw).unwrap();
        assert_eq!(metadata.style, MeetingStyle::Moderate);
    }
}
