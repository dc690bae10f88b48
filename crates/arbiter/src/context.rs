//! The immutable input of one arbitration attempt.

use {
    serde_json::{Map, Value},
    tracing::warn,
};

use crate::error::ContextError;

const MESSAGE_ID: &str = "message_id";
const TIME: &str = "time";
const SELF_ID: &str = "self_id";

/// Facts every competing bot must agree on before arbitration can start.
///
/// `msg_time` is the server-assigned timestamp carried by the message
/// itself. Using the local clock instead would let two bots compute
/// different rankings for the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArbitrationContext {
    message_id: i64,
    msg_time: i64,
    self_id: i64,
}

impl ArbitrationContext {
    #[must_use]
    pub const fn new(message_id: i64, msg_time: i64, self_id: i64) -> Self {
        Self {
            message_id,
            msg_time,
            self_id,
        }
    }

    /// Build a context from a raw OneBot message event.
    ///
    /// Returns `None` when any of `message_id`, `time` or `self_id` is
    /// missing or malformed; such events are ineligible for arbitration.
    #[must_use]
    pub fn from_event(event: &Value) -> Option<Self> {
        match Self::try_from(event) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                let message_id = event.get(MESSAGE_ID).map(ToString::to_string);
                warn!(
                    message_id = message_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "event does not satisfy arbitration preconditions"
                );
                None
            },
        }
    }

    #[must_use]
    pub const fn message_id(&self) -> i64 {
        self.message_id
    }

    /// Server timestamp of the message, in seconds since the epoch.
    #[must_use]
    pub const fn msg_time(&self) -> i64 {
        self.msg_time
    }

    #[must_use]
    pub const fn self_id(&self) -> i64 {
        self.self_id
    }
}

impl TryFrom<&Value> for ArbitrationContext {
    type Error = ContextError;

    fn try_from(event: &Value) -> Result<Self, Self::Error> {
        let obj = event.as_object().ok_or(ContextError::NotAnObject)?;
        Ok(Self {
            message_id: id_field(obj, MESSAGE_ID)?,
            msg_time: time_field(obj)?,
            self_id: id_field(obj, SELF_ID)?,
        })
    }
}

fn present<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ContextError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ContextError::MissingField { field }),
        Some(v) => Ok(v),
    }
}

fn invalid(field: &'static str, value: &Value) -> ContextError {
    ContextError::InvalidField {
        field,
        value: value.to_string(),
    }
}

/// Identifiers arrive as JSON integers from most implementations and as
/// decimal strings from a few.
fn id_field(obj: &Map<String, Value>, field: &'static str) -> Result<i64, ContextError> {
    let value = present(obj, field)?;
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok())),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(field, value))
}

/// The timestamp must be numeric; fractional seconds are truncated.
fn time_field(obj: &Map<String, Value>) -> Result<i64, ContextError> {
    let value = present(obj, TIME)?;
    let Value::Number(n) = value else {
        return Err(invalid(TIME, value));
    };
    if let Some(secs) = n.as_i64() {
        return Ok(secs);
    }
    match n.as_f64() {
        Some(secs) if secs.is_finite() && secs.abs() < i64::MAX as f64 => Ok(secs.trunc() as i64),
        _ => Err(invalid(TIME, value)),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn parses_onebot_message_event() {
        let event = json!({
            "post_type": "message",
            "message_type": "group",
            "message_id": 1_846_512_391,
            "time": 1_718_000_125,
            "self_id": 30,
            "group_id": 123_456,
        });
        let ctx = ArbitrationContext::from_event(&event).unwrap();
        assert_eq!(ctx.message_id(), 1_846_512_391);
        assert_eq!(ctx.msg_time(), 1_718_000_125);
        assert_eq!(ctx.self_id(), 30);
    }

    #[test]
    fn accepts_string_ids_and_fractional_time() {
        let event = json!({ "message_id": "-42", "time": 125.9, "self_id": " 10 " });
        let ctx = ArbitrationContext::try_from(&event).unwrap();
        assert_eq!(ctx, ArbitrationContext::new(-42, 125, 10));
    }

    #[test]
    fn missing_time_yields_no_context() {
        let event = json!({ "message_id": 1, "self_id": 10 });
        assert_eq!(
            ArbitrationContext::try_from(&event),
            Err(ContextError::MissingField { field: "time" })
        );
        assert!(ArbitrationContext::from_event(&event).is_none());
    }

    #[test]
    fn null_field_counts_as_missing() {
        let event = json!({ "message_id": null, "time": 1, "self_id": 10 });
        assert_eq!(
            ArbitrationContext::try_from(&event),
            Err(ContextError::MissingField {
                field: "message_id"
            })
        );
    }

    #[test]
    fn string_time_is_rejected() {
        let event = json!({ "message_id": 1, "time": "125", "self_id": 10 });
        assert!(matches!(
            ArbitrationContext::try_from(&event),
            Err(ContextError::InvalidField { field: "time", .. })
        ));
    }

    #[test]
    fn non_numeric_self_id_is_rejected() {
        let event = json!({ "message_id": 1, "time": 125, "self_id": "bot-a" });
        assert!(matches!(
            ArbitrationContext::try_from(&event),
            Err(ContextError::InvalidField {
                field: "self_id",
                ..
            })
        ));
    }

    #[test]
    fn non_object_event_is_rejected() {
        assert_eq!(
            ArbitrationContext::try_from(&json!([1, 2, 3])),
            Err(ContextError::NotAnObject)
        );
    }
}
