use serde_json::Value;

/// Coarse kind of an inbound OneBot v11 event, from its `post_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    Message,
    /// Echo of a message this account sent itself.
    MessageSent,
    Notice,
    Request,
    MetaEvent,
    Unknown,
}

impl InboundKind {
    /// Only messages from other users are arbitrated.
    #[must_use]
    pub const fn is_arbitrable(self) -> bool {
        matches!(self, Self::Message)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::MessageSent => "message_sent",
            Self::Notice => "notice",
            Self::Request => "request",
            Self::MetaEvent => "meta_event",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for InboundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[must_use]
pub fn classify(event: &Value) -> InboundKind {
    match event.get("post_type").and_then(Value::as_str) {
        Some("message") => InboundKind::Message,
        Some("message_sent") => InboundKind::MessageSent,
        Some("notice") => InboundKind::Notice,
        Some("request") => InboundKind::Request,
        Some("meta_event") => InboundKind::MetaEvent,
        _ => InboundKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    #[rstest]
    #[case(json!({"post_type": "message", "message_id": 1}), InboundKind::Message)]
    #[case(json!({"post_type": "message_sent"}), InboundKind::MessageSent)]
    #[case(json!({"post_type": "notice", "notice_type": "group_msg_emoji_like"}), InboundKind::Notice)]
    #[case(json!({"post_type": "request"}), InboundKind::Request)]
    #[case(json!({"post_type": "meta_event", "meta_event_type": "heartbeat"}), InboundKind::MetaEvent)]
    #[case(json!({"post_type": 3}), InboundKind::Unknown)]
    #[case(json!([]), InboundKind::Unknown)]
    fn classifies_post_type(#[case] event: Value, #[case] expected: InboundKind) {
        assert_eq!(classify(&event), expected);
    }

    #[test]
    fn only_foreign_messages_are_arbitrable() {
        assert!(InboundKind::Message.is_arbitrable());
        assert!(!InboundKind::MessageSent.is_arbitrable());
        assert!(!InboundKind::Notice.is_arbitrable());
    }
}
