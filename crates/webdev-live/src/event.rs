//! Events pushed to browsers and their `text/event-stream` framing.

use crate::changes::ChangeSet;

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// First event of every session.
    Connect,
    /// Heartbeat.
    Ping,
    /// Resources changed on disk.
    Change(ChangeSet),
    /// The last build failed; the session closes after this event.
    BundlingError,
}

impl LiveEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Connect => "connect",
            LiveEvent::Ping => "ping",
            LiveEvent::Change(_) => "change",
            LiveEvent::BundlingError => "bundling-error",
        }
    }

    fn data(&self) -> Option<String> {
        match self {
            LiveEvent::Connect => Some("Connected".to_string()),
            LiveEvent::Ping | LiveEvent::BundlingError => None,
            // Serializing three string vectors cannot fail.
            LiveEvent::Change(changes) => serde_json::to_string(changes).ok(),
        }
    }

    /// Frame the event with the given id.
    ///
    /// ```
    /// use webdev_live::LiveEvent;
    ///
    /// assert_eq!(LiveEvent::Ping.encode(3), "id: 3\nevent: ping\n\n");
    /// ```
    pub fn encode(&self, id: u64) -> String {
        let mut frame = format!("id: {id}\nevent: {}\n", self.name());
        if let Some(data) = self.data() {
            frame.push_str("data: ");
            frame.push_str(&sanitize(&data));
            frame.push('\n');
        }
        frame.push('\n');
        frame
    }
}

/// Remove every character that would end an event-stream line early.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\r' | '\n' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
            )
        })
        .collect()
}
