use std::sync::Mutex;

use crate::domain::{models::AvatarEvent, ports::outbound::AvatarEventSink};

/// Sink that keeps every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AvatarEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AvatarEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn terminal_events(&self) -> Vec<AvatarEvent> {
        self.events()
            .into_iter()
            .filter(AvatarEvent::is_terminal)
            .collect()
    }
}

impl AvatarEventSink for RecordingSink {
    fn notify(&self, event: AvatarEvent) {
        self.events.lock().unwrap().push(event);
    }
}
