use super::{SignedUrl, Stage};

/// Notifications a workflow run sends to the surface hosting it.
///
/// A run sends at most one `PreviewAvailable` and exactly one terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarEvent {
    PreviewAvailable(Vec<u8>),
    Succeeded(SignedUrl),
    Removed,
    Failed { stage: Stage, reason: String },
}

impl AvatarEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::PreviewAvailable(_))
    }
}
