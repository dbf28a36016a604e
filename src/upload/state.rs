//! Per-attachment upload lifecycle.

/// Where an attachment is in its preparation/upload lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    None,
    Compressing,
    Ready,
    Uploading,
    Finish,
    Fail,
}

impl UploadState {
    /// Whether `self -> next` is an allowed transition
    pub fn can_enter(self, next: UploadState) -> bool {
        use UploadState::*;

        matches!(
            (self, next),
            (None, Compressing)
                | (Compressing, Ready)
                | (Compressing, Fail)
                | (Ready, Uploading)
                | (Uploading, Finish)
                | (Uploading, Fail)
                | (Fail, Uploading)
                | (Fail, Compressing)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, UploadState::Finish | UploadState::Fail)
    }
}
