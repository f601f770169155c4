//! Wire shapes of error bodies served alongside non-200 statuses.

use serde::Deserialize;

/// Error envelope. Riot-style APIs nest the message under `status`; other
/// services put it at the top level.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    status: Option<ErrorStatusDto>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorStatusDto {
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBodyDto {
    /// First non-blank message, preferring the nested one.
    pub(super) fn into_message(self) -> Option<String> {
        self.status
            .and_then(|status| status.message)
            .into_iter()
            .chain(self.message)
            .map(|message| message.trim().to_owned())
            .find(|message| !message.is_empty())
    }
}
