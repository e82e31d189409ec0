use thiserror::Error;

/// What a session operation can fail with. Everything network-shaped
/// collapses to one user-visible message; the source chain stays available
/// for logs.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Tunnel list/create/activate call failed.
    #[error("tunnel setup failed: {0}")]
    TunnelSetup(#[source] anyhow::Error),

    /// Control-command dispatch failed.
    #[error("command send failed: {0}")]
    CommandSend(#[source] anyhow::Error),

    /// The derived stream URL could not be produced.
    #[error("stream setup failed: {0}")]
    StreamSetup(String),

    /// Local preset validation failed; nothing was sent.
    #[error("invalid preset: {0}")]
    InvalidPreset(String),
}

impl SessionError {
    /// The message shown in place of the action area. Deliberately a single
    /// generic string for every network-shaped failure; retry is manual.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidPreset(reason) => format!("Invalid preset: {reason}"),
            _ => "Failed to setup connection to camera. Try again later.".to_string(),
        }
    }
}
