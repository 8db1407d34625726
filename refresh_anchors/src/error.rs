use std::process::ExitStatus;

use reqwest::StatusCode;

/// Errors from the external credential tool.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("credential tool exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("credential tool printed no token")]
    Empty,

    #[error("credential tool printed invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors talking to the anchor management API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed (HTTP {status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why an anchor's expiration could not be moved to the target year.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExpireTimeError {
    #[error("unparseable expire time '{value}': {reason}")]
    Parse { value: String, reason: String },

    #[error("{value} has no counterpart in {year}")]
    NoSuchDate { value: String, year: i32 },
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("could not fetch bearer token: {0}")]
    Token(#[from] TokenError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("anchors still need updating after {0} patching passes")]
    PassLimitReached(u32),
}
