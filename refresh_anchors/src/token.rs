//! Bearer token acquisition through the `oauth2l` command-line tool.

use std::fmt;

use log::debug;
use tokio::process::Command;

use crate::error::TokenError;

pub const DEFAULT_PROGRAM: &str = "oauth2l";
pub const DEFAULT_KEY_FILE: &str = "ghosts-of-history-ba6b68332abd.json";
pub const DEFAULT_SCOPE: &str = "arcore.management";

/// Short-lived credential sent as `Authorization: Bearer ...`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Invocation of `oauth2l fetch --json <key_file> <scope>`.
#[derive(Debug, Clone)]
pub struct OAuth2l {
    pub program: String,
    pub key_file: String,
    pub scope: String,
}

impl Default for OAuth2l {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            key_file: DEFAULT_KEY_FILE.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

impl OAuth2l {
    fn args(&self) -> [&str; 4] {
        ["fetch", "--json", self.key_file.as_str(), self.scope.as_str()]
    }

    /// Runs the tool and returns its trimmed stdout as the token.
    pub async fn fetch(&self) -> Result<BearerToken, TokenError> {
        debug!("Running {} {}", self.program, self.args().join(" "));

        let output = Command::new(&self.program)
            .args(self.args())
            .output()
            .await
            .map_err(|source| TokenError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TokenError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)?;
        let token = stdout.trim();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        Ok(BearerToken::new(token))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn with_program(program: &str) -> OAuth2l {
        OAuth2l {
            program: program.to_string(),
            key_file: "key.json".to_string(),
            scope: "arcore.management".to_string(),
        }
    }

    #[tokio::test]
    async fn stdout_becomes_trimmed_token() {
        // echo prints its arguments followed by a newline
        let token = with_program("echo").fetch().await.unwrap();
        assert_eq!(token.secret(), "fetch --json key.json arcore.management");
    }

    #[tokio::test]
    async fn missing_program_is_fatal() {
        let err = with_program("definitely-not-an-oauth2l-binary")
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Spawn { .. }));
    }

    #[tokio::test]
    async fn failing_program_is_fatal() {
        let err = with_program("false").fetch().await.unwrap_err();
        assert!(matches!(err, TokenError::Exit { .. }));
    }

    #[tokio::test]
    async fn silent_program_yields_no_token() {
        let err = with_program("true").fetch().await.unwrap_err();
        assert!(matches!(err, TokenError::Empty));
    }

    #[test]
    fn debug_hides_secret() {
        let token = BearerToken::new("ya29.secret");
        assert_eq!(format!("{:?}", token), "BearerToken(***)");
    }
}
