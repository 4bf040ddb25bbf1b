//! Execution role of the host process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of the two mutually exclusive startup paths the host executes.
///
/// Resolved once at process start. The role decides which unit receives the
/// "run finished successfully" hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The host runs with a user-facing front end.
    #[default]
    Interactive,
    /// The host runs as a dedicated headless server.
    Headless,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Interactive => write!(f, "interactive"),
            Role::Headless => write!(f, "headless"),
        }
    }
}

/// Error type for parsing role strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    /// The input string that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid role: '{}' (expected 'interactive' or 'headless')",
            self.input
        )
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" | "client" => Ok(Role::Interactive),
            "headless" | "server" => Ok(Role::Headless),
            _ => Err(ParseRoleError {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_interactive() {
        assert_eq!(Role::default(), Role::Interactive);
    }

    #[test]
    fn parse_names_and_aliases() {
        assert_eq!("interactive".parse::<Role>().unwrap(), Role::Interactive);
        assert_eq!("Headless".parse::<Role>().unwrap(), Role::Headless);
        assert_eq!("server".parse::<Role>().unwrap(), Role::Headless);
        assert_eq!(" client ".parse::<Role>().unwrap(), Role::Interactive);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "daemon".parse::<Role>().unwrap_err();
        assert_eq!(err.input, "daemon");
        assert!(err.to_string().contains("invalid role"));
    }

    #[test]
    fn display_matches_serde_name() {
        for role in [Role::Interactive, Role::Headless] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }
}
