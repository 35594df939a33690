//! Build environments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The environment a build runs for.
///
/// Only production-like builds compile to the artifact cache; development
/// and test builds run straight from source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildEnv {
    /// Interactive development build.
    Dev,
    /// Test run.
    Test,
    /// Production build for deployment.
    Prod,
}

impl BuildEnv {
    /// Returns `true` for environments whose output is deployed.
    pub fn is_production_like(self) -> bool {
        matches!(self, BuildEnv::Prod)
    }

    /// Returns the canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildEnv::Dev => "dev",
            BuildEnv::Test => "test",
            BuildEnv::Prod => "prod",
        }
    }
}

impl fmt::Display for BuildEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an environment name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown build environment '{input}' (expected dev, test or prod)")]
pub struct ParseBuildEnvError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for BuildEnv {
    type Err = ParseBuildEnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(BuildEnv::Dev),
            "test" => Ok(BuildEnv::Test),
            "prod" | "production" => Ok(BuildEnv::Prod),
            _ => Err(ParseBuildEnvError {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_prod_is_production_like() {
        assert!(BuildEnv::Prod.is_production_like());
        assert!(!BuildEnv::Dev.is_production_like());
        assert!(!BuildEnv::Test.is_production_like());
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("production".parse::<BuildEnv>().unwrap(), BuildEnv::Prod);
        assert_eq!(" DEV ".parse::<BuildEnv>().unwrap(), BuildEnv::Dev);
        assert_eq!("test".parse::<BuildEnv>().unwrap(), BuildEnv::Test);
    }

    #[test]
    fn parse_unknown_errors() {
        let err = "staging".parse::<BuildEnv>().unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn display_roundtrips() {
        for env in [BuildEnv::Dev, BuildEnv::Test, BuildEnv::Prod] {
            assert_eq!(env.to_string().parse::<BuildEnv>().unwrap(), env);
        }
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(serde_json::to_string(&BuildEnv::Prod).unwrap(), "\"prod\"");
    }
}
