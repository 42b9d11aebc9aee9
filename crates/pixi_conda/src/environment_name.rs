use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

const INVALID_CHARACTERS: &[char] = &['/', '\\', ':', ',', ' '];

/// The name of an environment that lives in the environments root.
///
/// A name maps to the prefix `<root>/<name>`, so it must be usable as a
/// single path component. Parse one with [`FromStr::from_str`] or
/// [`str::parse`].
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EnvironmentName(String);

impl Display for EnvironmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EnvironmentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for EnvironmentName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseEnvironmentNameError {
    #[error("invalid character in environment name: {0}")]
    InvalidCharacter(String),

    #[error("an environment name cannot be empty")]
    Empty,

    #[error("'{0}' is not a valid environment name")]
    Reserved(String),
}

impl FromStr for EnvironmentName {
    type Err = ParseEnvironmentNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseEnvironmentNameError::Empty);
        }

        if let Some(invalid_char) = s
            .matches(|c| INVALID_CHARACTERS.contains(&c) || c.is_whitespace())
            .next()
        {
            return Err(ParseEnvironmentNameError::InvalidCharacter(
                invalid_char.to_owned(),
            ));
        }

        if s == "." || s == ".." {
            return Err(ParseEnvironmentNameError::Reserved(s.to_owned()));
        }

        Ok(EnvironmentName(s.to_owned()))
    }
}

impl EnvironmentName {
    /// Derives the name of an environment from its prefix if the prefix is a
    /// direct child of `root`.
    pub fn from_prefix(root: &Path, prefix: &Path) -> Option<Self> {
        if prefix.parent()? != root {
            return None;
        }
        prefix.file_name()?.to_str()?.parse().ok()
    }
}
