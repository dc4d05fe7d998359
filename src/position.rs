//! Page positions for JavaScript resources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ViewError;

/// Where (and when) a script is inserted into the page.
///
/// Positions are totally ordered from earliest to latest:
/// `Head < Begin < End < Ready < Load`. `Ready` and `Load` are rendered at
/// the end of the body, wrapped in a document-ready / window-load guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Head,
    Begin,
    End,
    Ready,
    Load,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::Head,
        Position::Begin,
        Position::End,
        Position::Ready,
        Position::Load,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Head => "head",
            Position::Begin => "begin",
            Position::End => "end",
            Position::Ready => "ready",
            Position::Load => "load",
        }
    }

    /// Whether inline code at this position runs behind a page-lifecycle guard.
    pub fn is_deferred(self) -> bool {
        matches!(self, Position::Ready | Position::Load)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ViewError::InvalidBundleConfig(format!("unknown position `{}`", s)))
    }
}
