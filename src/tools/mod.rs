//! The two auxiliary tools: the restricted arithmetic evaluator and the
//! Wikipedia summary lookup.

pub mod calc;
pub mod wiki;

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Calculator,
    Wikipedia,
}

impl ToolKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Calculator => "Calculator",
            Self::Wikipedia => "Wikipedia",
        }
    }

    /// Kind tag used for session trace lines.
    pub fn trace_kind(self) -> &'static str {
        match self {
            Self::Calculator => "tool.calc",
            Self::Wikipedia => "tool.wiki",
        }
    }
}

impl Display for ToolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
