//! Directive state machine for the keys analyzer.
//!
//! At most one directive state is active at a time. `skip` states end on the
//! next record of any kind, the other one-shot states on the next SQL record,
//! and scoped states last until their matching `end`.

use crate::loader::{Directive, Scope};
use crate::utils::config::KeysConfig;
use crate::utils::error::LoadError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectiveState {
    #[default]
    Normal,
    Skip,
    ErrorExpected,
    VExplain,
    VitessOnly,
    MySqlOnly,
    Reference,
    /// `skip` is the evaluated version predicate
    SkipBelowVersion { skip: bool },
}

/// What to do with the next SQL record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlAction {
    Discard,
    Analyze {
        expected_error: bool,
        vexplain: bool,
        reference: bool,
    },
}

impl SqlAction {
    fn analyze() -> Self {
        Self::Analyze {
            expected_error: false,
            vexplain: false,
            reference: false,
        }
    }
}

impl fmt::Display for DirectiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::Skip => "skip",
            Self::ErrorExpected => "error",
            Self::VExplain => "vexplain",
            Self::VitessOnly => "vitess_only",
            Self::MySqlOnly => "mysql_only",
            Self::Reference => "reference",
            Self::SkipBelowVersion { .. } => "skip_if_below_version",
        };
        f.write_str(name)
    }
}

impl DirectiveState {
    /// Apply a directive record
    ///
    /// # Errors
    /// * `LoadError::InvalidDirective` - a state is entered while another is
    ///   active, or an `end` has no matching `begin`
    pub fn enter(
        &mut self,
        directive: &Directive,
        config: &KeysConfig,
        line: usize,
    ) -> Result<(), LoadError> {
        let next = match directive {
            Directive::Skip => Self::Skip,
            Directive::Error => Self::ErrorExpected,
            Directive::VExplain => Self::VExplain,
            Directive::Reference => Self::Reference,
            Directive::SkipIfBelowVersion { binary, version } => Self::SkipBelowVersion {
                skip: config
                    .versions
                    .get(binary)
                    .is_some_and(|current| current < version),
            },
            Directive::VitessOnly(Scope::Begin) => Self::VitessOnly,
            Directive::MySqlOnly(Scope::Begin) => Self::MySqlOnly,
            Directive::VitessOnly(Scope::End) => return self.leave(Self::VitessOnly, line),
            Directive::MySqlOnly(Scope::End) => return self.leave(Self::MySqlOnly, line),
            Directive::UsageCount(_)
            | Directive::WaitAuthoritative { .. }
            | Directive::RemoveFile(_) => return Ok(()),
        };

        if *self != Self::Normal {
            return Err(LoadError::InvalidDirective {
                line,
                message: format!("'{}' while '{}' is still active", directive.verb(), self),
            });
        }

        *self = next;
        Ok(())
    }

    fn leave(&mut self, scoped: Self, line: usize) -> Result<(), LoadError> {
        if *self != scoped {
            return Err(LoadError::InvalidDirective {
                line,
                message: format!("'{} end' without a matching begin", scoped),
            });
        }
        *self = Self::Normal;
        Ok(())
    }

    /// Consume the state for one SQL record
    pub fn on_sql(&mut self) -> SqlAction {
        let action = match *self {
            Self::Normal | Self::VitessOnly => SqlAction::analyze(),
            Self::Skip | Self::MySqlOnly | Self::SkipBelowVersion { skip: true } => {
                SqlAction::Discard
            }
            Self::SkipBelowVersion { skip: false } => SqlAction::analyze(),
            Self::ErrorExpected => SqlAction::Analyze {
                expected_error: true,
                vexplain: false,
                reference: false,
            },
            Self::VExplain => SqlAction::Analyze {
                expected_error: false,
                vexplain: true,
                reference: false,
            },
            Self::Reference => SqlAction::Analyze {
                expected_error: false,
                vexplain: false,
                reference: true,
            },
        };

        if !matches!(self, Self::VitessOnly | Self::MySqlOnly) {
            *self = Self::Normal;
        }
        action
    }

    /// Consume the state for a comment or blank line
    pub fn on_other(&mut self) {
        if matches!(self, Self::Skip | Self::SkipBelowVersion { .. }) {
            *self = Self::Normal;
        }
    }
}
