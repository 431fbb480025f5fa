//! In-stream commands carried by SQL scripts as `-- <verb> [args]` lines.

use crate::utils::error::LoadError;
use std::fmt;

/// Opening or closing half of a scoped directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Begin,
    End,
}

/// A recognised directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Skip,
    Error,
    SkipIfBelowVersion { binary: String, version: u32 },
    VExplain,
    WaitAuthoritative { table: String, keyspace: Option<String> },
    VitessOnly(Scope),
    MySqlOnly(Scope),
    Reference,
    UsageCount(usize),
    RemoveFile(String),
}

impl Directive {
    /// Parse the text following `--`
    ///
    /// # Errors
    /// * `LoadError::UnknownDirective` - verb is not part of the vocabulary
    /// * `LoadError::InvalidDirective` - verb is known but its arguments are not
    pub fn parse(body: &str, line: usize) -> Result<Self, LoadError> {
        let mut parts = body.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let invalid = |message: String| LoadError::InvalidDirective { line, message };

        let directive = match verb.to_ascii_lowercase().as_str() {
            "skip" => Self::Skip,
            "error" => Self::Error,
            "vexplain" => Self::VExplain,
            "reference" => Self::Reference,
            "skip_if_below_version" => match args.as_slice() {
                [binary, version] => Self::SkipIfBelowVersion {
                    binary: binary.to_string(),
                    version: parse_major_version(version).ok_or_else(|| {
                        invalid(format!("bad version '{}' for {}", version, binary))
                    })?,
                },
                _ => {
                    return Err(invalid(
                        "skip_if_below_version expects <binary> <version>".to_string(),
                    ))
                }
            },
            "wait_authoritative" => match args.as_slice() {
                [table] => Self::WaitAuthoritative {
                    table: table.to_string(),
                    keyspace: None,
                },
                [table, keyspace] => Self::WaitAuthoritative {
                    table: table.to_string(),
                    keyspace: Some(keyspace.to_string()),
                },
                _ => {
                    return Err(invalid(
                        "wait_authoritative expects <table> [keyspace]".to_string(),
                    ))
                }
            },
            "vitess_only" => Self::VitessOnly(parse_scope(&args).ok_or_else(|| {
                invalid("vitess_only expects 'begin' or 'end'".to_string())
            })?),
            "mysql_only" => Self::MySqlOnly(parse_scope(&args).ok_or_else(|| {
                invalid("mysql_only expects 'begin' or 'end'".to_string())
            })?),
            "usage_count" => match args.as_slice() {
                [n] => Self::UsageCount(
                    n.parse()
                        .map_err(|_| invalid(format!("bad usage count '{}'", n)))?,
                ),
                _ => return Err(invalid("usage_count expects a number".to_string())),
            },
            "remove_file" => match args.as_slice() {
                [path] => Self::RemoveFile(path.to_string()),
                _ => return Err(invalid("remove_file expects a path".to_string())),
            },
            _ => {
                return Err(LoadError::UnknownDirective {
                    line,
                    verb: verb.to_string(),
                })
            }
        };

        Ok(directive)
    }

    /// The verb as written in scripts
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Error => "error",
            Self::SkipIfBelowVersion { .. } => "skip_if_below_version",
            Self::VExplain => "vexplain",
            Self::WaitAuthoritative { .. } => "wait_authoritative",
            Self::VitessOnly(_) => "vitess_only",
            Self::MySqlOnly(_) => "mysql_only",
            Self::Reference => "reference",
            Self::UsageCount(_) => "usage_count",
            Self::RemoveFile(_) => "remove_file",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-- {}", self.verb())?;
        match self {
            Self::SkipIfBelowVersion { binary, version } => write!(f, " {} {}", binary, version),
            Self::WaitAuthoritative { table, keyspace } => {
                write!(f, " {}", table)?;
                match keyspace {
                    Some(ks) => write!(f, " {}", ks),
                    None => Ok(()),
                }
            }
            Self::VitessOnly(scope) | Self::MySqlOnly(scope) => match scope {
                Scope::Begin => write!(f, " begin"),
                Scope::End => write!(f, " end"),
            },
            Self::UsageCount(n) => write!(f, " {}", n),
            Self::RemoveFile(path) => write!(f, " {}", path),
            _ => Ok(()),
        }
    }
}

fn parse_scope(args: &[&str]) -> Option<Scope> {
    match args {
        [arg] if arg.eq_ignore_ascii_case("begin") => Some(Scope::Begin),
        [arg] if arg.eq_ignore_ascii_case("end") => Some(Scope::End),
        _ => None,
    }
}

/// Accepts `19`, `19.0.1` and `v19`
fn parse_major_version(version: &str) -> Option<u32> {
    version
        .trim_start_matches(['v', 'V'])
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_verbs() {
        assert_eq!(Directive::parse("skip", 1).unwrap(), Directive::Skip);
        assert_eq!(Directive::parse(" error ", 1).unwrap(), Directive::Error);
        assert_eq!(Directive::parse("reference", 1).unwrap(), Directive::Reference);
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            Directive::parse("skip_if_below_version vtgate 19.0.2", 4).unwrap(),
            Directive::SkipIfBelowVersion {
                binary: "vtgate".to_string(),
                version: 19
            }
        );
        assert_eq!(
            Directive::parse("usage_count 12", 1).unwrap(),
            Directive::UsageCount(12)
        );
        assert_eq!(
            Directive::parse("vitess_only begin", 1).unwrap(),
            Directive::VitessOnly(Scope::Begin)
        );
        assert_eq!(
            Directive::parse("mysql_only END", 1).unwrap(),
            Directive::MySqlOnly(Scope::End)
        );
    }

    #[test]
    fn test_unknown_verb_fails() {
        let err = Directive::parse("frobnicate now", 9).unwrap_err();
        assert!(matches!(err, LoadError::UnknownDirective { line: 9, .. }));
    }

    #[test]
    fn test_bad_arguments_fail() {
        assert!(Directive::parse("usage_count many", 1).is_err());
        assert!(Directive::parse("vitess_only", 1).is_err());
        assert!(Directive::parse("skip_if_below_version vtgate", 1).is_err());
    }

    #[test]
    fn test_display_round_trips_arguments() {
        let d = Directive::parse("wait_authoritative users ks", 1).unwrap();
        assert_eq!(d.to_string(), "-- wait_authoritative users ks");
    }
}
