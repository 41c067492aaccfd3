// src/exec/command.rs

use std::fmt;

use crate::errors::{Result, WadoError};

/// A command string split into a binary and its arguments.
///
/// Splitting follows POSIX shell-word rules (quotes and backslash escapes
/// are honoured). No shell is involved at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    binary: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn parse(line: &str) -> Result<Self> {
        let words = shlex::split(line)
            .ok_or_else(|| WadoError::CommandParse(format!("unbalanced quoting in {line:?}")))?;
        let mut words = words.into_iter();
        let binary = words
            .next()
            .ok_or_else(|| WadoError::CommandParse(format!("empty command {line:?}")))?;
        Ok(Self {
            binary,
            args: words.collect(),
        })
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Binary followed by arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.binary.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let argv = self.argv();
        let quoted: Vec<_> = argv.iter().map(|w| shlex::try_quote(w)).collect();
        for (i, word) in quoted.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match word {
                Ok(w) => f.write_str(w)?,
                Err(_) => write!(f, "{:?}", argv[i])?,
            }
        }
        Ok(())
    }
}
