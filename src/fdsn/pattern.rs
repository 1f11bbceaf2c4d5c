//! Shell style wildcards as used by FDSN services: `*`, `?` and `[...]` character classes.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::SeisDataErr;

/// A compiled list of wildcard patterns, kept in the order they were given.
#[derive(Clone, Debug)]
pub struct Patterns {
    set: GlobSet,
}

impl Patterns {
    /// Compile a list of patterns. Each must match the whole of a code.
    pub fn new<I, S>(patterns: I) -> Result<Self, SeisDataErr>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            builder.add(Glob::new(pat.as_ref().trim())?);
        }

        Ok(Patterns {
            set: builder.build()?,
        })
    }

    /// Compile the comma separated patterns in `list`, e.g. `"CI, N*"`.
    pub fn from_list(list: &str) -> Result<Self, SeisDataErr> {
        Self::new(list.split(','))
    }

    /// Does `text` match any of the patterns.
    pub fn is_match(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// Does `text` match the pattern at `idx`.
    pub fn matches_at(&self, idx: usize, text: &str) -> bool {
        self.set.matches(text).contains(&idx)
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// No patterns at all.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
