//! Lazily compiled regular expressions.

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::warn;

/// A regular expression that is only compiled the first time it is used.
///
/// The compiled form is cached in a [`OnceCell`], so a `LazyRegex` can be
/// shared between threads and is compiled at most once no matter how many
/// comparisons use it.
///
/// An empty source means "no regex". A source that does not compile is
/// reported once with `tracing::warn!` and then behaves as if it were absent.
///
/// ```rust
/// use abicomp_core::suppression::LazyRegex;
///
/// let re = LazyRegex::new("^lib(foo|bar)\\.so");
/// assert!(re.get().is_some_and(|re| re.is_match("libfoo.so.1")));
/// assert!(LazyRegex::default().get().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LazyRegex
{
    source: String,
    compiled: OnceCell<Option<Regex>>,
}

impl LazyRegex
{
    pub fn new(source: impl Into<String>) -> Self
    {
        Self {
            source: source.into(),
            compiled: OnceCell::new(),
        }
    }

    /// The pattern text, `None` if no pattern was given.
    pub fn source(&self) -> Option<&str>
    {
        if self.source.is_empty() {
            None
        } else {
            Some(&self.source)
        }
    }

    /// Whether a pattern was given, regardless of whether it compiles.
    pub fn is_set(&self) -> bool
    {
        !self.source.is_empty()
    }

    /// The compiled regex, compiling it on first use.
    pub fn get(&self) -> Option<&Regex>
    {
        if self.source.is_empty() {
            return None;
        }
        self.compiled
            .get_or_init(|| match Regex::new(&self.source) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(pattern = %self.source, "Ignoring regular expression that does not compile: {err}");
                    None
                }
            })
            .as_ref()
    }

    /// Compile now and report the error instead of swallowing it.
    ///
    /// A successful check also fills the cache.
    pub fn check(&self) -> Result<(), regex::Error>
    {
        if self.source.is_empty() {
            return Ok(());
        }
        let regex = Regex::new(&self.source)?;
        let _ = self.compiled.set(Some(regex));
        Ok(())
    }
}

impl From<&str> for LazyRegex
{
    fn from(source: &str) -> Self
    {
        LazyRegex::new(source)
    }
}

impl From<String> for LazyRegex
{
    fn from(source: String) -> Self
    {
        LazyRegex::new(source)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_empty_is_absent()
    {
        let re = LazyRegex::new("");
        assert!(!re.is_set());
        assert!(re.get().is_none());
        assert!(re.check().is_ok());
    }

    #[test]
    fn test_compiles_once()
    {
        let re = LazyRegex::new("^foo$");
        let first = re.get().map(|re| re as *const Regex);
        let second = re.get().map(|re| re as *const Regex);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_fails_open()
    {
        let re = LazyRegex::new("foo(");
        assert!(re.is_set());
        assert!(re.get().is_none());
        assert!(re.check().is_err());
    }

    #[test]
    fn test_matching_is_unanchored()
    {
        let re = LazyRegex::new("bar");
        assert!(re.get().is_some_and(|re| re.is_match("foobarbaz")));
    }
}
