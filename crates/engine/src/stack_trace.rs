//! Stack trace filtering
//!
//! Framework frames (`   at NUnit.Framework.Assert.AreEqual(...)`) tell the
//! user nothing about their test, so they are dropped before a trace is
//! reported. Lines that are not frames are kept as they are.

use crate::config::DEFAULT_STACK_TRACE_FILTER;

/// Removes frames of framework methods from stack traces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTraceFilter {
    prefixes: Vec<String>,
}

impl Default for StackTraceFilter {
    fn default() -> Self {
        Self::new([DEFAULT_STACK_TRACE_FILTER])
    }
}

impl StackTraceFilter {
    /// Filter dropping frames whose method starts with any of `prefixes`
    ///
    /// Empty prefixes are ignored.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// Configured prefixes
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Filter a trace; `None` when nothing but whitespace remains
    pub fn filter(&self, trace: Option<&str>) -> Option<String> {
        let trace = trace?;
        let kept: String = trace
            .split_inclusive('\n')
            .filter(|line| !self.is_filtered_frame(line))
            .collect();

        if kept.trim().is_empty() {
            None
        } else {
            Some(kept)
        }
    }

    fn is_filtered_frame(&self, line: &str) -> bool {
        match line.trim_start().strip_prefix("at ") {
            Some(method) => self.prefixes.iter().any(|p| method.starts_with(p.as_str())),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "   at NUnit.Framework.Assert.Fail(String message)\n   at Acme.Tests.CalculatorTests.Adds() in /src/CalculatorTests.cs:line 14\n";

    #[test]
    fn test_framework_frames_dropped() {
        let filtered = StackTraceFilter::default().filter(Some(TRACE)).unwrap();
        assert_eq!(
            filtered,
            "   at Acme.Tests.CalculatorTests.Adds() in /src/CalculatorTests.cs:line 14\n"
        );
    }

    #[test]
    fn test_crlf_lines_preserved() {
        let trace = "   at NUnit.Framework.Assert.That()\r\n   at Acme.Run()\r\n";
        let filtered = StackTraceFilter::default().filter(Some(trace)).unwrap();
        assert_eq!(filtered, "   at Acme.Run()\r\n");
    }

    #[test]
    fn test_non_frame_lines_kept() {
        let trace = "--- End of stack trace from previous location ---\n   at NUnit.Framework.Internal.Reflect.InvokeMethod()";
        let filtered = StackTraceFilter::default().filter(Some(trace)).unwrap();
        assert_eq!(filtered, "--- End of stack trace from previous location ---\n");
    }

    #[test]
    fn test_only_framework_frames_gives_none() {
        let trace = "   at NUnit.Framework.Assert.Fail()\n   at NUnit.Framework.Assert.IsTrue()\n";
        assert_eq!(StackTraceFilter::default().filter(Some(trace)), None);
        assert_eq!(StackTraceFilter::default().filter(Some("")), None);
        assert_eq!(StackTraceFilter::default().filter(None), None);
    }

    #[test]
    fn test_custom_prefixes() {
        let filter = StackTraceFilter::new(["Acme.Harness.", ""]);
        assert_eq!(filter.prefixes(), ["Acme.Harness.".to_string()]);
        let trace = "   at Acme.Harness.Run()\n   at NUnit.Framework.Assert.Fail()\n";
        assert_eq!(
            filter.filter(Some(trace)).unwrap(),
            "   at NUnit.Framework.Assert.Fail()\n"
        );
    }

    #[test]
    fn test_no_prefixes_keeps_everything() {
        let filter = StackTraceFilter::new(Vec::<String>::new());
        assert_eq!(filter.filter(Some(TRACE)).unwrap(), TRACE);
    }
}
