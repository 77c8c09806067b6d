//! Outcome translation
//!
//! Maps framework result states onto runner outcomes and canonicalizes the
//! text that travels with a result:
//! - Failure messages lose the caret annotation line when shown in an IDE
//! - Output chunks lose trailing line separators, except that a doubled
//!   separator keeps one
//!
//! Every operation here is total.

use testbridge_core::{ExternalOutcome, ResultState};

const CRLF: &str = "\r\n";
const LF: &str = "\n";
const CR: &str = "\r";

/// Translates raw outcomes into what the runner expects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTranslator {
    interactive_host: bool,
}

impl OutcomeTranslator {
    /// Create a translator
    ///
    /// `interactive_host` is true when results are displayed by an IDE.
    pub fn new(interactive_host: bool) -> Self {
        Self { interactive_host }
    }

    /// Whether caret lines are removed from failure messages
    pub fn interactive_host(&self) -> bool {
        self.interactive_host
    }

    /// Runner outcome for a framework state
    pub fn outcome_of(state: ResultState) -> ExternalOutcome {
        match state {
            ResultState::Success => ExternalOutcome::Passed,
            ResultState::Failure => ExternalOutcome::Failed,
            ResultState::Error => ExternalOutcome::Failed,
            ResultState::NotRunnable => ExternalOutcome::Failed,
            ResultState::Ignored => ExternalOutcome::Skipped,
            ResultState::Skipped => ExternalOutcome::Skipped,
            ResultState::Cancelled => ExternalOutcome::None,
            ResultState::Inconclusive => ExternalOutcome::None,
        }
    }

    /// Message as it should be reported
    ///
    /// The message passes through unchanged except for `Failure` and
    /// `Inconclusive` results on an interactive host, where the first
    /// caret line (`  ------^`) sitting between two line separators is
    /// removed along with one of those separators.
    pub fn normalize_message(&self, state: ResultState, message: Option<&str>) -> Option<String> {
        let message = message?;
        let applies = matches!(state, ResultState::Failure | ResultState::Inconclusive);
        if !(self.interactive_host && applies) {
            return Some(message.to_string());
        }
        Some(remove_caret_line(message))
    }

    /// Output chunk with its trailing line separators normalized
    ///
    /// Exactly two identical trailing separators collapse to one. Any other
    /// run of trailing separators is removed. Embedded line breaks are kept.
    pub fn normalize_output_chunk(chunk: &str) -> String {
        let mut body = chunk;
        let mut trailing: Vec<&'static str> = Vec::new();
        while let Some(sep) = trailing_separator(body) {
            trailing.push(sep);
            body = &body[..body.len() - sep.len()];
        }

        match trailing.as_slice() {
            [a, b] if a == b => format!("{}{}", body, a),
            _ => body.to_string(),
        }
    }
}

fn trailing_separator(text: &str) -> Option<&'static str> {
    if text.ends_with(CRLF) {
        Some(CRLF)
    } else if text.ends_with(LF) {
        Some(LF)
    } else if text.ends_with(CR) {
        Some(CR)
    } else {
        None
    }
}

/// Split into `(line, separator)` pairs; the last separator may be empty
fn split_lines(text: &str) -> Vec<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let sep_len = match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
            b'\r' | b'\n' => 1,
            _ => 0,
        };
        if sep_len > 0 {
            lines.push((&text[start..i], &text[i..i + sep_len]));
            i += sep_len;
            start = i;
        } else {
            i += 1;
        }
    }
    lines.push((&text[start..], ""));
    lines
}

fn is_caret_line(line: &str) -> bool {
    let marker = line.trim_start_matches([' ', '\t']);
    match marker.strip_suffix('^') {
        Some(dashes) => !dashes.is_empty() && dashes.bytes().all(|b| b == b'-'),
        None => false,
    }
}

fn remove_caret_line(message: &str) -> String {
    let lines = split_lines(message);
    // A caret line needs a separator before it (i > 0) and after it
    let caret = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, (line, sep))| !sep.is_empty() && is_caret_line(line))
        .map(|(i, _)| i);

    let Some(caret) = caret else {
        return message.to_string();
    };

    let mut out = String::with_capacity(message.len());
    for (i, (line, sep)) in lines.iter().enumerate() {
        if i != caret {
            out.push_str(line);
            out.push_str(sep);
        }
    }
    out
}
