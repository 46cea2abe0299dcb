//! Step registry: pattern → handler resolution
//!
//! Patterns are literal step text with typed placeholders:
//! - `{d}` matches an integer
//! - `{w}` matches one bare word (no whitespace)
//! - `{q}` matches a double-quoted string, yielding the inner text
//!
//! Entries are evaluated in registration order and the first match wins.
//! Text that matches nothing is an explicit error naming the step.

use crate::common::{Error, Result};

/// A typed value extracted from a step by its pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Int(i64),
    Word(String),
    Quoted(String),
}

impl Arg {
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Arg::Int(value) => Ok(*value),
            other => Err(Error::Config(format!("expected integer argument, got {other:?}"))),
        }
    }

    pub fn as_text(&self) -> Result<&str> {
        match self {
            Arg::Word(text) | Arg::Quoted(text) => Ok(text),
            other => Err(Error::Config(format!("expected text argument, got {other:?}"))),
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Int,
    Word,
    Quoted,
}

/// A compiled step pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    spec: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a pattern spec. Unknown `{..}` tokens are kept literal.
    pub fn parse(spec: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = spec;

        while let Some(open) = rest.find('{') {
            let (before, tail) = rest.split_at(open);
            literal.push_str(before);

            let placeholder = match tail.get(..3) {
                Some("{d}") => Some(Segment::Int),
                Some("{w}") => Some(Segment::Word),
                Some("{q}") => Some(Segment::Quoted),
                _ => None,
            };

            match placeholder {
                Some(segment) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                    rest = &tail[3..];
                }
                None => {
                    literal.push('{');
                    rest = &tail[1..];
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            spec: spec.to_string(),
            segments,
        }
    }

    /// Match step text, extracting placeholder arguments.
    /// Matching is case-insensitive on the literal parts.
    pub fn matches(&self, text: &str) -> Option<Vec<Arg>> {
        let mut args = Vec::new();
        let mut cursor = text;

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    let take = cursor.get(..literal.len())?;
                    if !take.eq_ignore_ascii_case(literal) {
                        return None;
                    }
                    cursor = &cursor[literal.len()..];
                }
                Segment::Int => {
                    let digits: String =
                        cursor.chars().take_while(|c| c.is_ascii_digit()).collect();
                    if digits.is_empty() {
                        return None;
                    }
                    cursor = &cursor[digits.len()..];
                    args.push(Arg::Int(digits.parse().ok()?));
                }
                Segment::Word => {
                    let word: String =
                        cursor.chars().take_while(|c| !c.is_whitespace()).collect();
                    if word.is_empty() {
                        return None;
                    }
                    cursor = &cursor[word.len()..];
                    args.push(Arg::Word(word));
                }
                Segment::Quoted => {
                    let after_quote = cursor.strip_prefix('"')?;
                    let close = after_quote.find('"')?;
                    args.push(Arg::Quoted(after_quote[..close].to_string()));
                    cursor = &after_quote[close + 1..];
                }
            }
        }

        cursor.is_empty().then_some(args)
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }
}

/// Ordered collection of (pattern, action) pairs
#[derive(Debug, Default)]
pub struct StepRegistry<A> {
    entries: Vec<(Pattern, A)>,
}

impl<A: Clone> StepRegistry<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, spec: &str, action: A) {
        self.entries.push((Pattern::parse(spec), action));
    }

    /// Resolve step text to the first matching action and its arguments
    pub fn resolve(&self, text: &str) -> Result<(A, Vec<Arg>)> {
        for (pattern, action) in &self.entries {
            if let Some(args) = pattern.matches(text) {
                return Ok((action.clone(), args));
            }
        }
        Err(Error::StepNotFound(text.to_string()))
    }

    /// All registered pattern specs, in registration order
    pub fn specs(&self) -> Vec<&str> {
        self.entries.iter().map(|(p, _)| p.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match_is_exact_and_case_insensitive() {
        let pattern = Pattern::parse("services are running");
        assert_eq!(pattern.matches("services are running"), Some(vec![]));
        assert_eq!(pattern.matches("Services Are Running"), Some(vec![]));
        assert!(pattern.matches("services are running now").is_none());
        assert!(pattern.matches("services are").is_none());
    }

    #[test]
    fn test_int_placeholder_extraction() {
        let pattern = Pattern::parse("the response status is {d}");
        let args = pattern.matches("the response status is 200").unwrap();
        assert_eq!(args, vec![Arg::Int(200)]);
        assert!(pattern.matches("the response status is abc").is_none());
    }

    #[test]
    fn test_word_and_quoted_placeholders() {
        let pattern = Pattern::parse("I can access {w} at {q}");
        let args = pattern
            .matches(r#"I can access webui at "http://localhost:5173""#)
            .unwrap();
        assert_eq!(
            args,
            vec![
                Arg::Word("webui".to_string()),
                Arg::Quoted("http://localhost:5173".to_string())
            ]
        );
    }

    #[test]
    fn test_unterminated_quote_does_not_match() {
        let pattern = Pattern::parse("run {q} now");
        assert!(pattern.matches(r#"run "task up now"#).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut registry: StepRegistry<u8> = StepRegistry::new();
        registry.register("{w} responds at port {d}", 1);
        registry.register("webui responds at port {d}", 2);

        let (action, args) = registry.resolve("webui responds at port 5173").unwrap();
        assert_eq!(action, 1);
        assert_eq!(args[0], Arg::Word("webui".to_string()));
        assert_eq!(args[1], Arg::Int(5173));
    }

    #[test]
    fn test_unmatched_step_is_explicit_error() {
        let registry: StepRegistry<u8> = StepRegistry::new();
        let err = registry.resolve("no such step").unwrap_err();
        assert!(matches!(err, Error::StepNotFound(text) if text == "no such step"));
    }

    #[test]
    fn test_arg_accessors() {
        assert_eq!(Arg::Int(7).as_int().unwrap(), 7);
        assert!(Arg::Word("x".into()).as_int().is_err());
        assert_eq!(Arg::Quoted("url".into()).as_text().unwrap(), "url");
    }
}
