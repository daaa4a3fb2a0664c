//! Composable, positional tab-completion rules.

use std::fmt;

use crate::caller::Caller;

/// Which argument slot a suggestion rule applies to.
///
/// Positions are 1-indexed: position 1 is the first argument after the
/// command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPosition {
    /// The rule applies to exactly this slot.
    Exact(usize),
    /// The rule applies to this slot and every later one, for trailing or
    /// variadic arguments.
    AtLeast(usize),
}

impl ArgPosition {
    fn matches(self, current: usize) -> bool {
        match self {
            ArgPosition::Exact(position) => current == position,
            ArgPosition::AtLeast(position) => current >= position,
        }
    }
}

impl From<usize> for ArgPosition {
    fn from(position: usize) -> Self {
        ArgPosition::Exact(position)
    }
}

type CandidateFn = Box<dyn Fn(&dyn Caller, &str) -> Vec<String> + Send + Sync>;
type RulePredicate = Box<dyn Fn(&dyn Caller, &str) -> bool + Send + Sync>;

struct SuggestionRule {
    position: ArgPosition,
    predicate: Option<RulePredicate>,
    candidates: CandidateFn,
}

/// An ordered sequence of suggestion rules, evaluated against the argument
/// slot currently being typed.
///
/// The builder is pure aside from its rule list: it never touches the
/// registry or the global table. Candidates from rules at the same
/// position are concatenated in rule-insertion order; duplicates are not
/// removed, so overlapping rules should not be registered when uniqueness
/// matters.
#[derive(Default)]
pub struct SuggestionBuilder {
    rules: Vec<SuggestionRule>,
}

impl SuggestionBuilder {
    /// Create a builder with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule with a static candidate list.
    pub fn rule<I, S>(self, position: impl Into<ArgPosition>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = candidates.into_iter().map(Into::into).collect();
        self.provider(position, move |_, _| list.clone())
    }

    /// Add a rule with a static candidate list, gated by a predicate over
    /// the caller and the partial token already typed.
    pub fn rule_if<P, I, S>(self, position: impl Into<ArgPosition>, predicate: P, candidates: I) -> Self
    where
        P: Fn(&dyn Caller, &str) -> bool + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = candidates.into_iter().map(Into::into).collect();
        self.provider_if(position, predicate, move |_, _| list.clone())
    }

    /// Add a rule backed by a candidate provider closure.
    pub fn provider<F>(mut self, position: impl Into<ArgPosition>, candidates: F) -> Self
    where
        F: Fn(&dyn Caller, &str) -> Vec<String> + Send + Sync + 'static,
    {
        self.rules.push(SuggestionRule {
            position: position.into(),
            predicate: None,
            candidates: Box::new(candidates),
        });
        self
    }

    /// Add a predicate-gated rule backed by a candidate provider closure.
    pub fn provider_if<P, F>(mut self, position: impl Into<ArgPosition>, predicate: P, candidates: F) -> Self
    where
        P: Fn(&dyn Caller, &str) -> bool + Send + Sync + 'static,
        F: Fn(&dyn Caller, &str) -> Vec<String> + Send + Sync + 'static,
    {
        self.rules.push(SuggestionRule {
            position: position.into(),
            predicate: Some(Box::new(predicate)),
            candidates: Box::new(candidates),
        });
        self
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Build the suggestion list for the argument slot currently being
    /// typed.
    ///
    /// The current position is `args.len()` (1-indexed), and the partial
    /// token is the last argument. Candidates are filtered to
    /// case-insensitive prefix matches of the partial token. Returns an
    /// empty list when no rule matches.
    pub fn build(&self, caller: &dyn Caller, args: &[String]) -> Vec<String> {
        let current = args.len();
        let partial = args.last().map(String::as_str).unwrap_or("");

        let mut suggestions = Vec::new();
        for rule in &self.rules {
            if !rule.position.matches(current) {
                continue;
            }
            if let Some(predicate) = &rule.predicate {
                if !predicate(caller, partial) {
                    continue;
                }
            }
            suggestions.extend((rule.candidates)(caller, partial));
        }

        if !partial.is_empty() {
            let partial_lower = partial.to_lowercase();
            suggestions.retain(|candidate| candidate.to_lowercase().starts_with(&partial_lower));
        }

        suggestions
    }
}

impl fmt::Debug for SuggestionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuggestionBuilder")
            .field("rules", &self.rules.len())
            .finish()
    }
}
