//! Maps backend log lines to progress text.
//!
//! Classification is advisory: it feeds status notes, never state changes.

/// A substring to look for and the status text it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRule {
    /// Case-sensitive substring matched against each log line.
    pub needle: String,
    /// Status text published when the needle matches.
    pub message: String,
}

impl ClassifierRule {
    /// Builds a rule mapping `needle` to `message`.
    #[must_use]
    pub fn new(needle: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            message: message.into(),
        }
    }
}

/// Ordered rule table; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogClassifier {
    rules: Vec<ClassifierRule>,
}

const DEFAULT_RULES: &[(&str, &str)] = &[
    ("Uvicorn running on", "Backend server is listening"),
    ("Application startup complete", "Backend application started"),
    ("Creating virtual environment", "Creating the backend environment"),
    ("Resolved", "Resolving backend dependencies"),
    ("Downloading", "Downloading backend dependencies"),
    ("Installing", "Installing backend dependencies"),
    ("Installed", "Backend dependencies installed"),
    ("Loading model", "Loading models"),
];

impl Default for LogClassifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(needle, message)| ClassifierRule::new(*needle, *message))
                .collect(),
        }
    }
}

impl LogClassifier {
    /// Builds a classifier that recognises nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule, evaluated after every existing rule.
    #[must_use]
    pub fn with_rule(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push(ClassifierRule::new(needle, message));
        self
    }

    /// Returns the status text for `line`, if any rule matches.
    #[must_use]
    pub fn classify(&self, line: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| line.contains(rule.needle.as_str()))
            .map(|rule| rule.message.as_str())
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }
}
