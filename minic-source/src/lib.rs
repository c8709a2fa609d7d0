//! Source code representation and diagnostics management.

use console::style;
use std::{cell::RefCell, fmt};

/// Represents source code.
pub struct Source<'a> {
    /// Original source code.
    pub content: &'a str,
    /// Accumulated diagnostics. Shared by the parser and the code generator.
    pub errors: ErrorReporter,
}

impl<'a> Source<'a> {
    /// Create a new `Source` with the specified `content`.
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            errors: ErrorReporter::new(),
        }
    }

    /// Returns `true` if `Source` has no accumulated errors. Returns `false` otherwise.
    pub fn has_no_errors(&self) -> bool {
        self.errors.error_count() == 0
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(content: &'a str) -> Self {
        Source::new(content)
    }
}

/// A 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Which phase produced a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Reported by the parser. The parser recovers and keeps going.
    Syntax,
    /// Type, lookup and arity errors reported during IR lowering.
    Semantic,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Syntax => write!(f, "syntax"),
            DiagnosticKind::Semantic => write!(f, "semantic"),
        }
    }
}

/// Represents a compile time error.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// The offending lexeme, if the error was caused by a specific token.
    pub lexeme: Option<String>,
    pub position: Position,
}

impl Diagnostic {
    /// Create a new syntax error blaming the token `lexeme` at `position`.
    pub fn syntax(message: impl ToString, lexeme: impl ToString, position: Position) -> Self {
        Self {
            kind: DiagnosticKind::Syntax,
            message: message.to_string(),
            lexeme: Some(lexeme.to_string()),
            position,
        }
    }

    /// Create a new semantic error at `position`.
    pub fn semantic(message: impl ToString, position: Position) -> Self {
        Self {
            kind: DiagnosticKind::Semantic,
            message: message.to_string(),
            lexeme: None,
            position,
        }
    }

    /// Same as the [`fmt::Display`] output but with a colored header (when the terminal supports it).
    pub fn styled(&self) -> String {
        let header = format!("error[{}]", self.kind);
        format!("{}: {}", style(header).red().bold(), self.body())
    }

    fn body(&self) -> String {
        match &self.lexeme {
            Some(lexeme) => format!(
                "{}\n  --> '{}' at line {}, column {}",
                self.message, lexeme, self.position.line, self.position.column
            ),
            None => format!(
                "{}\n  --> line {}, column {}",
                self.message, self.position.line, self.position.column
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.kind, self.body())
    }
}

/// Manages all the errors.
pub struct ErrorReporter {
    errors: RefCell<Vec<Diagnostic>>,
}

impl ErrorReporter {
    /// Create an empty `ErrorReporter`.
    pub fn new() -> Self {
        Self {
            errors: RefCell::new(Vec::new()),
        }
    }

    /// Adds an error to the `ErrorReporter`.
    /// This method uses the interior mutability pattern so that the parser and the code generator
    /// can both hold a shared reference to the same [`Source`].
    pub fn add_error(&self, error: Diagnostic) {
        // This should be the only place where self.errors is borrowed mutably.
        self.errors.borrow_mut().push(error);
    }

    /// Number of errors reported so far.
    pub fn error_count(&self) -> usize {
        self.errors.borrow().len()
    }

    /// Number of errors of a specific kind.
    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.errors.borrow().iter().filter(|e| e.kind == kind).count()
    }

    /// Returns a copy of every error reported so far, in order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors.borrow().clone()
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors.borrow();
        for error in errors.iter() {
            writeln!(f, "{}", error)?;
        }

        Ok(())
    }
}
