use std::fmt::{Display, Formatter, Result};

use crate::errors::{FlowError, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            offset: 0,
            line,
            column,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-length span at a line/column pair; handy for trees built
    /// programmatically rather than parsed from source.
    pub fn at(line: usize, column: usize) -> Self {
        let pos = Position::new(line, column);
        Self::new(pos, pos)
    }

    pub fn merge_all(spans: Vec<Span>) -> Span {
        if spans.is_empty() {
            // Return a harmless 1:1 zero-length span instead of line 0.
            return Span::at(1, 1);
        }
        // Assume spans are in source order; take start from first, end from last.
        let start = spans[0].start;
        let end = spans.last().unwrap().end;
        Span::new(start, end)
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::at(1, 1)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Accumulating diagnostics sink. Reporting never unwinds the analysis; the
/// walk keeps going and the caller inspects the collected list at the end.
#[derive(Debug, Default)]
pub struct Diagnostics {
    reported: Vec<FlowError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: FlowError) {
        self.reported.push(error);
    }

    pub fn errors(&self) -> impl Iterator<Item = &FlowError> {
        self.reported
            .iter()
            .filter(|e| e.severity() == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }

    pub fn into_vec(self) -> Vec<FlowError> {
        self.reported
    }
}
