use thiserror::Error;

use crate::diag::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Error)]
pub enum FlowError {
    #[error("Use of unassigned local variable `{0}`")]
    UseOfUnassignedLocal(String, Span),

    #[error("Use of possibly unassigned field `{0}`")]
    UseOfUnassignedField(String, Span),

    #[error("Use of unassigned out parameter `{0}`")]
    UseOfUnassignedOutParam(String, Span),

    #[error("The out parameter `{0}` must be assigned to before control leaves the current method")]
    OutParamNotAssigned(String, Span),

    #[error("Control cannot fall through from one case label (`{0}`) to another")]
    SwitchFallThrough(String, Span),

    #[error("No enclosing loop out of which to break or continue")]
    NoEnclosingLoop(Span),

    #[error("A goto case statement is only valid inside a switch statement")]
    GotoCaseNotInSwitch(Span),

    #[error("Control cannot leave the body of a finally clause")]
    LeaveFinallyClause(Span),

    #[error("No such label `{0}` within the scope of the goto statement")]
    NoSuchLabel(String, Span),

    #[error("The label `{0}` is a duplicate")]
    DuplicateLabel(String, Span),

    #[error("Unreachable code detected")]
    UnreachableCode(Span),

    #[error("Struct member `{0}.{1}` of type `{2}` causes a cycle in the struct layout")]
    StructLayoutCycle(String, String, String, Span),
}

impl FlowError {
    /// Stable numeric diagnostic code, matching the C#-family compiler this
    /// engine is modeled on.
    pub fn code(&self) -> u32 {
        match self {
            FlowError::UseOfUnassignedLocal(..) => 165,
            FlowError::UseOfUnassignedField(..) => 170,
            FlowError::UseOfUnassignedOutParam(..) => 269,
            FlowError::OutParamNotAssigned(..) => 177,
            FlowError::SwitchFallThrough(..) => 163,
            FlowError::NoEnclosingLoop(..) => 139,
            FlowError::GotoCaseNotInSwitch(..) => 153,
            FlowError::LeaveFinallyClause(..) => 157,
            FlowError::NoSuchLabel(..) => 159,
            FlowError::DuplicateLabel(..) => 140,
            FlowError::UnreachableCode(..) => 162,
            FlowError::StructLayoutCycle(..) => 523,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            FlowError::UnreachableCode(..) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Formats the diagnostic the way the compiler driver prints it:
    /// `(line,col): error CS0165: message`.
    pub fn render(&self) -> String {
        let start = self.span().start;
        let kind = match self.severity() {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        format!(
            "({},{}): {} CS{:04}: {}",
            start.line,
            start.column,
            kind,
            self.code(),
            self
        )
    }

    pub fn span(&self) -> Span {
        match self {
            FlowError::UseOfUnassignedLocal(_, span)
            | FlowError::UseOfUnassignedField(_, span)
            | FlowError::UseOfUnassignedOutParam(_, span)
            | FlowError::OutParamNotAssigned(_, span)
            | FlowError::SwitchFallThrough(_, span)
            | FlowError::NoEnclosingLoop(span)
            | FlowError::GotoCaseNotInSwitch(span)
            | FlowError::LeaveFinallyClause(span)
            | FlowError::NoSuchLabel(_, span)
            | FlowError::DuplicateLabel(_, span)
            | FlowError::UnreachableCode(span)
            | FlowError::StructLayoutCycle(_, _, _, span) => *span,
        }
    }
}
