//! The resolved statement tree the flow engine consumes.
//!
//! Name binding has already happened: every variable reference carries the
//! [`VarId`] its resolver assigned, and every struct type is defined in the
//! module's [`TypeTable`]. The engine only observes this tree; it never
//! rewrites it.

use std::fmt;

use crate::diag::Span;
use crate::types::{Type, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub u32);

#[derive(Debug, Clone)]
pub struct Module {
    pub types: TypeTable,
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    Value,
    Ref,
    Out,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: VarId,
    pub name: String,
    pub ty: Type,
    pub mode: ParamMode,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Block),
    VarDecl {
        id: VarId,
        name: String,
        ty: Type,
        init: Option<Expr>,
    },
    Assign {
        place: Expr,
        value: Expr,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then_body: Box<Stmt>,
        else_body: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Vec<Stmt>,
        body: Box<Stmt>,
    },
    Switch {
        scrutinee: Expr,
        sections: Vec<SwitchSection>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Throw(Option<Expr>),
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Goto(String),
    GotoCase(i64),
    GotoDefault,
}

#[derive(Debug, Clone)]
pub struct SwitchSection {
    pub labels: Vec<CaseLabel>,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseLabel {
    Case(i64),
    Default,
}

impl fmt::Display for CaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseLabel::Case(value) => write!(f, "case {value}:"),
            CaseLabel::Default => write!(f, "default:"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    /// The caught exception binding, if any; it is assigned on entry.
    pub var: Option<(VarId, String, Type)>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn var(id: VarId, span: Span) -> Self {
        Self::new(ExprKind::Var(id), span)
    }

    pub fn field(base: Expr, name: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExprKind::Field {
                base: Box::new(base),
                name: name.into(),
            },
            span,
        )
    }

    pub fn int(value: i64, span: Span) -> Self {
        Self::new(ExprKind::IntLit(value), span)
    }

    pub fn boolean(value: bool, span: Span) -> Self {
        Self::new(ExprKind::BoolLit(value), span)
    }

    /// Whether this expression denotes a variable or a field path rooted in
    /// one, i.e. something a descriptor can be resolved for.
    pub fn is_place(&self) -> bool {
        match &self.kind {
            ExprKind::Var(_) => true,
            ExprKind::Field { base, .. } => base.is_place(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Var(VarId),
    Field {
        base: Box<Expr>,
        name: String,
    },
    IntLit(i64),
    BoolLit(bool),
    StringLit(String),
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Arg>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    Value,
    Ref,
    Out,
}

#[derive(Debug, Clone)]
pub struct Arg {
    pub mode: ArgMode,
    pub expr: Expr,
}

impl Arg {
    pub fn value(expr: Expr) -> Self {
        Self {
            mode: ArgMode::Value,
            expr,
        }
    }

    pub fn by_ref(expr: Expr) -> Self {
        Self {
            mode: ArgMode::Ref,
            expr,
        }
    }

    pub fn out(expr: Expr) -> Self {
        Self {
            mode: ArgMode::Out,
            expr,
        }
    }
}
