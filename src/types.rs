use std::fmt;

use indexmap::IndexMap;

use crate::diag::Span;

/// Types as the flow engine sees them: scalars are opaque single-flag values,
/// structs are value types whose fields are tracked individually. Struct
/// types reference their definition by name so that (erroneous) recursive
/// layouts are expressible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Unit,
    Bool,
    Int32,
    Int64,
    Char,
    String,
    Struct(String),
}

impl Type {
    /// Whether variables of this type need a per-field layout. Everything
    /// else is tracked by a single assigned/unassigned flag.
    pub fn needs_layout(&self) -> bool {
        matches!(self, Type::Struct(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unit => write!(f, "unit"),
            Type::Bool => write!(f, "bool"),
            Type::Int32 => write!(f, "i32"),
            Type::Int64 => write!(f, "i64"),
            Type::Char => write!(f, "char"),
            Type::String => write!(f, "string"),
            Type::Struct(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub span: Span,
}

/// The type/symbol collaborator. The engine asks it exactly one question:
/// the ordered instance-field list of a value type.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    structs: IndexMap<String, StructDef>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_struct(&mut self, def: StructDef) {
        self.structs.insert(def.name.clone(), def);
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    pub fn struct_fields(&self, name: &str) -> Option<&[FieldDef]> {
        self.structs.get(name).map(|def| def.fields.as_slice())
    }
}
