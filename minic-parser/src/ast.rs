use minic_source::Position;
use std::fmt;

/// A type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    Int,
    Bool,
    Float,
    /// Only valid as a return type or as the `(void)` parameter list marker.
    Void,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Int => write!(f, "int"),
            TypeName::Bool => write!(f, "bool"),
            TypeName::Float => write!(f, "float"),
            TypeName::Void => write!(f, "void"),
        }
    }
}

/// A name together with where it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Negate,
    /// `!x`
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// `<`, `<=`, `>` and `>=`.
    pub fn is_relational(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    /// `==` and `!=`.
    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    /// `&&` and `||`.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i32),
    FloatLit(f32),
    BoolLit(bool),
    /// A variable reference (e.g. `foo`).
    Identifier(Ident),
    /// A prefix expression (e.g. `-x`, `!done`).
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        position: Position,
    },
    /// A binary expression (e.g. `1+1`). `position` is the operator's.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        position: Position,
    },
    /// `name = value`. Right associative.
    Assignment { name: Ident, value: Box<Expr> },
    /// A function call (e.g. `add(1, 2)`).
    Call { callee: Ident, args: Vec<Expr> },
    /// Placeholder for an expression that failed to parse.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub ty: TypeName,
    /// `None` only for the `void` marker in `f(void)`.
    pub name: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    /// Never [`TypeName::Void`].
    pub ty: TypeName,
    pub name: Ident,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub local_decls: Vec<VariableDecl>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    /// A bare `;`.
    Empty,
    Block(Block),
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
        position: Position,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        position: Position,
    },
    Return {
        value: Option<Expr>,
        position: Position,
    },
    /// Placeholder for a statement that failed to parse.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub return_type: TypeName,
    pub name: Ident,
    pub params: Vec<Parameter>,
}

impl FunctionSignature {
    /// Parameters with the `void` marker filtered out.
    pub fn named_params(&self) -> impl Iterator<Item = (&Ident, TypeName)> {
        self.params
            .iter()
            .filter_map(|param| param.name.as_ref().map(|name| (name, param.ty)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub signature: FunctionSignature,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Variable(VariableDecl),
    Function(FunctionDef),
}

/// The root of the AST.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub externs: Vec<FunctionSignature>,
    pub items: Vec<Item>,
}
