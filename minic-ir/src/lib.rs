//! A small typed SSA intermediate representation with basic blocks and phi nodes.
//!
//! Modules are built through the [`builder::Backend`] trait, printed as LLVM-flavoured text with
//! [`std::fmt::Display`] and can be executed directly by [`interp::Interpreter`].

pub mod builder;
mod display;
pub mod interp;

/// A first class IR type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// Booleans.
    I1,
    I32,
    F32,
    /// Only valid as a function return type.
    Void,
    /// The address of an `alloca` slot or a global.
    Ptr,
}

/// A virtual register. Numbered per function in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(pub u32);

/// Index of a [`BasicBlock`] in [`Function::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// Index of a [`Function`] in [`Module::functions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub usize);

/// Index of a [`Global`] in [`Module::globals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub usize);

/// An instruction operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    ConstInt(i32),
    ConstFloat(f32),
    ConstBool(bool),
    /// The result of an earlier instruction.
    Reg(Reg, Type),
    /// The `n`-th parameter of the enclosing function.
    Param(u32, Type),
    /// The address of a global variable.
    Global(GlobalId),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::ConstInt(_) => Type::I32,
            Value::ConstFloat(_) => Type::F32,
            Value::ConstBool(_) => Type::I1,
            Value::Reg(_, ty) | Value::Param(_, ty) => *ty,
            Value::Global(_) => Type::Ptr,
        }
    }

    /// The zero value of `ty` (`0`, `false` or `0.0`). `None` for types without constants.
    pub fn zero(ty: Type) -> Option<Value> {
        match ty {
            Type::I1 => Some(Value::ConstBool(false)),
            Type::I32 => Some(Value::ConstInt(0)),
            Type::F32 => Some(Value::ConstFloat(0.0)),
            Type::Void | Type::Ptr => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl ArithOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::SDiv => "sdiv",
            ArithOp::SRem => "srem",
            ArithOp::FAdd => "fadd",
            ArithOp::FSub => "fsub",
            ArithOp::FMul => "fmul",
            ArithOp::FDiv => "fdiv",
            ArithOp::FRem => "frem",
        }
    }

    /// Type of both operands and of the result.
    pub fn operand_type(&self) -> Type {
        match self {
            ArithOp::Add | ArithOp::Sub | ArithOp::Mul | ArithOp::SDiv | ArithOp::SRem => Type::I32,
            ArithOp::FAdd | ArithOp::FSub | ArithOp::FMul | ArithOp::FDiv | ArithOp::FRem => Type::F32,
        }
    }
}

/// Bitwise operations on `i1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

impl LogicOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
            LogicOp::Xor => "xor",
        }
    }
}

/// Comparison predicates. The `S*` and `Eq`/`Ne` predicates compare integers (or `i1`), the `O*`
/// predicates compare floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl CmpPred {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            CmpPred::Eq => "eq",
            CmpPred::Ne => "ne",
            CmpPred::Slt => "slt",
            CmpPred::Sle => "sle",
            CmpPred::Sgt => "sgt",
            CmpPred::Sge => "sge",
            CmpPred::Oeq => "oeq",
            CmpPred::One => "one",
            CmpPred::Olt => "olt",
            CmpPred::Ole => "ole",
            CmpPred::Ogt => "ogt",
            CmpPred::Oge => "oge",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            CmpPred::Oeq | CmpPred::One | CmpPred::Olt | CmpPred::Ole | CmpPred::Ogt | CmpPred::Oge
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    /// Reserves a stack slot of type `ty`. `dest` holds its address.
    Alloca { dest: Reg, ty: Type },
    Load { dest: Reg, ty: Type, ptr: Value },
    Store { value: Value, ptr: Value },
    Arith { dest: Reg, op: ArithOp, lhs: Value, rhs: Value },
    Logic { dest: Reg, op: LogicOp, lhs: Value, rhs: Value },
    FNeg { dest: Reg, operand: Value },
    /// Signed integer to float conversion.
    IntToFloat { dest: Reg, operand: Value },
    Compare { dest: Reg, pred: CmpPred, lhs: Value, rhs: Value },
    /// `dest` is `None` for `void` callees.
    Call { dest: Option<Reg>, callee: FuncId, args: Vec<Value> },
    /// Selects the value associated with the block control came from.
    Phi { dest: Reg, ty: Type, incoming: Vec<(Value, BlockId)> },
    Br { target: BlockId },
    CondBr { cond: Value, then_block: BlockId, else_block: BlockId },
    Ret { value: Option<Value> },
}

impl Inst {
    /// Returns `true` for instructions that end a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Inst::Br { .. } | Inst::CondBr { .. } | Inst::Ret { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// Unique within the function.
    pub label: String,
    pub insts: Vec<Inst>,
}

impl BasicBlock {
    pub fn terminator(&self) -> Option<&Inst> {
        self.insts.last().filter(|inst| inst.is_terminator())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub ret: Type,
    /// Empty for declarations. The first block is the entry block.
    pub blocks: Vec<BasicBlock>,
    /// Number of registers allocated so far.
    pub(crate) reg_count: u32,
}

impl Function {
    /// Returns `true` if the function has no body (an `extern`).
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    /// Iterates over every instruction of every block.
    pub fn insts(&self) -> impl Iterator<Item = &Inst> {
        self.blocks.iter().flat_map(|block| block.insts.iter())
    }
}

/// A zero initialised global variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: Type,
}

/// A translation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn function_id(&self, name: &str) -> Option<FuncId> {
        self.functions.iter().position(|f| f.name == name).map(FuncId)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global_id(&self, name: &str) -> Option<GlobalId> {
        self.globals.iter().position(|g| g.name == name).map(GlobalId)
    }
}
