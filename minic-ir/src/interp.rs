//! Direct execution of a [`Module`].
//!
//! Functions without a body are resolved against native callbacks registered with
//! [`Interpreter::add_native_fn`].

use crate::*;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Maximum depth of nested calls before [`RuntimeError::StackOverflow`].
const MAX_CALL_DEPTH: usize = 256;

/// A runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i32),
    Float(f32),
    Bool(bool),
    Ptr(Address),
}

impl Scalar {
    fn zero(ty: Type) -> Scalar {
        match ty {
            Type::I1 => Scalar::Bool(false),
            Type::F32 => Scalar::Float(0.0),
            Type::I32 | Type::Void | Type::Ptr => Scalar::Int(0),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Scalar::Int(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Scalar::Float(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(val) => Some(*val),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(val) => write!(f, "{}", val),
            Scalar::Float(val) => write!(f, "{}", val),
            Scalar::Bool(val) => write!(f, "{}", val),
            Scalar::Ptr(Address::Global(id)) => write!(f, "<global {}>", id.0),
            Scalar::Ptr(Address::Stack(slot)) => write!(f, "<stack {}>", slot),
        }
    }
}

/// Where a pointer points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Global(GlobalId),
    Stack(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("function `{0}` has no body and no native implementation")]
    UnresolvedExtern(String),
    #[error("`{name}` expects {expected} arguments, received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("operands of `{0}` have the wrong type")]
    TypeMismatch(&'static str),
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("use of undefined register %t{0}")]
    UndefinedRegister(u32),
    #[error("block `{0}` does not end with a terminator")]
    MissingTerminator(String),
    #[error("phi in block `{0}` has no value for the incoming edge")]
    PhiWithoutIncoming(String),
    #[error("call depth exceeded {0}")]
    StackOverflow(usize),
    #[error("executed more than {0} instructions")]
    StepLimitExceeded(u64),
}

pub type NativeFn<'n> = Box<dyn FnMut(&[Scalar]) -> Option<Scalar> + 'n>;

/// Executes functions of a [`Module`].
pub struct Interpreter<'m, 'n> {
    module: &'m Module,
    natives: HashMap<String, NativeFn<'n>>,
    globals: Vec<Scalar>,
    /// `alloca` slots of every active call.
    stack: Vec<Scalar>,
    depth: usize,
    steps: u64,
    step_limit: Option<u64>,
}

impl<'m, 'n> Interpreter<'m, 'n> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            natives: HashMap::new(),
            globals: module.globals.iter().map(|global| Scalar::zero(global.ty)).collect(),
            stack: Vec::with_capacity(256),
            depth: 0,
            steps: 0,
            step_limit: None,
        }
    }

    /// Provides the implementation of the body-less function `name`.
    pub fn add_native_fn(
        &mut self,
        name: impl Into<String>,
        func: impl FnMut(&[Scalar]) -> Option<Scalar> + 'n,
    ) {
        self.natives.insert(name.into(), Box::new(func));
    }

    /// Aborts execution with [`RuntimeError::StepLimitExceeded`] after `limit` instructions.
    pub fn set_step_limit(&mut self, limit: u64) {
        self.step_limit = Some(limit);
    }

    /// Current value of the global `name`.
    pub fn global(&self, name: &str) -> Option<Scalar> {
        self.module.global_id(name).map(|id| self.globals[id.0])
    }

    /// Calls the function `name`. Returns `None` for `void` functions.
    pub fn call(&mut self, name: &str, args: &[Scalar]) -> Result<Option<Scalar>, RuntimeError> {
        let id = self
            .module
            .function_id(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;
        self.call_function(id, args.to_vec())
    }

    fn call_function(&mut self, id: FuncId, args: Vec<Scalar>) -> Result<Option<Scalar>, RuntimeError> {
        let module = self.module;
        let function = &module.functions[id.0];

        if args.len() != function.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: function.name.clone(),
                expected: function.params.len(),
                received: args.len(),
            });
        }

        if function.is_declaration() {
            return match self.natives.get_mut(&function.name) {
                Some(native) => Ok(native(&args)),
                None => Err(RuntimeError::UnresolvedExtern(function.name.clone())),
            };
        }

        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow(MAX_CALL_DEPTH));
        }
        self.depth += 1;
        let base = self.stack.len();
        let result = self.run(function, &args);
        self.stack.truncate(base);
        self.depth -= 1;
        result
    }

    fn run(&mut self, function: &Function, args: &[Scalar]) -> Result<Option<Scalar>, RuntimeError> {
        let mut regs = Frame {
            regs: vec![None; function.reg_count as usize],
            args,
        };
        let mut previous: Option<BlockId> = None;
        let mut current = BlockId(0);

        loop {
            let block = function.block(current);
            let mut next = None;

            for inst in &block.insts {
                self.tick()?;
                match inst {
                    Inst::Alloca { dest, ty } => {
                        self.stack.push(Scalar::zero(*ty));
                        regs.set(*dest, Scalar::Ptr(Address::Stack(self.stack.len() - 1)));
                    }
                    Inst::Load { dest, ptr, .. } => {
                        let val = match regs.get(ptr)? {
                            Scalar::Ptr(address) => self.read(address),
                            _ => return Err(RuntimeError::TypeMismatch("load")),
                        };
                        regs.set(*dest, val);
                    }
                    Inst::Store { value, ptr } => {
                        let val = regs.get(value)?;
                        match regs.get(ptr)? {
                            Scalar::Ptr(address) => self.write(address, val),
                            _ => return Err(RuntimeError::TypeMismatch("store")),
                        }
                    }
                    Inst::Arith { dest, op, lhs, rhs } => {
                        let val = arithmetic(*op, regs.get(lhs)?, regs.get(rhs)?)?;
                        regs.set(*dest, val);
                    }
                    Inst::Logic { dest, op, lhs, rhs } => {
                        let val = match (regs.get(lhs)?, regs.get(rhs)?) {
                            (Scalar::Bool(a), Scalar::Bool(b)) => match op {
                                LogicOp::And => a & b,
                                LogicOp::Or => a | b,
                                LogicOp::Xor => a ^ b,
                            },
                            _ => return Err(RuntimeError::TypeMismatch(op.mnemonic())),
                        };
                        regs.set(*dest, Scalar::Bool(val));
                    }
                    Inst::FNeg { dest, operand } => match regs.get(operand)? {
                        Scalar::Float(val) => regs.set(*dest, Scalar::Float(-val)),
                        _ => return Err(RuntimeError::TypeMismatch("fneg")),
                    },
                    Inst::IntToFloat { dest, operand } => match regs.get(operand)? {
                        Scalar::Int(val) => regs.set(*dest, Scalar::Float(val as f32)),
                        _ => return Err(RuntimeError::TypeMismatch("sitofp")),
                    },
                    Inst::Compare { dest, pred, lhs, rhs } => {
                        let val = compare(*pred, regs.get(lhs)?, regs.get(rhs)?)?;
                        regs.set(*dest, Scalar::Bool(val));
                    }
                    Inst::Call { dest, callee, args } => {
                        let args = args.iter().map(|arg| regs.get(arg)).collect::<Result<Vec<_>, _>>()?;
                        let result = self.call_function(*callee, args)?;
                        if let Some(dest) = dest {
                            regs.set(*dest, result.ok_or(RuntimeError::TypeMismatch("call"))?);
                        }
                    }
                    Inst::Phi { dest, incoming, .. } => {
                        let (value, _) = incoming
                            .iter()
                            .find(|(_, block)| Some(*block) == previous)
                            .ok_or_else(|| RuntimeError::PhiWithoutIncoming(block.label.clone()))?;
                        let val = regs.get(value)?;
                        regs.set(*dest, val);
                    }
                    Inst::Br { target } => {
                        next = Some(*target);
                        break;
                    }
                    Inst::CondBr {
                        cond,
                        then_block,
                        else_block,
                    } => {
                        next = match regs.get(cond)? {
                            Scalar::Bool(true) => Some(*then_block),
                            Scalar::Bool(false) => Some(*else_block),
                            _ => return Err(RuntimeError::TypeMismatch("br")),
                        };
                        break;
                    }
                    Inst::Ret { value } => {
                        return value.as_ref().map(|value| regs.get(value)).transpose();
                    }
                }
            }

            match next {
                Some(target) => {
                    previous = Some(current);
                    current = target;
                }
                None => return Err(RuntimeError::MissingTerminator(block.label.clone())),
            }
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(RuntimeError::StepLimitExceeded(limit)),
            _ => Ok(()),
        }
    }

    fn read(&self, address: Address) -> Scalar {
        match address {
            Address::Global(id) => self.globals[id.0],
            Address::Stack(slot) => self.stack[slot],
        }
    }

    fn write(&mut self, address: Address, val: Scalar) {
        match address {
            Address::Global(id) => self.globals[id.0] = val,
            Address::Stack(slot) => self.stack[slot] = val,
        }
    }
}

/// Register file of one call.
struct Frame<'a> {
    regs: Vec<Option<Scalar>>,
    args: &'a [Scalar],
}

impl<'a> Frame<'a> {
    fn get(&self, value: &Value) -> Result<Scalar, RuntimeError> {
        match value {
            Value::ConstInt(val) => Ok(Scalar::Int(*val)),
            Value::ConstFloat(val) => Ok(Scalar::Float(*val)),
            Value::ConstBool(val) => Ok(Scalar::Bool(*val)),
            Value::Reg(reg, _) => self
                .regs
                .get(reg.0 as usize)
                .copied()
                .flatten()
                .ok_or(RuntimeError::UndefinedRegister(reg.0)),
            Value::Param(index, _) => Ok(self.args[*index as usize]),
            Value::Global(id) => Ok(Scalar::Ptr(Address::Global(*id))),
        }
    }

    fn set(&mut self, reg: Reg, val: Scalar) {
        self.regs[reg.0 as usize] = Some(val);
    }
}

fn arithmetic(op: ArithOp, lhs: Scalar, rhs: Scalar) -> Result<Scalar, RuntimeError> {
    match (lhs, rhs) {
        (Scalar::Int(a), Scalar::Int(b)) => {
            let val = match op {
                ArithOp::Add => a.wrapping_add(b),
                ArithOp::Sub => a.wrapping_sub(b),
                ArithOp::Mul => a.wrapping_mul(b),
                ArithOp::SDiv | ArithOp::SRem if b == 0 => return Err(RuntimeError::DivisionByZero),
                ArithOp::SDiv => a.wrapping_div(b),
                ArithOp::SRem => a.wrapping_rem(b),
                _ => return Err(RuntimeError::TypeMismatch(op.mnemonic())),
            };
            Ok(Scalar::Int(val))
        }
        (Scalar::Float(a), Scalar::Float(b)) => {
            let val = match op {
                ArithOp::FAdd => a + b,
                ArithOp::FSub => a - b,
                ArithOp::FMul => a * b,
                ArithOp::FDiv => a / b,
                ArithOp::FRem => a % b,
                _ => return Err(RuntimeError::TypeMismatch(op.mnemonic())),
            };
            Ok(Scalar::Float(val))
        }
        _ => Err(RuntimeError::TypeMismatch(op.mnemonic())),
    }
}

fn compare(pred: CmpPred, lhs: Scalar, rhs: Scalar) -> Result<bool, RuntimeError> {
    let result = match (lhs, rhs) {
        (Scalar::Int(a), Scalar::Int(b)) => match pred {
            CmpPred::Eq => a == b,
            CmpPred::Ne => a != b,
            CmpPred::Slt => a < b,
            CmpPred::Sle => a <= b,
            CmpPred::Sgt => a > b,
            CmpPred::Sge => a >= b,
            _ => return Err(RuntimeError::TypeMismatch("icmp")),
        },
        (Scalar::Bool(a), Scalar::Bool(b)) => match pred {
            CmpPred::Eq => a == b,
            CmpPred::Ne => a != b,
            _ => return Err(RuntimeError::TypeMismatch("icmp")),
        },
        // ordered predicates are false if either operand is NaN, which `PartialOrd` already does
        (Scalar::Float(a), Scalar::Float(b)) => match pred {
            CmpPred::Oeq => a == b,
            CmpPred::One => a < b || a > b,
            CmpPred::Olt => a < b,
            CmpPred::Ole => a <= b,
            CmpPred::Ogt => a > b,
            CmpPred::Oge => a >= b,
            _ => return Err(RuntimeError::TypeMismatch("fcmp")),
        },
        _ => return Err(RuntimeError::TypeMismatch(if pred.is_float() { "fcmp" } else { "icmp" })),
    };
    Ok(result)
}
