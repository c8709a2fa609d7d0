//! Lowers the AST into IR through a [`Backend`].

use crate::scope::{Local, ScopeStack};
use minic_ir::builder::Backend;
use minic_ir::{ArithOp, BlockId, CmpPred, FuncId, LogicOp, Type, Value};
use minic_parser::ast::*;
use minic_source::{Diagnostic, Position, Source};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// The error has already been added to the [`Source`] diagnostics.
    #[error("error already reported")]
    Reported,
    #[error("internal code generator error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CodegenError>;

/// The IR type of a mini-C type.
pub fn ir_type(ty: TypeName) -> Type {
    match ty {
        TypeName::Int => Type::I32,
        TypeName::Bool => Type::I1,
        TypeName::Float => Type::F32,
        TypeName::Void => Type::Void,
    }
}

/// `0`, `false` or `0.0`.
fn zero_value(ty: TypeName) -> Value {
    match ty {
        TypeName::Bool => Value::ConstBool(false),
        TypeName::Float => Value::ConstFloat(0.0),
        TypeName::Int | TypeName::Void => Value::ConstInt(0),
    }
}

/// A lowered expression together with its mini-C type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypedValue {
    pub ty: TypeName,
    pub value: Value,
}

impl TypedValue {
    fn new(ty: TypeName, value: Value) -> Self {
        Self { ty, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FunctionSymbol {
    id: FuncId,
    return_type: TypeName,
    params: Vec<TypeName>,
    /// `false` for externs that have not (yet) been given a body.
    defined: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum GlobalSymbol {
    Variable { ty: TypeName, ptr: Value },
    Function(FunctionSymbol),
}

/// State of the function being generated.
struct FunctionState {
    id: FuncId,
    return_type: TypeName,
    /// The block instructions are appended to.
    block: BlockId,
    /// Whether `block` already ends with a terminator.
    terminated: bool,
}

fn expr_position(expr: &Expr) -> Option<Position> {
    match expr {
        Expr::Identifier(ident) => Some(ident.position),
        Expr::Unary { position, .. } | Expr::Binary { position, .. } => Some(*position),
        Expr::Assignment { name, .. } => Some(name.position),
        Expr::Call { callee, .. } => Some(callee.position),
        Expr::IntLit(_) | Expr::FloatLit(_) | Expr::BoolLit(_) | Expr::Error => None,
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "argument"
    } else {
        "arguments"
    }
}

/// Generate IR from an abstract syntax tree.
pub struct Codegen<'a, B: Backend> {
    backend: B,
    source: &'a Source<'a>,
    /// Module level names: global variables and functions.
    globals: HashMap<String, GlobalSymbol>,
    /// Every block entered pushes a scope, leaving it pops the scope.
    scopes: ScopeStack,
    current: Option<FunctionState>,
}

impl<'a, B: Backend> Codegen<'a, B> {
    pub fn new(backend: B, source: &'a Source<'a>) -> Self {
        Self {
            backend,
            source,
            globals: HashMap::new(),
            scopes: ScopeStack::new(),
            current: None,
        }
    }

    /// Consumes `self` and returns the backend with everything generated so far.
    #[must_use]
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Generates every extern, global and function of `program`.
    /// Semantic errors are reported to the [`Source`] and skip the rest of the offending item.
    pub fn codegen_program(&mut self, program: &Program) {
        for signature in &program.externs {
            let result = self.declare_function(signature, false).map(|_| ());
            self.report_internal(result);
        }

        for item in &program.items {
            let result = match item {
                Item::Variable(decl) => self.codegen_global(decl),
                Item::Function(def) => self.codegen_function(def),
            };
            self.report_internal(result);
        }
    }

    fn report_internal(&self, result: Result<()>) {
        if let Err(CodegenError::Internal(message)) = result {
            self.source
                .errors
                .add_error(Diagnostic::semantic(format!("internal error: {}", message), Position::default()));
        }
    }

    /// Reports a semantic error and returns [`CodegenError::Reported`].
    fn error<T>(&self, message: impl ToString, position: Position) -> Result<T> {
        self.source.errors.add_error(Diagnostic::semantic(message, position));
        Err(CodegenError::Reported)
    }
}

/* Declarations */
impl<'a, B: Backend> Codegen<'a, B> {
    fn codegen_global(&mut self, decl: &VariableDecl) -> Result<()> {
        let name = &decl.name.name;
        if self.globals.contains_key(name) {
            return self.error(format!("redefinition of '{}'", name), decl.name.position);
        }

        let ptr = self.backend.get_or_declare_global(name, ir_type(decl.ty));
        self.globals
            .insert(name.clone(), GlobalSymbol::Variable { ty: decl.ty, ptr });
        Ok(())
    }

    /// Declares the function described by `signature`. When `defining`, a matching earlier extern is
    /// reused so that the definition provides its body.
    fn declare_function(&mut self, signature: &FunctionSignature, defining: bool) -> Result<FuncId> {
        let name = &signature.name.name;
        let mut seen = Vec::new();
        for (param, _) in signature.named_params() {
            if seen.contains(&param.name.as_str()) {
                return self.error(
                    format!("duplicate parameter '{}' in '{}'", param.name, name),
                    param.position,
                );
            }
            seen.push(param.name.as_str());
        }

        let params: Vec<TypeName> = signature.named_params().map(|(_, ty)| ty).collect();
        match self.globals.get_mut(name) {
            None => {
                let ir_params: Vec<(String, Type)> = signature
                    .named_params()
                    .map(|(param, ty)| (param.name.clone(), ir_type(ty)))
                    .collect();
                let id = self
                    .backend
                    .declare_function(name, &ir_params, ir_type(signature.return_type));
                self.globals.insert(
                    name.clone(),
                    GlobalSymbol::Function(FunctionSymbol {
                        id,
                        return_type: signature.return_type,
                        params,
                        defined: defining,
                    }),
                );
                Ok(id)
            }
            Some(GlobalSymbol::Function(symbol))
                if !symbol.defined
                    && symbol.return_type == signature.return_type
                    && symbol.params == params =>
            {
                symbol.defined = defining;
                Ok(symbol.id)
            }
            Some(_) => self.error(format!("redefinition of '{}'", name), signature.name.position),
        }
    }

    fn codegen_function(&mut self, def: &FunctionDef) -> Result<()> {
        let id = self.declare_function(&def.signature, true)?;
        let entry = self.backend.create_block(id, "entry");
        self.backend.set_insert_point(id, entry);
        self.current = Some(FunctionState {
            id,
            return_type: def.signature.return_type,
            block: entry,
            terminated: false,
        });

        let result = self.codegen_function_body(def);
        self.scopes.clear();
        self.current = None;
        result
    }

    fn codegen_function_body(&mut self, def: &FunctionDef) -> Result<()> {
        // parameters live in their own scope around the body block
        self.scopes.push();
        for (index, (param, ty)) in def.signature.named_params().enumerate() {
            let slot = self.backend.emit_alloca(ir_type(ty));
            self.backend
                .emit_store(Value::Param(index as u32, ir_type(ty)), slot);
            self.scopes.declare(&param.name, Local { ty, ptr: slot });
        }

        let body_value = self.codegen_block(&def.body)?;

        if !self.state()?.terminated {
            match def.signature.return_type {
                TypeName::Void => self.backend.emit_return(None),
                ty => {
                    let value = match body_value {
                        Some(body_value) if body_value.ty == ty => body_value.value,
                        _ => zero_value(ty),
                    };
                    self.backend.emit_return(Some(value));
                }
            }
            self.state_mut()?.terminated = true;
        }
        Ok(())
    }
}

/* Statements */
impl<'a, B: Backend> Codegen<'a, B> {
    fn state(&self) -> Result<&FunctionState> {
        self.current
            .as_ref()
            .ok_or_else(|| CodegenError::Internal("statement outside of a function".to_string()))
    }

    fn state_mut(&mut self) -> Result<&mut FunctionState> {
        self.current
            .as_mut()
            .ok_or_else(|| CodegenError::Internal("statement outside of a function".to_string()))
    }

    fn create_block(&mut self, name: &str) -> Result<BlockId> {
        let func = self.state()?.id;
        Ok(self.backend.create_block(func, name))
    }

    /// Makes `block` the insertion point.
    fn switch_to(&mut self, block: BlockId) -> Result<()> {
        let state = self.state_mut()?;
        state.block = block;
        state.terminated = false;
        let func = state.id;
        self.backend.set_insert_point(func, block);
        Ok(())
    }

    /// Ends the current block with a branch to `target` unless it is already terminated.
    /// Returns the block that branched, if any.
    fn branch_to(&mut self, target: BlockId) -> Result<Option<BlockId>> {
        let state = self.state_mut()?;
        if state.terminated {
            return Ok(None);
        }
        state.terminated = true;
        let from = state.block;
        self.backend.emit_branch(target);
        Ok(Some(from))
    }

    /// Lowers a block in a new scope. Returns the value of the block: the value of its last
    /// statement if that statement produces one.
    fn codegen_block(&mut self, block: &Block) -> Result<Option<TypedValue>> {
        self.scopes.push();
        let result = self.codegen_block_contents(block);
        self.scopes.pop();
        result
    }

    fn codegen_block_contents(&mut self, block: &Block) -> Result<Option<TypedValue>> {
        for decl in &block.local_decls {
            let ty = ir_type(decl.ty);
            let slot = self.backend.emit_alloca(ty);
            if !self.scopes.declare(&decl.name.name, Local { ty: decl.ty, ptr: slot }) {
                return self.error(
                    format!("redefinition of '{}' in the same block", decl.name.name),
                    decl.name.position,
                );
            }
            self.backend.emit_store(zero_value(decl.ty), slot);
        }

        let mut value = None;
        for stmt in &block.statements {
            value = self.codegen_stmt(stmt)?;
        }
        Ok(value)
    }

    fn codegen_stmt(&mut self, stmt: &Stmt) -> Result<Option<TypedValue>> {
        if self.state()?.terminated {
            // code after a return: keep every block to a single terminator
            let dead = self.create_block("dead")?;
            self.switch_to(dead)?;
        }

        match stmt {
            Stmt::Expr(expr) => self.codegen_expr(expr),
            Stmt::Empty => Ok(None),
            Stmt::Block(block) => {
                self.codegen_block(block)?;
                Ok(None)
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
                position,
            } => self.codegen_if(condition, then_block, else_block.as_ref(), *position),
            Stmt::While {
                condition,
                body,
                position,
            } => {
                self.codegen_while(condition, body, *position)?;
                Ok(None)
            }
            Stmt::Return { value, position } => {
                self.codegen_return(value.as_ref(), *position)?;
                Ok(None)
            }
            Stmt::Error => Err(CodegenError::Internal(
                "unparsed statement reached code generation".to_string(),
            )),
        }
    }

    /// Lowers an `if` or `while` condition, which must be a `bool`.
    fn codegen_condition(&mut self, condition: &Expr, keyword: &str, position: Position) -> Result<Value> {
        let condition = self.codegen_value(condition)?;
        if condition.ty != TypeName::Bool {
            return self.error(
                format!("condition of '{}' must be bool, found {}", keyword, condition.ty),
                position,
            );
        }
        Ok(condition.value)
    }

    fn codegen_if(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
        position: Position,
    ) -> Result<Option<TypedValue>> {
        let condition = self.codegen_condition(condition, "if", position)?;

        let then_bb = self.create_block("then")?;
        let else_bb = match else_block {
            Some(_) => Some(self.create_block("else")?),
            None => None,
        };
        let merge_bb = self.create_block("merge")?;
        self.backend
            .emit_cond_branch(condition, then_bb, else_bb.unwrap_or(merge_bb));
        self.state_mut()?.terminated = true;

        self.switch_to(then_bb)?;
        let then_value = self.codegen_block(then_block)?;
        let then_exit = self.branch_to(merge_bb)?;

        let (else_value, else_exit) = match (else_block, else_bb) {
            (Some(else_block), Some(else_bb)) => {
                self.switch_to(else_bb)?;
                let value = self.codegen_block(else_block)?;
                (value, self.branch_to(merge_bb)?)
            }
            _ => (None, None),
        };

        self.switch_to(merge_bb)?;
        match (then_value, then_exit, else_value, else_exit) {
            (Some(then_value), Some(then_exit), Some(else_value), Some(else_exit))
                if then_value.ty == else_value.ty =>
            {
                let phi = self.backend.emit_phi(
                    ir_type(then_value.ty),
                    vec![(then_value.value, then_exit), (else_value.value, else_exit)],
                );
                Ok(Some(TypedValue::new(then_value.ty, phi)))
            }
            _ => Ok(None),
        }
    }

    fn codegen_while(&mut self, condition: &Expr, body: &Stmt, position: Position) -> Result<()> {
        let cond_bb = self.create_block("cond")?;
        let body_bb = self.create_block("body")?;
        let after_bb = self.create_block("after")?;
        self.branch_to(cond_bb)?;

        self.switch_to(cond_bb)?;
        let condition = self.codegen_condition(condition, "while", position)?;
        self.backend.emit_cond_branch(condition, body_bb, after_bb);
        self.state_mut()?.terminated = true;

        self.switch_to(body_bb)?;
        self.codegen_stmt(body)?;
        self.branch_to(cond_bb)?;

        self.switch_to(after_bb)
    }

    fn codegen_return(&mut self, value: Option<&Expr>, position: Position) -> Result<()> {
        let return_type = self.state()?.return_type;
        match (value, return_type) {
            (None, TypeName::Void) => self.backend.emit_return(None),
            (None, ty) => self.backend.emit_return(Some(zero_value(ty))),
            (Some(_), TypeName::Void) => {
                return self.error("void function cannot return a value", position);
            }
            (Some(value), ty) => {
                let value = self.codegen_value(value)?;
                if value.ty != ty {
                    return self.error(
                        format!("return type mismatch: expected {}, found {}", ty, value.ty),
                        position,
                    );
                }
                self.backend.emit_return(Some(value.value));
            }
        }
        self.state_mut()?.terminated = true;
        Ok(())
    }
}

/* Expressions */
impl<'a, B: Backend> Codegen<'a, B> {
    /// Lowers an expression that must produce a value.
    fn codegen_value(&mut self, expr: &Expr) -> Result<TypedValue> {
        match self.codegen_expr(expr)? {
            Some(value) => Ok(value),
            None => self.error(
                "void function call used as a value",
                expr_position(expr).unwrap_or_default(),
            ),
        }
    }

    /// Lowers an expression. Returns `None` only for calls to `void` functions.
    fn codegen_expr(&mut self, expr: &Expr) -> Result<Option<TypedValue>> {
        let value = match expr {
            Expr::IntLit(val) => TypedValue::new(TypeName::Int, Value::ConstInt(*val)),
            Expr::FloatLit(val) => TypedValue::new(TypeName::Float, Value::ConstFloat(*val)),
            Expr::BoolLit(val) => TypedValue::new(TypeName::Bool, Value::ConstBool(*val)),
            Expr::Identifier(ident) => {
                let (ty, ptr) = self.lookup_variable(ident)?;
                let value = self.backend.emit_load(ir_type(ty), ptr);
                TypedValue::new(ty, value)
            }
            Expr::Unary {
                op,
                operand,
                position,
            } => self.codegen_unary(*op, operand, *position)?,
            Expr::Binary {
                op,
                lhs,
                rhs,
                position,
            } => self.codegen_binary(*op, lhs, rhs, *position)?,
            Expr::Assignment { name, value } => {
                let (ty, ptr) = self.lookup_variable(name)?;
                let value = self.codegen_value(value)?;
                if value.ty != ty {
                    return self.error(
                        format!(
                            "cannot assign a value of type {} to '{}' of type {}",
                            value.ty, name.name, ty
                        ),
                        name.position,
                    );
                }
                self.backend.emit_store(value.value, ptr);
                value
            }
            Expr::Call { callee, args } => return self.codegen_call(callee, args),
            Expr::Error => {
                return Err(CodegenError::Internal(
                    "unparsed expression reached code generation".to_string(),
                ))
            }
        };
        Ok(Some(value))
    }

    /// Resolves a variable: innermost local scope first, then globals.
    fn lookup_variable(&self, ident: &Ident) -> Result<(TypeName, Value)> {
        if let Some(local) = self.scopes.lookup(&ident.name) {
            return Ok((local.ty, local.ptr));
        }

        match self.globals.get(&ident.name) {
            Some(GlobalSymbol::Variable { ty, ptr }) => Ok((*ty, *ptr)),
            Some(GlobalSymbol::Function(_)) => self.error(
                format!("'{}' is a function, not a variable", ident.name),
                ident.position,
            ),
            None => self.error(format!("undeclared variable '{}'", ident.name), ident.position),
        }
    }

    fn codegen_call(&mut self, callee: &Ident, args: &[Expr]) -> Result<Option<TypedValue>> {
        let symbol = match self.globals.get(&callee.name) {
            Some(GlobalSymbol::Function(symbol)) => symbol.clone(),
            Some(GlobalSymbol::Variable { .. }) => {
                return self.error(
                    format!("'{}' is a variable, not a function", callee.name),
                    callee.position,
                )
            }
            None => {
                return self.error(
                    format!("call to undeclared function '{}'", callee.name),
                    callee.position,
                )
            }
        };

        // arity first so that a mismatched call emits nothing
        let expected = symbol.params.len();
        if args.len() < expected {
            let missing = expected - args.len();
            return self.error(
                format!(
                    "call to '{}' is missing {} {} (expected {}, found {})",
                    callee.name,
                    missing,
                    plural(missing),
                    expected,
                    args.len()
                ),
                callee.position,
            );
        } else if args.len() > expected {
            let extra = args.len() - expected;
            return self.error(
                format!(
                    "call to '{}' has {} extra {} (expected {}, found {})",
                    callee.name,
                    extra,
                    plural(extra),
                    expected,
                    args.len()
                ),
                callee.position,
            );
        }

        let mut values = Vec::with_capacity(args.len());
        for (index, (arg, ty)) in args.iter().zip(&symbol.params).enumerate() {
            let value = self.codegen_value(arg)?;
            if value.ty != *ty {
                return self.error(
                    format!(
                        "argument {} of '{}' must be {}, found {}",
                        index + 1,
                        callee.name,
                        ty,
                        value.ty
                    ),
                    expr_position(arg).unwrap_or(callee.position),
                );
            }
            values.push(value.value);
        }

        let result = self.backend.emit_call(symbol.id, values);
        Ok(result.map(|value| TypedValue::new(symbol.return_type, value)))
    }

    fn codegen_unary(&mut self, op: UnaryOp, operand: &Expr, position: Position) -> Result<TypedValue> {
        let operand = self.codegen_value(operand)?;
        match (op, operand.ty) {
            (UnaryOp::Negate, TypeName::Int) => {
                let value = self
                    .backend
                    .emit_arithmetic(ArithOp::Sub, Value::ConstInt(0), operand.value);
                Ok(TypedValue::new(TypeName::Int, value))
            }
            (UnaryOp::Negate, TypeName::Float) => {
                let value = self.backend.emit_fneg(operand.value);
                Ok(TypedValue::new(TypeName::Float, value))
            }
            (UnaryOp::Not, TypeName::Bool) => {
                let value = self
                    .backend
                    .emit_logical(LogicOp::Xor, operand.value, Value::ConstBool(true));
                Ok(TypedValue::new(TypeName::Bool, value))
            }
            (UnaryOp::Negate, ty) => self.error(
                format!("unary '-' needs an int or float operand, found {}", ty),
                position,
            ),
            (UnaryOp::Not, ty) => self.error(format!("unary '!' needs a bool operand, found {}", ty), position),
        }
    }

    fn codegen_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, position: Position) -> Result<TypedValue> {
        // both operands are always evaluated, `&&` and `||` do not short-circuit
        let lhs = self.codegen_value(lhs)?;
        let rhs = self.codegen_value(rhs)?;

        if op.is_logical() {
            if lhs.ty != TypeName::Bool || rhs.ty != TypeName::Bool {
                return self.error(
                    format!(
                        "operands of '{}' must be bool, found {} and {}",
                        op.symbol(),
                        lhs.ty,
                        rhs.ty
                    ),
                    position,
                );
            }
            let logic_op = match op {
                BinaryOp::And => LogicOp::And,
                _ => LogicOp::Or,
            };
            let value = self.backend.emit_logical(logic_op, lhs.value, rhs.value);
            return Ok(TypedValue::new(TypeName::Bool, value));
        }

        if op.is_equality() && lhs.ty == TypeName::Bool && rhs.ty == TypeName::Bool {
            let pred = match op {
                BinaryOp::Eq => CmpPred::Eq,
                _ => CmpPred::Ne,
            };
            let value = self.backend.emit_compare(pred, lhs.value, rhs.value);
            return Ok(TypedValue::new(TypeName::Bool, value));
        }

        let (ty, lhs, rhs) = self.coerce_numeric(op, lhs, rhs, position)?;
        let is_float = ty == TypeName::Float;

        if op.is_equality() || op.is_relational() {
            let pred = match (op, is_float) {
                (BinaryOp::Eq, false) => CmpPred::Eq,
                (BinaryOp::Ne, false) => CmpPred::Ne,
                (BinaryOp::Lt, false) => CmpPred::Slt,
                (BinaryOp::Le, false) => CmpPred::Sle,
                (BinaryOp::Gt, false) => CmpPred::Sgt,
                (BinaryOp::Ge, false) => CmpPred::Sge,
                (BinaryOp::Eq, true) => CmpPred::Oeq,
                (BinaryOp::Ne, true) => CmpPred::One,
                (BinaryOp::Lt, true) => CmpPred::Olt,
                (BinaryOp::Le, true) => CmpPred::Ole,
                (BinaryOp::Gt, true) => CmpPred::Ogt,
                (_, _) => CmpPred::Oge,
            };
            let value = self.backend.emit_compare(pred, lhs, rhs);
            return Ok(TypedValue::new(TypeName::Bool, value));
        }

        let arith_op = match (op, is_float) {
            (BinaryOp::Add, false) => ArithOp::Add,
            (BinaryOp::Sub, false) => ArithOp::Sub,
            (BinaryOp::Mul, false) => ArithOp::Mul,
            (BinaryOp::Div, false) => ArithOp::SDiv,
            (BinaryOp::Rem, false) => ArithOp::SRem,
            (BinaryOp::Add, true) => ArithOp::FAdd,
            (BinaryOp::Sub, true) => ArithOp::FSub,
            (BinaryOp::Mul, true) => ArithOp::FMul,
            (BinaryOp::Div, true) => ArithOp::FDiv,
            (BinaryOp::Rem, true) => ArithOp::FRem,
            (op, _) => {
                return Err(CodegenError::Internal(format!(
                    "'{}' is not an arithmetic operator",
                    op.symbol()
                )))
            }
        };
        let value = self.backend.emit_arithmetic(arith_op, lhs, rhs);
        Ok(TypedValue::new(ty, value))
    }

    /// Brings two numeric operands to a common type, widening `int` to `float` when they differ.
    fn coerce_numeric(
        &mut self,
        op: BinaryOp,
        lhs: TypedValue,
        rhs: TypedValue,
        position: Position,
    ) -> Result<(TypeName, Value, Value)> {
        match (lhs.ty, rhs.ty) {
            (TypeName::Int, TypeName::Int) => Ok((TypeName::Int, lhs.value, rhs.value)),
            (TypeName::Float, TypeName::Float) => Ok((TypeName::Float, lhs.value, rhs.value)),
            (TypeName::Int, TypeName::Float) => {
                let lhs = self.backend.emit_int_to_float(lhs.value);
                Ok((TypeName::Float, lhs, rhs.value))
            }
            (TypeName::Float, TypeName::Int) => {
                let rhs = self.backend.emit_int_to_float(rhs.value);
                Ok((TypeName::Float, lhs.value, rhs))
            }
            (lhs_ty, rhs_ty) => self.error(
                format!(
                    "operator '{}' cannot be applied to {} and {}",
                    op.symbol(),
                    lhs_ty,
                    rhs_ty
                ),
                position,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen_module;
    use insta::assert_snapshot;
    use minic_ir::{Inst, Module};
    use minic_parser::parser::Parser;
    use minic_source::{Diagnostic, DiagnosticKind, Source};

    fn compile(source: &str) -> (Module, Vec<Diagnostic>) {
        let source: Source = source.into();
        let program = Parser::new(&source).parse_program();
        assert!(source.has_no_errors(), "{}", source.errors);
        let module = codegen_module("test", &program, &source);
        let errors = source.errors.diagnostics();
        assert!(errors.iter().all(|e| e.kind == DiagnosticKind::Semantic));
        (module, errors)
    }

    fn ir(source: &str) -> String {
        let (module, errors) = compile(source);
        assert!(errors.is_empty(), "{:?}", errors);
        module.to_string()
    }

    /// The single error reported for `source`.
    fn error(source: &str) -> String {
        let (_, errors) = compile(source);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        errors[0].message.clone()
    }

    fn count_calls(module: &Module) -> usize {
        module
            .functions
            .iter()
            .flat_map(|f| f.insts())
            .filter(|inst| matches!(inst, Inst::Call { .. }))
            .count()
    }

    #[test]
    fn test_function_with_params() {
        assert_snapshot!(ir("int add(int a, int b) { return a + b; }"), @r###"
        ; ModuleID = 'test'
        source_filename = "test"

        define i32 @add(i32 %arg.a, i32 %arg.b) {
        entry:
          %t0 = alloca i32
          %t1 = alloca i32
          store i32 %arg.a, ptr %t0
          store i32 %arg.b, ptr %t1
          %t2 = load i32, ptr %t0
          %t3 = load i32, ptr %t1
          %t4 = add i32 %t2, %t3
          ret i32 %t4
        }
        "###);
    }

    #[test]
    fn test_if_else_values_merge_with_phi() {
        assert_snapshot!(ir("int pick(bool c) { if (c) { 1; } else { 2; } }"), @r###"
        ; ModuleID = 'test'
        source_filename = "test"

        define i32 @pick(i1 %arg.c) {
        entry:
          %t0 = alloca i1
          store i1 %arg.c, ptr %t0
          %t1 = load i1, ptr %t0
          br i1 %t1, label %then, label %else

        then:
          br label %merge

        else:
          br label %merge

        merge:
          %t2 = phi i32 [ 1, %then ], [ 2, %else ]
          ret i32 %t2
        }
        "###);
    }

    #[test]
    fn test_while_loop() {
        assert_snapshot!(ir("void count(int n) { while (n > 0) n = n - 1; }"), @r###"
        ; ModuleID = 'test'
        source_filename = "test"

        define void @count(i32 %arg.n) {
        entry:
          %t0 = alloca i32
          store i32 %arg.n, ptr %t0
          br label %cond

        cond:
          %t1 = load i32, ptr %t0
          %t2 = icmp sgt i32 %t1, 0
          br i1 %t2, label %body, label %after

        body:
          %t3 = load i32, ptr %t0
          %t4 = sub i32 %t3, 1
          store i32 %t4, ptr %t0
          br label %cond

        after:
          ret void
        }
        "###);
    }

    #[test]
    fn test_globals_externs_and_negation() {
        assert_snapshot!(ir("extern int print_int(int x);\nint g;\nvoid f(void) { g = -g; print_int(g); }"), @r###"
        ; ModuleID = 'test'
        source_filename = "test"

        @g = global i32 0

        declare i32 @print_int(i32)

        define void @f() {
        entry:
          %t0 = load i32, ptr @g
          %t1 = sub i32 0, %t0
          store i32 %t1, ptr @g
          %t2 = load i32, ptr @g
          %t3 = call i32 @print_int(i32 %t2)
          ret void
        }
        "###);
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_snapshot!(ir("float scale(int a) { return a * 2.5; }"), @r###"
        ; ModuleID = 'test'
        source_filename = "test"

        define float @scale(i32 %arg.a) {
        entry:
          %t0 = alloca i32
          store i32 %arg.a, ptr %t0
          %t1 = load i32, ptr %t0
          %t2 = sitofp i32 %t1 to float
          %t3 = fmul float %t2, 0x4004000000000000
          ret float %t3
        }
        "###);
    }

    #[test]
    fn test_locals_are_zero_initialised() {
        assert_snapshot!(ir("bool f(void) { bool b; float x; return !b; }"), @r###"
        ; ModuleID = 'test'
        source_filename = "test"

        define i1 @f() {
        entry:
          %t0 = alloca i1
          %t1 = alloca float
          store i1 false, ptr %t0
          store float 0x0000000000000000, ptr %t1
          %t2 = load i1, ptr %t0
          %t3 = xor i1 %t2, true
          ret i1 %t3
        }
        "###);
    }

    #[test]
    fn test_code_after_return_goes_to_dead_block() {
        let (module, errors) = compile("int f(void) { return 1; 2; return 3; }");
        assert!(errors.is_empty());
        let function = module.function("f").unwrap();
        assert_eq!(function.blocks.len(), 2);
        assert_eq!(function.blocks[1].label, "dead");
        assert!(function.blocks.iter().all(|block| block
            .insts
            .iter()
            .filter(|inst| inst.is_terminator())
            .count()
            == 1));
    }

    #[test]
    fn test_every_block_is_terminated() {
        let (module, errors) = compile(
            "int f(int n) {\n\
               if (n > 0) { return 1; } else { n = 2; }\n\
               while (n < 10) { if (n == 5) { return n; } n = n + 1; }\n\
             }",
        );
        assert!(errors.is_empty(), "{:?}", errors);
        let function = module.function("f").unwrap();
        for block in &function.blocks {
            assert!(block.terminator().is_some(), "block {} is not terminated", block.label);
            assert!(block.insts[..block.insts.len() - 1].iter().all(|inst| !inst.is_terminator()));
        }
    }

    #[test]
    fn test_return_without_value_in_int_function() {
        let (module, errors) = compile("int f(void) { return; }");
        assert!(errors.is_empty());
        let ret = module.function("f").unwrap().insts().last().cloned();
        assert_eq!(
            ret,
            Some(Inst::Ret {
                value: Some(minic_ir::Value::ConstInt(0))
            })
        );
    }

    #[test]
    fn test_extern_then_definition() {
        let (module, errors) = compile("extern int f(int x);\nint f(int y) { return y; }");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(module.functions.len(), 1);
        assert!(!module.functions[0].is_declaration());
    }

    #[test]
    fn test_redefinitions() {
        assert_eq!(
            error("extern int f(int x);\nfloat f(int y) { return 1.0; }"),
            "redefinition of 'f'"
        );
        assert_eq!(error("int f(void) { return 1; }\nint f(void) { return 2; }"), "redefinition of 'f'");
        assert_eq!(error("int x;\nfloat x;"), "redefinition of 'x'");
        assert_eq!(error("int x;\nint x(void) { return 1; }"), "redefinition of 'x'");
        assert_eq!(
            error("int f(void) { int a; float a; return 1; }"),
            "redefinition of 'a' in the same block"
        );
        assert_eq!(
            error("int f(int a, int a) { return a; }"),
            "duplicate parameter 'a' in 'f'"
        );
    }

    #[test]
    fn test_type_errors() {
        assert_eq!(
            error("int f(void) { return 1 + true; }"),
            "operator '+' cannot be applied to int and bool"
        );
        assert_eq!(
            error("bool f(void) { return 1.0 == false; }"),
            "operator '==' cannot be applied to float and bool"
        );
        assert_eq!(
            error("bool f(void) { return 1 && true; }"),
            "operands of '&&' must be bool, found int and bool"
        );
        assert_eq!(
            error("int f(void) { return -true; }"),
            "unary '-' needs an int or float operand, found bool"
        );
        assert_eq!(error("bool f(void) { return !1; }"), "unary '!' needs a bool operand, found int");
        assert_eq!(
            error("void f(void) { int x; x = 1.5; }"),
            "cannot assign a value of type float to 'x' of type int"
        );
        assert_eq!(
            error("int f(void) { return 1.5; }"),
            "return type mismatch: expected int, found float"
        );
        assert_eq!(error("void f(void) { return 1; }"), "void function cannot return a value");
        assert_eq!(
            error("void f(int n) { if (n) { } }"),
            "condition of 'if' must be bool, found int"
        );
        assert_eq!(
            error("void f(int n) { while (n - 1) n = 0; }"),
            "condition of 'while' must be bool, found int"
        );
        assert_eq!(
            error("bool f(void) { return 1 < 2 < 3; }"),
            "operator '<' cannot be applied to bool and int"
        );
    }

    #[test]
    fn test_bool_equality_is_allowed() {
        let (_, errors) = compile("bool f(bool a, bool b) { return a == b != false; }");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_lookup_errors() {
        assert_eq!(error("int f(void) { return y; }"), "undeclared variable 'y'");
        assert_eq!(error("int f(void) { return g(); }"), "call to undeclared function 'g'");
        assert_eq!(
            error("int x;\nint f(void) { return x(); }"),
            "'x' is a variable, not a function"
        );
        assert_eq!(
            error("int f(void) { return f; }"),
            "'f' is a function, not a variable"
        );
        assert_eq!(
            error("extern void print(int x);\nint f(void) { return print(1); }"),
            "void function call used as a value"
        );
        // functions are only visible after their declaration
        assert_eq!(
            error("int f(void) { return g(); }\nint g(void) { return 1; }"),
            "call to undeclared function 'g'"
        );
    }

    #[test]
    fn test_arity_mismatch_emits_no_call() {
        let source = "int add(int a, int b) { return a + b; }\nint main(void) { return add(1); }";
        let (module, errors) = compile(source);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "call to 'add' is missing 1 argument (expected 2, found 1)"
        );
        assert_eq!(count_calls(&module), 0);

        let source = "int add(int a, int b) { return a + b; }\nint main(void) { return add(1, 2, 3); }";
        let (module, errors) = compile(source);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "call to 'add' has 1 extra argument (expected 2, found 3)"
        );
        assert_eq!(count_calls(&module), 0);
    }

    #[test]
    fn test_argument_type_must_match() {
        assert_eq!(
            error("int f(int a) { return a; }\nint g(void) { return f(1.5); }"),
            "argument 1 of 'f' must be int, found float"
        );
    }

    #[test]
    fn test_errors_skip_only_the_offending_function() {
        let (module, errors) = compile(
            "int bad(void) { return y; }\n\
             int good(void) { return 1; }",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].position.line, 1);
        let good = module.function("good").unwrap();
        assert!(good.blocks[0].terminator().is_some());
    }

    #[test]
    fn test_shadowing_uses_inner_slot() {
        let (module, errors) = compile("int f(void) { int x; x = 1; { float x; x = 2.0; } return x; }");
        assert!(errors.is_empty(), "{:?}", errors);
        let allocas = module
            .function("f")
            .unwrap()
            .insts()
            .filter(|inst| matches!(inst, Inst::Alloca { .. }))
            .count();
        assert_eq!(allocas, 2);
    }
}
