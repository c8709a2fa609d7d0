//! The interface the code generator emits through, and the [`Module`] building implementation.

use crate::*;

/// Instruction emission interface.
///
/// Every `emit_*` method appends to the block selected with [`Backend::set_insert_point`], except
/// [`Backend::emit_alloca`] which always places the slot at the start of the function's entry block.
pub trait Backend {
    /// Declares a function. Declaring an existing name returns the existing function unchanged.
    fn declare_function(&mut self, name: &str, params: &[(String, Type)], ret: Type) -> FuncId;
    /// Appends a new empty block to `func`. `name` is made unique within the function.
    fn create_block(&mut self, func: FuncId, name: &str) -> BlockId;
    fn set_insert_point(&mut self, func: FuncId, block: BlockId);

    fn emit_alloca(&mut self, ty: Type) -> Value;
    fn emit_load(&mut self, ty: Type, ptr: Value) -> Value;
    fn emit_store(&mut self, value: Value, ptr: Value);
    fn emit_arithmetic(&mut self, op: ArithOp, lhs: Value, rhs: Value) -> Value;
    fn emit_int_to_float(&mut self, value: Value) -> Value;
    fn emit_fneg(&mut self, value: Value) -> Value;
    fn emit_compare(&mut self, pred: CmpPred, lhs: Value, rhs: Value) -> Value;
    fn emit_logical(&mut self, op: LogicOp, lhs: Value, rhs: Value) -> Value;
    /// Returns `None` when the callee returns `void`.
    fn emit_call(&mut self, callee: FuncId, args: Vec<Value>) -> Option<Value>;
    fn emit_branch(&mut self, target: BlockId);
    fn emit_cond_branch(&mut self, cond: Value, then_block: BlockId, else_block: BlockId);
    fn emit_phi(&mut self, ty: Type, incoming: Vec<(Value, BlockId)>) -> Value;
    fn emit_return(&mut self, value: Option<Value>);

    /// Returns the address of the global `name`, declaring it (zero initialised) if needed.
    fn get_or_declare_global(&mut self, name: &str, ty: Type) -> Value;
}

/// Builds an in-memory [`Module`].
pub struct ModuleBuilder {
    module: Module,
    insert_point: Option<(FuncId, BlockId)>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module: Module::new(name),
            insert_point: None,
        }
    }

    /// The module built so far.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Consumes `self` and returns the built [`Module`].
    #[must_use]
    pub fn into_module(self) -> Module {
        self.module
    }

    fn current_function(&mut self) -> &mut Function {
        let (func, _) = self
            .insert_point
            .expect("instruction emitted without an insertion point");
        &mut self.module.functions[func.0]
    }

    fn new_reg(&mut self) -> Reg {
        let function = self.current_function();
        let reg = Reg(function.reg_count);
        function.reg_count += 1;
        reg
    }

    fn push(&mut self, inst: Inst) {
        let (func, block) = self
            .insert_point
            .expect("instruction emitted without an insertion point");
        self.module.functions[func.0].blocks[block.0].insts.push(inst);
    }
}

impl Backend for ModuleBuilder {
    fn declare_function(&mut self, name: &str, params: &[(String, Type)], ret: Type) -> FuncId {
        if let Some(id) = self.module.function_id(name) {
            return id;
        }

        self.module.functions.push(Function {
            name: name.to_string(),
            params: params.to_vec(),
            ret,
            blocks: Vec::new(),
            reg_count: 0,
        });
        FuncId(self.module.functions.len() - 1)
    }

    fn create_block(&mut self, func: FuncId, name: &str) -> BlockId {
        let blocks = &mut self.module.functions[func.0].blocks;
        let uses = blocks
            .iter()
            .filter(|block| block.label.trim_end_matches(|c: char| c.is_ascii_digit()) == name)
            .count();
        let label = match uses {
            0 => name.to_string(),
            n => format!("{}{}", name, n),
        };

        blocks.push(BasicBlock {
            label,
            insts: Vec::new(),
        });
        BlockId(blocks.len() - 1)
    }

    fn set_insert_point(&mut self, func: FuncId, block: BlockId) {
        self.insert_point = Some((func, block));
    }

    fn emit_alloca(&mut self, ty: Type) -> Value {
        let dest = self.new_reg();
        let entry = &mut self.current_function().blocks[0];
        let at = entry
            .insts
            .iter()
            .take_while(|inst| matches!(inst, Inst::Alloca { .. }))
            .count();
        entry.insts.insert(at, Inst::Alloca { dest, ty });
        Value::Reg(dest, Type::Ptr)
    }

    fn emit_load(&mut self, ty: Type, ptr: Value) -> Value {
        let dest = self.new_reg();
        self.push(Inst::Load { dest, ty, ptr });
        Value::Reg(dest, ty)
    }

    fn emit_store(&mut self, value: Value, ptr: Value) {
        self.push(Inst::Store { value, ptr });
    }

    fn emit_arithmetic(&mut self, op: ArithOp, lhs: Value, rhs: Value) -> Value {
        let dest = self.new_reg();
        self.push(Inst::Arith { dest, op, lhs, rhs });
        Value::Reg(dest, op.operand_type())
    }

    fn emit_int_to_float(&mut self, value: Value) -> Value {
        let dest = self.new_reg();
        self.push(Inst::IntToFloat {
            dest,
            operand: value,
        });
        Value::Reg(dest, Type::F32)
    }

    fn emit_fneg(&mut self, value: Value) -> Value {
        let dest = self.new_reg();
        self.push(Inst::FNeg {
            dest,
            operand: value,
        });
        Value::Reg(dest, Type::F32)
    }

    fn emit_compare(&mut self, pred: CmpPred, lhs: Value, rhs: Value) -> Value {
        let dest = self.new_reg();
        self.push(Inst::Compare { dest, pred, lhs, rhs });
        Value::Reg(dest, Type::I1)
    }

    fn emit_logical(&mut self, op: LogicOp, lhs: Value, rhs: Value) -> Value {
        let dest = self.new_reg();
        self.push(Inst::Logic { dest, op, lhs, rhs });
        Value::Reg(dest, Type::I1)
    }

    fn emit_call(&mut self, callee: FuncId, args: Vec<Value>) -> Option<Value> {
        let ret = self.module.functions[callee.0].ret;
        let dest = match ret {
            Type::Void => None,
            _ => Some(self.new_reg()),
        };
        self.push(Inst::Call { dest, callee, args });
        dest.map(|dest| Value::Reg(dest, ret))
    }

    fn emit_branch(&mut self, target: BlockId) {
        self.push(Inst::Br { target });
    }

    fn emit_cond_branch(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) {
        self.push(Inst::CondBr {
            cond,
            then_block,
            else_block,
        });
    }

    fn emit_phi(&mut self, ty: Type, incoming: Vec<(Value, BlockId)>) -> Value {
        let dest = self.new_reg();
        self.push(Inst::Phi { dest, ty, incoming });
        Value::Reg(dest, ty)
    }

    fn emit_return(&mut self, value: Option<Value>) {
        self.push(Inst::Ret { value });
    }

    fn get_or_declare_global(&mut self, name: &str, ty: Type) -> Value {
        if let Some(id) = self.module.global_id(name) {
            return Value::Global(id);
        }

        self.module.globals.push(Global {
            name: name.to_string(),
            ty,
        });
        Value::Global(GlobalId(self.module.globals.len() - 1))
    }
}
