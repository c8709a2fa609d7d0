//! Textual (LLVM-flavoured) output.

use crate::*;
use std::fmt;

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I1 => write!(f, "i1"),
            Type::I32 => write!(f, "i32"),
            Type::F32 => write!(f, "float"),
            Type::Void => write!(f, "void"),
            Type::Ptr => write!(f, "ptr"),
        }
    }
}

/// Formats a float constant as the hexadecimal bit pattern of the equivalent double.
fn float_constant(val: f32) -> String {
    format!("0x{:016X}", f64::from(val).to_bits())
}

/// Prints operands and block references in the context of one function.
struct FunctionPrinter<'m> {
    module: &'m Module,
    function: &'m Function,
}

impl<'m> FunctionPrinter<'m> {
    fn value(&self, value: &Value) -> String {
        match value {
            Value::ConstInt(val) => val.to_string(),
            Value::ConstFloat(val) => float_constant(*val),
            Value::ConstBool(val) => val.to_string(),
            Value::Reg(reg, _) => format!("%t{}", reg.0),
            Value::Param(index, _) => match self.function.params.get(*index as usize) {
                Some((name, _)) => format!("%arg.{}", name),
                None => format!("%arg.{}", index),
            },
            Value::Global(id) => format!("@{}", self.module.globals[id.0].name),
        }
    }

    /// `ty value`
    fn typed(&self, value: &Value) -> String {
        format!("{} {}", value.ty(), self.value(value))
    }

    fn label(&self, block: BlockId) -> &str {
        &self.function.blocks[block.0].label
    }

    fn inst(&self, f: &mut fmt::Formatter<'_>, inst: &Inst) -> fmt::Result {
        match inst {
            Inst::Alloca { dest, ty } => write!(f, "%t{} = alloca {}", dest.0, ty),
            Inst::Load { dest, ty, ptr } => {
                write!(f, "%t{} = load {}, {}", dest.0, ty, self.typed(ptr))
            }
            Inst::Store { value, ptr } => {
                write!(f, "store {}, {}", self.typed(value), self.typed(ptr))
            }
            Inst::Arith { dest, op, lhs, rhs } => write!(
                f,
                "%t{} = {} {} {}, {}",
                dest.0,
                op.mnemonic(),
                op.operand_type(),
                self.value(lhs),
                self.value(rhs)
            ),
            Inst::Logic { dest, op, lhs, rhs } => write!(
                f,
                "%t{} = {} i1 {}, {}",
                dest.0,
                op.mnemonic(),
                self.value(lhs),
                self.value(rhs)
            ),
            Inst::FNeg { dest, operand } => {
                write!(f, "%t{} = fneg {}", dest.0, self.typed(operand))
            }
            Inst::IntToFloat { dest, operand } => {
                write!(f, "%t{} = sitofp {} to float", dest.0, self.typed(operand))
            }
            Inst::Compare { dest, pred, lhs, rhs } => write!(
                f,
                "%t{} = {} {} {}, {}",
                dest.0,
                if pred.is_float() { "fcmp" } else { "icmp" },
                pred.mnemonic(),
                self.typed(lhs),
                self.value(rhs)
            ),
            Inst::Call { dest, callee, args } => {
                let callee = &self.module.functions[callee.0];
                if let Some(dest) = dest {
                    write!(f, "%t{} = ", dest.0)?;
                }
                let args: Vec<String> = args.iter().map(|arg| self.typed(arg)).collect();
                write!(f, "call {} @{}({})", callee.ret, callee.name, args.join(", "))
            }
            Inst::Phi { dest, ty, incoming } => {
                let incoming: Vec<String> = incoming
                    .iter()
                    .map(|(value, block)| format!("[ {}, %{} ]", self.value(value), self.label(*block)))
                    .collect();
                write!(f, "%t{} = phi {} {}", dest.0, ty, incoming.join(", "))
            }
            Inst::Br { target } => write!(f, "br label %{}", self.label(*target)),
            Inst::CondBr {
                cond,
                then_block,
                else_block,
            } => write!(
                f,
                "br {}, label %{}, label %{}",
                self.typed(cond),
                self.label(*then_block),
                self.label(*else_block)
            ),
            Inst::Ret { value: Some(value) } => write!(f, "ret {}", self.typed(value)),
            Inst::Ret { value: None } => write!(f, "ret void"),
        }
    }

    fn function(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let function = self.function;
        if function.is_declaration() {
            let params: Vec<String> = function.params.iter().map(|(_, ty)| ty.to_string()).collect();
            return writeln!(f, "declare {} @{}({})", function.ret, function.name, params.join(", "));
        }

        let params: Vec<String> = function
            .params
            .iter()
            .map(|(name, ty)| format!("{} %arg.{}", ty, name))
            .collect();
        writeln!(f, "define {} @{}({}) {{", function.ret, function.name, params.join(", "))?;
        for (i, block) in function.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            for inst in &block.insts {
                write!(f, "  ")?;
                self.inst(f, inst)?;
                writeln!(f)?;
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;

        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for global in &self.globals {
            let zero = match Value::zero(global.ty) {
                Some(Value::ConstFloat(val)) => float_constant(val),
                Some(Value::ConstBool(val)) => val.to_string(),
                _ => "0".to_string(),
            };
            writeln!(f, "@{} = global {} {}", global.name, global.ty, zero)?;
        }

        for function in &self.functions {
            writeln!(f)?;
            FunctionPrinter {
                module: self,
                function,
            }
            .function(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_constants_print_as_double_bits() {
        assert_eq!(float_constant(0.0), "0x0000000000000000");
        assert_eq!(float_constant(2.5), "0x4004000000000000");
        assert_eq!(float_constant(-1.0), "0xBFF0000000000000");
        // 0.1 is not exactly representable, the f32 rounding shows in the double
        assert_eq!(float_constant(0.1), "0x3FB99999A0000000");
    }

    #[test]
    fn test_empty_module() {
        assert_eq!(
            Module::new("empty").to_string(),
            "; ModuleID = 'empty'\nsource_filename = \"empty\"\n"
        );
    }
}
