//! Type-directed lowering of the mini-C AST into IR.

pub mod codegen;
pub mod scope;

pub use codegen::{Codegen, CodegenError};

use minic_ir::builder::ModuleBuilder;
use minic_ir::Module;
use minic_parser::ast::Program;
use minic_source::Source;

/// Generates a [`Module`] named `name` for `program`. Semantic errors are added to `source`; the
/// returned module is partial if there were any.
pub fn codegen_module(name: &str, program: &Program, source: &Source) -> Module {
    let mut codegen = Codegen::new(ModuleBuilder::new(name), source);
    codegen.codegen_program(program);
    codegen.into_backend().into_module()
}
