//! Compiler driver: source text in, IR module and diagnostics out.

use anyhow::Context;
use console::style;
use minic_codegen::codegen_module;
use minic_ir::Module;
use minic_parser::ast::Program;
use minic_parser::lexer::{Lexer, Token};
use minic_parser::parser::Parser;
use minic_source::{Diagnostic, Source};
use std::fs;
use std::path::Path;

/// Settings for one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Name recorded in the IR module header.
    pub module_name: String,
    /// Keep the token stream in [`Compilation::tokens`].
    pub dump_tokens: bool,
    /// Print phase progress to stderr.
    pub verbose: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: "main".to_string(),
            dump_tokens: false,
            verbose: false,
        }
    }
}

/// Everything a compilation produced.
#[derive(Debug)]
pub struct Compilation {
    /// Empty if parsing failed, partial if code generation reported errors.
    pub module: Module,
    /// Syntax errors followed by semantic errors, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    /// Only filled when [`CompileOptions::dump_tokens`] is set.
    pub tokens: Vec<Token>,
}

impl Compilation {
    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

fn progress(options: &CompileOptions, message: &str) {
    if options.verbose {
        eprintln!("{}", style(message).dim());
    }
}

/// Parses `source`. Syntax errors are added to `source.errors`.
pub fn parse(source: &Source) -> Program {
    Parser::new(source).parse_program()
}

/// Compiles `content`. Never fails: problems with the program are returned as diagnostics.
pub fn compile(content: &str, options: &CompileOptions) -> Compilation {
    let tokens = Lexer::new(content).tokenize();
    progress(options, &format!("lexing finished ({} tokens)", tokens.len()));

    let source: Source = content.into();
    let program = parse(&source);
    progress(options, "parsing finished");

    // the AST may contain error placeholders, do not lower it
    let module = if source.has_no_errors() {
        let module = codegen_module(&options.module_name, &program, &source);
        progress(options, "codegen finished");
        module
    } else {
        progress(options, "codegen skipped because of syntax errors");
        Module::new(options.module_name.clone())
    };

    Compilation {
        module,
        diagnostics: source.errors.diagnostics(),
        tokens: if options.dump_tokens { tokens } else { Vec::new() },
    }
}

/// Reads `input`, compiles it and writes the textual IR to `output`.
/// Only I/O problems are errors.
pub fn compile_file(input: &Path, output: &Path, options: &CompileOptions) -> anyhow::Result<Compilation> {
    let content =
        fs::read_to_string(input).with_context(|| format!("could not open {}", input.display()))?;
    let compilation = compile(&content, options);
    fs::write(output, compilation.module.to_string())
        .with_context(|| format!("could not create {}", output.display()))?;
    Ok(compilation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_errors_skip_codegen() {
        let compilation = compile("int f(void) { return 1 }", &CompileOptions::default());
        assert_eq!(compilation.error_count(), 1);
        assert!(compilation.module.functions.is_empty());
    }

    #[test]
    fn test_tokens_only_kept_on_request() {
        let options = CompileOptions::default();
        assert!(compile("int x;", &options).tokens.is_empty());

        let options = CompileOptions {
            dump_tokens: true,
            ..CompileOptions::default()
        };
        assert_eq!(compile("int x;", &options).tokens.len(), 4);
    }

    #[test]
    fn test_module_name() {
        let options = CompileOptions {
            module_name: "prog.c".to_string(),
            ..CompileOptions::default()
        };
        let compilation = compile("int x;", &options);
        assert!(!compilation.has_errors());
        assert!(compilation
            .module
            .to_string()
            .starts_with("; ModuleID = 'prog.c'\n"));
    }
}
