use clap::error::ErrorKind;
use clap::Parser;
use console::style;
use minic::{compile_file, CompileOptions};
use std::path::PathBuf;
use std::process;

/// Compiles a mini-C source file to textual IR.
#[derive(Parser, Debug)]
#[command(name = "minic", version)]
struct Cli {
    /// Source file to compile.
    source: PathBuf,
    /// Where to write the IR module.
    #[arg(short, long, default_value = "output.ll")]
    output: PathBuf,
    /// Print every token to stderr before parsing.
    #[arg(long)]
    tokens: bool,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let module_name = cli
        .source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    let options = CompileOptions {
        module_name,
        dump_tokens: cli.tokens,
        verbose: true,
    };

    let compilation = compile_file(&cli.source, &cli.output, &options)?;

    for token in &compilation.tokens {
        eprintln!(
            "{:>4}:{:<3} {:?} {}",
            token.line,
            token.column,
            token.kind,
            style(&token.lexeme).dim()
        );
    }
    for diagnostic in &compilation.diagnostics {
        println!("{}", diagnostic.styled());
    }
    println!("{} Errors found", compilation.error_count());
    eprintln!("{} {}", style("wrote").green(), cli.output.display());

    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            // printing only fails if stdout/stderr is gone
            let _ = err.print();
            process::exit(code);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", style("error:").red().bold(), err);
        process::exit(1);
    }
}
