use clap::{Parser, Subcommand};
use colored::Colorize;
use liquid_core::diagnostics::{self, Diagnostic, Severity};
use liquid_core::parser::DEFAULT_MAX_DEPTH;
use liquid_core::{LiquidSchema, ParseOptions};
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::prelude::*;

/// LiquidCode — UI layout DSL compiler
///
/// Parse, check, format and roundtrip LiquidCode programs.
#[derive(Parser)]
#[command(name = "liquid", version, about, long_about = None)]
struct Cli {
    /// Print only results and errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log pipeline stages to stderr (-v debug, -vv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Maximum block nesting depth
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile DSL into schema JSON
    Parse {
        /// Path to .lc file
        file: PathBuf,
        /// Single-line JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },

    /// Emit canonical DSL from schema JSON
    Compile {
        /// Path to schema .json file
        file: PathBuf,
    },

    /// Validate DSL and report diagnostics
    Check {
        /// Path to .lc file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite DSL in canonical form
    Fmt {
        /// Path to .lc file
        file: PathBuf,
        /// Overwrite the file instead of printing
        #[arg(long)]
        write: bool,
    },

    /// Parse, emit, re-parse and compare
    Roundtrip {
        /// Path to .lc file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Structural diff between two programs
    Diff {
        /// First .lc file
        file_a: PathBuf,
        /// Second .lc file
        file_b: PathBuf,
    },

    /// Dump the unresolved syntax tree as JSON
    Ast {
        /// Path to .lc file
        file: PathBuf,
    },

    /// Compute the fingerprint (SHA-256 of the canonical DSL)
    Hash {
        /// Path to .lc file
        file: PathBuf,
    },

    /// Show version information
    Version,
}

/// Exit codes: 0 success, 1 invalid input or failed check, 2 usage or I/O error
const EXIT_OK: i32 = 0;
const EXIT_INVALID: i32 = 1;
const EXIT_ERROR: i32 = 2;

struct Context {
    quiet: bool,
    options: ParseOptions,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context {
        quiet: cli.quiet,
        options: ParseOptions {
            max_depth: cli.max_depth,
        },
    };

    let exit_code = match cli.command {
        Commands::Parse { file, compact } => cmd_parse(&ctx, &file, compact),
        Commands::Compile { file } => cmd_compile(&file),
        Commands::Check { file, json } => cmd_check(&ctx, &file, json),
        Commands::Fmt { file, write } => cmd_fmt(&ctx, &file, write),
        Commands::Roundtrip { file, json } => cmd_roundtrip(&ctx, &file, json),
        Commands::Diff { file_a, file_b } => cmd_diff(&ctx, &file_a, &file_b),
        Commands::Ast { file } => cmd_ast(&ctx, &file),
        Commands::Hash { file } => cmd_hash(&ctx, &file),
        Commands::Version => {
            println!(
                "liquid {} (liquid-core {}, schema {})",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_VERSION"),
                liquid_core::schema::SCHEMA_VERSION
            );
            EXIT_OK
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "liquid_core=debug",
        _ => "liquid_core=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

// ── Commands ──────────────────────────────────────────────

fn cmd_parse(ctx: &Context, file: &Path, compact: bool) -> i32 {
    let schema = match read_and_parse(ctx, file) {
        Ok(schema) => schema,
        Err(code) => return code,
    };
    let json = if compact {
        serde_json::to_string(&schema)
    } else {
        serde_json::to_string_pretty(&schema)
    };
    match json {
        Ok(json) => {
            println!("{}", json);
            EXIT_OK
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            EXIT_ERROR
        }
    }
}

fn cmd_compile(file: &Path) -> i32 {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };
    match LiquidSchema::from_json(&source) {
        Ok(schema) => {
            println!("{}", liquid_core::compile(&schema));
            EXIT_OK
        }
        Err(e) => {
            eprintln!("{}: invalid schema JSON: {}", "error".red().bold(), e);
            EXIT_ERROR
        }
    }
}

fn cmd_check(ctx: &Context, file: &Path, json: bool) -> i32 {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let diagnostics = diagnostics::check(&source, &ctx.options);
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;

    if json {
        let report = serde_json::json!({
            "file": file.display().to_string(),
            "valid": errors == 0,
            "errors": errors,
            "warnings": warnings,
            "diagnostics": diagnostics,
        });
        println!("{}", report);
    } else {
        for diagnostic in &diagnostics {
            print_diagnostic(diagnostic);
        }
        if errors == 0 && !ctx.quiet {
            println!(
                "{} {} is valid ({} warning{})",
                "✓".green(),
                file.display(),
                warnings,
                if warnings == 1 { "" } else { "s" }
            );
        }
    }

    if errors == 0 {
        EXIT_OK
    } else {
        EXIT_INVALID
    }
}

fn cmd_fmt(ctx: &Context, file: &Path, write: bool) -> i32 {
    let schema = match read_and_parse(ctx, file) {
        Ok(schema) => schema,
        Err(code) => return code,
    };
    let canonical = liquid_core::compile(&schema);

    if !write {
        println!("{}", canonical);
        return EXIT_OK;
    }
    if let Err(e) = std::fs::write(file, format!("{}\n", canonical)) {
        eprintln!("{}: cannot write {}: {}", "error".red().bold(), file.display(), e);
        return EXIT_ERROR;
    }
    if !ctx.quiet {
        println!("{} formatted {}", "✓".green(), file.display());
    }
    EXIT_OK
}

fn cmd_roundtrip(ctx: &Context, file: &Path, json: bool) -> i32 {
    let schema = match read_and_parse(ctx, file) {
        Ok(schema) => schema,
        Err(code) => return code,
    };
    let report = match liquid_core::roundtrip(&schema) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return EXIT_ERROR;
        }
    };

    if json {
        match serde_json::to_string(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{}: {}", "error".red().bold(), e);
                return EXIT_ERROR;
            }
        }
    } else if report.is_equivalent {
        if !ctx.quiet {
            println!("{} roundtrip is lossless", "✓".green());
        }
    } else {
        println!(
            "{} roundtrip found {} difference{}",
            "✗".red(),
            report.differences.len(),
            if report.differences.len() == 1 { "" } else { "s" }
        );
        for difference in &report.differences {
            println!("  {}", difference);
        }
    }

    if report.is_equivalent {
        EXIT_OK
    } else {
        EXIT_INVALID
    }
}

fn cmd_diff(ctx: &Context, file_a: &Path, file_b: &Path) -> i32 {
    let a = match read_and_parse(ctx, file_a) {
        Ok(schema) => schema,
        Err(code) => return code,
    };
    let b = match read_and_parse(ctx, file_b) {
        Ok(schema) => schema,
        Err(code) => return code,
    };

    let differences = liquid_core::roundtrip::compare(&a, &b);
    if differences.is_empty() {
        if !ctx.quiet {
            println!("{} structurally identical", "✓".green());
        }
        return EXIT_OK;
    }

    println!("{} {}", "---".red(), file_a.display());
    println!("{} {}", "+++".green(), file_b.display());
    for difference in &differences {
        println!("  {}", difference);
    }
    EXIT_INVALID
}

fn cmd_ast(ctx: &Context, file: &Path) -> i32 {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let ast = match liquid_core::parser::parse(&source, &ctx.options) {
        Ok(ast) => ast,
        Err(e) => {
            print_diagnostic(&diagnostics::render(&e, &source));
            return EXIT_INVALID;
        }
    };
    match serde_json::to_string_pretty(&ast) {
        Ok(json) => {
            println!("{}", json);
            EXIT_OK
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            EXIT_ERROR
        }
    }
}

fn cmd_hash(ctx: &Context, file: &Path) -> i32 {
    match read_and_parse(ctx, file) {
        Ok(schema) => {
            println!("{}", liquid_core::fingerprint(&schema));
            EXIT_OK
        }
        Err(code) => code,
    }
}

// ── Helpers ───────────────────────────────────────────────

fn read_source(file: &Path) -> Result<String, i32> {
    debug!(file = %file.display(), "reading source");
    std::fs::read_to_string(file).map_err(|e| {
        eprintln!("{}: cannot read {}: {}", "error".red().bold(), file.display(), e);
        EXIT_ERROR
    })
}

fn read_and_parse(ctx: &Context, file: &Path) -> Result<LiquidSchema, i32> {
    let source = read_source(file)?;
    liquid_core::parse_with(&source, &ctx.options).map_err(|e| {
        print_diagnostic(&diagnostics::render(&e, &source));
        EXIT_INVALID
    })
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    let severity = match diagnostic.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
    };
    eprintln!("{}[{}]: {}", severity, diagnostic.kind, diagnostic.message);

    // The rest of the rendering (location, context, help) after the header line
    let rendered = diagnostic.to_string();
    if let Some((_, details)) = rendered.split_once('\n') {
        eprintln!("{}", details);
    }
}
