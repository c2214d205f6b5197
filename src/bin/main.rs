use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use plume::{
    context::{Config, Context},
    lexer::lex,
    parser::parse_file,
    util::fmt::tree::print_program,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parses a Plume program and expands its process declarations.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// The program to compile.
    input: PathBuf,

    /// Where imports not found relative to the working directory are looked
    /// up. Defaults to `lib/` next to the executable.
    #[arg(long)]
    stdlib: Option<PathBuf>,

    /// Print the tokens of the input file and stop.
    #[arg(long)]
    dump_tokens: bool,

    /// Print every declaration once processes are generated.
    #[arg(long)]
    dump_ast: bool,

    /// Log more. Repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    match run(&args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// The filter used when `RUST_LOG` isn't set. Each `-v` raises it one level
/// above the default `warn`.
fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "plume=warn",
        1 => "plume=info",
        2 => "plume=debug",
        _ => "plume=trace",
    }
}

fn init_logging(verbose: u8) {
    let default = default_directive(verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> io::Result<ExitCode> {
    if args.dump_tokens {
        let text = fs::read_to_string(&args.input)?;
        let mut out = io::stdout().lock();
        for token in lex(args.input.to_string_lossy().into(), &text) {
            let location = &token.location;
            writeln!(out, "{}:{}\t{}", location.line, location.column, token.kind)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::default();
    if let Some(stdlib) = &args.stdlib {
        config.stdlib_dir.clone_from(stdlib);
    }
    let mut ctx = Context::new(config);
    if let Err(error) = parse_file(&mut ctx, &args.input) {
        eprintln!("{}", error.render(&ctx.files));
        return Ok(ExitCode::FAILURE);
    }
    info!(definitions = ctx.tree.globals().len(), "compiled");

    if args.dump_ast {
        print_program(&mut io::stdout().lock(), &ctx.tree)?;
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{default_directive, Args};

    #[test]
    fn verbosity_raises_the_log_level() {
        let levels: Vec<_> = (0..=3).map(default_directive).collect();
        assert_eq!(
            levels,
            ["plume=warn", "plume=info", "plume=debug", "plume=trace"]
        );
        assert_eq!(default_directive(9), "plume=trace");
    }

    #[test]
    fn verbose_flag_counts_repetitions() {
        let args = Args::parse_from(["plumec", "main.plume", "-vv"]);
        assert_eq!(args.verbose, 2);
        assert_eq!(default_directive(args.verbose), "plume=debug");
    }
}
