use clap::Parser;
use simplecalc::cli::{run_demo, run_expressions, run_repl, Cli, Evaluator};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let result = Evaluator::from_cli(&cli).and_then(|mut evaluator| {
        let mut stdout = io::stdout().lock();
        if cli.repl {
            let mut stdin = io::stdin().lock();
            run_repl(&mut evaluator, cli.tree, &mut stdin, &mut stdout, &mut io::stderr())
        } else if cli.expressions.is_empty() {
            run_demo(&mut evaluator, cli.tree, &mut stdout)
        } else {
            run_expressions(&mut evaluator, &cli.expressions, cli.tree, &mut stdout)
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
