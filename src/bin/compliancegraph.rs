use std::{env, process};

use compliancegraph::{RunOutcome, TypeStatus, cli::CommandLineConfig, pipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let cli = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {err}");
            eprint!("{}", CommandLineConfig::help());
            process::exit(2);
        }
    };
    setup_logging(&cli);

    let config = match cli.load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    let outcome = match pipeline::run(&config, None).await {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("run failed: {err}");
            process::exit(1);
        }
    };

    if cli.json {
        print_json(&outcome);
    } else {
        print_summary(&outcome);
    }
    process::exit(outcome.exit_code());
}

fn setup_logging(cli: &CommandLineConfig) {
    let level = cli.log_level().as_str().to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json(outcome: &RunOutcome) {
    let doc = serde_json::json!({
        "run": outcome.run,
        "reconciliation": outcome.reconciliation,
        "exit_code": outcome.exit_code(),
    });
    match serde_json::to_string_pretty(&doc) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("could not render report: {err}"),
    }
}

fn print_summary(outcome: &RunOutcome) {
    if let Some(run) = &outcome.run {
        println!("status={}", run.status.as_str());
        for (kind, entry) in &run.types {
            print!(
                "{:<22} {:<9} records={} relational={} graph={}",
                kind.as_str(),
                entry.status.as_str(),
                entry.records,
                entry.relational_written,
                entry.graph_written
            );
            if entry.status != TypeStatus::Succeeded
                && let Some(reason) = &entry.reason
            {
                print!(" reason={reason}");
            }
            println!();
        }
    }
    if let Some(reconciliation) = &outcome.reconciliation {
        let mismatches = reconciliation.mismatches();
        println!(
            "consistent={} mismatches={}",
            reconciliation.is_consistent(),
            mismatches.len()
        );
        for line in mismatches {
            println!("  mismatch {line}");
        }
    }
    for path in &outcome.exported {
        println!("exported {}", path.display());
    }
}
