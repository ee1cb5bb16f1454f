use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use jxl_entropy::static_codes::{
    extend_static_codes, format_codes, StaticCodeKind, STATIC_ALPHABET_SIZE,
};

#[derive(Parser, Debug)]
#[command(name = "update_static_codes")]
#[command(version)]
#[command(about = "Prints the compiled-in DC or AC prefix codes extended to a larger alphabet")]
struct Args {
    /// Code type: DC or AC
    code_type: StaticCodeKind,

    /// New alphabet size
    new_alphabet_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn run(args: &Args) -> jxl_entropy::Result<()> {
    let codes = extend_static_codes(args.code_type, args.new_alphabet_size)?;
    info!(
        kind = args.code_type.name(),
        codes = codes.len(),
        size = args.new_alphabet_size,
        "extended static codes"
    );
    let text = format_codes(args.code_type, &codes)?;
    std::io::stdout().lock().write_all(text.as_bytes())?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to set tracing subscriber");
    }

    if args.new_alphabet_size <= STATIC_ALPHABET_SIZE {
        eprintln!(
            "New alphabet size must be greater than current alphabet size, which is {STATIC_ALPHABET_SIZE}."
        );
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed to extend prefix codes");
            eprintln!("Failed to extend prefix codes: {e}");
            ExitCode::FAILURE
        }
    }
}
