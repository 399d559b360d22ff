use queue_sim::config::{self, Command, FormatArg};
use queue_sim::engine;
use queue_sim::error::Result;
use queue_sim::output::{self, Formatter, HumanFormatter, JsonFormatter, SummaryFormatter};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = config::parse_args()?;

    match cli.command {
        Command::Run(args) => {
            init_logging(args.verbose);
            let config = config::build_config(&args)?;
            let result = engine::run_simulation(&config)?;

            let formatter = formatter_for(&args.format);
            print!("{}", formatter.write(&result)?);
        }
        Command::ShowConfig(args) => {
            init_logging(args.verbose);
            let config = config::build_config(&args)?;
            print!("{}", output::describe_config(&config));
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn formatter_for(format: &FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}
