use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, ValueEnum};
use console::{Term, style};

use plate_avail::check::Status;
use plate_avail::config::{DEFAULT_WORKERS, ServiceConfig};
use plate_avail::generate::generate_plates;
use plate_avail::pool::{ErrorPolicy, ProgressSink, run_pool};
use plate_avail::session::{SESSION_COOKIE, Session};
use plate_avail::sink::save_results;
use plate_avail::source::load_plates;

#[derive(Parser)]
#[command(
    name = "plate-avail",
    about = "Bulk-check California DMV personalized plate availability",
    after_help = "Candidates come from a newline-separated word file (--input) \
                  or are generated for a topic (--topic, with --num-plates). \
                  Each worker holds its own DMV session; results land in a \
                  two-column CSV sorted by descending length."
)]
#[command(group(ArgGroup::new("plates").required(true)))]
struct Cli {
    /// File of newline-separated candidate plates
    #[arg(short, long, group = "plates", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Topic to generate candidate plates from (e.g. "animals")
    #[arg(short, long, group = "plates", requires = "num_plates")]
    topic: Option<String>,

    /// Number of plates to generate (required with --topic)
    #[arg(short = 'n', long, value_name = "N")]
    num_plates: Option<usize>,

    /// Destination CSV file for results
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// Number of concurrent workers, each with its own DMV session
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// What to do when a single check request fails
    #[arg(long, value_enum, default_value_t = OnError::Abort)]
    on_error: OnError,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnError {
    /// Abort the whole run on the first failed check
    Abort,
    /// Record the plate as ERROR and keep going
    Continue,
}

impl From<OnError> for ErrorPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => Self::Abort,
            OnError::Continue => Self::RecordAndContinue,
        }
    }
}

/// Prints each classified plate, uppercased, green when available and red
/// otherwise.
struct ConsoleSink {
    separator: String,
}

impl ProgressSink for ConsoleSink {
    fn plate_checked(&self, plate: &str, status: &Status) {
        let shown = plate.to_uppercase();
        if status.is_available() {
            println!("{}", style(shown).green());
        } else {
            println!("{}", style(shown).red());
        }
    }

    fn workers_ready(&self, _workers: usize) {
        println!("{} \n", self.separator);
        println!("Searching for valid plates:\n");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let plates = match (&cli.input, &cli.topic) {
        (Some(path), _) => {
            let plates = load_plates(path)?;
            println!("\nTotal words found: {}\n", plates.len());
            plates
        }
        (_, Some(topic)) => {
            let count = cli
                .num_plates
                .ok_or("--num-plates is required with --topic")?;
            let plates = generate_plates(topic, count)?;
            println!(
                "\nGenerated {} valid plates for topic '{topic}': {plates:?}\n",
                plates.len()
            );
            plates
        }
        _ => return Err("either --input or --topic is required".into()),
    };

    if plates.is_empty() {
        println!("No plates to process. Exiting.");
        return Ok(());
    }

    let config = ServiceConfig::from_env();
    let separator = "-".repeat(Term::stdout().size().1 as usize);
    let sink = ConsoleSink {
        separator: separator.clone(),
    };

    println!("{separator}");
    let outcome = run_pool(
        cli.workers,
        plates,
        |_worker| {
            let session = Session::establish(&config)?;
            println!("Worker initiated with {SESSION_COOKIE}: {}", session.token());
            Ok(session)
        },
        cli.on_error.into(),
        &sink,
    )?;

    println!("\nTotal Time: {:.2} seconds", outcome.elapsed.as_secs_f64());

    let written = save_results(&outcome.results, &cli.output)?;
    println!("Results saved to {}", written.display());
    Ok(())
}
