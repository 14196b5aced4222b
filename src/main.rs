use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, LevelFilter};
use bean::ReadOptions;
use crate::driver::Settings;

mod driver;

/// Reads and verifies Java class files.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
	/// Class files, or directories to search for class files.
	#[arg(required = true)]
	paths: Vec<PathBuf>,

	/// The number of worker threads, defaults to the available parallelism.
	#[arg(long)]
	threads: Option<NonZeroUsize>,

	/// Log more, give twice for even more.
	#[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
	verbose: u8,

	/// Only log warnings and errors.
	#[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
	quiet: bool,

	/// Print every verified type with the file it came from.
	#[arg(long)]
	list: bool,
}

impl Cli {
	fn level(&self) -> LevelFilter {
		match (self.quiet, self.verbose) {
			(true, _) => LevelFilter::Warn,
			(false, 0) => LevelFilter::Info,
			(false, 1) => LevelFilter::Debug,
			(false, _) => LevelFilter::Trace,
		}
	}

	fn settings(&self) -> Settings {
		let threads = self.threads
			.or_else(|| std::thread::available_parallelism().ok())
			.map_or(1, NonZeroUsize::get);

		Settings {
			paths: self.paths.clone(),
			threads,
			read_options: ReadOptions::default(),
		}
	}
}

fn setup_logging(level: LevelFilter) -> Result<()> {
	fern::Dispatch::new()
		.format(|out, message, record| {
			out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
		})
		.level(level)
		.chain(std::io::stderr())
		.apply()
		.context("failed to set up logging")
}

fn main() -> ExitCode {
	let cli = Cli::parse();

	if let Err(e) = setup_logging(cli.level()) {
		eprintln!("{e:?}");
		return ExitCode::from(2);
	}

	let report = match driver::run(&cli.settings()) {
		Ok(report) => report,
		Err(e) => {
			error!("{e:?}");
			return ExitCode::from(2);
		},
	};

	if cli.list {
		for (name, path) in report.sorted_types() {
			println!("{name}\t{}", path.display());
		}
	}

	let summary = report.summary();
	println!("{summary}");

	if summary.failures == 0 {
		ExitCode::SUCCESS
	} else {
		ExitCode::from(1)
	}
}
