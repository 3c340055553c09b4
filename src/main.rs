use clap::Parser;
use log::Level;
use navstack::core::config::{self, CliOverrides, Diagnostics, NavConfig};
use navstack::core::deeplink::DeliveryStyle;
use navstack::stress::{self, StressMode, StressReport};
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "navstack", about = "Headless stress runner for the navstack router")]
struct Args {
    /// Stress scenario to run
    #[arg(short, long, value_enum)]
    mode: Option<StressMode>,

    /// Number of steps to perform
    #[arg(short = 'n', long)]
    operations: Option<usize>,

    /// Deepest stack or presentation nesting before resetting
    #[arg(long)]
    max_depth: Option<usize>,

    /// Pause between serialized actions, in milliseconds
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// How delivered deep links are shown
    #[arg(long, value_enum)]
    delivery: Option<DeliveryStyle>,

    /// Seed for the mixed scenario
    #[arg(long)]
    seed: Option<u64>,

    /// Deep link to queue before the root scope appears (repeatable)
    #[arg(long = "link")]
    links: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            settle_delay_ms: self.settle_delay_ms,
            delivery: self.delivery,
            mode: self.mode,
            operations: self.operations,
            max_depth: self.max_depth,
            seed: self.seed,
        }
    }
}

fn print_summary(report: &StressReport) {
    println!("mode:            {:?}", report.mode);
    println!("seed:            {}", report.seed);
    println!("operations:      {}", report.operations);
    println!(
        "  push/pop:      {}/{}",
        report.pushes, report.pops
    );
    println!(
        "  sheet/full:    {}/{}",
        report.sheets, report.full_screens
    );
    println!("  dismiss/reset: {}/{}", report.dismissals, report.resets);
    println!(
        "deep links:      {} queued, {} delivered, {} dropped",
        report.links_enqueued, report.links_delivered, report.links_dropped
    );
    println!("scopes created:  {}", report.scopes_created);
    println!("max stack depth: {}", report.max_stack_depth);
    println!("max nesting:     {}", report.max_nesting);
    println!("elapsed:         {} ms", report.elapsed_ms);
    if report.is_clean() {
        println!("result:          clean");
    } else {
        println!("result:          {} violations", report.violations.len());
        for violation in &report.violations {
            println!("  - {violation}");
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Config messages are held until the logger they configure exists.
    let mut diagnostics = Diagnostics::default();
    let file_config = match config::load_config(&mut diagnostics) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("navstack: {e}, using defaults");
            diagnostics.push(Level::Error, format!("{e}, using defaults"));
            NavConfig::default()
        }
    };
    let resolved = config::resolve(&file_config, &args.overrides(), &mut diagnostics);

    // Initialize file logger
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    match File::create(&resolved.log_file) {
        Ok(log_file) => {
            let _ = WriteLogger::init(resolved.log_level, log_config, log_file);
        }
        Err(e) => {
            eprintln!("navstack: cannot open {}: {e}", resolved.log_file);
            for warning in diagnostics.warnings() {
                eprintln!("navstack: {warning}");
            }
        }
    }

    diagnostics.replay();
    log::info!("navstack starting: {:?}", resolved);

    let report = stress::run(&resolved, &args.links).await;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        println!("{json}");
    } else {
        print_summary(&report);
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}
