use clap::Parser;
use days_lived::core::engine::ReportOutcome;
use days_lived::utils::error::LivedError;
use days_lived::utils::{logger, validation::Validate};
use days_lived::{CliConfig, LocalStorage, ReportEngine, ReportPipeline};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    logger::init_logger(&config.log_format, config.verbose);

    tracing::info!("Starting days-lived CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // Reject bad flags before touching any input
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = ReportPipeline::new(storage, config);
    let engine = ReportEngine::new(pipeline);

    match engine.run() {
        Ok(outcome) => {
            print_outcome(&outcome)?;
            Ok(())
        }
        Err(e) => {
            report_failure(&e);
            std::process::exit(e.severity().exit_code());
        }
    }
}

fn print_outcome(outcome: &ReportOutcome) -> Result<(), serde_json::Error> {
    println!("Basic statistics ({}):", outcome.dataset);
    println!("{}", serde_json::to_string_pretty(&outcome.stats)?);

    for city in &outcome.lookups.cities {
        println!("\nCity summary for {}:", city.city);
        println!("{}", serde_json::to_string_pretty(city)?);
    }
    for country in &outcome.lookups.countries {
        println!("\nCountry summary for {}:", country.country);
        println!("{}", serde_json::to_string_pretty(country)?);
    }
    for year in &outcome.lookups.years {
        println!("\nYear summary for {}:", year.year);
        println!("{}", serde_json::to_string_pretty(year)?);
    }

    println!("\n📁 Report saved to: {}", outcome.output_path);
    Ok(())
}

fn report_failure(e: &LivedError) {
    tracing::error!(
        "Report failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}
