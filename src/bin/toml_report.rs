use clap::Parser;
use days_lived::core::{ConfigProvider, Pipeline};
use days_lived::utils::{logger, validation::Validate};
use days_lived::{LocalStorage, ReportEngine, ReportPipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-report")]
#[command(about = "days-lived report driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "days-lived.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the as-of date from config (YYYY-MM-DD)
    #[arg(long)]
    as_of: Option<chrono::NaiveDate>,

    /// Dry run - load and validate the inputs without writing any output
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    logger::init_logger(config.log_format(), args.verbose || config.verbose());
    tracing::info!("Loaded configuration from: {}", args.config);

    // Command line overrides win over the file
    if let Some(as_of) = args.as_of {
        config.aggregation.as_of = Some(as_of);
        tracing::info!("as_of overridden to: {}", as_of);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = ReportPipeline::new(storage, config);

    if args.dry_run {
        tracing::info!("DRY RUN MODE - no output will be written");
        return perform_dry_run(&pipeline);
    }

    let engine = ReportEngine::new(pipeline);
    match engine.run() {
        Ok(outcome) => {
            println!("✅ Report '{}' completed", outcome.dataset);
            println!(
                "  {} days across {} cities in {} countries",
                outcome.stats.total_days_lived,
                outcome.stats.number_of_cities,
                outcome.stats.number_of_countries
            );
            println!("📁 Output saved to: {}", outcome.output_path);
        }
        Err(e) => {
            tracing::error!(
                "Report failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Report: {}", config.report.name);
    if let Some(description) = &config.report.description {
        println!("  Description: {}", description);
    }
    println!("  Inputs: {}", config.input_files().join(", "));
    println!("  Date formats: {}", config.date_formats().join(", "));
    match config.as_of() {
        Some(as_of) => println!("  As of: {}", as_of),
        None => println!("  As of: today"),
    }
    if let Some(top_n) = config.top_n() {
        println!("  Top cities: {}", top_n);
    }
    if let Some(exclude) = config.exclude_top_n() {
        println!("  Excluding top cities: {}", exclude);
    }
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(bundle) = config.bundle_filename() {
        println!("  Bundle: {} (ZIP)", bundle);
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

fn perform_dry_run<P: Pipeline>(pipeline: &P) -> Result<(), Box<dyn std::error::Error>> {
    let database = pipeline.extract()?;
    for name in database.names() {
        let stats = database.basic_stats(Some(name))?;
        println!(
            "  {}: {} stays, {} days, {} years covered",
            name, stats.number_of_stays, stats.total_days_lived, stats.years_covered
        );
    }

    // Validate only, nothing is written
    let report = pipeline.transform(database)?;
    println!(
        "✅ Dry run complete: {} cities, {} countries, {} yearly rows",
        report.cities.len(),
        report.countries.len(),
        report.city_years.len()
    );
    Ok(())
}
