mod api;
mod server;

use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use content_planner::config::PlannerConfig;
use content_planner::estimate::RateContext;
use content_planner::planner::{ExistingByTitle, Planner};
use content_planner::rates_client::{effective_rates_or_local, RatesClient};
use content_planner::{
    estimate_lesson, format_float, format_hours, format_products, ExistingContent, ProductRates,
    ProjectDefaults, QualityTier, TrainingPlan,
};

#[derive(Parser)]
#[command(name = "content-planner", about = "Training-plan content and cost estimator")]
struct Cli {
    /// Path to a planner TOML config (defaults to config/planner.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recommend content products for one lesson title
    Recommend(RecommendArgs),
    /// Recompute every estimate in a training-plan JSON document
    Plan(PlanArgs),
    /// Fetch effective rates from the backend, falling back to local defaults
    Rates(RatesArgs),
    /// Write the effective configuration as TOML
    InitConfig(InitConfigArgs),
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
struct RecommendArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long, default_value = "interactive")]
    tier: String,
    #[arg(long)]
    has_lesson: bool,
    #[arg(long)]
    has_quiz: bool,
    #[arg(long)]
    has_one_pager: bool,
    #[arg(long)]
    has_video_lesson: bool,
    /// Hourly rate; defaults to the configured fallback rate
    #[arg(long)]
    rate: Option<f64>,
    #[arg(long)]
    advanced: bool,
    #[arg(long)]
    presentation_rate: Option<f64>,
    #[arg(long)]
    one_pager_rate: Option<f64>,
    #[arg(long)]
    quiz_rate: Option<f64>,
    #[arg(long)]
    video_lesson_rate: Option<f64>,
    #[arg(long)]
    details: bool,
}

#[derive(Args, Debug, Clone)]
struct PlanArgs {
    /// Training plan JSON; read from stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    /// JSON object mapping lesson titles to existing-content flags
    #[arg(long)]
    existing: Option<PathBuf>,
    #[arg(long)]
    project_tier: Option<String>,
    #[arg(long)]
    project_rate: Option<f64>,
    #[arg(long)]
    project_advanced: bool,
    /// Print the recomputed plan as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct RatesArgs {
    #[arg(long)]
    project_id: String,
    #[arg(long)]
    section_index: Option<usize>,
    #[arg(long)]
    lesson_index: Option<usize>,
    /// Rate used when the backend cannot be reached
    #[arg(long)]
    local_rate: Option<f64>,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long, default_value = "config/planner.toml")]
    path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8787)]
    port: u16,
    #[arg(long, default_value = "../webapp/dist")]
    web_root: String,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (config, config_path) = PlannerConfig::load(cli.config)?;
    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        tracing::debug!(path = %path.display(), "loaded planner config");
    }

    match cli.command {
        Command::Recommend(args) => run_recommend(args, &config),
        Command::Plan(args) => run_plan(args, &config),
        Command::Rates(args) => run_rates(args, &config).await,
        Command::InitConfig(args) => run_init_config(args, &config),
        Command::Serve(args) => server::serve(args, config).await,
    }
}

fn run_recommend(args: RecommendArgs, config: &PlannerConfig) -> Result<(), String> {
    let title = read_text(args.title)?;
    let existing = ExistingContent {
        has_lesson: args.has_lesson,
        has_quiz: args.has_quiz,
        has_one_pager: args.has_one_pager,
        has_video_lesson: args.has_video_lesson,
    };
    let single_rate = validate_rate(args.rate.unwrap_or(config.rates.fallback_rate))?;
    let rates = if args.advanced {
        RateContext::advanced(
            single_rate,
            ProductRates {
                presentation: args.presentation_rate,
                one_pager: args.one_pager_rate,
                quiz: args.quiz_rate,
                video_lesson: args.video_lesson_rate,
            },
        )
    } else {
        RateContext::single(single_rate)
    };

    if let Err(err) = args.tier.parse::<QualityTier>() {
        tracing::warn!(error = %err, "scoring as interactive");
    }

    let estimate = estimate_lesson(&title, &args.tier, &existing, rates, config);

    println!(
        "Recommended: {} ({} tier)",
        format_products(&estimate.recommendation.primary),
        estimate.recommendation.quality_tier_used
    );
    println!("Completion time: {}", estimate.completion.label());
    println!(
        "Creation estimate: {} ({} rate{})",
        format_hours(f64::from(estimate.hours)),
        if estimate.rates.advanced { "per-product" } else { "single" },
        if estimate.rates.advanced {
            String::new()
        } else {
            format!(" {}", format_float(estimate.rates.single_rate, 0))
        }
    );

    if args.details {
        println!("\nBreakdown:");
        for (product, minutes) in &estimate.completion.breakdown {
            println!(
                "  {}: {}m @ {}",
                product,
                minutes,
                format_float(estimate.rates.rate_for(*product), 0)
            );
        }
        println!("\nReasoning: {}", estimate.recommendation.reasoning);
    }

    Ok(())
}

fn run_plan(args: PlanArgs, config: &PlannerConfig) -> Result<(), String> {
    let payload = match args.input.as_ref() {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read plan {}: {}", path.display(), err))?,
        None => read_stdin()?,
    };
    let mut plan: TrainingPlan =
        serde_json::from_str(&payload).map_err(|err| format!("failed to parse plan: {}", err))?;

    let discovery = match args.existing.as_ref() {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .map_err(|err| format!("failed to read existing content {}: {}", path.display(), err))?;
            let entries: HashMap<String, ExistingContent> = serde_json::from_str(&data)
                .map_err(|err| format!("failed to parse existing content: {}", err))?;
            ExistingByTitle::new(entries)
        }
        None => ExistingByTitle::default(),
    };

    let project = ProjectDefaults {
        quality_tier: args.project_tier,
        custom_rate: args.project_rate.map(validate_rate).transpose()?,
        is_advanced: Some(args.project_advanced),
        advanced_rates: None,
    };

    let planner = Planner::from_config(config);
    let total = planner.recompute_plan(&mut plan, &project, &discovery);

    if args.json {
        let output = serde_json::to_string_pretty(&plan)
            .map_err(|err| format!("failed to serialize plan: {}", err))?;
        println!("{}", output);
        return Ok(());
    }

    for section in &plan.sections {
        println!("{}: {}", section.title, format_hours(section.total_hours));
        for lesson in &section.lessons {
            let products = lesson
                .recommended_content_types
                .as_ref()
                .map(|recommended| format_products(&recommended.primary))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {} | {} | {} | {}",
                lesson.title,
                products,
                lesson.completion_time.as_deref().unwrap_or("-"),
                format_hours(lesson.hours.unwrap_or(0.0))
            );
        }
    }
    println!(
        "\nTotal: {} across {} lessons",
        format_hours(total),
        plan.lesson_count()
    );

    Ok(())
}

async fn run_rates(args: RatesArgs, config: &PlannerConfig) -> Result<(), String> {
    let client = RatesClient::from_config(config)?;
    let local_rate = validate_rate(args.local_rate.unwrap_or(config.rates.fallback_rate))?;
    let resolved = effective_rates_or_local(
        Some(&client),
        &args.project_id,
        args.section_index,
        args.lesson_index,
        RateContext::single(local_rate),
        config.rates.fallback_rate,
    )
    .await;

    let output = serde_json::to_string_pretty(&resolved)
        .map_err(|err| format!("failed to serialize rates: {}", err))?;
    println!("{}", output);
    Ok(())
}

fn run_init_config(args: InitConfigArgs, config: &PlannerConfig) -> Result<(), String> {
    config.write(&args.path)?;
    println!("Wrote {}", args.path.display());
    Ok(())
}

fn read_text(arg: Option<String>) -> Result<String, String> {
    if let Some(text) = arg {
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    let text = read_stdin()?;
    if text.is_empty() {
        return Err("missing lesson title: pass --title or pipe stdin".to_string());
    }
    Ok(text)
}

fn read_stdin() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("failed reading stdin: {}", err))?;
    Ok(buffer.trim().to_string())
}

fn validate_rate(value: f64) -> Result<f64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid rate (must be >= 0): {}", value));
    }
    Ok(value)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("content_planner=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
