use clap::{Parser, Subcommand};
use cl_app::{
    AppError, AppResult, ExplainSession, RunOptions, RunProgressEvent, RunRequest, RunStage,
    ScenarioMode,
};
use cl_explain::{ExplainRequest, ExplainableResult, ParameterChange, ScenarioDefinition};
use cl_sim::{RunInputs, SimOptions};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cl-cli")]
#[command(about = "causalens CLI - explain simulation traces of causal models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a model file and print its structure
    Validate {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
    },
    /// Simulate a model and store the trace
    Simulate {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
        /// Number of steps (defaults to the model's setting)
        #[arg(long)]
        steps: Option<usize>,
        /// Time step (defaults to the model's setting)
        #[arg(long)]
        dt: Option<f64>,
        /// Initial value override, `Entity.component=value` (repeatable)
        #[arg(long = "set", value_name = "VAR=VALUE")]
        sets: Vec<String>,
        /// Run store directory (defaults to `.causalens/runs` next to the model)
        #[arg(long)]
        store: Option<PathBuf>,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
        /// Also write the trace to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List stored runs of a model
    Runs {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
        /// Run store directory
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Explain a trace of a model
    Explain {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
        /// Path to the trace JSON file
        trace_path: PathBuf,
        /// Outcome variable (defaults to the model's viability variable)
        #[arg(long)]
        outcome: Option<String>,
        /// Desired outcome value, enables suggested lever values
        #[arg(long)]
        target: Option<f64>,
        /// Additional variables to decompose (repeatable)
        #[arg(long = "decompose", value_name = "VAR")]
        extra_targets: Vec<String>,
        /// Viability score of the previous run, for the trend
        #[arg(long)]
        previous_score: Option<f64>,
        /// Scenario, `name:VAR=VALUE,VAR=VALUE` (repeatable)
        #[arg(long = "scenario", value_name = "SCENARIO")]
        scenarios: Vec<String>,
        /// Project scenarios by re-simulating instead of linearly
        #[arg(long)]
        simulate_scenarios: bool,
        /// Engine config YAML or JSON file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip the narrative insight
        #[arg(long)]
        no_insight: bool,
        /// Write the full result JSON here (optional, defaults to a text report)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a trace as a wide CSV (one column per variable)
    ExportTrace {
        /// Path to the trace JSON file
        trace_path: PathBuf,
        /// Variables to include, comma separated (defaults to all)
        #[arg(long, value_delimiter = ',')]
        variables: Vec<String>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export one variable of a trace as CSV
    ExportSeries {
        /// Path to the trace JSON file
        trace_path: PathBuf,
        /// Variable id (e.g., Teachers.retention)
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { model_path } => cmd_validate(&model_path),
        Commands::Simulate {
            model_path,
            steps,
            dt,
            sets,
            store,
            no_cache,
            output,
        } => cmd_simulate(
            &model_path,
            RunOptions {
                use_cache: !no_cache,
                dt,
                steps,
            },
            &sets,
            store.as_deref(),
            output.as_deref(),
        ),
        Commands::Runs { model_path, store } => cmd_runs(&model_path, store.as_deref()),
        Commands::Explain {
            model_path,
            trace_path,
            outcome,
            target,
            extra_targets,
            previous_score,
            scenarios,
            simulate_scenarios,
            config,
            no_insight,
            output,
        } => {
            let request = ExplainRequest {
                outcome,
                extra_targets,
                outcome_target: target,
                previous_score,
                scenarios: scenarios
                    .iter()
                    .map(|s| parse_scenario(s))
                    .collect::<AppResult<_>>()?,
                skip_insight: no_insight,
            };
            cmd_explain(
                &model_path,
                &trace_path,
                &request,
                simulate_scenarios,
                config.as_deref(),
                output.as_deref(),
            )
        }
        Commands::ExportTrace {
            trace_path,
            variables,
            output,
        } => cmd_export_trace(&trace_path, &variables, output.as_deref()),
        Commands::ExportSeries {
            trace_path,
            variable,
            output,
        } => cmd_export_series(&trace_path, &variable, output.as_deref()),
    }
}

fn cmd_validate(model_path: &Path) -> AppResult<()> {
    println!("Validating model: {}", model_path.display());
    let model = cl_app::load_model(model_path)?;
    let summary = cl_app::validate_model(&model)?;
    println!("✓ Model is valid");
    println!("  Entities: {}", summary.entity_count);
    println!(
        "  Variables: {} ({} state, {} computed, {} constant)",
        summary.variable_count, summary.state_count, summary.computed_count, summary.constant_count
    );
    println!(
        "  Influences: {} enabled, {} disabled",
        summary.influence_count, summary.disabled_influence_count
    );
    Ok(())
}

fn cmd_simulate(
    model_path: &Path,
    options: RunOptions,
    sets: &[String],
    store_dir: Option<&Path>,
    output: Option<&Path>,
) -> AppResult<()> {
    println!("Simulating model: {}", model_path.display());

    let parameter_changes = sets
        .iter()
        .map(|s| parse_assignment(s))
        .collect::<AppResult<BTreeMap<_, _>>>()?;
    let request = RunRequest {
        model_path,
        inputs: RunInputs::with_parameters(parameter_changes),
        options,
        store_dir,
    };

    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let response = cl_app::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let fraction = event.simulation.map(|s| s.fraction()).unwrap_or(-1.0);
            let emit_now = (fraction >= 0.0 && (fraction - last_fraction).abs() >= 0.005)
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                if fraction >= 0.0 {
                    last_fraction = fraction;
                }
                last_emit = Instant::now();
            }
        }),
    )?;

    clear_progress_line();
    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Simulation completed: {}", response.run_id);
    }
    let summary = cl_app::get_run_summary(&response.trace)?;
    println!(
        "  Time: {:.3} .. {:.3} ({} points, dt = {})",
        summary.time_range.0, summary.time_range.1, summary.point_count, response.settings.dt
    );
    println!("  Variables: {}", summary.variable_count);
    println!("  Wall time: {:.3} s", response.elapsed_s);

    if let Some(path) = output {
        cl_trace::save_trace_file(path, &response.trace)?;
        println!("✓ Trace written to: {}", path.display());
    }
    Ok(())
}

fn cmd_runs(model_path: &Path, store_dir: Option<&Path>) -> AppResult<()> {
    let model = cl_app::load_model(model_path)?;
    let store = match store_dir {
        Some(dir) => cl_trace::RunStore::new(dir.to_path_buf()),
        None => cl_trace::RunStore::for_model_file(model_path),
    }?;
    let runs = cl_app::list_runs(&store, &model)?;

    if runs.is_empty() {
        println!("No stored runs for this model");
    } else {
        println!("Stored runs:");
        for run in runs {
            println!(
                "  {} - {} (dt = {}, steps = {}, {} overrides)",
                run.run_id,
                run.timestamp,
                run.dt,
                run.steps,
                run.parameter_changes.len()
            );
        }
    }
    Ok(())
}

fn cmd_explain(
    model_path: &Path,
    trace_path: &Path,
    request: &ExplainRequest,
    simulate_scenarios: bool,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> AppResult<()> {
    let model = cl_app::load_model(model_path)?;
    let trace = cl_app::load_trace(trace_path)?;
    let config = cl_app::load_config(config_path)?;

    let mode = if simulate_scenarios {
        ScenarioMode::Simulate {
            options: SimOptions::from(&model.simulation),
            baseline: RunInputs::default(),
        }
    } else {
        ScenarioMode::Linear
    };

    let session = ExplainSession::new(config);
    let result = session.explain(&model, &trace, request, &mode)?;

    match output {
        Some(path) => {
            std::fs::write(path, result.to_json_pretty()?)?;
            println!("✓ Result written to: {}", path.display());
        }
        None => print_report(&result),
    }
    Ok(())
}

fn print_report(result: &ExplainableResult) {
    let viability = &result.viability;
    println!("Outcome: {}", result.outcome.as_deref().unwrap_or("(none)"));
    println!(
        "Viability: {:.1}/100  risk={}  stability={}  trend={:?}",
        viability.score,
        viability.risk_level.label(),
        viability.stability.label(),
        viability.trend
    );

    if let Some(insight) = &result.insight {
        println!();
        println!("{}", insight.headline);
        println!("  {}", insight.text);
    }

    if !result.main_drivers.is_empty() {
        println!();
        println!("Main drivers:");
        for d in &result.main_drivers {
            println!(
                "  {}. {} ({:?}, {:.1}%)",
                d.rank, d.display_name, d.direction, d.percentage
            );
        }
    }

    let levers: Vec<_> = result.sensitivities.iter().filter(|s| s.is_lever).collect();
    if !levers.is_empty() {
        println!();
        println!("Levers:");
        for s in levers {
            print!(
                "  {}  elasticity={:+.3}  control={:?}",
                s.display_name, s.elasticity, s.control_level
            );
            if let Some(v) = s.suggested_value {
                print!("  suggested={v:.3}");
            }
            println!();
        }
    }

    if !result.critical_paths.is_empty() {
        println!();
        println!("Critical paths:");
        for p in &result.critical_paths {
            println!("  [{:?}] {}  impact={:.4}", p.nature, p.description, p.impact);
        }
    }

    if !result.scenarios.is_empty() {
        println!();
        println!("Scenarios:");
        for s in &result.scenarios {
            let marker = if s.approximate { " (approx.)" } else { "" };
            println!(
                "  {}: {:.4} -> {:.4} ({:+.1}%){}",
                s.name, s.baseline, s.projected, s.delta_percent, marker
            );
        }
    }

    if !result.timeline.is_empty() {
        println!();
        println!("Timeline:");
        for e in &result.timeline {
            println!("  t={:.3}  [{:?}] {}", e.time, e.severity, e.description);
        }
    }
}

fn cmd_export_trace(trace_path: &Path, variables: &[String], output: Option<&Path>) -> AppResult<()> {
    let trace = cl_app::load_trace(trace_path)?;
    let selection = (!variables.is_empty()).then_some(variables);
    let csv = cl_app::export_trace_csv(&trace, selection)?;
    write_csv(csv, output)
}

fn cmd_export_series(trace_path: &Path, variable: &str, output: Option<&Path>) -> AppResult<()> {
    let trace = cl_app::load_trace(trace_path)?;
    let csv = cl_app::export_series_csv(&trace, variable)?;
    write_csv(csv, output)
}

fn write_csv(csv: String, output: Option<&Path>) -> AppResult<()> {
    match output {
        Some(path) => {
            std::fs::write(path, csv)?;
            println!("✓ Exported to: {}", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

/// Parse `Entity.component=value`.
fn parse_assignment(text: &str) -> AppResult<(String, f64)> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| AppError::InvalidInput(format!("expected VAR=VALUE, got '{text}'")))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("invalid value in '{text}'")))?;
    Ok((name.trim().to_string(), value))
}

/// Parse `name:VAR=VALUE,VAR=VALUE`.
fn parse_scenario(text: &str) -> AppResult<ScenarioDefinition> {
    let (name, changes) = text
        .split_once(':')
        .ok_or_else(|| AppError::InvalidInput(format!("expected NAME:VAR=VALUE, got '{text}'")))?;
    let changes = changes
        .split(',')
        .filter(|c| !c.trim().is_empty())
        .map(|c| {
            parse_assignment(c).map(|(variable, new_value)| ParameterChange {
                variable,
                new_value,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(ScenarioDefinition {
        name: name.trim().to_string(),
        changes,
    })
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (event.stage, &event.simulation) {
        (RunStage::Simulating, Some(sim)) => {
            let width = 28usize;
            let fraction = sim.fraction();
            let filled = ((fraction * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.3}  step={}/{}  elapsed={:.1}s",
                bar,
                fraction * 100.0,
                sim.time,
                sim.step,
                sim.steps,
                event.elapsed_wall_s
            );
        }
        _ => {
            print!(
                "\r{:<24} elapsed={:.1}s",
                event.stage.label(),
                event.elapsed_wall_s
            );
        }
    }
    let _ = io::stdout().flush();
}
