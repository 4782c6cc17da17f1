//! AgentLab CLI
//!
//! The `agentlab` command manages agent profiles and runs simulated
//! multi-candidate experiments against them.
//!
//! ## Commands
//!
//! - `simulate`: Create one agent and run a single experiment, streaming progress
//! - `session`: Replay NDJSON agent and experiment requests from a file or stdin
//! - `candidates`: Show the candidate models and the scoring parameters

mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentlab_core::telemetry::parse_level;
use agentlab_core::{
    chart_rows, leader, progress, winner_line, AgentDraft, ChartRow, ExperimentEvent,
    ExperimentRequest, ExperimentRun, LabConfig, LabService, SimulatorState, TracingNotifier,
    CANDIDATES, METRICS,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::BufReader;
use tracing::{info, Level};

use crate::session::Session;

/// Widest bar drawn in the score chart.
const CHART_WIDTH: usize = 40;

#[derive(Parser)]
#[command(name = "agentlab")]
#[command(author = "AgentLab Developers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agent registry and simulated model experiments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines (and JSON events for `simulate`)
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "AGENTLAB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an agent and run one experiment against it
    Simulate {
        /// Agent name
        #[arg(long)]
        name: String,

        /// Agent role
        #[arg(long)]
        role: String,

        /// Agent goal
        #[arg(long)]
        goal: String,

        /// Agent backstory
        #[arg(long)]
        backstory: String,

        /// Experiment name
        #[arg(short, long, default_value = "Experiment")]
        experiment: String,

        /// Prompt given to every candidate
        #[arg(short, long)]
        prompt: String,

        /// Iteration budget (1-100; default from config)
        #[arg(short = 'n', long)]
        iterations: Option<u32>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Replay newline-delimited JSON requests
    Session {
        /// Request file (default: stdin)
        input: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// List candidate models and scoring parameters
    Candidates,
}

/// Overrides applied on top of the loaded configuration.
#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Milliseconds between ticks
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Fixed rng seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

impl RunArgs {
    fn apply(&self, config: &mut LabConfig) -> Result<()> {
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        config.validate().context("Invalid command-line settings")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        LabConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        parse_level(&config.log.level)
    };
    agentlab_core::init_tracing(cli.json || config.log.json, level);

    let result = match cli.command {
        Commands::Simulate {
            name,
            role,
            goal,
            backstory,
            experiment,
            prompt,
            iterations,
            run,
        } => {
            run.apply(&mut config)?;
            cmd_simulate(
                config,
                AgentDraft::new(name, role, goal, backstory),
                &experiment,
                &prompt,
                iterations,
                cli.json,
            )
            .await
        }
        Commands::Session { input, run } => {
            run.apply(&mut config)?;
            cmd_session(config, input.as_deref()).await
        }
        Commands::Candidates => cmd_candidates(&config, cli.json),
    };

    METRICS.flush();
    result
}

/// Create one agent and run one experiment, streaming progress to stdout.
///
/// Ctrl-C cancels the run; the partial chart is still printed.
async fn cmd_simulate(
    config: LabConfig,
    draft: AgentDraft,
    experiment: &str,
    prompt: &str,
    iterations: Option<u32>,
    json_output: bool,
) -> Result<()> {
    let mut lab = LabService::new(config, Arc::new(TracingNotifier));
    let agent = lab.create_agent(draft).context("Invalid agent profile")?;
    let budget = iterations.unwrap_or(lab.config().default_max_iterations);

    let ExperimentRun { handle, mut events } = lab
        .start_experiment(ExperimentRequest::new(agent.id, experiment, prompt, budget))
        .context("Failed to start experiment")?;

    if !json_output {
        println!(
            "Running \"{}\" for {} [{}] ({} iterations, {} candidates)",
            experiment,
            agent.name,
            agent.id.short(),
            budget,
            CANDIDATES.len()
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    let terminal = event.is_terminal();
                    render_event(&event, json_output)?;
                    if terminal {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                info!("interrupt received, cancelling experiment");
                handle.cancel();
            }
        }
    }

    if let Some(outcome) = handle.outcome() {
        info!(
            winner = %outcome.winner,
            score = outcome.winner_score,
            agent = %agent.id.short(),
            "experiment outcome"
        );
    }
    let state = handle.wait().await;
    info!(?state, "experiment finished");
    if state == SimulatorState::Cancelled && !json_output {
        println!("Experiment cancelled.");
    }
    Ok(())
}

fn render_event(event: &ExperimentEvent, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        ExperimentEvent::Progress(snapshot) => {
            let leading = leader(&snapshot.scores)
                .map(|c| c.name.as_str())
                .unwrap_or("-");
            println!("  {}  leader: {}", progress(snapshot), leading);
        }
        ExperimentEvent::Completed(outcome) => {
            println!();
            println!("{}", render_chart(&chart_rows(&outcome.snapshot)));
            println!();
            println!("{}", winner_line(outcome));
        }
        ExperimentEvent::Cancelled(snapshot) => {
            println!();
            println!("Stopped at {}", progress(snapshot));
            println!("{}", render_chart(&chart_rows(snapshot)));
        }
    }
    Ok(())
}

/// Horizontal bar chart, one row per candidate, scaled to the top score.
fn render_chart(rows: &[ChartRow]) -> String {
    let top = rows.iter().map(|r| r.score).max().unwrap_or(0).max(1);
    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);

    rows.iter()
        .map(|row| {
            let len = (row.score.max(0) as usize * CHART_WIDTH) / top as usize;
            format!(
                "  {:<width$}  {:>4}  {:<bar$}  ({} attempts)",
                row.name,
                row.score,
                "#".repeat(len),
                row.attempts,
                width = name_width,
                bar = CHART_WIDTH,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replay NDJSON requests from `input` (or stdin) and write responses to stdout.
async fn cmd_session(config: LabConfig, input: Option<&Path>) -> Result<()> {
    let mut session = Session::new(config);
    let mut stdout = tokio::io::stdout();

    let summary = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open session file: {:?}", path))?;
            session.run(BufReader::new(file), &mut stdout).await?
        }
        None => {
            session
                .run(BufReader::new(tokio::io::stdin()), &mut stdout)
                .await?
        }
    };

    info!(
        requests = summary.requests,
        failed = summary.failed,
        agents = session.lab().registry().len(),
        "session finished"
    );
    Ok(())
}

/// Show the candidate models and the effective scoring parameters.
fn cmd_candidates(config: &LabConfig, json_output: bool) -> Result<()> {
    let walk = config.scoring_strategy();
    let (low, high) = walk.bounds();

    if json_output {
        let body = json!({
            "candidates": CANDIDATES,
            "scoring": {
                "magnitude": walk.magnitude,
                "offset": walk.offset,
                "expected_increment": walk.expected_increment(),
                "min_increment": low,
                "max_increment": high,
            },
            "tick_interval_ms": config.tick_interval_ms,
            "default_max_iterations": config.default_max_iterations,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("Candidates");
    println!("==========");
    for (i, name) in CANDIDATES.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    println!();
    println!(
        "Scoring: random walk, increment in [{:.1}, {:.1}), mean {:+.2}",
        low,
        high,
        walk.expected_increment()
    );
    println!(
        "Ticks every {} ms, default budget {} iterations",
        config.tick_interval_ms, config.default_max_iterations
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate_with_overrides() {
        let cli = Cli::try_parse_from([
            "agentlab",
            "--json",
            "simulate",
            "--name",
            "Scout",
            "--role",
            "Explorer",
            "--goal",
            "Map",
            "--backstory",
            "Sailor",
            "-p",
            "Hello",
            "-n",
            "25",
            "--tick-ms",
            "50",
            "--seed",
            "7",
        ])
        .expect("valid arguments");
        assert!(cli.json);

        match cli.command {
            Commands::Simulate {
                name,
                experiment,
                iterations,
                run,
                ..
            } => {
                assert_eq!(name, "Scout");
                assert_eq!(experiment, "Experiment");
                assert_eq!(iterations, Some(25));
                assert_eq!(run.tick_ms, Some(50));
                assert_eq!(run.seed, Some(7));
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_run_args_override_and_validate() {
        let mut config = LabConfig::default();
        RunArgs {
            tick_ms: Some(25),
            seed: Some(3),
        }
        .apply(&mut config)
        .expect("valid overrides");
        assert_eq!(config.tick_interval_ms, 25);
        assert_eq!(config.seed, Some(3));

        let err = RunArgs {
            tick_ms: Some(0),
            seed: None,
        }
        .apply(&mut config)
        .unwrap_err();
        assert!(err.to_string().contains("Invalid command-line settings"));
    }

    #[test]
    fn test_render_chart_scales_to_top_score() {
        let rows = vec![
            ChartRow {
                name: "GPT-4".to_string(),
                score: 20,
                attempts: 3,
            },
            ChartRow {
                name: "Gemini".to_string(),
                score: 10,
                attempts: 2,
            },
            ChartRow {
                name: "PaLM-2".to_string(),
                score: 0,
                attempts: 1,
            },
        ];
        let chart = render_chart(&rows);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].matches('#').count(), CHART_WIDTH);
        assert_eq!(lines[1].matches('#').count(), CHART_WIDTH / 2);
        assert_eq!(lines[2].matches('#').count(), 0);
        assert!(lines[1].ends_with("(2 attempts)"));
    }

    #[test]
    fn test_render_chart_all_zero() {
        let rows = vec![ChartRow {
            name: "GPT-4".to_string(),
            score: 0,
            attempts: 0,
        }];
        assert!(!render_chart(&rows).contains('#'));
    }

    #[tokio::test]
    async fn test_session_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.ndjson");
        std::fs::write(
            &path,
            "{\"op\":\"create\",\"name\":\"A\",\"role\":\"R\",\"goal\":\"G\",\"backstory\":\"B\"}\n",
        )
        .unwrap();

        let result = cmd_session(LabConfig::default(), Some(&path)).await;
        assert!(result.is_ok(), "session failed: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_session_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_session(LabConfig::default(), Some(&dir.path().join("absent.ndjson")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to open session file"));
    }
}
