//! `vas` command line
//!
//! Runs assessments against simulated collaborators with checkpoints in a
//! local state directory. Ctrl-C cancels a run; `vas resume` continues it.

mod config;
mod report;
mod simulate;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::AppConfig;
use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vas_pipeline::{
    DocumentRef, PhaseKey, PhaseStatus, Pipeline, PipelineError, PipelineResults, PrimaryInput,
};
use vas_state::{ArchiveKey, ScoreDimension, StateStore, UserScore};

fn cli() -> Command {
    Command::new("vas")
        .version(vas_pipeline::VERSION)
        .about("Venture assessment pipeline")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Checkpoint directory (overrides config)"),
        )
        .arg(
            Arg::new("scale-ms")
                .long("scale-ms")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Milliseconds of simulated work per estimated second"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run an assessment against simulated collaborators")
                .arg(Arg::new("url").long("url").help("Company website"))
                .arg(
                    Arg::new("document")
                        .long("document")
                        .help("Pitch deck file name"),
                )
                .arg(Arg::new("advisor").long("advisor").help("Reviewer name"))
                .arg(
                    Arg::new("fail")
                        .long("fail")
                        .action(ArgAction::Append)
                        .help("Phase whose first call fails (repeatable)"),
                )
                .arg(
                    Arg::new("retry")
                        .long("retry")
                        .action(ArgAction::SetTrue)
                        .help("Retry failed phases once the run ends"),
                )
                .arg(
                    Arg::new("discard")
                        .long("discard")
                        .action(ArgAction::SetTrue)
                        .help("Discard an interrupted assessment instead of refusing"),
                ),
        )
        .subcommand(Command::new("resume").about("Resume the interrupted assessment"))
        .subcommand(
            Command::new("status")
                .about("Show the stored checkpoint")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("clear").about("Delete the stored checkpoint"))
        .subcommand(
            Command::new("score")
                .about("Record a rubric score for the current assessment")
                .arg(
                    Arg::new("dimension")
                        .required(true)
                        .help("team, funding, competitive, market or iprisk"),
                )
                .arg(
                    Arg::new("score")
                        .required(true)
                        .value_parser(value_parser!(u8))
                        .help("1 to 9"),
                )
                .arg(
                    Arg::new("justification")
                        .long("justification")
                        .default_value(""),
                )
                .arg(
                    Arg::new("submit")
                        .long("submit")
                        .action(ArgAction::SetTrue)
                        .help("Mark the score submitted"),
                ),
        )
        .subcommand(
            Command::new("archive")
                .about("Browse archived assessments")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List archived assessments"))
                .subcommand(
                    Command::new("show")
                        .about("Print one archived assessment")
                        .arg(Arg::new("key").required(true)),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete one archived assessment")
                        .arg(Arg::new("key").required(true)),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let mut config = AppConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    if let Some(dir) = matches.get_one::<PathBuf>("state-dir") {
        config = config.with_state_dir(dir);
    }
    if let Some(scale_ms) = matches.get_one::<u64>("scale-ms") {
        config = config.with_scale_ms(*scale_ms);
    }
    let store = Arc::new(
        StateStore::open(&config.state_dir, config.state.clone())
            .await
            .with_context(|| format!("opening state dir {}", config.state_dir.display()))?,
    );

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(&config, store, args).await,
        Some(("resume", _)) => resume(&config, store).await,
        Some(("status", args)) => status(&store, args.get_flag("json")).await,
        Some(("clear", _)) => {
            store.try_clear_state().await?;
            println!("checkpoint cleared");
            Ok(ExitCode::SUCCESS)
        }
        Some(("score", args)) => score(&store, args).await,
        Some(("archive", args)) => archive(&store, args).await,
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn build_pipeline(
    config: &AppConfig,
    failing: &BTreeSet<PhaseKey>,
    store: Arc<StateStore>,
) -> Pipeline {
    let scale_ms = config.simulation.scale_ms;
    Pipeline::builder(simulate::collaborators(&config.pipeline, scale_ms, failing))
        .config(config.pipeline.clone())
        .checkpoints(store)
        .build()
}

fn input_from(args: &ArgMatches) -> anyhow::Result<PrimaryInput> {
    let mut input = match args.get_one::<String>("url") {
        Some(url) => PrimaryInput::from_url(url)?,
        None => PrimaryInput::new(),
    };
    if let Some(document) = args.get_one::<String>("document") {
        input = input.with_document(DocumentRef::new(document.as_str()));
    }
    if let Some(advisor) = args.get_one::<String>("advisor") {
        input = input.with_advisor(advisor.as_str());
    }
    input.validate()?;
    Ok(input)
}

/// Await `run` while printing events; Ctrl-C cancels the pipeline
async fn drive<T, F>(pipeline: &Pipeline, run: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    let mut events = pipeline.subscribe();
    tokio::pin!(run);
    let mut interrupted = false;

    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            Some(event) = events.recv() => println!("{}", report::event_line(&event)),
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if signal.is_ok() {
                    pipeline.cancel();
                }
            }
        }
    };
    while let Ok(event) = events.try_recv() {
        println!("{}", report::event_line(&event));
    }
    outcome
}

fn finish(outcome: Result<PipelineResults, PipelineError>) -> anyhow::Result<Option<PipelineResults>> {
    match outcome {
        Ok(results) => {
            print!("{}", report::results_summary(&results));
            Ok(Some(results))
        }
        Err(PipelineError::Cancelled) => {
            println!("progress saved; continue with `vas resume`");
            Ok(None)
        }
        Err(error) => Err(error.into()),
    }
}

async fn retry_failed(pipeline: &Pipeline, results: &PipelineResults) -> bool {
    // canonical order retries competitive before market
    for key in results.failed_phases() {
        info!(phase = %key, "retrying");
        if let Err(error) = drive(pipeline, pipeline.retry_phase(key)).await {
            println!("retry of {key} failed: {error}");
        }
    }
    pipeline
        .phases()
        .iter()
        .all(|phase| phase.status == PhaseStatus::Completed)
}

async fn simulate(config: &AppConfig, store: Arc<StateStore>, args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let input = input_from(args)?;
    let failing = args
        .get_many::<String>("fail")
        .into_iter()
        .flatten()
        .map(|raw| raw.parse::<PhaseKey>())
        .collect::<Result<BTreeSet<_>, _>>()?;

    if store.has_incomplete_analysis().await {
        if !args.get_flag("discard") {
            bail!("an interrupted assessment is stored; run `vas resume` or pass --discard");
        }
        store.try_clear_state().await?;
    }

    let pipeline = build_pipeline(config, &failing, store);
    let Some(results) = finish(drive(&pipeline, pipeline.start(input)).await)? else {
        return Ok(ExitCode::from(130));
    };

    let complete = if !results.is_complete() && args.get_flag("retry") {
        retry_failed(&pipeline, &results).await
    } else {
        results.is_complete()
    };
    Ok(if complete { ExitCode::SUCCESS } else { ExitCode::from(2) })
}

async fn resume(config: &AppConfig, store: Arc<StateStore>) -> anyhow::Result<ExitCode> {
    let Some(point) = store.resume_point().await else {
        println!("nothing to resume");
        return Ok(ExitCode::SUCCESS);
    };
    println!(
        "resuming {} ({} of {} phases saved)",
        point.input.identifier(),
        point.completed.len(),
        PhaseKey::ALL.len()
    );

    let pipeline = build_pipeline(config, &BTreeSet::new(), store);
    match finish(drive(&pipeline, pipeline.resume(point)).await)? {
        Some(results) if results.is_complete() => Ok(ExitCode::SUCCESS),
        Some(_) => Ok(ExitCode::from(2)),
        None => Ok(ExitCode::from(130)),
    }
}

async fn status(store: &StateStore, json: bool) -> anyhow::Result<ExitCode> {
    let Some(record) = store.try_load().await? else {
        println!("no stored assessment");
        return Ok(ExitCode::SUCCESS);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", report::record_summary(&record));
    }
    Ok(ExitCode::SUCCESS)
}

async fn score(store: &StateStore, args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let dimension = args
        .get_one::<String>("dimension")
        .context("dimension is required")?
        .parse::<ScoreDimension>()?;
    let value = *args.get_one::<u8>("score").context("score is required")?;
    let justification = args
        .get_one::<String>("justification")
        .cloned()
        .unwrap_or_default();

    let mut score = UserScore::new(value, justification);
    if args.get_flag("submit") {
        score = score.submitted();
    }
    store.try_save_user_score(dimension, score).await?;
    println!("{dimension} scored {value}");
    Ok(ExitCode::SUCCESS)
}

fn archive_key(args: &ArgMatches) -> anyhow::Result<ArchiveKey> {
    Ok(args
        .get_one::<String>("key")
        .context("key is required")?
        .parse()?)
}

async fn archive(store: &StateStore, args: &ArgMatches) -> anyhow::Result<ExitCode> {
    match args.subcommand() {
        Some(("list", _)) => {
            let summaries = store.try_list_past_assessments().await?;
            if summaries.is_empty() {
                println!("archive is empty");
            }
            for summary in &summaries {
                println!("{}", report::archive_line(summary));
            }
        }
        Some(("show", args)) => {
            let key = archive_key(args)?;
            let Some(assessment) = store.load_assessment(key).await else {
                bail!("no readable archive entry {key}");
            };
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }
        Some(("delete", args)) => {
            let key = archive_key(args)?;
            store.try_delete_assessment(key).await?;
            println!("deleted {key}");
        }
        _ => {}
    }
    Ok(ExitCode::SUCCESS)
}
