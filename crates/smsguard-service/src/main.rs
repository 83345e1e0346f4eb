//! SMS Guard
//!
//! Command-line front end: ingest transport segments, classify single
//! texts, and train word models.

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use smsguard_classifiers::{ClassifierBuilder, NaiveBayesClassifier, WordModel};
use smsguard_core::Segment;
use smsguard_service::{ConfigOverrides, ServiceConfig, SmsFilter};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    let overrides = ConfigOverrides {
        model_path: cli.model.clone(),
        keyword_only: cli.keyword_only,
        inference_timeout_ms: cli.inference_timeout_ms,
    };
    let config = ServiceConfig::load(&cli.config, &overrides)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    match cli.command {
        Commands::Ingest {
            input,
            list,
            metrics,
        } => {
            let handle = init_metrics()?;
            ingest(&config, &input, list).await?;
            if metrics {
                println!("{}", handle.render());
            }
        }
        Commands::Classify { text } => classify(&config, &text).await?,
        Commands::Train { spam, ham, output } => {
            train(cli.model.as_deref(), spam.as_deref(), ham.as_deref(), &output)?
        }
    }

    Ok(())
}

async fn ingest(config: &ServiceConfig, input: &str, list: bool) -> Result<()> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if input == "-" {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        let file = tokio::fs::File::open(input)
            .await
            .with_context(|| format!("Failed to open {}", input))?;
        Box::new(BufReader::new(file))
    };

    let filter = SmsFilter::from_config(config)?;
    let store = filter.store().clone();
    let processor = filter.processor().clone();

    let mut lines = reader.lines();
    let mut line_number = 0usize;
    let mut segments = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Segment>(line) {
            Ok(segment) => {
                filter.ingest(segment);
                segments += 1;
            }
            Err(e) => warn!("Skipping line {}: {}", line_number, e),
        }
    }
    info!("Read {} segments from {}", segments, input);

    let summary = filter.finish().await?;

    if let Some(days) = config.storage.retention_days {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
        processor.purge_older_than(cutoff.timestamp_millis()).await?;
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if list {
        for message in store.messages() {
            println!("{}", serde_json::to_string(&message)?);
        }
    }
    Ok(())
}

async fn classify(config: &ServiceConfig, text: &str) -> Result<()> {
    let classifier = ClassifierBuilder::new(config.classifier.clone()).build()?;
    let result = classifier.classify(text).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn train(
    base: Option<&Path>,
    spam: Option<&Path>,
    ham: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let model = match base {
        Some(path) if path.exists() => WordModel::load(path)?,
        _ => WordModel::new(),
    };
    let bayes = NaiveBayesClassifier::new(Arc::new(model))?;

    let mut trained = (0usize, 0usize);
    if let Some(path) = spam {
        trained.0 = train_file(path, |line| bayes.train_spam(line))?;
    }
    if let Some(path) = ham {
        trained.1 = train_file(path, |line| bayes.train_ham(line))?;
    }

    bayes.model().save(output)?;
    info!(
        "Trained on {} spam and {} ham messages; {} words in vocabulary",
        trained.0,
        trained.1,
        bayes.model().vocabulary_size()
    );
    println!("Model written to {}", output.display());
    Ok(())
}

fn train_file(path: &Path, mut train: impl FnMut(&str)) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut count = 0;
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        train(line);
        count += 1;
    }
    Ok(count)
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("smsguard=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smsguard=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics recorder and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "smsguard_segments_received_total",
        "Total number of transport segments received"
    );
    metrics::describe_counter!(
        "smsguard_messages_emitted_total",
        "Total number of reassembled messages by outcome"
    );
    metrics::describe_counter!(
        "smsguard_reassembly_evictions_total",
        "Total number of open messages evicted at buffer capacity"
    );
    metrics::describe_counter!(
        "smsguard_classifications_total",
        "Total number of classifications by mode and verdict"
    );
    metrics::describe_counter!(
        "smsguard_inference_fallbacks_total",
        "Total number of neutral inference results by reason"
    );
    metrics::describe_counter!(
        "smsguard_store_failures_total",
        "Total number of failed store attempts"
    );

    Ok(handle)
}
