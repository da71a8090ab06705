//! Replay newline-delimited transactions through the fraud detector
//!
//! Each input line is a JSON object `{"transaction": {...}, "context": {...}}`
//! where `context` is optional. Results are written to stdout, one JSON
//! object per line.
//!
//! Without a `context` the replay builds one: recent activity and any
//! learned profile come from the detector, and the account history is the
//! account's previously replayed transactions, most recent first, capped at
//! `HISTORY_LIMIT`. The first transaction of an account sees an empty
//! history. A supplied `context` is used as-is.
//!
//! Usage: `fraud-replay [FILE]` (reads stdin when no file is given)

use anyhow::Context;
use fraud_engine::{Detector, EvaluationContext, FraudConfig, Transaction};
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Write};
use tokio_util::sync::CancellationToken;

/// Prior transactions kept per account for replay-built contexts
const HISTORY_LIMIT: usize = 50;

#[derive(Deserialize)]
struct ReplayLine {
    transaction: Transaction,
    #[serde(default)]
    context: Option<EvaluationContext>,
}

/// Replayed transactions per source account, most recent first
#[derive(Default)]
struct AccountHistory {
    accounts: HashMap<String, VecDeque<Transaction>>,
}

impl AccountHistory {
    fn for_account(&self, account_id: &str) -> Vec<Transaction> {
        self.accounts
            .get(account_id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn push(&mut self, txn: Transaction) {
        let history = self.accounts.entry(txn.source_account_id.clone()).or_default();
        history.push_front(txn);
        history.truncate(HISTORY_LIMIT);
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    // Logs go to stderr so stdout stays machine readable
    let json = std::env::var("FRAUD_LOG_JSON").map_or(false, |v| v == "1");
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config() -> anyhow::Result<FraudConfig> {
    match std::env::var("FRAUD_ENGINE_CONFIG") {
        Ok(path) => FraudConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path)),
        Err(_) => FraudConfig::from_env().context("loading config from environment"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config()?;
    tracing::info!(threshold = config.score_threshold, "Starting fraud replay");

    let detector = Detector::new(config)?;
    detector.start(CancellationToken::new())?;

    let input: Box<dyn BufRead> = match std::env::args().nth(1) {
        Some(path) => {
            let file = std::fs::File::open(&path).with_context(|| format!("opening {}", path))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut evaluated = 0usize;
    let mut history = AccountHistory::default();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let parsed: ReplayLine = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(line = index + 1, "Skipping malformed input: {}", e);
                continue;
            }
        };

        let txn = parsed.transaction;
        let context = parsed.context.unwrap_or_else(|| EvaluationContext {
            account_history: Some(history.for_account(&txn.source_account_id)),
            ..detector.derive_context(&txn)
        });
        let result = detector.evaluate(&txn, &context).await;
        history.push(txn);

        serde_json::to_writer(&mut out, &result)?;
        out.write_all(b"\n")?;
        evaluated += 1;
    }
    out.flush()?;

    detector.shutdown().await;

    let stats = detector.get_stats();
    tracing::info!(
        evaluated,
        alerts = stats.total_alerts,
        "Fraud replay finished"
    );
    tracing::debug!("{}", detector.metrics().gather_text());

    Ok(())
}
