//! Call log replay.
//!
//! A log is a JSON array (or newline-delimited JSON) of [`ReplayRecord`]s.
//! Records run in order against one [`LocalClock`]; a record carrying a
//! `height` moves the clock forward to it first.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};
use vaultdao_governance::{handle_input, CallInput, DaoState, ErrorKind};
use vaultdao_types::{Address, BlockClock, BlockHeight, LocalClock};

/// One logged call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<BlockHeight>,
    pub caller: Address,
    pub input: CallInput,
}

/// A call the state machine refused during replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedCall {
    pub index: usize,
    pub function: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: Vec<RejectedCall>,
    pub final_height: BlockHeight,
}

pub fn load_state(path: &Path) -> Result<DaoState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid state file {}", path.display()))
}

pub fn save_state(path: &Path, state: &DaoState) -> Result<()> {
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write state {}", path.display()))?;
    Ok(())
}

pub fn load_log(path: &Path) -> Result<Vec<ReplayRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read call log {}", path.display()))?;
    parse_log(&content).with_context(|| format!("Invalid call log {}", path.display()))
}

/// Parse a JSON array of records, or one record per non-blank line.
pub fn parse_log(content: &str) -> Result<Vec<ReplayRecord>> {
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}", number + 1))
        })
        .collect()
}

/// Apply `records` to `state` in order, starting the clock at `start_height`.
///
/// Rejections are logged and collected. With `stop_on_error` the first one
/// aborts the replay instead. A record whose height is below the clock is
/// always an error.
pub fn replay(
    mut state: DaoState,
    records: Vec<ReplayRecord>,
    start_height: BlockHeight,
    stop_on_error: bool,
) -> Result<(DaoState, ReplaySummary)> {
    let clock = LocalClock::new(start_height);
    let mut summary = ReplaySummary::default();

    info!(records = records.len(), start_height, "▶️ Replaying call log");

    for (index, record) in records.into_iter().enumerate() {
        if let Some(height) = record.height {
            if !clock.advance_to(height) {
                bail!(
                    "record {} moves the clock backwards ({} < {})",
                    index,
                    height,
                    clock.current_height()
                );
            }
        }

        let function = record.input.function.clone();
        state = match handle_input(state, record.caller, record.input, &clock) {
            Ok(outcome) => {
                if let Some(result) = outcome.result() {
                    info!(index, function = %function, result = ?result, "🔍 Query");
                } else {
                    debug!(index, function = %function, "Call applied");
                }
                summary.applied += 1;
                outcome.into_state()
            }
            Err(rejection) => {
                if stop_on_error {
                    return Err(rejection.error)
                        .with_context(|| format!("record {} ({}) rejected", index, function));
                }
                warn!(index, function = %function, error = %rejection.error, "⚠️ Skipping rejected call");
                summary.rejected.push(RejectedCall {
                    index,
                    function,
                    kind: rejection.error.kind(),
                    message: rejection.error.to_string(),
                });
                rejection.state
            }
        };
    }

    summary.final_height = clock.current_height();
    info!(
        applied = summary.applied,
        rejected = summary.rejected.len(),
        height = summary.final_height,
        "✅ Replay complete"
    );
    Ok((state, summary))
}
