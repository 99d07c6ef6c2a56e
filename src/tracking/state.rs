use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{TradeRecord, TradeSignature};

/// How far a wallet's trades have already been notified.
///
/// Every record that was delivered (or suppressed as history at seed time)
/// satisfies one of:
/// - `timestamp < high_water_mark`
/// - `timestamp == high_water_mark` and its signature is in `seen_at_mark`
///
/// Anything older than the mark is treated as known even if its signature was
/// never observed. A trade that shows up late with an older timestamp than
/// already-processed ones is therefore never alerted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletPollState {
    high_water_mark: DateTime<Utc>,
    seen_at_mark: HashSet<TradeSignature>,
}

/// Result of running one snapshot through [`detect_new_trades`].
#[derive(Debug, Clone)]
pub struct Detection {
    /// Genuinely new records, oldest first.
    pub new_trades: Vec<TradeRecord>,
    pub state: WalletPollState,
}

impl Default for WalletPollState {
    fn default() -> Self {
        Self {
            high_water_mark: DateTime::UNIX_EPOCH,
            seen_at_mark: HashSet::new(),
        }
    }
}

impl WalletPollState {
    /// Cold-start state: everything in `snapshot` counts as already known.
    pub fn seed(snapshot: &[TradeRecord]) -> Self {
        let Some(latest) = snapshot.iter().map(|t| t.timestamp).max() else {
            return Self::default();
        };

        Self {
            high_water_mark: latest,
            seen_at_mark: signatures_at(snapshot, latest),
        }
    }

    pub fn high_water_mark(&self) -> DateTime<Utc> {
        self.high_water_mark
    }

    pub fn seen_at_mark(&self) -> &HashSet<TradeSignature> {
        &self.seen_at_mark
    }

    /// Apply a snapshot in place and return the new records, oldest first.
    pub fn ingest(&mut self, snapshot: &[TradeRecord]) -> Vec<TradeRecord> {
        let detection = detect_new_trades(self, snapshot);
        *self = detection.state;
        detection.new_trades
    }
}

/// Classify `snapshot` against `state`. Pure: the input state is not touched.
pub fn detect_new_trades(state: &WalletPollState, snapshot: &[TradeRecord]) -> Detection {
    let mut ordered: Vec<&TradeRecord> = snapshot.iter().collect();
    ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mark = state.high_water_mark;
    let mut emitted: HashSet<TradeSignature> = HashSet::new();
    let mut new_trades: Vec<TradeRecord> = Vec::new();
    let mut new_mark = mark;

    for trade in ordered {
        if trade.timestamp < mark {
            // Sorted descending, nothing after this can be new.
            break;
        }

        let signature = trade.signature();
        if trade.timestamp == mark && state.seen_at_mark.contains(&signature) {
            continue;
        }
        // Same record listed twice in one snapshot.
        if !emitted.insert(signature) {
            continue;
        }

        if trade.timestamp > new_mark {
            new_mark = trade.timestamp;
        }
        new_trades.push(trade.clone());
    }

    if new_trades.is_empty() {
        return Detection {
            new_trades,
            state: state.clone(),
        };
    }

    let next = if new_mark > mark {
        // Rebuilt from the whole snapshot so that every record sharing the new
        // mark is known next tick, not only the ones emitted now.
        WalletPollState {
            high_water_mark: new_mark,
            seen_at_mark: signatures_at(snapshot, new_mark),
        }
    } else {
        let mut seen = state.seen_at_mark.clone();
        seen.extend(emitted);
        WalletPollState {
            high_water_mark: mark,
            seen_at_mark: seen,
        }
    };

    new_trades.reverse();

    Detection {
        new_trades,
        state: next,
    }
}

fn signatures_at(snapshot: &[TradeRecord], at: DateTime<Utc>) -> HashSet<TradeSignature> {
    snapshot
        .iter()
        .filter(|t| t.timestamp == at)
        .map(TradeRecord::signature)
        .collect()
}
