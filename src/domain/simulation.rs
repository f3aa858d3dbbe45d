//! Portfolio simulator: the day-by-day decision state machine.
//!
//! Per trading day, in strict order: resolve regime, evaluate exits against
//! yesterday's positions (high-water mark updated first), execute exits,
//! evaluate and execute entries (BULL days only), record end-of-day equity.
//! Days with no price data at all are skipped. Residual open positions are not
//! liquidated at the end; final equity is mark-to-market.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::error::PipelineError;
use super::portfolio::Portfolio;
use super::position::{ExitReason, Position};
use super::regime::Regime;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    pub entry_score_threshold: i32,
    pub exit_score_threshold: i32,
    pub trailing_stop_fraction: f64,
    pub transaction_cost_rate: f64,
    pub max_positions: usize,
    pub position_size_fraction: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 100_000.0,
            entry_score_threshold: 4,
            exit_score_threshold: 2,
            trailing_stop_fraction: 0.20,
            transaction_cost_rate: 0.004,
            max_positions: 10,
            position_size_fraction: 0.10,
        }
    }
}

/// All inputs are loaded in full before the loop begins; the simulator never
/// touches a store mid-run.
#[derive(Debug, Clone, Default)]
pub struct SimulationInputs {
    /// The simulation date index: one entry per classified trading day.
    pub regime_by_date: BTreeMap<NaiveDate, Regime>,
    pub prices_by_date: HashMap<NaiveDate, HashMap<String, f64>>,
    pub scores_by_date: HashMap<NaiveDate, HashMap<String, i32>>,
}

pub fn run_simulation(
    inputs: &SimulationInputs,
    config: &SimulationConfig,
) -> Result<Portfolio, PipelineError> {
    if inputs.regime_by_date.is_empty() {
        return Err(PipelineError::EmptyDateIndex {
            reason: "no regime records in the requested date range".into(),
        });
    }

    let mut portfolio = Portfolio::new(config.initial_capital);
    let empty_scores: HashMap<String, i32> = HashMap::new();

    for (&date, &regime) in &inputs.regime_by_date {
        let Some(today_prices) = inputs.prices_by_date.get(&date) else {
            continue;
        };
        if today_prices.is_empty() {
            continue;
        }
        let today_scores = inputs.scores_by_date.get(&date).unwrap_or(&empty_scores);

        evaluate_and_execute_exits(&mut portfolio, regime, today_prices, today_scores, date, config);

        if regime == Regime::Bull && portfolio.position_count() < config.max_positions {
            execute_entries(&mut portfolio, today_prices, today_scores, date, config);
        }

        let equity = portfolio.total_equity(today_prices);
        portfolio.record_equity(date, equity);
    }

    Ok(portfolio)
}

/// Two-pass exit handling: flag first, then settle, so settlement never
/// mutates the position map mid-iteration. A held symbol with no price today
/// is held unconditionally. Rule priority: regime, then score, then stop.
fn evaluate_and_execute_exits(
    portfolio: &mut Portfolio,
    regime: Regime,
    today_prices: &HashMap<String, f64>,
    today_scores: &HashMap<String, i32>,
    date: NaiveDate,
    config: &SimulationConfig,
) {
    let mut flagged: Vec<(String, f64, ExitReason)> = Vec::new();

    for pos in portfolio.positions.values_mut() {
        let Some(&price) = today_prices.get(&pos.symbol) else {
            continue;
        };
        pos.observe_price(price);

        let score = today_scores.get(&pos.symbol).copied().unwrap_or(0);
        let reason = if regime == Regime::Bear {
            Some(ExitReason::RegimeBear)
        } else if score <= config.exit_score_threshold {
            Some(ExitReason::ScoreLow)
        } else if pos.trailing_stop_hit(price, config.trailing_stop_fraction) {
            Some(ExitReason::TrailingStop)
        } else {
            None
        };

        if let Some(reason) = reason {
            flagged.push((pos.symbol.clone(), price, reason));
        }
    }

    for (symbol, exit_price, reason) in flagged {
        settle_exit(portfolio, &symbol, exit_price, date, reason, config);
    }
}

fn settle_exit(
    portfolio: &mut Portfolio,
    symbol: &str,
    exit_price: f64,
    date: NaiveDate,
    reason: ExitReason,
    config: &SimulationConfig,
) {
    let Some(position) = portfolio.remove_position(symbol) else {
        return;
    };

    let gross_proceeds = position.shares as f64 * exit_price;
    let cost = gross_proceeds * config.transaction_cost_rate;
    let net_proceeds = gross_proceeds - cost;
    let pnl = net_proceeds - position.shares as f64 * position.entry_price;

    portfolio.cash += net_proceeds;
    portfolio.record_trade(super::position::TradeRecord {
        symbol: position.symbol,
        entry_date: position.entry_date,
        exit_date: date,
        entry_price: position.entry_price,
        exit_price,
        shares: position.shares,
        pnl,
        exit_reason: reason,
    });
}

/// Entries on a BULL day. Candidates are materialized into an ordered list and
/// ranked by score descending, symbol ascending as the deterministic
/// tie-break. Every slot sizes against the same pre-fill equity snapshot;
/// the allocation is deliberately not recomputed as cash is spent.
fn execute_entries(
    portfolio: &mut Portfolio,
    today_prices: &HashMap<String, f64>,
    today_scores: &HashMap<String, i32>,
    date: NaiveDate,
    config: &SimulationConfig,
) {
    let slots = config.max_positions - portfolio.position_count();

    let mut candidates: Vec<(&str, i32)> = today_scores
        .iter()
        .filter(|(symbol, score)| {
            **score >= config.entry_score_threshold
                && !portfolio.has_position(symbol)
                && today_prices.contains_key(*symbol)
        })
        .map(|(symbol, &score)| (symbol.as_str(), score))
        .collect();

    if candidates.is_empty() {
        return;
    }

    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    candidates.truncate(slots);

    let current_equity = portfolio.total_equity(today_prices);
    let allocation_per_slot = current_equity * config.position_size_fraction;

    for (symbol, _) in candidates {
        let Some(&price) = today_prices.get(symbol) else {
            continue;
        };
        if price <= 0.0 || portfolio.cash <= 0.0 {
            continue;
        }

        let invest_amount = allocation_per_slot.min(portfolio.cash);
        let net_of_fees = invest_amount / (1.0 + config.transaction_cost_rate);
        let shares = (net_of_fees / price).floor() as i64;
        let total_cost = shares as f64 * price * (1.0 + config.transaction_cost_rate);

        if shares > 0 && portfolio.cash >= total_cost {
            portfolio.cash -= total_cost;
            portfolio.add_position(Position::open(symbol, shares, price, date));
        }
    }
}
