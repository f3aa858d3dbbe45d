//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{validate_pipeline_config, validate_simulation_config};
use crate::domain::error::PipelineError;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "trendfolio", about = "Regime-aware equity screening and backtesting pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute per-symbol indicators and store them
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Classify the market regime calendar from the benchmark index
    Regime {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Score all indicator rows in batches
    Score {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value_t = 50_000)]
        chunk_size: usize,
    },
    /// Run the portfolio simulation and export its artifacts
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        #[arg(long)]
        tx_cost: Option<f64>,
        #[arg(long, default_value = "")]
        output_prefix: String,
    },
    /// Compute performance metrics against the benchmark
    Metrics {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value = "")]
        input_prefix: String,
    },
    /// Run the built-in scenario battery end to end
    StressTest {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Indicators { config } => run_stage(&config, Stage::Indicators),
        Command::Regime { config } => run_stage(&config, Stage::Regime),
        Command::Score { config, chunk_size } => run_stage(&config, Stage::Score { chunk_size }),
        Command::Simulate {
            config,
            start_date,
            end_date,
            tx_cost,
            output_prefix,
        } => run_stage(
            &config,
            Stage::Simulate {
                start_date,
                end_date,
                tx_cost,
                output_prefix,
            },
        ),
        Command::Metrics {
            config,
            input_prefix,
        } => run_stage(&config, Stage::Metrics { input_prefix }),
        Command::StressTest { config } => run_stage(&config, Stage::StressTest),
    }
}

enum Stage {
    Indicators,
    Regime,
    Score {
        chunk_size: usize,
    },
    Simulate {
        start_date: Option<String>,
        end_date: Option<String>,
        tx_cost: Option<f64>,
        output_prefix: String,
    },
    Metrics {
        input_prefix: String,
    },
    StressTest,
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PipelineError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_stage(config_path: &PathBuf, stage: Stage) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_pipeline_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_simulation_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    #[cfg(feature = "sqlite")]
    {
        match pipeline::dispatch(&config, stage) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = stage;
        eprintln!("error: sqlite feature is required for pipeline stages");
        ExitCode::from(1)
    }
}

fn parse_cli_date(value: &str, flag: &str) -> Result<NaiveDate, PipelineError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| PipelineError::ConfigInvalid {
        section: "cli".into(),
        key: flag.into(),
        reason: "invalid date format, expected YYYY-MM-DD".into(),
    })
}

#[cfg(feature = "sqlite")]
mod pipeline {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    use crate::adapters::csv_report_adapter::{read_equity_curve, CsvReportAdapter};
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::indicator::{self, SkippedSymbol, MIN_HISTORY_ROWS};
    use crate::domain::metrics::{align_series, compute_metrics, Verdicts};
    use crate::domain::regime::{classify_series, Regime};
    use crate::domain::scenario::builtin_scenarios;
    use crate::domain::score::score_chunk;
    use crate::domain::simulation::{run_simulation, SimulationConfig, SimulationInputs};
    use crate::ports::feature_store_port::FeatureStorePort;
    use crate::ports::price_store_port::PriceStorePort;
    use crate::ports::report_port::ReportPort;

    pub fn dispatch(config: &dyn ConfigPort, stage: Stage) -> Result<(), PipelineError> {
        let store = SqliteAdapter::from_config(config)?;
        store.initialize_schema()?;

        match stage {
            Stage::Indicators => run_indicators(config, &store),
            Stage::Regime => run_regime(config, &store),
            Stage::Score { chunk_size } => run_score(&store, chunk_size),
            Stage::Simulate {
                start_date,
                end_date,
                tx_cost,
                output_prefix,
            } => {
                let start = start_date
                    .as_deref()
                    .map(|s| parse_cli_date(s, "--start-date"))
                    .transpose()?;
                let end = end_date
                    .as_deref()
                    .map(|s| parse_cli_date(s, "--end-date"))
                    .transpose()?;
                run_simulate(config, &store, start, end, tx_cost, &output_prefix)
            }
            Stage::Metrics { input_prefix } => run_metrics(config, &store, &input_prefix),
            Stage::StressTest => run_stress_test(config, &store),
        }
    }

    fn benchmark_index(config: &dyn ConfigPort) -> Result<String, PipelineError> {
        config
            .get_string("pipeline", "benchmark_index")
            .ok_or_else(|| PipelineError::ConfigMissing {
                section: "pipeline".into(),
                key: "benchmark_index".into(),
            })
    }

    fn output_dir(config: &dyn ConfigPort) -> String {
        config
            .get_string("simulation", "output_dir")
            .unwrap_or_else(|| "outputs".to_string())
    }

    fn run_indicators(config: &dyn ConfigPort, store: &SqliteAdapter) -> Result<(), PipelineError> {
        let index_id = benchmark_index(config)?;
        let min_rows = config.get_int("pipeline", "min_history_rows", MIN_HISTORY_ROWS as i64)
            as usize;

        let index_series = store.fetch_index_series(&index_id)?;
        if index_series.is_empty() {
            return Err(PipelineError::NoData { symbol: index_id });
        }
        let index_returns = indicator::index_return_map(&index_series);

        let symbols = store.list_symbols()?;
        eprintln!("Computing indicators for {} symbols...", symbols.len());

        let mut processed = 0usize;
        let mut skipped: Vec<SkippedSymbol> = Vec::new();
        for symbol in &symbols {
            let series = store.fetch_price_series(symbol)?;
            let skip = SkippedSymbol {
                symbol: symbol.clone(),
                rows: series.len(),
            };
            if series.len() < min_rows {
                skipped.push(skip);
                continue;
            }
            match indicator::compute_symbol_indicators(&series, &index_returns) {
                Some(rows) => {
                    store.upsert_indicators(&rows)?;
                    processed += 1;
                }
                None => skipped.push(skip),
            }
        }

        for skip in &skipped {
            eprintln!(
                "warning: skipping {} ({} rows, need {})",
                skip.symbol, skip.rows, min_rows
            );
        }
        eprintln!(
            "Indicators stored for {} symbols ({} skipped)",
            processed,
            skipped.len()
        );
        Ok(())
    }

    fn run_regime(config: &dyn ConfigPort, store: &SqliteAdapter) -> Result<(), PipelineError> {
        let index_id = benchmark_index(config)?;
        let index_series = store.fetch_index_series(&index_id)?;
        if index_series.is_empty() {
            return Err(PipelineError::NoData { symbol: index_id });
        }

        let records = classify_series(&index_series);
        store.upsert_regimes(&records)?;

        let bulls = records
            .iter()
            .filter(|r| r.classification == Regime::Bull)
            .count();
        let bears = records
            .iter()
            .filter(|r| r.classification == Regime::Bear)
            .count();
        eprintln!(
            "Regime calendar stored: {} days ({} BULL, {} BEAR, {} NEUTRAL)",
            records.len(),
            bulls,
            bears,
            records.len() - bulls - bears
        );
        Ok(())
    }

    fn run_score(store: &SqliteAdapter, chunk_size: usize) -> Result<(), PipelineError> {
        if chunk_size == 0 {
            return Err(PipelineError::ConfigInvalid {
                section: "cli".into(),
                key: "--chunk-size".into(),
                reason: "chunk size must be positive".into(),
            });
        }

        let mut offset = 0usize;
        let mut total = 0usize;
        loop {
            let batch = store.fetch_indicator_rows(offset, chunk_size)?;
            if batch.is_empty() {
                break;
            }
            let scores = score_chunk(&batch);
            store.upsert_scores(&scores)?;
            total += scores.len();
            offset += batch.len();
            eprintln!("Scored {} rows...", total);
        }

        eprintln!("Scoring complete: {} rows", total);
        Ok(())
    }

    fn build_simulation_config(config: &dyn ConfigPort, tx_cost: Option<f64>) -> SimulationConfig {
        let defaults = SimulationConfig::default();
        SimulationConfig {
            initial_capital: config.get_double(
                "simulation",
                "initial_capital",
                defaults.initial_capital,
            ),
            entry_score_threshold: config.get_int(
                "simulation",
                "entry_score_threshold",
                defaults.entry_score_threshold as i64,
            ) as i32,
            exit_score_threshold: config.get_int(
                "simulation",
                "exit_score_threshold",
                defaults.exit_score_threshold as i64,
            ) as i32,
            trailing_stop_fraction: config.get_double(
                "simulation",
                "trailing_stop",
                defaults.trailing_stop_fraction,
            ),
            transaction_cost_rate: tx_cost.unwrap_or_else(|| {
                config.get_double(
                    "simulation",
                    "transaction_cost",
                    defaults.transaction_cost_rate,
                )
            }),
            max_positions: config.get_int(
                "simulation",
                "max_positions",
                defaults.max_positions as i64,
            ) as usize,
            position_size_fraction: config.get_double(
                "simulation",
                "position_size",
                defaults.position_size_fraction,
            ),
        }
    }

    fn config_date(
        config: &dyn ConfigPort,
        key: &str,
    ) -> Result<Option<NaiveDate>, PipelineError> {
        config
            .get_string("simulation", key)
            .map(|s| parse_cli_date(&s, key))
            .transpose()
    }

    fn load_simulation_inputs(
        store: &SqliteAdapter,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<SimulationInputs, PipelineError> {
        let regime_by_date: BTreeMap<NaiveDate, Regime> = store
            .fetch_regime_history(start, end)?
            .into_iter()
            .map(|r| (r.date, r.classification))
            .collect();

        let mut prices_by_date: HashMap<NaiveDate, HashMap<String, f64>> = HashMap::new();
        for (date, symbol, close) in store.fetch_close_history(start, end)? {
            prices_by_date.entry(date).or_default().insert(symbol, close);
        }

        let mut scores_by_date: HashMap<NaiveDate, HashMap<String, i32>> = HashMap::new();
        for (date, symbol, score) in store.fetch_score_history(start, end)? {
            scores_by_date.entry(date).or_default().insert(symbol, score);
        }

        Ok(SimulationInputs {
            regime_by_date,
            prices_by_date,
            scores_by_date,
        })
    }

    fn run_simulate(
        config: &dyn ConfigPort,
        store: &SqliteAdapter,
        start_override: Option<NaiveDate>,
        end_override: Option<NaiveDate>,
        tx_cost: Option<f64>,
        output_prefix: &str,
    ) -> Result<(), PipelineError> {
        let start = match start_override {
            Some(d) => Some(d),
            None => config_date(config, "start_date")?,
        };
        let end = match end_override {
            Some(d) => Some(d),
            None => config_date(config, "end_date")?,
        };

        let sim_config = build_simulation_config(config, tx_cost);
        let inputs = load_simulation_inputs(store, start, end)?;

        eprintln!(
            "Simulating {} trading days (capital {:.0}, tx cost {:.3}%)...",
            inputs.regime_by_date.len(),
            sim_config.initial_capital,
            sim_config.transaction_cost_rate * 100.0
        );

        let portfolio = run_simulation(&inputs, &sim_config)?;

        let final_equity = portfolio
            .equity_curve
            .last()
            .map_or(sim_config.initial_capital, |s| s.equity);
        eprintln!(
            "Simulation complete: {} trades, final equity {:.2}",
            portfolio.trade_log.len(),
            final_equity
        );

        let dir = output_dir(config);
        let reporter = CsvReportAdapter;
        let equity_path = format!("{}/{}equity_curve.csv", dir, output_prefix);
        let trades_path = format!("{}/{}trade_log.csv", dir, output_prefix);
        reporter.write_equity_curve(&portfolio.equity_curve, &equity_path)?;
        reporter.write_trade_log(&portfolio.trade_log, &trades_path)?;
        eprintln!("Artifacts written to {} and {}", equity_path, trades_path);
        Ok(())
    }

    fn run_metrics(
        config: &dyn ConfigPort,
        store: &SqliteAdapter,
        input_prefix: &str,
    ) -> Result<(), PipelineError> {
        let dir = output_dir(config);
        let equity_path = format!("{}/{}equity_curve.csv", dir, input_prefix);
        let equity = read_equity_curve(&equity_path)?;
        if equity.is_empty() {
            return Err(PipelineError::EmptyDateIndex {
                reason: format!("{} contains no rows", equity_path),
            });
        }

        let index_id = benchmark_index(config)?;
        let first = equity[0].0;
        let last = equity[equity.len() - 1].0;
        let benchmark: Vec<(NaiveDate, f64)> = store
            .fetch_index_series(&index_id)?
            .into_iter()
            .filter(|p| p.date >= first && p.date <= last)
            .map(|p| (p.date, p.close))
            .collect();

        let aligned = align_series(&equity, &benchmark);
        eprintln!(
            "Computing metrics over {} aligned trading days...",
            aligned.len()
        );

        let strategy_series: Vec<(NaiveDate, f64)> =
            aligned.iter().map(|&(d, s, _)| (d, s)).collect();
        let benchmark_series: Vec<(NaiveDate, f64)> =
            aligned.iter().map(|&(d, _, b)| (d, b)).collect();

        let strategy = compute_metrics("Trend Strategy", &strategy_series)?;
        let bench = compute_metrics(&format!("{} (Buy & Hold)", index_id), &benchmark_series)?;

        let reporter = CsvReportAdapter;
        let summary_csv = format!("{}/{}performance_summary.csv", dir, input_prefix);
        let summary_md = format!("{}/{}performance_summary.md", dir, input_prefix);
        let rows = [strategy.clone(), bench.clone()];
        reporter.write_performance_summary(&rows, &summary_csv)?;
        reporter.write_performance_markdown(&rows, &summary_md)?;
        eprintln!("Metrics exported to {} and {}", summary_csv, summary_md);

        let verdicts = Verdicts::evaluate(&strategy, &bench);
        let mark = |pass: bool| if pass { "PASS" } else { "FAIL" };
        eprintln!("--- GO/NO-GO CRITERIA ---");
        eprintln!(
            "1. CAGR > benchmark:         {}",
            mark(verdicts.cagr_beats_benchmark)
        );
        eprintln!(
            "2. Max drawdown < benchmark: {}",
            mark(verdicts.drawdown_shallower_than_benchmark)
        );
        eprintln!(
            "3. Sharpe ratio >= 1.0:      {}",
            mark(verdicts.sharpe_at_least_one)
        );
        Ok(())
    }

    fn run_stress_test(config: &dyn ConfigPort, store: &SqliteAdapter) -> Result<(), PipelineError> {
        for scenario in builtin_scenarios() {
            eprintln!("\n=== SCENARIO: {} ===", scenario.name);
            let result = run_simulate(
                config,
                store,
                scenario.start_date,
                scenario.end_date,
                Some(scenario.transaction_cost_rate),
                scenario.output_prefix,
            )
            .and_then(|()| run_metrics(config, store, scenario.output_prefix));

            if let Err(e) = result {
                eprintln!("scenario '{}' failed: {}", scenario.name, e);
                return Err(e);
            }
        }
        eprintln!("\nAll scenarios complete.");
        Ok(())
    }
}
