//! Built-in stress-test scenarios.
//!
//! Each scenario is one full simulate-then-measure pass over a date window
//! with its own transaction cost and output prefix. The runner executes them
//! in order and halts on the first failure.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: &'static str,
    pub output_prefix: &'static str,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transaction_cost_rate: f64,
}

fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, day)
}

/// The fixed scenario battery, in execution order.
pub fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "Baseline Engine",
            output_prefix: "baseline_",
            start_date: None,
            end_date: None,
            transaction_cost_rate: 0.004,
        },
        Scenario {
            name: "High Transaction Friction (0.8%)",
            output_prefix: "high_friction_",
            start_date: None,
            end_date: None,
            transaction_cost_rate: 0.008,
        },
        Scenario {
            name: "2008 Financial Crisis",
            output_prefix: "crash_2008_",
            start_date: d(2007, 10, 1),
            end_date: d(2009, 3, 31),
            transaction_cost_rate: 0.004,
        },
        Scenario {
            name: "2020 COVID Crash",
            output_prefix: "crash_2020_",
            start_date: d(2020, 1, 1),
            end_date: d(2020, 6, 30),
            transaction_cost_rate: 0.004,
        },
        Scenario {
            name: "Sideways Market",
            output_prefix: "sideways_2010_",
            start_date: d(2010, 1, 1),
            end_date: d(2013, 12, 31),
            transaction_cost_rate: 0.004,
        },
        Scenario {
            name: "Walk-Forward (In-Sample Training)",
            output_prefix: "wf_train_",
            start_date: d(2005, 1, 1),
            end_date: d(2015, 12, 31),
            transaction_cost_rate: 0.004,
        },
        Scenario {
            name: "Walk-Forward (Out-of-Sample Test)",
            output_prefix: "wf_test_",
            start_date: d(2016, 1, 1),
            end_date: d(2024, 12, 31),
            transaction_cost_rate: 0.004,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_has_seven_scenarios_in_order() {
        let scenarios = builtin_scenarios();
        assert_eq!(scenarios.len(), 7);
        assert_eq!(scenarios[0].name, "Baseline Engine");
        assert_eq!(scenarios[6].output_prefix, "wf_test_");
    }

    #[test]
    fn only_high_friction_raises_the_cost() {
        for scenario in builtin_scenarios() {
            let expected = if scenario.output_prefix == "high_friction_" {
                0.008
            } else {
                0.004
            };
            assert!((scenario.transaction_cost_rate - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn crisis_windows_are_bounded() {
        let scenarios = builtin_scenarios();
        let crash = scenarios
            .iter()
            .find(|s| s.output_prefix == "crash_2008_")
            .unwrap();
        assert!(crash.start_date.unwrap() < crash.end_date.unwrap());
        assert_eq!(crash.start_date, NaiveDate::from_ymd_opt(2007, 10, 1));
    }

    #[test]
    fn prefixes_are_unique() {
        let scenarios = builtin_scenarios();
        let mut prefixes: Vec<&str> = scenarios.iter().map(|s| s.output_prefix).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), scenarios.len());
    }
}
