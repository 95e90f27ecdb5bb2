//! Progress weighting and cost accounting.

use serde::{Deserialize, Serialize};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    Decode,
    Recognize,
    Segment,
    PostEdit,
    Translate,
    Synthesize,
    Mux,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::Decode => "decode",
            Stage::Recognize => "recognize",
            Stage::Segment => "segment",
            Stage::PostEdit => "post_edit",
            Stage::Translate => "translate",
            Stage::Synthesize => "synthesize",
            Stage::Mux => "mux",
        }
    }

    /// Base weight of a stage in the full dub pipeline.
    fn base_weight(&self) -> u32 {
        match self {
            Stage::Download => 5,
            Stage::Decode => 5,
            Stage::Recognize => 20,
            Stage::Segment => 5,
            Stage::PostEdit => 10,
            Stage::Translate => 10,
            Stage::Synthesize => 30,
            Stage::Mux => 15,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stages a job will run, with their weights. Job progress is the
/// weighted sum of per-stage sub-progress, rounded down.
#[derive(Debug, Clone)]
pub struct ProgressPlan {
    stages: Vec<Stage>,
    total_weight: u32,
}

impl ProgressPlan {
    /// Build a plan from the enabled stage list; weights are the dub-table
    /// base weights renormalized over the stages that actually run.
    pub fn new(stages: Vec<Stage>) -> Self {
        let total_weight = stages.iter().map(|s| s.base_weight()).sum::<u32>().max(1);
        Self {
            stages,
            total_weight,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Overall progress with `stage` at `sub_progress` (0–100) and all
    /// earlier stages complete.
    pub fn progress_at(&self, stage: Stage, sub_progress: u8) -> u8 {
        let mut completed = 0u32;
        let mut active = 0u32;
        for s in &self.stages {
            if *s == stage {
                active = s.base_weight();
                break;
            }
            completed += s.base_weight();
        }
        let sub = sub_progress.min(100) as u32;
        let scaled = (completed * 100 + active * sub) / self.total_weight;
        scaled.min(100) as u8
    }
}

/// quote = expected cost, actual = cost incurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Quote,
    Actual,
}

/// One cost ledger line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLine {
    pub stage: Stage,
    pub kind: LineKind,
    /// Billable units (characters, seconds, ...).
    pub units: f64,
    /// Price per unit in USD.
    pub rate: f64,
    /// Line amount in USD.
    pub amount: f64,
}

/// Per-job cost ledger.
///
/// A stage appends a quote when it begins and an actual when it ends; the
/// running total is actuals plus quotes not yet superseded by an actual, so
/// it is meaningful at any point of the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostLedger {
    lines: Vec<CostLine>,
}

impl CostLedger {
    pub fn quote(&mut self, stage: Stage, units: f64, rate: f64) {
        self.push(stage, LineKind::Quote, units, rate);
    }

    pub fn actual(&mut self, stage: Stage, units: f64, rate: f64) {
        self.push(stage, LineKind::Actual, units, rate);
    }

    fn push(&mut self, stage: Stage, kind: LineKind, units: f64, rate: f64) {
        let amount = (units * rate).max(0.0);
        self.lines.push(CostLine {
            stage,
            kind,
            units,
            rate,
            amount,
        });
    }

    pub fn lines(&self) -> &[CostLine] {
        &self.lines
    }

    /// Sum of actual amounts only.
    pub fn actual_total(&self) -> f64 {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Actual)
            .map(|l| l.amount)
            .sum()
    }

    /// Actuals plus quotes for stages without an actual yet.
    pub fn total(&self) -> f64 {
        let mut total = self.actual_total();
        for line in &self.lines {
            if line.kind == LineKind::Quote && !self.has_actual(line.stage) {
                total += line.amount;
            }
        }
        total
    }

    fn has_actual(&self, stage: Stage) -> bool {
        self.lines
            .iter()
            .any(|l| l.stage == stage && l.kind == LineKind::Actual)
    }

    /// Budget gate: would adding `quote_amount` push the projection past the
    /// cap? Checked before every billable stage, before spending.
    pub fn would_exceed(&self, quote_amount: f64, cap: Option<f64>) -> Option<f64> {
        let cap = cap?;
        let projected = self.total() + quote_amount;
        if projected > cap {
            Some(projected)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dub_plan() -> ProgressPlan {
        ProgressPlan::new(vec![
            Stage::Download,
            Stage::Decode,
            Stage::Recognize,
            Stage::Segment,
            Stage::PostEdit,
            Stage::Translate,
            Stage::Synthesize,
            Stage::Mux,
        ])
    }

    #[test]
    fn test_dub_weights_sum_to_100() {
        let plan = dub_plan();
        assert_eq!(plan.progress_at(Stage::Mux, 100), 100);
        assert_eq!(plan.progress_at(Stage::Download, 0), 0);
    }

    #[test]
    fn test_progress_is_weighted_and_floored() {
        let plan = dub_plan();
        // download(5) + decode(5) complete, recognize at 50% of its 20
        assert_eq!(plan.progress_at(Stage::Recognize, 50), 20);
        // floor behavior: recognize at 33% -> 10 + 6.6 -> 16
        assert_eq!(plan.progress_at(Stage::Recognize, 33), 16);
    }

    #[test]
    fn test_renormalized_subset() {
        let plan = ProgressPlan::new(vec![Stage::Download, Stage::Recognize]);
        // weights 5 and 20 over total 25
        assert_eq!(plan.progress_at(Stage::Download, 100), 20);
        assert_eq!(plan.progress_at(Stage::Recognize, 0), 20);
        assert_eq!(plan.progress_at(Stage::Recognize, 100), 100);
    }

    #[test]
    fn test_ledger_total_mixes_quotes_and_actuals() {
        let mut ledger = CostLedger::default();
        ledger.quote(Stage::Recognize, 100.0, 0.01);
        ledger.quote(Stage::Synthesize, 1000.0, 0.0003);
        assert!((ledger.total() - 1.3).abs() < 1e-9);
        assert_eq!(ledger.actual_total(), 0.0);

        // recognize completes cheaper than quoted
        ledger.actual(Stage::Recognize, 80.0, 0.01);
        assert!((ledger.total() - (0.8 + 0.3)).abs() < 1e-9);
        assert!((ledger.actual_total() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_actual_total_is_monotone() {
        let mut ledger = CostLedger::default();
        let mut last = 0.0;
        for i in 1..5 {
            ledger.actual(Stage::Synthesize, i as f64 * 100.0, 0.0003);
            let total = ledger.actual_total();
            assert!(total >= last);
            last = total;
        }
    }

    #[test]
    fn test_budget_gate() {
        let mut ledger = CostLedger::default();
        ledger.actual(Stage::Recognize, 100.0, 0.01); // $1.00
        assert!(ledger.would_exceed(0.5, Some(1.2)).is_some());
        assert!(ledger.would_exceed(0.1, Some(1.2)).is_none());
        assert!(ledger.would_exceed(1000.0, None).is_none());
    }

    #[test]
    fn test_negative_amounts_clamped() {
        let mut ledger = CostLedger::default();
        ledger.actual(Stage::Mux, -5.0, 0.02);
        assert_eq!(ledger.actual_total(), 0.0);
    }
}
