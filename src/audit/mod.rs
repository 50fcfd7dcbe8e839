//! Monte-Carlo audit of the generator.
//!
//! Builds many independent rundowns, one seed each, in parallel with rayon.
//! Every build owns its own [`GenerationContext`](crate::rundown::GenerationContext),
//! so runs never share generator state and the report is the same no matter
//! how rayon schedules them.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GenerationConfig;
use crate::level::Tier;
use crate::rundown::{build_rundown, Rundown};

/// What to audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub base_seed: String,
    pub runs: u32,
    /// Shape of every audited rundown; its seed is replaced per run
    pub generation: GenerationConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            base_seed: "audit".to_string(),
            runs: 200,
            generation: GenerationConfig::default(),
        }
    }
}

/// Per-tier numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAudit {
    pub tier: Tier,
    pub levels: u32,
    pub failures: u32,
    pub failure_rate: f64,
    /// `alarm_histogram[n]` = levels that ended with `n` error alarms
    pub alarm_histogram: Vec<u32>,
    /// Fraction of levels with at least one error alarm
    pub alarm_rate: f64,
    pub mean_zones: f64,
    /// Assigned points over budget, averaged over branches
    pub mean_budget_use: f64,
    pub max_budget_use: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub runs: u32,
    pub levels: u32,
    pub failures: u32,
    pub failure_rate: f64,
    pub violations: u32,
    pub tiers: Vec<TierAudit>,
}

/// Seed of the `run`-th audited rundown
pub fn run_seed(base: &str, run: u32) -> String {
    format!("{base}-{run}")
}

/// Build `runs` rundowns in parallel and summarise them
pub fn run_audit(config: &AuditConfig) -> AuditReport {
    let rundowns: Vec<Rundown> = (0..config.runs)
        .into_par_iter()
        .map(|run| {
            let generation = config
                .generation
                .clone()
                .with_seed(&run_seed(&config.base_seed, run));
            build_rundown(&generation)
        })
        .collect();

    let report = analyze(&rundowns, config.runs);
    info!(
        runs = report.runs,
        levels = report.levels,
        failure_rate = report.failure_rate,
        "audit finished"
    );
    report
}

fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn analyze(rundowns: &[Rundown], runs: u32) -> AuditReport {
    let tiers: Vec<TierAudit> = Tier::ALL
        .iter()
        .map(|tier| analyze_tier(rundowns, *tier))
        .filter(|t| t.levels + t.failures > 0)
        .collect();

    let levels: u32 = tiers.iter().map(|t| t.levels).sum();
    let failures: u32 = tiers.iter().map(|t| t.failures).sum();
    let violations = rundowns
        .iter()
        .map(|r| r.violations.iter().map(|v| v.violations.len() as u32).sum::<u32>())
        .sum();

    AuditReport {
        runs,
        levels,
        failures,
        failure_rate: ratio(failures, levels + failures),
        violations,
        tiers,
    }
}

fn analyze_tier(rundowns: &[Rundown], tier: Tier) -> TierAudit {
    let levels: Vec<_> = rundowns
        .iter()
        .flat_map(|r| r.levels.iter())
        .filter(|l| l.tier == tier)
        .collect();
    let failures = rundowns
        .iter()
        .flat_map(|r| r.failures.iter())
        .filter(|f| f.tier == tier)
        .count() as u32;

    let mut alarm_histogram: Vec<u32> = Vec::new();
    let mut zones = 0usize;
    let mut uses: Vec<f64> = Vec::new();
    for level in &levels {
        let alarms: usize = level.branches.iter().map(|b| b.error_alarms()).sum();
        if alarm_histogram.len() <= alarms {
            alarm_histogram.resize(alarms + 1, 0);
        }
        alarm_histogram[alarms] += 1;
        zones += level.zone_count();
        for branch in &level.branches {
            if branch.budget > 0 {
                uses.push(branch.points_assigned() as f64 / branch.budget as f64);
            }
        }
    }

    let count = levels.len() as u32;
    let with_alarms: u32 = alarm_histogram.iter().skip(1).sum();
    let mean_budget_use = if uses.is_empty() {
        0.0
    } else {
        uses.iter().sum::<f64>() / uses.len() as f64
    };
    let max_budget_use = uses.iter().cloned().fold(0.0, f64::max);

    TierAudit {
        tier,
        levels: count,
        failures,
        failure_rate: ratio(failures, count + failures),
        alarm_histogram,
        alarm_rate: ratio(with_alarms, count),
        mean_zones: if count == 0 { 0.0 } else { zones as f64 / count as f64 },
        mean_budget_use,
        max_budget_use,
    }
}
