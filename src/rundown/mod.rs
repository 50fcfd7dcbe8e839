//! Rundown pipeline.
//!
//! One [`GenerationContext`] per build: it owns the generator and the config
//! and is threaded through every level in tier order. A level that aborts is
//! logged and recorded; the pipeline moves on to the next level with the
//! same generator, so the rest of the rundown stays reproducible.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::GenerationConfig;
use crate::error::GenResult;
use crate::layout::{self, LayoutOptions, LevelLayout};
use crate::level::{Bulkhead, Complex, LevelRequest, Tier};
use crate::logging::TimingSpan;
use crate::random::Generator;
use crate::validate::{validate_level, Violation};

/// Generator plus config for one build
#[derive(Debug, Clone)]
pub struct GenerationContext {
    rng: Generator,
    config: GenerationConfig,
}

impl GenerationContext {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            rng: Generator::seeded(&config.seed),
            config,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn rng(&mut self) -> &mut Generator {
        &mut self.rng
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            forward_extraction: self.config.forward_extraction,
        }
    }

    /// Roll which bulkheads a level carries. Overload only comes with Extreme.
    pub fn roll_bulkheads(&mut self, tier: Tier) -> Vec<Bulkhead> {
        let chances = &self.config.bulkhead_chances;
        let (extreme, overload) = (chances.extreme(tier), chances.overload(tier));
        let mut bulkheads = vec![Bulkhead::Main];
        if self.rng.flip(extreme) {
            bulkheads.push(Bulkhead::Extreme);
            if self.rng.flip(overload) {
                bulkheads.push(Bulkhead::Overload);
            }
        }
        bulkheads
    }

    /// Full request for the `index`-th level of a tier
    pub fn roll_request(&mut self, tier: Tier, index: u32) -> LevelRequest {
        let bulkheads = self.roll_bulkheads(tier);
        let complex = Complex::roll(&mut self.rng);
        LevelRequest::new(tier, index, complex).with_bulkheads(&bulkheads)
    }

    pub fn build_level(&mut self, request: &LevelRequest) -> GenResult<LevelLayout> {
        let options = self.layout_options();
        layout::build_level(&mut self.rng, options, request)
    }
}

/// A level that aborted, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFailure {
    pub tier: Tier,
    pub index: u32,
    pub reason: String,
}

/// Violations found in one finished level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelViolations {
    pub level: String,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rundown {
    pub seed: String,
    pub levels: Vec<LevelLayout>,
    pub failures: Vec<LevelFailure>,
    pub violations: Vec<LevelViolations>,
}

impl Rundown {
    pub fn level(&self, tier: Tier, index: u32) -> Option<&LevelLayout> {
        self.levels.iter().find(|l| l.tier == tier && l.index == index)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.violations.is_empty()
    }
}

/// Build every level the config asks for, tier by tier
pub fn build_rundown(config: &GenerationConfig) -> Rundown {
    let _span = TimingSpan::rundown(&config.seed);
    let mut ctx = GenerationContext::new(config.clone());
    let mut rundown = Rundown {
        seed: config.seed.clone(),
        levels: Vec::new(),
        failures: Vec::new(),
        violations: Vec::new(),
    };

    for tier in Tier::ALL {
        for index in 1..=config.levels(tier) {
            let request = ctx.roll_request(tier, index);
            match ctx.build_level(&request) {
                Ok(level) => {
                    let violations = validate_level(&level);
                    if !violations.is_empty() {
                        for violation in &violations {
                            error!(level = %level.label(), %violation, "level failed validation");
                        }
                        rundown.violations.push(LevelViolations {
                            level: level.label(),
                            violations,
                        });
                    }
                    rundown.levels.push(level);
                }
                Err(err) => {
                    error!(level = %request.label(), error = %err, "level build aborted");
                    rundown.failures.push(LevelFailure {
                        tier,
                        index,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    info!(
        seed = %rundown.seed,
        levels = rundown.levels.len(),
        failures = rundown.failures.len(),
        "rundown built"
    );
    rundown
}
