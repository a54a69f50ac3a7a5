use crate::types::MinorUnits;
use serde::{Deserialize, Serialize};

/// Yearly pension (SIPP) contribution ceiling: £60,000 in pence.
pub const YEARLY_PENSION_LIMIT: MinorUnits = 6_000_000;

/// Yearly ISA subscription ceiling: £20,000 in pence.
pub const YEARLY_ISA_LIMIT: MinorUnits = 2_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub sipp_ceiling: MinorUnits,
    pub isa_ceiling: MinorUnits,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            sipp_ceiling: YEARLY_PENSION_LIMIT,
            isa_ceiling: YEARLY_ISA_LIMIT,
        }
    }
}

impl AllocationConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AllocationConfig = serde_json::from_str(&content)?;
        if config.sipp_ceiling < 0 || config.isa_ceiling < 0 {
            anyhow::bail!("Ceilings in {path} must be non-negative");
        }
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }
}
