//! Construction of dynamics by name.

use std::fmt;
use std::str::FromStr;

use crate::cbo::Cbo;
use crate::cbo_memory::CboMemory;
use crate::cbs::Cbs;
use crate::config::DynamicConfig;
use crate::dynamic::Dynamic;
use crate::error::{CbxError, Result};
use crate::objective::Objective;
use crate::polar_cbo::PolarCbo;
use crate::pso::Pso;
use crate::qcbo::Qcbo;

/// Every dynamic that can be built by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicKind {
    /// [`Cbo`]
    Cbo,
    /// [`CboMemory`]
    CboMemory,
    /// [`Pso`]
    Pso,
    /// [`Cbs`]
    Cbs,
    /// [`PolarCbo`]
    PolarCbo,
    /// [`Qcbo`]
    Qcbo,
}

impl DynamicKind {
    /// All kinds, in a stable order.
    pub const ALL: [DynamicKind; 6] = [
        DynamicKind::Cbo,
        DynamicKind::CboMemory,
        DynamicKind::Pso,
        DynamicKind::Cbs,
        DynamicKind::PolarCbo,
        DynamicKind::Qcbo,
    ];

    /// Configuration name of the dynamic.
    pub fn name(self) -> &'static str {
        match self {
            DynamicKind::Cbo => "cbo",
            DynamicKind::CboMemory => "cbo_memory",
            DynamicKind::Pso => "pso",
            DynamicKind::Cbs => "cbs",
            DynamicKind::PolarCbo => "polar_cbo",
            DynamicKind::Qcbo => "q_cbo",
        }
    }
}

impl FromStr for DynamicKind {
    type Err = CbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DynamicKind::ALL
            .into_iter()
            .find(|k| k.name() == s.to_lowercase())
            .ok_or_else(|| CbxError::UnknownVariant {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for DynamicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds the dynamic of the given kind.
///
/// # Errors
///
/// Whatever the constructor of the dynamic reports.
pub fn build_dynamic(
    kind: DynamicKind,
    objective: Objective,
    config: DynamicConfig,
) -> Result<Box<dyn Dynamic>> {
    Ok(match kind {
        DynamicKind::Cbo => Box::new(Cbo::new(objective, config)?),
        DynamicKind::CboMemory => Box::new(CboMemory::new(objective, config)?),
        DynamicKind::Pso => Box::new(Pso::new(objective, config)?),
        DynamicKind::Cbs => Box::new(Cbs::new(objective, config)?),
        DynamicKind::PolarCbo => Box::new(PolarCbo::new(objective, config)?),
        DynamicKind::Qcbo => Box::new(Qcbo::new(objective, config)?),
    })
}

/// Builds a dynamic from its configuration name.
///
/// # Errors
///
/// `UnknownVariant` for an unknown name, otherwise as [`build_dynamic`].
pub fn build_dynamic_by_name(
    name: &str,
    objective: Objective,
    config: DynamicConfig,
) -> Result<Box<dyn Dynamic>> {
    build_dynamic(name.parse()?, objective, config)
}

/// Configuration names of every dynamic.
pub fn available_dynamics() -> Vec<&'static str> {
    DynamicKind::ALL.iter().map(|k| k.name()).collect()
}
