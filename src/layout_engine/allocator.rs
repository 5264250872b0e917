use std::fmt;

use serde::{Deserialize, Serialize};

use super::Orientation;
use crate::common::config::AllocationSettings;
use crate::model::container::Container;

/// Total share distributed among the children of one container.
pub const FULL_SHARE: f64 = 100.0;

/// Sizing constraints declared by one child.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeRequest {
    /// Share of the parent along its axis; `None` takes part in the remainder.
    pub ratio: Option<f64>,
    pub min_size: Option<f64>,
}

impl SizeRequest {
    pub fn auto() -> Self { SizeRequest::default() }

    pub fn ratio(ratio: f64) -> Self { SizeRequest { ratio: Some(ratio), min_size: None } }

    pub fn with_min(mut self, min_size: f64) -> Self {
        self.min_size = Some(min_size);
        self
    }
}

impl From<&Container> for SizeRequest {
    fn from(c: &Container) -> Self { SizeRequest { ratio: c.ratio, min_size: c.min_size } }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostic {
    /// Declared ratios added up to more than the full share and were scaled down.
    RatioOverflow { sum: f64 },
    /// Every child declared a ratio and together they fell short; they were
    /// scaled up and minimums were not checked.
    RatioUnderflow { sum: f64 },
    MinExceedsShare { index: usize, min: f64, share: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Diagnostic::RatioOverflow { sum } => {
                write!(f, "declared ratios sum to {sum}%, rescaled to {FULL_SHARE}%")
            }
            Diagnostic::RatioUnderflow { sum } => write!(
                f,
                "declared ratios sum to {sum}% with no auto-sized child, rescaled to {FULL_SHARE}%"
            ),
            Diagnostic::MinExceedsShare { index, min, share } => {
                write!(f, "child {index}: minimum {min}% exceeds its share of {share}%")
            }
        }
    }
}

/// Result of distributing a container's space among its children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub orientation: Orientation,
    pub widths: Vec<f64>,
    pub heights: Vec<f64>,
    pub minimums: Vec<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Allocation {
    /// Shares along the container's own axis.
    pub fn primary(&self) -> &[f64] {
        match self.orientation {
            Orientation::Horizontal => &self.widths,
            Orientation::Vertical => &self.heights,
        }
    }

    /// Shares across the container's axis, always the full share.
    pub fn secondary(&self) -> &[f64] {
        match self.orientation {
            Orientation::Horizontal => &self.heights,
            Orientation::Vertical => &self.widths,
        }
    }

    pub fn is_clean(&self) -> bool { self.diagnostics.is_empty() }

    pub fn len(&self) -> usize { self.minimums.len() }

    pub fn is_empty(&self) -> bool { self.minimums.is_empty() }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SizeAllocator {
    /// Slack allowed before a minimum is reported as exceeding its share.
    pub tolerance: f64,
}

impl SizeAllocator {
    pub fn new(tolerance: f64) -> Self { SizeAllocator { tolerance } }

    pub fn from_settings(settings: &AllocationSettings) -> Self {
        SizeAllocator::new(settings.tolerance)
    }

    pub fn allocate(&self, children: &[SizeRequest], orientation: Orientation) -> Allocation {
        let count = children.len();
        let mut diagnostics = Vec::new();
        let mut primary: Vec<Option<f64>> = children.iter().map(|c| c.ratio).collect();
        let minimums: Vec<f64> = children.iter().map(|c| c.min_size.unwrap_or(0.0)).collect();

        let mut sum: f64 = primary.iter().flatten().sum();
        let unassigned = primary.iter().filter(|r| r.is_none()).count();

        if sum > FULL_SHARE {
            diagnostics.push(Diagnostic::RatioOverflow { sum });
            rescale(&mut primary, sum);
            sum = FULL_SHARE;
        } else if sum < FULL_SHARE && unassigned == 0 && count > 0 {
            diagnostics.push(Diagnostic::RatioUnderflow { sum });
            rescale(&mut primary, sum);
            return Allocation::assemble(orientation, resolve(primary, 0.0), minimums, diagnostics);
        }

        let remainder = if unassigned > 0 { (FULL_SHARE - sum) / unassigned as f64 } else { 0.0 };
        let primary = resolve(primary, remainder);

        for (index, (&min, &share)) in minimums.iter().zip(&primary).enumerate() {
            if min > share + self.tolerance {
                diagnostics.push(Diagnostic::MinExceedsShare { index, min, share });
            }
        }

        Allocation::assemble(orientation, primary, minimums, diagnostics)
    }
}

impl Allocation {
    fn assemble(
        orientation: Orientation,
        primary: Vec<f64>,
        minimums: Vec<f64>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let secondary = vec![FULL_SHARE; primary.len()];
        let (widths, heights) = match orientation {
            Orientation::Horizontal => (primary, secondary),
            Orientation::Vertical => (secondary, primary),
        };
        Allocation {
            orientation,
            widths,
            heights,
            minimums,
            diagnostics,
        }
    }
}

// A declared sum of zero leaves every share at zero.
fn rescale(primary: &mut [Option<f64>], sum: f64) {
    if sum <= 0.0 {
        return;
    }
    for ratio in primary.iter_mut().flatten() {
        *ratio *= FULL_SHARE / sum;
    }
}

fn resolve(primary: Vec<Option<f64>>, remainder: f64) -> Vec<f64> {
    primary.into_iter().map(|r| r.unwrap_or(remainder)).collect()
}

/// Distributes the full share among `children` laid out along `orientation`.
pub fn allocate_sizes(children: &[SizeRequest], orientation: Orientation) -> Allocation {
    SizeAllocator::default().allocate(children, orientation)
}
