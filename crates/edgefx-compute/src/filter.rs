//! Filter strategies and their parameters.
//!
//! A [`Filter`] turns one device image into another on a given
//! [`Accelerator`]. [`FilterKind`] names the filters the command line can
//! select; [`FilterSpec`] pairs a kind with its configuration.
//!
//! Only Canny exists today. Its parameters live in [`CannyConfig`]:
//!
//! | Field            | Default       |
//! |------------------|---------------|
//! | `low_threshold`  | 72            |
//! | `high_threshold` | 256           |
//! | `kernel`         | Sobel         |
//! | `mask`           | 3x3           |
//! | `norm`           | L2            |
//! | `border`         | Replicate     |

use std::fmt;
use std::str::FromStr;

use edgefx_core::Rect;
use tracing::debug;

use crate::backend::{Accelerator, DeviceImage};
use crate::{ComputeError, ComputeResult};

/// Differential operator used for gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifferentialKernel {
    #[default]
    Sobel,
    Scharr,
}

/// Gradient operator footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskSize {
    #[default]
    Mask3x3,
    Mask5x5,
}

/// Norm combining the x and y gradients into a magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientNorm {
    /// |gx| + |gy|
    L1,
    /// sqrt(gx^2 + gy^2)
    #[default]
    L2,
}

/// How pixels beyond the image edge are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// Repeat the nearest edge pixel.
    #[default]
    Replicate,
}

/// Canny edge detector parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CannyConfig {
    /// Gradient magnitude below which a pixel is never an edge.
    pub low_threshold: i16,
    /// Gradient magnitude above which a pixel is always an edge.
    pub high_threshold: i16,
    pub kernel: DifferentialKernel,
    pub mask: MaskSize,
    pub norm: GradientNorm,
    pub border: BorderMode,
}

impl CannyConfig {
    pub const DEFAULT_LOW_THRESHOLD: i16 = 72;
    pub const DEFAULT_HIGH_THRESHOLD: i16 = 256;

    /// Default configuration with explicit thresholds.
    pub fn with_thresholds(low: i16, high: i16) -> Self {
        Self { low_threshold: low, high_threshold: high, ..Self::default() }
    }

    /// Checks the thresholds are non-negative and ordered.
    pub fn validate(&self) -> ComputeResult<()> {
        if self.low_threshold < 0 || self.low_threshold > self.high_threshold {
            return Err(ComputeError::UnsupportedParameters(format!(
                "thresholds must satisfy 0 <= low <= high (got low={}, high={})",
                self.low_threshold, self.high_threshold
            )));
        }
        Ok(())
    }
}

impl Default for CannyConfig {
    fn default() -> Self {
        Self {
            low_threshold: Self::DEFAULT_LOW_THRESHOLD,
            high_threshold: Self::DEFAULT_HIGH_THRESHOLD,
            kernel: DifferentialKernel::default(),
            mask: MaskSize::default(),
            norm: GradientNorm::default(),
            border: BorderMode::default(),
        }
    }
}

/// Strategy turning a device image into a filtered device image.
pub trait Filter<A: Accelerator> {
    /// Filter name.
    fn name(&self) -> &'static str;

    /// Run the filter, returning a newly allocated result.
    fn apply(&self, accel: &A, src: &A::Image) -> ComputeResult<A::Image>;
}

/// Bordered Canny edge detection.
#[derive(Debug, Clone, Default)]
pub struct CannyFilter {
    pub config: CannyConfig,
    /// Region to process; the whole source when `None`.
    pub roi: Option<Rect>,
}

impl CannyFilter {
    pub fn new(config: CannyConfig) -> Self {
        Self { config, roi: None }
    }

    pub fn with_roi(mut self, roi: Rect) -> Self {
        self.roi = Some(roi);
        self
    }
}

impl<A: Accelerator> Filter<A> for CannyFilter {
    fn name(&self) -> &'static str {
        "canny"
    }

    fn apply(&self, accel: &A, src: &A::Image) -> ComputeResult<A::Image> {
        self.config.validate()?;
        let roi = self.roi.unwrap_or_else(|| Rect::from_size(src.width(), src.height()));
        roi.check_within(src.size())?;

        let mut dst = accel.allocate(roi.width, roi.height)?;

        let scratch_len = accel.canny_scratch_size(roi.size())?;
        let mut scratch = if scratch_len > 0 {
            Some(accel.allocate_scratch(scratch_len)?)
        } else {
            None
        };
        debug!(backend = accel.name(), ?roi, scratch_len, "canny");

        let result = accel.exec_canny(src, roi, &mut dst, &self.config, scratch.as_mut());
        drop(scratch);
        result?;

        Ok(dst)
    }
}

/// Filters selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Canny,
}

impl FilterKind {
    /// Every selectable filter.
    pub const ALL: &'static [FilterKind] = &[FilterKind::Canny];

    /// Name accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Canny => "canny",
        }
    }

    /// Pairs this kind with a Canny configuration.
    pub fn with_config(self, config: CannyConfig) -> FilterSpec {
        match self {
            Self::Canny => FilterSpec::Canny(CannyFilter::new(config)),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for a filter name no [`FilterKind`] matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFilter(pub String);

impl fmt::Display for UnknownFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown filter type '{}'", self.0)
    }
}

impl std::error::Error for UnknownFilter {}

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}

/// A configured filter, ready to build for any backend.
#[derive(Debug, Clone)]
pub enum FilterSpec {
    Canny(CannyFilter),
}

impl FilterSpec {
    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Canny(_) => FilterKind::Canny,
        }
    }

    /// Strategy object for backend `A`.
    pub fn build<A: Accelerator>(&self) -> Box<dyn Filter<A>> {
        match self {
            Self::Canny(f) => Box::new(f.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = CannyConfig::default();
        assert_eq!(c.low_threshold, 72);
        assert_eq!(c.high_threshold, 256);
        assert_eq!(c.kernel, DifferentialKernel::Sobel);
        assert_eq!(c.mask, MaskSize::Mask3x3);
        assert_eq!(c.norm, GradientNorm::L2);
        assert_eq!(c.border, BorderMode::Replicate);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_thresholds() {
        assert!(CannyConfig::with_thresholds(10, 10).validate().is_ok());
        assert!(CannyConfig::with_thresholds(100, 50).validate().is_err());
        assert!(CannyConfig::with_thresholds(-1, 50).validate().is_err());
    }

    #[test]
    fn test_filter_kind_parse() {
        assert_eq!("canny".parse::<FilterKind>(), Ok(FilterKind::Canny));
        assert_eq!("blur".parse::<FilterKind>(), Err(UnknownFilter("blur".into())));
        assert!("Canny".parse::<FilterKind>().is_err());
        assert_eq!(FilterKind::Canny.to_string(), "canny");
    }

    #[test]
    fn test_spec_kind() {
        let spec = FilterKind::Canny.with_config(CannyConfig::with_thresholds(1, 2));
        assert_eq!(spec.kind(), FilterKind::Canny);
        let FilterSpec::Canny(f) = spec;
        assert_eq!(f.config.high_threshold, 2);
        assert!(f.roi.is_none());
    }
}
