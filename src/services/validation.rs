use crate::models::{ConversionConfig, ValidationSettings, WidthClass};
use std::sync::Arc;

/// Check applied to the configuration before a conversion request is built.
///
/// A rejection ends the submission with the returned message and nothing is sent.
pub trait WidthPolicy: Send + Sync {
    fn validate(&self, config: &ConversionConfig) -> Result<(), String>;
}

/// Sends whatever the user typed; the conversion service is the validator
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl WidthPolicy for AcceptAll {
    fn validate(&self, _config: &ConversionConfig) -> Result<(), String> {
        Ok(())
    }
}

/// Requires every column width to be a number within `min..=max`.
///
/// The total table width, when set, only has to be a positive number.
#[derive(Debug, Clone, Copy)]
pub struct RangePolicy {
    pub min: f64,
    pub max: f64,
}

impl RangePolicy {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self::new(1.0, 10.0)
    }
}

impl WidthPolicy for RangePolicy {
    fn validate(&self, config: &ConversionConfig) -> Result<(), String> {
        for class in WidthClass::ALL {
            let text = config.column_widths.get(class).trim();
            let in_range = text
                .parse::<f64>()
                .is_ok_and(|width| width.is_finite() && width >= self.min && width <= self.max);

            if !in_range {
                return Err(format!(
                    "Width for {} must be a number between {:.1} and {:.1} (got \"{}\")",
                    class.label(),
                    self.min,
                    self.max,
                    text
                ));
            }
        }

        if let Some(ref total) = config.total_table_width {
            let positive = total
                .trim()
                .parse::<f64>()
                .is_ok_and(|width| width.is_finite() && width > 0.0);
            if !positive {
                return Err("total_table_width must be a valid number".to_string());
            }
        }

        Ok(())
    }
}

/// Policy selected by `validation` in `lodtex.yaml`
pub fn policy_from_settings(settings: &ValidationSettings) -> Arc<dyn WidthPolicy> {
    if settings.enforce_width_range {
        tracing::info!(
            "Enforcing column widths between {} and {}",
            settings.min_width,
            settings.max_width
        );
        Arc::new(RangePolicy::new(settings.min_width, settings.max_width))
    } else {
        Arc::new(AcceptAll)
    }
}
