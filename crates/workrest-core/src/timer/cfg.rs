use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MS_PER_MIN: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Timer configuration: goal, phase lengths, and snooze increment.
///
/// Keys are camelCase so the persisted JSON matches what earlier
/// front-ends wrote under the same storage key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cfg {
    #[serde(default = "default_total_hours")]
    pub total_hours: f64,
    #[serde(default = "default_work_min")]
    pub work_min: f64,
    #[serde(default = "default_rest_min")]
    pub rest_min: f64,
    #[serde(default = "default_snooze_min")]
    pub snooze_min: f64,
}

fn default_total_hours() -> f64 {
    5.0
}
fn default_work_min() -> f64 {
    40.0
}
fn default_rest_min() -> f64 {
    20.0
}
fn default_snooze_min() -> f64 {
    5.0
}

impl Default for Cfg {
    fn default() -> Self {
        Self {
            total_hours: default_total_hours(),
            work_min: default_work_min(),
            rest_min: default_rest_min(),
            snooze_min: default_snooze_min(),
        }
    }
}

/// Partial update for [`Cfg`]; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfgPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_min: Option<f64>,
}

impl CfgPatch {
    pub fn is_empty(&self) -> bool {
        self.total_hours.is_none()
            && self.work_min.is_none()
            && self.rest_min.is_none()
            && self.snooze_min.is_none()
    }
}

impl Cfg {
    /// Apply a patch, returning the merged configuration.
    pub fn merged(&self, patch: &CfgPatch) -> Cfg {
        Cfg {
            total_hours: patch.total_hours.unwrap_or(self.total_hours),
            work_min: patch.work_min.unwrap_or(self.work_min),
            rest_min: patch.rest_min.unwrap_or(self.rest_min),
            snooze_min: patch.snooze_min.unwrap_or(self.snooze_min),
        }
    }

    /// Every field must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("totalHours", self.total_hours),
            ("workMin", self.work_min),
            ("restMin", self.rest_min),
            ("snoozeMin", self.snooze_min),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    message: format!("expected a finite, non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Goal in milliseconds.
    pub fn total_work_ms(&self) -> u64 {
        to_ms(self.total_hours * MS_PER_HOUR)
    }

    pub fn work_ms(&self) -> u64 {
        to_ms(self.work_min * MS_PER_MIN)
    }

    pub fn rest_ms(&self) -> u64 {
        to_ms(self.rest_min * MS_PER_MIN)
    }

    pub fn snooze_ms(&self) -> u64 {
        to_ms(self.snooze_min * MS_PER_MIN)
    }
}

// Float-to-int `as` casts saturate, and NaN maps to 0.
fn to_ms(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Cfg::default();
        assert_eq!(cfg.total_work_ms(), 5 * 3_600_000);
        assert_eq!(cfg.work_ms(), 40 * 60_000);
        assert_eq!(cfg.rest_ms(), 20 * 60_000);
        assert_eq!(cfg.snooze_ms(), 5 * 60_000);
    }

    #[test]
    fn fractional_minutes_round_to_ms() {
        let cfg = Cfg {
            work_min: 0.5,
            ..Cfg::default()
        };
        assert_eq!(cfg.work_ms(), 30_000);
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let patch = CfgPatch {
            work_min: Some(25.0),
            ..CfgPatch::default()
        };
        let merged = Cfg::default().merged(&patch);
        assert_eq!(merged.work_min, 25.0);
        assert_eq!(merged.rest_min, 20.0);
        assert_eq!(merged.total_hours, 5.0);
    }

    #[test]
    fn rejects_negative_and_nan() {
        let negative = Cfg {
            rest_min: -1.0,
            ..Cfg::default()
        };
        assert!(negative.validate().is_err());

        let nan = Cfg {
            snooze_min: f64::NAN,
            ..Cfg::default()
        };
        assert!(nan.validate().is_err());

        assert!(Cfg::default().validate().is_ok());
    }

    #[test]
    fn camel_case_json() {
        let json = serde_json::to_value(Cfg::default()).unwrap();
        assert_eq!(json["totalHours"], 5.0);
        assert_eq!(json["snoozeMin"], 5.0);

        let partial: Cfg = serde_json::from_str(r#"{"workMin": 50}"#).unwrap();
        assert_eq!(partial.work_min, 50.0);
        assert_eq!(partial.rest_min, 20.0);
    }
}
