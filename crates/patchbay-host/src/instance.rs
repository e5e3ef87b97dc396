use std::fmt::Debug;

use patchbay_catalog::PluginDescriptor;

/// Metadata and live value for one automatable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValue {
    pub name: String,
    pub value: f32,
    pub default: f32,
    pub min: f32,
    pub max: f32,
}

impl ParamValue {
    pub fn new(name: impl Into<String>, min: f32, max: f32, default: f32) -> Self {
        Self {
            name: name.into(),
            value: default,
            default,
            min,
            max,
        }
    }

    /// Assigns a raw value, clamped into the parameter range.
    pub fn set(&mut self, value: f32) {
        self.value = value.clamp(self.min, self.max);
    }

    pub fn normalised(&self) -> f32 {
        if (self.max - self.min).abs() <= f32::EPSILON {
            0.0
        } else {
            (self.value - self.min) / (self.max - self.min)
        }
    }

    pub fn set_from_normalised(&mut self, value: f32) {
        self.value = self.min + value.clamp(0.0, 1.0) * (self.max - self.min);
    }
}

/// A loaded processing unit.
///
/// Implementations are owned by graph nodes and may be created off the UI
/// thread, hence `Send`.
pub trait PluginInstance: Send + Debug {
    fn descriptor(&self) -> &PluginDescriptor;

    fn parameters(&self) -> &[ParamValue];

    /// Sets a parameter by slice index, clamped into its range. Unknown
    /// indices are ignored.
    fn set_parameter(&mut self, index: usize, value: f32);

    fn programs(&self) -> &[String] {
        &[]
    }

    fn current_program(&self) -> usize {
        0
    }

    fn set_current_program(&mut self, _index: usize) {}

    /// Opaque blob for session persistence.
    fn save_state(&self) -> Vec<u8>;

    /// Applies a previously saved blob; returns whether it was accepted.
    fn restore_state(&mut self, state: &[u8]) -> bool;

    /// Whether the plugin ships its own editor surface. When it does not,
    /// hosts fall back to a generic parameter panel.
    fn has_editor(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn set_clamps_into_range() {
        let mut param = ParamValue::new("level", 0.0, 1.0, 0.25);
        param.set(3.0);
        assert_eq!(param.value, 1.0);
        param.set(-1.0);
        assert_eq!(param.value, 0.0);
    }

    #[test]
    fn normalised_round_trip() {
        let mut param = ParamValue::new("frequency", 20.0, 20_000.0, 440.0);
        param.set_from_normalised(0.5);
        assert_eq!(param.value, 10_010.0);
        assert_eq!(param.normalised(), 0.5);
    }

    #[test]
    fn degenerate_range_normalises_to_zero() {
        let param = ParamValue::new("fixed", 1.0, 1.0, 1.0);
        assert_eq!(param.normalised(), 0.0);
    }
}
