// Deferred configuration for drive controllers
//
// The builder only accumulates tuning. `build` freezes a copy of it into a
// factory, so mutating the builder afterwards never reaches an existing factory.

use super::device::DeviceOpener;
use super::error::ConfigError;
use super::factory::DriveControllerFactoryImpl;

/// Optional tuning applied when a drive controller is created
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveConfiguration {
    /// Voltage compensation target in volts
    pub nominal_voltage: Option<f64>,
    /// Supply current limit in amps
    pub current_limit: Option<f64>,
}

/// Fluent builder for [`DriveControllerFactoryImpl`]
#[derive(Debug, Clone, Default)]
pub struct DriveControllerFactoryBuilder {
    config: DriveConfiguration,
}

impl DriveControllerFactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable voltage compensation around `nominal_voltage`. Last call wins.
    pub fn with_voltage_compensation(
        &mut self,
        nominal_voltage: f64,
    ) -> Result<&mut Self, ConfigError> {
        self.config.nominal_voltage = Some(finite("nominal_voltage", nominal_voltage)?);
        Ok(self)
    }

    /// Once set there is no way back to `false`
    pub fn has_voltage_compensation(&self) -> bool {
        self.config.nominal_voltage.is_some()
    }

    /// Limit supply current to `current_limit` amps. Last call wins.
    pub fn with_current_limit(&mut self, current_limit: f64) -> Result<&mut Self, ConfigError> {
        self.config.current_limit = Some(finite("current_limit", current_limit)?);
        Ok(self)
    }

    pub fn has_current_limit(&self) -> bool {
        self.config.current_limit.is_some()
    }

    /// Snapshot of the current configuration
    pub fn configuration(&self) -> DriveConfiguration {
        self.config
    }

    /// Create a factory that opens devices through `opener`.
    ///
    /// No device is touched until the factory's `create` is called.
    pub fn build<O: DeviceOpener>(&self, opener: O) -> DriveControllerFactoryImpl<O> {
        DriveControllerFactoryImpl::new(self.config, opener)
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder() {
        let builder = DriveControllerFactoryBuilder::new();
        assert!(!builder.has_voltage_compensation());
        assert!(!builder.has_current_limit());
        assert_eq!(builder.configuration(), DriveConfiguration::default());
    }

    #[test]
    fn test_voltage_compensation_is_one_way() {
        let mut builder = DriveControllerFactoryBuilder::new();
        assert!(!builder.has_voltage_compensation());

        builder.with_voltage_compensation(12.0).unwrap();
        assert!(builder.has_voltage_compensation());

        // A rejected value does not clear an earlier one
        assert!(builder.with_voltage_compensation(f64::NAN).is_err());
        assert!(builder.has_voltage_compensation());
        assert_eq!(builder.configuration().nominal_voltage, Some(12.0));
    }

    #[test]
    fn test_fluent_chaining_last_call_wins() {
        let mut builder = DriveControllerFactoryBuilder::new();
        builder
            .with_voltage_compensation(12.0)
            .unwrap()
            .with_current_limit(80.0)
            .unwrap()
            .with_voltage_compensation(11.0)
            .unwrap();

        assert_eq!(
            builder.configuration(),
            DriveConfiguration {
                nominal_voltage: Some(11.0),
                current_limit: Some(80.0),
            }
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut builder = DriveControllerFactoryBuilder::new();

        let err = builder.with_current_limit(f64::INFINITY).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NonFinite {
                field: "current_limit",
                value: f64::INFINITY
            }
        );
        assert!(!builder.has_current_limit());

        assert!(matches!(
            builder.with_voltage_compensation(f64::NEG_INFINITY),
            Err(ConfigError::NonFinite {
                field: "nominal_voltage",
                ..
            })
        ));
        assert!(!builder.has_voltage_compensation());
    }
}
