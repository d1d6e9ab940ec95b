use crate::domain::RhorError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Physical inputs of the capsule model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShellParameter {
    /// Initial shell inner radius (cm).
    #[serde(rename = "Ri")]
    InnerRadius,
    /// Initial shell outer radius (cm).
    #[serde(rename = "Ro")]
    OuterRadius,
    /// Deuterium atomic fraction of the fuel.
    #[serde(rename = "fD")]
    DeuteriumFraction,
    #[serde(rename = "f3He")]
    Helium3Fraction,
    /// Fill pressure (atm).
    #[serde(rename = "P0")]
    FillPressure,
    #[serde(rename = "Te_Gas")]
    GasTemperature,
    #[serde(rename = "Te_Shell")]
    ShellTemperature,
    #[serde(rename = "Te_Abl")]
    AblatorTemperature,
    #[serde(rename = "Te_Mix")]
    MixTemperature,
    #[serde(rename = "rho_Abl_Max")]
    AblatorPeakDensity,
    #[serde(rename = "rho_Abl_Min")]
    AblatorFloorDensity,
    /// Exponential scale length of the ablated plasma (cm).
    #[serde(rename = "rho_Abl_Scale")]
    AblatorScaleLength,
    /// Fraction of the shell mass mixed into the fuel.
    #[serde(rename = "MixF")]
    MixFraction,
    /// Compressed shell thickness (cm).
    #[serde(rename = "Tshell")]
    ShellThickness,
    /// Fraction of the shell mass not ablated.
    #[serde(rename = "Mrem")]
    RemainingMass,
    /// Birth energy of the protons (MeV).
    #[serde(rename = "E0")]
    BirthEnergy,
}

impl ShellParameter {
    pub const ALL: [ShellParameter; 16] = [
        Self::InnerRadius,
        Self::OuterRadius,
        Self::DeuteriumFraction,
        Self::Helium3Fraction,
        Self::FillPressure,
        Self::GasTemperature,
        Self::ShellTemperature,
        Self::AblatorTemperature,
        Self::MixTemperature,
        Self::AblatorPeakDensity,
        Self::AblatorFloorDensity,
        Self::AblatorScaleLength,
        Self::MixFraction,
        Self::ShellThickness,
        Self::RemainingMass,
        Self::BirthEnergy,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::InnerRadius => "Ri",
            Self::OuterRadius => "Ro",
            Self::DeuteriumFraction => "fD",
            Self::Helium3Fraction => "f3He",
            Self::FillPressure => "P0",
            Self::GasTemperature => "Te_Gas",
            Self::ShellTemperature => "Te_Shell",
            Self::AblatorTemperature => "Te_Abl",
            Self::MixTemperature => "Te_Mix",
            Self::AblatorPeakDensity => "rho_Abl_Max",
            Self::AblatorFloorDensity => "rho_Abl_Min",
            Self::AblatorScaleLength => "rho_Abl_Scale",
            Self::MixFraction => "MixF",
            Self::ShellThickness => "Tshell",
            Self::RemainingMass => "Mrem",
            Self::BirthEnergy => "E0",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl Display for ShellParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShellParameter {
    type Err = RhorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|parameter| parameter.name().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| {
                RhorError::input_validation(
                    "INPUT.SHELL_PARAMETER",
                    format!("unknown shell model parameter '{normalized}'"),
                )
            })
    }
}

/// Nominal value and fixed 1 sigma uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub value: f64,
    #[serde(default)]
    pub sigma: f64,
}

impl ParameterValue {
    pub const fn new(value: f64, sigma: f64) -> Self {
        Self { value, sigma }
    }
}

const DEFAULTS: [ParameterValue; 16] = [
    ParameterValue::new(0.09, 5.0e-4),
    ParameterValue::new(0.11, 5.0e-4),
    ParameterValue::new(0.3, 0.02),
    ParameterValue::new(0.7, 0.02),
    ParameterValue::new(50.0, 1.0),
    ParameterValue::new(3.0, 1.0),
    ParameterValue::new(0.2, 0.1),
    ParameterValue::new(0.3, 0.1),
    ParameterValue::new(3.0, 1.0),
    ParameterValue::new(1.5, 0.5),
    ParameterValue::new(0.1, 0.05),
    ParameterValue::new(70.0e-4, 20.0e-4),
    ParameterValue::new(0.005, 0.005),
    ParameterValue::new(40.0e-4, 10.0e-4),
    ParameterValue::new(0.175, 0.05),
    ParameterValue::new(14.7, 0.1),
];

/// The sixteen capsule model inputs. Perturbed copies are new values;
/// nothing here is mutated once a model is built from it.
///
/// Serializes as a map from parameter name to `{value, sigma}`; names left
/// out of a request keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "std::collections::BTreeMap<ShellParameter, ParameterValue>",
    into = "std::collections::BTreeMap<ShellParameter, ParameterValue>"
)]
pub struct ShellModelParameters {
    values: [ParameterValue; 16],
}

impl Default for ShellModelParameters {
    fn default() -> Self {
        Self { values: DEFAULTS }
    }
}

impl ShellModelParameters {
    pub fn get(&self, parameter: ShellParameter) -> ParameterValue {
        self.values[parameter.index()]
    }

    pub fn value(&self, parameter: ShellParameter) -> f64 {
        self.get(parameter).value
    }

    pub fn sigma(&self, parameter: ShellParameter) -> f64 {
        self.get(parameter).sigma
    }

    pub fn with_value(mut self, parameter: ShellParameter, value: f64) -> Self {
        self.values[parameter.index()].value = value;
        self
    }

    pub fn with_sigma(mut self, parameter: ShellParameter, sigma: f64) -> Self {
        self.values[parameter.index()].sigma = sigma;
        self
    }

    /// Copy with `parameter` moved by `sigmas` standard deviations.
    pub fn with_offset(self, parameter: ShellParameter, sigmas: f64) -> Self {
        let ParameterValue { value, sigma } = self.get(parameter);
        self.with_value(parameter, value + sigmas * sigma)
    }

    pub fn validate(&self) -> Result<(), RhorError> {
        use ShellParameter::*;

        let invalid = |message: String| Err(RhorError::input_validation("INPUT.SHELL_MODEL", message));
        for parameter in ShellParameter::ALL {
            let ParameterValue { value, sigma } = self.get(parameter);
            if !value.is_finite() || !sigma.is_finite() || sigma < 0.0 {
                return invalid(format!(
                    "{parameter} must be finite with a non-negative sigma, got {value} +/- {sigma}"
                ));
            }
        }
        for parameter in [
            InnerRadius,
            OuterRadius,
            FillPressure,
            AblatorScaleLength,
            AblatorFloorDensity,
            ShellThickness,
            BirthEnergy,
        ] {
            if self.value(parameter) <= 0.0 {
                return invalid(format!("{parameter} must be positive, got {}", self.value(parameter)));
            }
        }
        if self.value(OuterRadius) <= self.value(InnerRadius) {
            return invalid(format!(
                "Ro ({}) must exceed Ri ({})",
                self.value(OuterRadius),
                self.value(InnerRadius)
            ));
        }
        for parameter in [DeuteriumFraction, Helium3Fraction, MixFraction, RemainingMass] {
            let value = self.value(parameter);
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{parameter} must lie in [0, 1], got {value}"));
            }
        }
        if self.value(DeuteriumFraction) + self.value(Helium3Fraction) <= 0.0 {
            return invalid("fuel fractions fD and f3He cannot both be zero".to_string());
        }
        if self.value(AblatorPeakDensity) < self.value(AblatorFloorDensity) {
            return invalid(format!(
                "rho_Abl_Max ({}) must not be below rho_Abl_Min ({})",
                self.value(AblatorPeakDensity),
                self.value(AblatorFloorDensity)
            ));
        }
        Ok(())
    }
}

impl TryFrom<std::collections::BTreeMap<ShellParameter, ParameterValue>> for ShellModelParameters {
    type Error = RhorError;

    fn try_from(
        overrides: std::collections::BTreeMap<ShellParameter, ParameterValue>,
    ) -> Result<Self, Self::Error> {
        let mut parameters = Self::default();
        for (parameter, value) in overrides {
            parameters.values[parameter.index()] = value;
        }
        parameters.validate()?;
        Ok(parameters)
    }
}

impl From<ShellModelParameters> for std::collections::BTreeMap<ShellParameter, ParameterValue> {
    fn from(parameters: ShellModelParameters) -> Self {
        ShellParameter::ALL
            .into_iter()
            .map(|parameter| (parameter, parameters.get(parameter)))
            .collect()
    }
}
