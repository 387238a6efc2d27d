use crate::error::{MulanError, Result};
use serde::{Deserialize, Serialize};

/// Environmental carrying capacity `S(z, t)` along the niche axis.
///
/// Environment parameters are `[S0, sigma, A, lambda, omega]`: peak height,
/// width of the gaussian, amplitude and wavelength of the cosine ripple, and
/// angular frequency of its seasonal modulation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CarryingCapacity {
    #[default]
    Gaussian,
    #[serde(rename = "gausscos")]
    GaussCos,
    #[serde(rename = "gausscostd")]
    GaussCosTd,
    #[serde(rename = "gausscos2td")]
    GaussCos2Td,
}

impl CarryingCapacity {
    pub const COUNT: usize = 4;

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Gaussian => 0,
            Self::GaussCos => 1,
            Self::GaussCosTd => 2,
            Self::GaussCos2Td => 3,
        }
    }

    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            0 => Ok(Self::Gaussian),
            1 => Ok(Self::GaussCos),
            2 => Ok(Self::GaussCosTd),
            3 => Ok(Self::GaussCos2Td),
            other => Err(MulanError::invalid_selector(format!(
                "No valid 'env_func' function: {other}"
            ))),
        }
    }

    /// True when the capacity changes with time.
    #[must_use]
    pub fn is_time_dependent(self) -> bool {
        matches!(self, Self::GaussCosTd | Self::GaussCos2Td)
    }

    /// Capacity at niche position `z` and absolute time `time`.
    #[must_use]
    pub fn evaluate(self, params: &[f64], z: f64, time: f64) -> f64 {
        let p = |i: usize| params.get(i).copied().unwrap_or(0.0);
        let scaled = z / p(1);
        let gauss = p(0) * (-0.5 * scaled * scaled).exp();
        let value = match self {
            Self::Gaussian => return gauss,
            Self::GaussCos => gauss + p(2) * (z / p(3)).cos(),
            Self::GaussCosTd => gauss + p(2) * (z / p(3)).cos() * (p(4) * time).sin(),
            Self::GaussCos2Td => {
                let ripple = (z / p(3)).cos();
                let season = (p(4) * time).sin();
                gauss + p(2) * ripple * ripple * season * season
            }
        };
        value.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: [f64; 5] = [100.0, 10.0, 20.0, 2.0, 0.5];

    #[test]
    fn test_gaussian_peak_and_width() {
        let s = CarryingCapacity::Gaussian;
        assert_eq!(s.evaluate(&PARAMS, 0.0, 0.0), 100.0);
        let one_sigma = s.evaluate(&PARAMS, 10.0, 0.0);
        assert!((one_sigma - 100.0 * (-0.5f64).exp()).abs() < 1e-12);
        assert_eq!(s.evaluate(&PARAMS, 10.0, 7.0), one_sigma);
    }

    #[test]
    fn test_ripple_is_clamped_at_zero() {
        let s = CarryingCapacity::GaussCos;
        // far tail: gaussian ~ 0, cosine at pi is -A
        let z = 2.0 * std::f64::consts::PI * 1000.0 + 2.0 * std::f64::consts::PI;
        assert!(s.evaluate(&PARAMS, z, 0.0) >= 0.0);
        let at_peak = s.evaluate(&PARAMS, 0.0, 0.0);
        assert!((at_peak - 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_dependent_variants() {
        let td = CarryingCapacity::GaussCosTd;
        let td2 = CarryingCapacity::GaussCos2Td;
        assert!(td.is_time_dependent() && td2.is_time_dependent());
        assert!(!CarryingCapacity::GaussCos.is_time_dependent());
        // sin(0) = 0 removes the ripple
        assert_eq!(td.evaluate(&PARAMS, 0.0, 0.0), 100.0);
        assert_eq!(td2.evaluate(&PARAMS, 0.0, 0.0), 100.0);
        let quarter = std::f64::consts::PI; // omega * t = pi / 2
        assert!((td.evaluate(&PARAMS, 0.0, quarter) - 120.0).abs() < 1e-9);
        assert!((td2.evaluate(&PARAMS, 0.0, quarter) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_index_round_trip_and_rejection() {
        for i in 0..CarryingCapacity::COUNT {
            assert_eq!(CarryingCapacity::from_index(i).unwrap().index(), i);
        }
        assert!(matches!(
            CarryingCapacity::from_index(4),
            Err(MulanError::InvalidSelector(_))
        ));
    }
}
