use std::f64::consts::PI;

const SMALL_ARGUMENT_SERIES_CUTOFF: f64 = 0.05;

/// Error function via the Chebyshev-fitted complementary error function
/// (fractional error below 1.2e-7 everywhere).
pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }

    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let polynomial = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let erfc = t * polynomial.exp();

    if x >= 0.0 { 1.0 - erfc } else { erfc - 1.0 }
}

/// Chandrasekhar function `mu(x) = erf(sqrt(x)) - 2 sqrt(x/pi) exp(-x)`,
/// the fraction of field particles slower than the test particle.
pub fn chandrasekhar_mu(x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x < SMALL_ARGUMENT_SERIES_CUTOFF {
        let sqrt_x = x.sqrt();
        return 2.0 / PI.sqrt()
            * (2.0 / 3.0 * x * sqrt_x - 0.4 * x * x * sqrt_x + x * x * x * sqrt_x / 7.0);
    }

    erf(x.sqrt()) - 2.0 * (x / PI).sqrt() * (-x).exp()
}

pub fn chandrasekhar_mu_derivative(x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    2.0 * (x / PI).sqrt() * (-x).exp()
}

#[cfg(test)]
mod tests {
    use super::{chandrasekhar_mu, chandrasekhar_mu_derivative, erf};

    #[test]
    fn erf_matches_reference_values() {
        let cases = [
            (0.0, 0.0),
            (0.5, 0.520_499_877_8),
            (1.0, 0.842_700_792_9),
            (2.0, 0.995_322_265_0),
            (-1.0, -0.842_700_792_9),
        ];
        for (x, expected) in cases {
            assert!(
                (erf(x) - expected).abs() < 2.0e-7,
                "erf({x}) = {} expected {expected}",
                erf(x)
            );
        }
        assert!(erf(f64::NAN).is_nan());
    }

    #[test]
    fn chandrasekhar_mu_limits() {
        assert_eq!(chandrasekhar_mu(0.0), 0.0);
        assert!((chandrasekhar_mu(50.0) - 1.0).abs() < 1.0e-6);
        for x in [0.01, 0.1, 0.5, 1.0, 3.0, 10.0] {
            let value = chandrasekhar_mu(x);
            assert!(value > 0.0 && value < 1.0);
        }
    }

    #[test]
    fn small_argument_series_joins_closed_form() {
        let below = chandrasekhar_mu(0.049_999);
        let above = chandrasekhar_mu(0.050_001);
        assert!((below - above).abs() < 1.0e-6);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        for x in [0.2, 1.0, 4.0] {
            let h = 1.0e-3;
            let numeric = (chandrasekhar_mu(x + h) - chandrasekhar_mu(x - h)) / (2.0 * h);
            assert!((numeric - chandrasekhar_mu_derivative(x)).abs() < 1.0e-3);
        }
    }
}
