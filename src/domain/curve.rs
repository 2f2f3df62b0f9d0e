//! Flow-rate curves and their synthetic generation.
//!
//! A curve is sampled uniformly over `[0, flow_time]`. Generated curves encode
//! one of three archetypes:
//! - Normal: a single bell-shaped lobe near the middle of the void
//! - Obstructive: a later, wider and flattened lobe
//! - Dysfunctional: two to four short sub-lobes separated by gaps

use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use super::Diagnosis;
use crate::UroflowError;

/// Default number of samples per curve.
pub const DEFAULT_NUM_POINTS: usize = 100;

/// Added to integral denominators so degenerate inputs never divide by zero.
const INTEGRAL_EPSILON: f64 = 1e-9;

/// Ordered, non-negative flow-rate samples (ml/s) for one void event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowCurve(Vec<f64>);

impl FlowCurve {
    /// Wrap measured samples.
    ///
    /// # Errors
    /// Returns `Validation` if any sample is negative or not finite.
    pub fn new(samples: Vec<f64>) -> Result<Self, UroflowError> {
        if let Some((i, v)) = samples
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(UroflowError::Validation(format!(
                "Flow curve sample {i} is {v}; samples must be finite and >= 0"
            )));
        }
        Ok(Self(samples))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Maximum flow rate (0 for an empty curve).
    #[must_use]
    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(0.0, f64::max)
    }

    /// Mean flow rate (0 for an empty curve).
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.0.iter().sum::<f64>() / self.0.len() as f64
    }

    /// Voided volume estimated by the trapezoidal rule over `[0, flow_time]`.
    #[must_use]
    pub fn integral(&self, flow_time: f64) -> f64 {
        if self.0.len() < 2 {
            return 0.0;
        }
        let dt = flow_time / (self.0.len() - 1) as f64;
        trapezoid(&self.0, dt)
    }
}

impl AsRef<[f64]> for FlowCurve {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Curve archetype to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveKind {
    Normal,
    Obstructive,
    Dysfunctional,
}

impl From<Diagnosis> for CurveKind {
    fn from(d: Diagnosis) -> Self {
        match d {
            Diagnosis::Normal => Self::Normal,
            Diagnosis::Obstructive => Self::Obstructive,
            Diagnosis::Dysfunctional => Self::Dysfunctional,
        }
    }
}

impl FromStr for CurveKind {
    type Err = UroflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "obstructive" => Ok(Self::Obstructive),
            "dysfunctional" => Ok(Self::Dysfunctional),
            other => Err(UroflowError::Validation(format!(
                "Unknown curve kind '{other}' (expected normal, obstructive or dysfunctional)"
            ))),
        }
    }
}

/// Generate a curve of the default length using an entropy-seeded generator.
///
/// # Errors
/// Returns `Validation` if `volume` or `flow_time` is negative or not finite.
pub fn generate_curve(
    kind: CurveKind,
    volume: f64,
    flow_time: f64,
) -> Result<FlowCurve, UroflowError> {
    let mut rng = ChaCha20Rng::from_entropy();
    generate_curve_with(&mut rng, kind, volume, flow_time, DEFAULT_NUM_POINTS)
}

/// Generate a curve with a caller-supplied random source.
///
/// The result always has `num_points` samples, all `>= 0`, with the first and
/// last sample exactly 0.
///
/// # Errors
/// Returns `Validation` for negative or non-finite `volume`/`flow_time`, or
/// fewer than two points.
pub fn generate_curve_with<R: Rng + ?Sized>(
    rng: &mut R,
    kind: CurveKind,
    volume: f64,
    flow_time: f64,
    num_points: usize,
) -> Result<FlowCurve, UroflowError> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(UroflowError::Validation(format!(
            "Volume {volume} must be finite and >= 0"
        )));
    }
    if !flow_time.is_finite() || flow_time < 0.0 {
        return Err(UroflowError::Validation(format!(
            "Flow time {flow_time} must be finite and >= 0"
        )));
    }
    if num_points < 2 {
        return Err(UroflowError::Validation(format!(
            "A curve needs at least 2 points, got {num_points}"
        )));
    }

    let mut flow = match kind {
        CurveKind::Normal => single_lobe(
            rng,
            &LobeShape {
                peak: (0.4, 0.6),
                width: (0.15, 0.25),
                flatten: None,
                jitter: (0.8, 1.2),
            },
            volume,
            flow_time,
            num_points,
        ),
        CurveKind::Obstructive => single_lobe(
            rng,
            &LobeShape {
                peak: (0.5, 0.8),
                width: (0.25, 0.4),
                flatten: Some((0.4, 0.8)),
                jitter: (0.9, 1.1),
            },
            volume,
            flow_time,
            num_points,
        ),
        CurveKind::Dysfunctional => segmented(rng, volume, flow_time, num_points),
    };

    let sigma = match kind {
        CurveKind::Normal => 0.5,
        CurveKind::Obstructive => 0.3,
        CurveKind::Dysfunctional => 0.8,
    };
    for v in &mut flow {
        *v = (*v + gaussian(rng, sigma)).max(0.0);
    }
    flow[0] = 0.0;
    flow[num_points - 1] = 0.0;

    Ok(FlowCurve(flow))
}

/// Parameter ranges (as fractions of the duration) for a single-lobe curve.
struct LobeShape {
    peak: (f64, f64),
    width: (f64, f64),
    flatten: Option<(f64, f64)>,
    jitter: (f64, f64),
}

fn single_lobe<R: Rng + ?Sized>(
    rng: &mut R,
    shape: &LobeShape,
    volume: f64,
    flow_time: f64,
    n: usize,
) -> Vec<f64> {
    let dt = flow_time / (n - 1) as f64;
    let peak_time = flow_time * rng.gen_range(shape.peak.0..shape.peak.1);
    let std_dev = flow_time * rng.gen_range(shape.width.0..shape.width.1);

    let mut flow: Vec<f64> = (0..n)
        .map(|i| gaussian_lobe(i as f64 * dt, peak_time, std_dev))
        .collect();

    let mut scale = volume / (trapezoid(&flow, dt) + INTEGRAL_EPSILON);
    if let Some((lo, hi)) = shape.flatten {
        scale *= rng.gen_range(lo..hi);
    }

    let jitter = rng.gen_range(shape.jitter.0..shape.jitter.1);
    let last = (n - 1) as f64;
    for (i, v) in flow.iter_mut().enumerate() {
        let envelope = (std::f64::consts::PI * i as f64 / last).sin();
        *v *= scale * envelope * jitter;
    }
    flow
}

fn segmented<R: Rng + ?Sized>(rng: &mut R, volume: f64, flow_time: f64, n: usize) -> Vec<f64> {
    let dt = flow_time / (n - 1) as f64;
    let mut flow = vec![0.0; n];

    let num_segments = rng.gen_range(2..=4);
    let per_segment = flow_time / f64::from(num_segments);
    let mut position = 0.0;
    let mut remaining = volume;

    for i in 0..num_segments {
        if remaining <= 0.0 {
            break;
        }

        let duration = rng.gen_range(0.1..0.3) * per_segment;
        position += rng.gen_range(0.05..0.1) * per_segment;

        let segment_volume = if i == num_segments - 1 {
            remaining
        } else {
            remaining * rng.gen_range(0.3..0.7)
        };

        let peak_time = duration * rng.gen_range(0.4..0.6);
        let std_dev = duration * rng.gen_range(0.1..0.2);

        let count = if flow_time > INTEGRAL_EPSILON {
            (n as f64 * duration / flow_time) as usize
        } else {
            0
        };
        if count == 0 {
            continue;
        }

        let step = if count > 1 {
            duration / (count - 1) as f64
        } else {
            0.0
        };
        let base: Vec<f64> = (0..count)
            .map(|k| gaussian_lobe(k as f64 * step, peak_time, std_dev))
            .collect();
        let area = trapezoid(&base, step);

        let start = (0..n)
            .find(|&k| k as f64 * dt >= position)
            .unwrap_or(n);
        let end = n.min(start + count);
        if area > 0.0 {
            for (slot, b) in flow[start..end].iter_mut().zip(&base) {
                *slot = b / area * segment_volume;
            }
        } else {
            flow[start..end].iter_mut().for_each(|slot| *slot = 0.0);
        }

        position += duration;
        remaining -= segment_volume;
    }

    flow
}

fn gaussian_lobe(t: f64, center: f64, std_dev: f64) -> f64 {
    let std_dev = std_dev.max(INTEGRAL_EPSILON);
    (-((t - center).powi(2)) / (2.0 * std_dev * std_dev)).exp()
}

fn trapezoid(samples: &[f64], dt: f64) -> f64 {
    samples.windows(2).map(|w| (w[0] + w[1]) * 0.5 * dt).sum()
}

/// Zero-mean Gaussian sample via the Box-Muller transform.
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen();
    sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng(seed: u64) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(seed)
    }

    #[test]
    fn test_generated_curve_invariants() {
        let mut rng = rng(7);
        for kind in [CurveKind::Normal, CurveKind::Obstructive, CurveKind::Dysfunctional] {
            for _ in 0..25 {
                let volume = rng.gen_range(100.0..500.0);
                let flow_time = rng.gen_range(15.0..80.0);
                let curve = generate_curve_with(&mut rng, kind, volume, flow_time, 100)
                    .expect("Should generate");

                assert_eq!(curve.len(), 100);
                assert_eq!(curve.as_slice()[0], 0.0);
                assert_eq!(curve.as_slice()[99], 0.0);
                assert!(curve.as_slice().iter().all(|v| *v >= 0.0 && v.is_finite()));
            }
        }
    }

    #[test]
    fn test_custom_length() {
        let curve = generate_curve_with(&mut rng(1), CurveKind::Normal, 300.0, 30.0, 37)
            .expect("Should generate");
        assert_eq!(curve.len(), 37);
    }

    #[test]
    fn test_normal_integral_approximates_volume() {
        let mut rng = rng(11);
        let curve = generate_curve_with(&mut rng, CurveKind::Normal, 300.0, 30.0, 100)
            .expect("Should generate");
        let integral = curve.integral(30.0);
        // Envelope and 0.8-1.2 jitter keep the area within a broad band.
        assert!(integral > 300.0 * 0.4 && integral < 300.0 * 1.4, "got {integral}");
    }

    #[test]
    fn test_obstructive_flatter_than_normal() {
        let mut rng = rng(3);
        let mut normal_peak = 0.0;
        let mut obstructive_peak = 0.0;
        for _ in 0..20 {
            normal_peak += generate_curve_with(&mut rng, CurveKind::Normal, 300.0, 40.0, 100)
                .expect("Should generate")
                .max();
            obstructive_peak +=
                generate_curve_with(&mut rng, CurveKind::Obstructive, 300.0, 40.0, 100)
                    .expect("Should generate")
                    .max();
        }
        assert!(obstructive_peak < normal_peak);
    }

    #[test]
    fn test_zero_volume_is_near_zero() {
        let curve = generate_curve_with(&mut rng(42), CurveKind::Normal, 0.0, 30.0, 100)
            .expect("Zero volume must not fail");
        assert_eq!(curve.len(), 100);
        assert!(curve.as_slice().iter().all(|v| v.is_finite() && *v < 3.0));
    }

    #[test]
    fn test_zero_flow_time_does_not_divide_by_zero() {
        for kind in [CurveKind::Normal, CurveKind::Obstructive, CurveKind::Dysfunctional] {
            let curve = generate_curve_with(&mut rng(5), kind, 0.0, 0.0, 100)
                .expect("Zero duration must not fail");
            assert!(curve.as_slice().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_rejects_negative_inputs() {
        assert!(matches!(
            generate_curve_with(&mut rng(1), CurveKind::Normal, -1.0, 30.0, 100),
            Err(UroflowError::Validation(_))
        ));
        assert!(matches!(
            generate_curve_with(&mut rng(1), CurveKind::Normal, 100.0, f64::NAN, 100),
            Err(UroflowError::Validation(_))
        ));
        assert!(generate_curve_with(&mut rng(1), CurveKind::Normal, 100.0, 30.0, 1).is_err());
    }

    #[test]
    fn test_same_seed_same_curve() {
        let a = generate_curve_with(&mut rng(9), CurveKind::Dysfunctional, 250.0, 45.0, 100)
            .expect("Should generate");
        let b = generate_curve_with(&mut rng(9), CurveKind::Dysfunctional, 250.0, 45.0, 100)
            .expect("Should generate");
        assert_eq!(a, b);
    }

    #[test]
    fn test_curve_kind_parse() {
        assert_eq!("Obstructive".parse::<CurveKind>().expect("parse"), CurveKind::Obstructive);
        assert_eq!(" normal ".parse::<CurveKind>().expect("parse"), CurveKind::Normal);
        assert!("flat".parse::<CurveKind>().is_err());
        assert_eq!(CurveKind::from(Diagnosis::Dysfunctional), CurveKind::Dysfunctional);
    }

    #[test]
    fn test_flow_curve_validation() {
        assert!(FlowCurve::new(vec![0.0, 1.5, 0.0]).is_ok());
        assert!(FlowCurve::new(vec![0.0, -0.1]).is_err());
        assert!(FlowCurve::new(vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn test_curve_statistics() {
        let curve = FlowCurve::new(vec![0.0, 2.0, 4.0, 2.0, 0.0]).expect("valid");
        assert_eq!(curve.max(), 4.0);
        assert!((curve.mean() - 1.6).abs() < 1e-12);
        // dt = 1.0 -> area = 1 + 3 + 3 + 1
        assert!((curve.integral(4.0) - 8.0).abs() < 1e-12);
        assert_eq!(FlowCurve::default().mean(), 0.0);
    }
}
