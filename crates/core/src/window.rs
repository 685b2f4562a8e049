//! Window functions evaluated pointwise

use std::f32::consts::PI;

/// Zeroth-order modified Bessel function of the first kind, by power series.
fn bessel_i0(x: f32) -> f32 {
    let mut sum = 1.0f32;
    let mut term = 1.0f32;
    let half = x * 0.5;
    for k in 1..32 {
        term *= (half / k as f32) * (half / k as f32);
        sum += term;
        if term < sum * 1e-9 {
            break;
        }
    }
    sum
}

/// Kaiser window of length `n` at index `i`, shape parameter `beta`.
pub fn kaiser(beta: f32, i: usize, n: usize) -> f32 {
    let x = 2.0 * i as f32 / (n - 1) as f32 - 1.0;
    bessel_i0(beta * (1.0 - x * x).max(0.0).sqrt()) / bessel_i0(beta)
}

/// Hann window of length `n` at index `i`.
pub fn hann(i: usize, n: usize) -> f32 {
    0.5 * (1.0 - (2.0 * PI * i as f32 / (n - 1) as f32).cos())
}

/// Blackman window of length `n` at index `i`.
pub fn blackman(i: usize, n: usize) -> f32 {
    let phase = 2.0 * PI * i as f32 / (n - 1) as f32;
    0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kaiser_symmetric_and_peaked() {
        let n = 33;
        for i in 0..n {
            let a = kaiser(6.0, i, n);
            let b = kaiser(6.0, n - 1 - i, n);
            assert!((a - b).abs() < 1e-5);
            assert!(a <= 1.0 + 1e-6);
        }
        assert!((kaiser(6.0, (n - 1) / 2, n) - 1.0).abs() < 1e-6);
        assert!(kaiser(6.0, 0, n) < 0.02);
    }

    #[test]
    fn test_hann_endpoints() {
        assert!(hann(0, 65).abs() < 1e-6);
        assert!((hann(32, 65) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_blackman_endpoints() {
        assert!(blackman(0, 65).abs() < 1e-2);
        assert!((blackman(32, 65) - 1.0).abs() < 1e-6);
    }
}
