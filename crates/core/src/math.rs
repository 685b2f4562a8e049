//! Saturating fixed-point arithmetic and complex helpers
//!
//! The int8 operations implement the metric arithmetic of the polar list
//! decoder. Results are clamped to [-127, 127]; -128 never appears, so
//! negation is always safe and comparisons stay symmetric.

pub use rustfft::num_complex::Complex32;

/// Saturating addition on int8 soft values.
#[inline]
pub fn qadd(a: i8, b: i8) -> i8 {
    (a as i16 + b as i16).clamp(-127, 127) as i8
}

/// Saturating absolute value; |-128| would overflow, so clamp first.
#[inline]
pub fn qabs(a: i8) -> i8 {
    (a as i16).abs().min(127) as i8
}

/// Minimum of two soft values.
#[inline]
pub fn qmin(a: i8, b: i8) -> i8 {
    a.min(b)
}

/// Check-node (min-sum) product: sign(a)*sign(b)*min(|a|, |b|).
#[inline]
pub fn prod(a: i8, b: i8) -> i8 {
    let m = qmin(qabs(a), qabs(b));
    if (a < 0) != (b < 0) {
        -m
    } else {
        m
    }
}

/// Saturating multiply-add a*b + c, with a restricted to hard values {-1, +1}.
#[inline]
pub fn madd(a: i8, b: i8, c: i8) -> i8 {
    (a as i16 * b as i16 + c as i16).clamp(-127, 127) as i8
}

/// Unit-magnitude complex from a phase angle.
#[inline]
pub fn polar(radius: f32, theta: f32) -> Complex32 {
    Complex32::new(radius * theta.cos(), radius * theta.sin())
}

/// NRZ mapping: bit 0 -> +1, bit 1 -> -1.
#[inline]
pub fn nrz(bit: bool) -> f32 {
    if bit {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qadd_saturates() {
        assert_eq!(qadd(100, 100), 127);
        assert_eq!(qadd(-100, -100), -127);
        assert_eq!(qadd(50, -20), 30);
    }

    #[test]
    fn test_qabs_bounds() {
        assert_eq!(qabs(-127), 127);
        assert_eq!(qabs(-128), 127);
        assert_eq!(qabs(13), 13);
    }

    #[test]
    fn test_prod_min_sum() {
        assert_eq!(prod(40, -10), -10);
        assert_eq!(prod(-40, -10), 10);
        assert_eq!(prod(0, 99), 0);
        assert_eq!(prod(-127, -127), 127);
    }

    #[test]
    fn test_madd_hard_values() {
        assert_eq!(madd(1, 30, 40), 70);
        assert_eq!(madd(-1, 30, 40), 10);
        assert_eq!(madd(-1, 127, -127), -127);
        assert_eq!(madd(1, 127, 127), 127);
    }

    #[test]
    fn test_nrz() {
        assert_eq!(nrz(false), 1.0);
        assert_eq!(nrz(true), -1.0);
    }
}
