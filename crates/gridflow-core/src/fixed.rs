use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use at the external buffer interface and for
/// initialization, never inside the balancer.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    if v.is_nan() {
        return Fixed64::ZERO;
    }
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and the external interface.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Clamp a quantity into `[lo, hi]`. If the bounds are inverted the lower
/// bound wins, so a zero-capacity store always reads zero.
#[inline]
pub fn clamp(v: Fixed64, lo: Fixed64, hi: Fixed64) -> Fixed64 {
    if v > hi {
        hi.max(lo)
    } else if v < lo {
        lo
    } else {
        v
    }
}

/// `num / den`, or `None` when the denominator is not strictly positive.
#[inline]
pub fn ratio(num: Fixed64, den: Fixed64) -> Option<Fixed64> {
    if den <= Fixed64::ZERO {
        None
    } else {
        num.checked_div(den)
    }
}

/// Multiply by a count, saturating instead of overflowing.
#[inline]
pub fn scale(v: Fixed64, count: usize) -> Fixed64 {
    let n = i64::try_from(count).unwrap_or(i64::MAX);
    v.saturating_mul_int(n)
}
