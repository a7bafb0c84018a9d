//! IEEE-754 packing without bit reinterpretation.
//!
//! [`FloatMode::Native`] hands floats to `byteorder`, which reinterprets the bits
//! directly. [`FloatMode::Portable`] decomposes values into sign, exponent and
//! fraction arithmetically, so the wire format stays correct on hosts whose
//! native float layout is not IEEE-754.

use serde::Deserialize;

/// How floating point fields are converted to and from their wire bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatMode {
    #[default]
    Native,
    Portable,
}

impl FloatMode {
    pub fn f32_to_bits(self, value: f32) -> u32 {
        match self {
            FloatMode::Native => value.to_bits(),
            FloatMode::Portable => pack_f32(value),
        }
    }

    pub fn f32_from_bits(self, bits: u32) -> f32 {
        match self {
            FloatMode::Native => f32::from_bits(bits),
            FloatMode::Portable => unpack_f32(bits),
        }
    }

    pub fn f64_to_bits(self, value: f64) -> u64 {
        match self {
            FloatMode::Native => value.to_bits(),
            FloatMode::Portable => pack_f64(value),
        }
    }

    pub fn f64_from_bits(self, bits: u64) -> f64 {
        match self {
            FloatMode::Native => f64::from_bits(bits),
            FloatMode::Portable => unpack_f64(bits),
        }
    }
}

/// Bit layout of a binary interchange format.
#[derive(Debug, Clone, Copy)]
struct Layout {
    exp_bits: u32,
    frac_bits: u32,
}

const SINGLE: Layout = Layout {
    exp_bits: 8,
    frac_bits: 23,
};

const DOUBLE: Layout = Layout {
    exp_bits: 11,
    frac_bits: 52,
};

impl Layout {
    fn bias(self) -> i32 {
        (1 << (self.exp_bits - 1)) - 1
    }

    fn max_biased(self) -> u64 {
        (1 << self.exp_bits) - 1
    }

    fn frac_mask(self) -> u64 {
        (1 << self.frac_bits) - 1
    }

    fn sign_bit(self) -> u64 {
        1 << (self.exp_bits + self.frac_bits)
    }

    fn quiet_nan(self) -> u64 {
        (self.max_biased() << self.frac_bits) | (1 << (self.frac_bits - 1))
    }
}

/// Multiplies `x` by `2^exp` in steps that never overflow or lose bits on the way,
/// as long as the final result is representable.
fn ldexp(mut x: f64, mut exp: i32) -> f64 {
    while exp > 1023 {
        x *= 2f64.powi(1023);
        exp -= 1023;
    }
    while exp < -1022 {
        x *= 2f64.powi(-1022);
        exp += 1022;
    }
    x * 2f64.powi(exp)
}

/// Splits a finite, positive `value` into `m * 2^e` with `m` in `[0.5, 1)`.
fn frexp(value: f64) -> (f64, i32) {
    let mut mantissa = value;
    let mut exp = 0;
    while mantissa >= 1.0 {
        mantissa *= 0.5;
        exp += 1;
    }
    while mantissa < 0.5 {
        mantissa *= 2.0;
        exp -= 1;
    }
    (mantissa, exp)
}

fn pack(value: f64, layout: Layout) -> u64 {
    let sign = if value.is_sign_negative() {
        layout.sign_bit()
    } else {
        0
    };

    if value.is_nan() {
        return layout.quiet_nan();
    }
    if value.is_infinite() {
        return sign | (layout.max_biased() << layout.frac_bits);
    }
    if value == 0.0 {
        return sign;
    }

    let largest_finite = sign | ((layout.max_biased() - 1) << layout.frac_bits) | layout.frac_mask();
    let (mantissa, exp) = frexp(value.abs());
    let biased = (exp - 1 + layout.bias()) as i64;

    if biased >= layout.max_biased() as i64 {
        return largest_finite;
    }

    if biased >= 1 {
        let mut fraction =
            ldexp(2.0 * mantissa - 1.0, layout.frac_bits as i32).round_ties_even() as u64;
        let mut biased = biased as u64;
        if fraction > layout.frac_mask() {
            fraction = 0;
            biased += 1;
        }
        if biased >= layout.max_biased() {
            return largest_finite;
        }
        return sign | (biased << layout.frac_bits) | fraction;
    }

    // Subnormal range: value / 2^(1 - bias - frac_bits) is the raw fraction field.
    let scale = layout.bias() - 1 + layout.frac_bits as i32;
    let fraction = ldexp(value.abs(), scale).round_ties_even() as u64;
    if fraction == 0 {
        // Below the smallest subnormal: keep the smallest magnitude rather than flushing.
        return sign | 1;
    }
    if fraction > layout.frac_mask() {
        return sign | (1 << layout.frac_bits);
    }
    sign | fraction
}

fn unpack(bits: u64, layout: Layout) -> f64 {
    let negative = bits & layout.sign_bit() != 0;
    let biased = (bits >> layout.frac_bits) & layout.max_biased();
    let fraction = bits & layout.frac_mask();

    let magnitude = if biased == layout.max_biased() {
        if fraction == 0 {
            f64::INFINITY
        } else {
            return f64::NAN;
        }
    } else if biased == 0 {
        ldexp(
            fraction as f64,
            1 - layout.bias() - layout.frac_bits as i32,
        )
    } else {
        let significand = (fraction | (1 << layout.frac_bits)) as f64;
        ldexp(
            significand,
            biased as i32 - layout.bias() - layout.frac_bits as i32,
        )
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

pub fn pack_f32(value: f32) -> u32 {
    pack(value as f64, SINGLE) as u32
}

/// Packs a double into single precision, clamping out-of-range magnitudes.
pub fn pack_f32_from_f64(value: f64) -> u32 {
    pack(value, SINGLE) as u32
}

pub fn unpack_f32(bits: u32) -> f32 {
    unpack(bits as u64, SINGLE) as f32
}

pub fn pack_f64(value: f64) -> u64 {
    pack(value, DOUBLE)
}

pub fn unpack_f64(bits: u64) -> f64 {
    unpack(bits, DOUBLE)
}
