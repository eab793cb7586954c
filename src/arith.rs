use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use rand::RngCore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArithError {
    #[error("random number generation failed: {0}")]
    RandomSource(String),
    #[error("modulus must be positive")]
    NonPositiveModulus,
}

/// (a * b) mod m, result in [0, m).
pub fn mod_mul(a: &BigInt, b: &BigInt, m: &BigInt) -> BigInt {
    (a * b).mod_floor(m)
}

/// (a + b) mod m, result in [0, m).
pub fn mod_add(a: &BigInt, b: &BigInt, m: &BigInt) -> BigInt {
    (a + b).mod_floor(m)
}

/// (a - b) mod m, result in [0, m).
pub fn mod_sub(a: &BigInt, b: &BigInt, m: &BigInt) -> BigInt {
    (a - b).mod_floor(m)
}

/// base^exp mod m. The exponent must be non-negative.
pub fn mod_exp(base: &BigInt, exp: &BigInt, m: &BigInt) -> BigInt {
    base.modpow(exp, m)
}

/// Multiplicative inverse of a mod m, or None when gcd(a, m) != 1.
pub fn mod_inverse(a: &BigInt, m: &BigInt) -> Option<BigInt> {
    a.modinv(m)
}

/// a mod m, result in [0, m).
pub fn modulo(a: &BigInt, m: &BigInt) -> BigInt {
    a.mod_floor(m)
}

/// Uniform random integer in [0, n) by rejection sampling.
///
/// The top byte is masked down to n's bit length so the expected number of
/// rejections stays below one per draw.
pub fn random_mod(n: &BigInt, rng: &mut impl RngCore) -> Result<BigInt, ArithError> {
    if n.sign() != Sign::Plus {
        return Err(ArithError::NonPositiveModulus);
    }
    let bits = n.bits();
    let byte_len = ((bits + 7) / 8) as usize;
    let top_mask = ((1u16 << (((bits - 1) % 8) + 1)) - 1) as u8;
    let mut buf = vec![0u8; byte_len];
    loop {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| ArithError::RandomSource(e.to_string()))?;
        buf[0] &= top_mask;
        let candidate = BigInt::from_bytes_be(Sign::Plus, &buf);
        if &candidate < n {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{One, Zero};
    use rand::rngs::OsRng;

    #[test]
    fn test_mod_sub_wraps_negative() {
        let m = BigInt::from(17);
        let r = mod_sub(&BigInt::from(3), &BigInt::from(5), &m);
        assert_eq!(r, BigInt::from(15));
    }

    #[test]
    fn test_mod_mul_reduces() {
        let m = BigInt::from(13);
        let r = mod_mul(&BigInt::from(7), &BigInt::from(8), &m);
        assert_eq!(r, BigInt::from(4));
    }

    #[test]
    fn test_mod_inverse() {
        let m = BigInt::from(17);
        let a = BigInt::from(3);
        let inv = mod_inverse(&a, &m).unwrap();
        assert_eq!(mod_mul(&a, &inv, &m), BigInt::one());

        // 6 and 9 share a factor with 12
        assert!(mod_inverse(&BigInt::from(6), &BigInt::from(12)).is_none());
    }

    #[test]
    fn test_modulo_negative_operand() {
        let m = BigInt::from(7);
        assert_eq!(modulo(&BigInt::from(-1), &m), BigInt::from(6));
    }

    #[test]
    fn test_random_mod_bounds() {
        let n = BigInt::from(1000u32);
        for _ in 0..100 {
            let r = random_mod(&n, &mut OsRng).unwrap();
            assert!(r >= BigInt::zero());
            assert!(r < n);
        }
    }

    #[test]
    fn test_random_mod_distinct() {
        let n = BigInt::one() << 256;
        let r1 = random_mod(&n, &mut OsRng).unwrap();
        let r2 = random_mod(&n, &mut OsRng).unwrap();
        assert_ne!(r1, r2);
    }

    #[test]
    fn test_random_mod_rejects_non_positive() {
        assert!(random_mod(&BigInt::zero(), &mut OsRng).is_err());
        assert!(random_mod(&BigInt::from(-5), &mut OsRng).is_err());
    }
}
