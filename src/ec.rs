//! Thin façade over the RustCrypto curve implementations.
//!
//! Scalars are [`BigInt`] values; they are reduced modulo the group order
//! before touching the underlying field types, so callers can pass any
//! integer.

use elliptic_curve::bigint::ArrayEncoding;
use elliptic_curve::Curve as _;
use elliptic_curve::PrimeField;
use num_bigint::{BigInt, Sign};
use num_integer::Integer;

/// Identifier for a supported prime-order curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    P256,
    Secp256k1,
}

impl Curve {
    /// Order of the subgroup generated by the base point.
    pub fn order(&self) -> BigInt {
        let bytes = match self {
            Curve::P256 => p256::NistP256::ORDER.to_be_byte_array(),
            Curve::Secp256k1 => k256::Secp256k1::ORDER.to_be_byte_array(),
        };
        BigInt::from_bytes_be(Sign::Plus, bytes.as_slice())
    }

    /// k * G where G is the curve base point.
    pub fn scalar_base_mult(&self, k: &BigInt) -> Point {
        let inner = match self {
            Curve::P256 => PointRepr::P256(p256::ProjectivePoint::GENERATOR * p256_scalar(k)),
            Curve::Secp256k1 => {
                PointRepr::Secp256k1(k256::ProjectivePoint::GENERATOR * k256_scalar(k))
            }
        };
        Point {
            curve: *self,
            inner,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PointRepr {
    P256(p256::ProjectivePoint),
    Secp256k1(k256::ProjectivePoint),
}

/// A point on one of the supported curves. Equality compares both the curve
/// and the group element; points on different curves are never equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    curve: Curve,
    inner: PointRepr,
}

impl Point {
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// k * P.
    pub fn scalar_mult(&self, k: &BigInt) -> Point {
        let inner = match &self.inner {
            PointRepr::P256(p) => PointRepr::P256(*p * p256_scalar(k)),
            PointRepr::Secp256k1(p) => PointRepr::Secp256k1(*p * k256_scalar(k)),
        };
        Point {
            curve: self.curve,
            inner,
        }
    }

    /// P + Q, or None when the points live on different curves.
    pub fn add(&self, other: &Point) -> Option<Point> {
        let inner = match (&self.inner, &other.inner) {
            (PointRepr::P256(a), PointRepr::P256(b)) => PointRepr::P256(*a + *b),
            (PointRepr::Secp256k1(a), PointRepr::Secp256k1(b)) => {
                PointRepr::Secp256k1(*a + *b)
            }
            _ => return None,
        };
        Some(Point {
            curve: self.curve,
            inner,
        })
    }

    pub fn is_identity(&self) -> bool {
        match &self.inner {
            PointRepr::P256(p) => p == &p256::ProjectivePoint::IDENTITY,
            PointRepr::Secp256k1(p) => p == &k256::ProjectivePoint::IDENTITY,
        }
    }
}

fn p256_scalar(k: &BigInt) -> p256::Scalar {
    let repr = scalar_repr(k, Curve::P256);
    Option::from(p256::Scalar::from_repr(repr.into()))
        .expect("value reduced below the group order is a canonical scalar")
}

fn k256_scalar(k: &BigInt) -> k256::Scalar {
    let repr = scalar_repr(k, Curve::Secp256k1);
    Option::from(k256::Scalar::from_repr(repr.into()))
        .expect("value reduced below the group order is a canonical scalar")
}

// Big-endian 32-byte encoding of k mod the group order.
fn scalar_repr(k: &BigInt, curve: Curve) -> [u8; 32] {
    let reduced = k.mod_floor(&curve.order());
    let (_, bytes) = reduced.to_bytes_be();
    let mut repr = [0u8; 32];
    repr[32 - bytes.len()..].copy_from_slice(&bytes);
    repr
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{One, Zero};

    #[test]
    fn test_order_bit_length() {
        assert_eq!(Curve::P256.order().bits(), 256);
        assert_eq!(Curve::Secp256k1.order().bits(), 256);
    }

    #[test]
    fn test_scalar_base_mult_zero_is_identity() {
        let p = Curve::P256.scalar_base_mult(&BigInt::zero());
        assert!(p.is_identity());
    }

    #[test]
    fn test_scalar_base_mult_order_is_identity() {
        let n = Curve::P256.order();
        assert!(Curve::P256.scalar_base_mult(&n).is_identity());
    }

    #[test]
    fn test_scalar_wraps_mod_order() {
        let n = Curve::Secp256k1.order();
        let g1 = Curve::Secp256k1.scalar_base_mult(&BigInt::one());
        let g2 = Curve::Secp256k1.scalar_base_mult(&(&n + BigInt::one()));
        assert_eq!(g1, g2);
    }

    #[test]
    fn test_add_matches_doubling() {
        let g = Curve::P256.scalar_base_mult(&BigInt::one());
        let two_g = Curve::P256.scalar_base_mult(&BigInt::from(2));
        assert_eq!(g.add(&g).unwrap(), two_g);
    }

    #[test]
    fn test_scalar_mult_matches_base_mult() {
        let g = Curve::P256.scalar_base_mult(&BigInt::one());
        let k = BigInt::from(987654321u64);
        assert_eq!(g.scalar_mult(&k), Curve::P256.scalar_base_mult(&k));
    }

    #[test]
    fn test_add_rejects_curve_mismatch() {
        let a = Curve::P256.scalar_base_mult(&BigInt::one());
        let b = Curve::Secp256k1.scalar_base_mult(&BigInt::one());
        assert!(a.add(&b).is_none());
    }

    #[test]
    fn test_points_on_different_curves_never_equal() {
        let a = Curve::P256.scalar_base_mult(&BigInt::one());
        let b = Curve::Secp256k1.scalar_base_mult(&BigInt::one());
        assert_ne!(a, b);
    }

    #[test]
    fn test_negative_scalar_reduces() {
        let n = Curve::P256.order();
        let minus_one = Curve::P256.scalar_base_mult(&BigInt::from(-1));
        let n_minus_one = Curve::P256.scalar_base_mult(&(&n - BigInt::one()));
        assert_eq!(minus_one, n_minus_one);
    }
}
