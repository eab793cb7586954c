//! Threshold-cryptography primitives over arbitrary-precision integers.
//!
//! Three engines share a modular-arithmetic substrate:
//!
//! - [`vss`] — Feldman verifiable secret sharing over a prime-order
//!   elliptic curve group
//! - [`paillier`] — the Paillier additively homomorphic cryptosystem
//! - [`prime`] — a combined-sieve generator for safe primes (p = 2q + 1
//!   with both p and q prime), which also feeds Paillier key generation
//!
//! # Example
//!
//! ```
//! use num_bigint::BigInt;
//! use tss_crypto::ec::Curve;
//! use tss_crypto::vss;
//!
//! # fn main() -> Result<(), tss_crypto::vss::VssError> {
//! let indices: Vec<BigInt> = (1..=5).map(BigInt::from).collect();
//! let secret = BigInt::from(12345);
//!
//! let (commitment, shares) = vss::split(Curve::P256, 3, &secret, &indices)?;
//! assert!(shares[0].verify(Curve::P256, &commitment));
//!
//! let recovered = vss::reconstruct(Curve::P256, 3, &shares[..3])?;
//! assert_eq!(recovered, secret);
//! # Ok(())
//! # }
//! ```

pub mod arith;
pub mod ec;
pub mod paillier;
pub mod prime;
pub mod vss;
