//! Feldman verifiable secret sharing.
//!
//! The secret is the constant term of a random polynomial f of degree t-1
//! over Z_N, where N is the order of the chosen curve's prime subgroup.
//! Every participant i receives the share f(x_i); every coefficient a_j is
//! published as the commitment a_j · G, which lets any shareholder check its
//! own share without learning anything about the others.

use std::collections::HashSet;

use num_bigint::BigInt;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::arith;
use crate::ec::{Curve, Point};

#[derive(Error, Debug)]
pub enum VssError {
    #[error("threshold must be at least 1")]
    ThresholdTooSmall,
    #[error("indices list is empty")]
    EmptyIndices,
    #[error("need at least {need} indices, got {got}")]
    TooFewIndices { need: usize, got: usize },
    #[error("need at least {need} shares to reconstruct, got {got}")]
    InsufficientShares { need: usize, got: usize },
    #[error("index after reduction mod N cannot be zero")]
    ZeroIndex,
    #[error("indices contain duplicates after normalization")]
    DuplicateIndex,
    #[error("modular inverse does not exist")]
    NoInverse,
    #[error("random number generation failed: {0}")]
    RandomSource(String),
}

/// One participant's share f(index) of a split secret.
#[derive(Debug, Clone)]
pub struct Share {
    /// The participant's x-coordinate, non-zero mod N.
    pub index: BigInt,
    /// f(index) mod N.
    pub value: BigInt,
    /// The threshold t the secret was split with; a share is only meaningful
    /// against a commitment carrying exactly t coefficients.
    pub threshold: usize,
}

/// Commitments C_j = a_j · G to the polynomial coefficients. C_0 commits to
/// the secret itself.
#[derive(Debug, Clone)]
pub struct Commitment {
    pub curve: Curve,
    pub coeffs: Vec<Point>,
}

/// Split `secret` into one share per index, recoverable from any `threshold`
/// of them, together with the Feldman commitment.
pub fn split(
    curve: Curve,
    threshold: usize,
    secret: &BigInt,
    indices: &[BigInt],
) -> Result<(Commitment, Vec<Share>), VssError> {
    if threshold < 1 {
        return Err(VssError::ThresholdTooSmall);
    }
    if indices.is_empty() {
        return Err(VssError::EmptyIndices);
    }
    if indices.len() < threshold {
        return Err(VssError::TooFewIndices {
            need: threshold,
            got: indices.len(),
        });
    }

    let n = curve.order();
    let coefficients = random_polynomial(threshold, secret, &n)?;

    let commitment = Commitment {
        curve,
        coeffs: coefficients
            .iter()
            .map(|a| curve.scalar_base_mult(a))
            .collect(),
    };

    let shares = indices
        .iter()
        .map(|index| Share {
            index: index.clone(),
            value: compute_share(&coefficients, index, &n),
            threshold,
        })
        .collect();

    Ok((commitment, shares))
}

/// Recover the secret from at least `threshold` shares via Lagrange
/// interpolation at x = 0. The first `threshold` shares whose declared
/// threshold matches are used; the result does not depend on their order
/// beyond that selection.
pub fn reconstruct(
    curve: Curve,
    threshold: usize,
    shares: &[Share],
) -> Result<BigInt, VssError> {
    if shares.len() < threshold {
        return Err(VssError::InsufficientShares {
            need: threshold,
            got: shares.len(),
        });
    }

    let selected: Vec<&Share> = shares
        .iter()
        .filter(|s| s.threshold == threshold)
        .take(threshold)
        .collect();
    if selected.len() < threshold {
        return Err(VssError::InsufficientShares {
            need: threshold,
            got: selected.len(),
        });
    }

    let n = curve.order();
    let lambdas = lagrange_coefficients(&selected, &n)?;

    let mut secret = BigInt::zero();
    for (share, lambda) in selected.iter().zip(lambdas.iter()) {
        let part = arith::mod_mul(&share.value, lambda, &n);
        secret = arith::mod_add(&secret, &part, &n);
    }
    Ok(secret)
}

impl Share {
    /// Check this share against a commitment: value · G must equal
    /// Σ_j index^j · C_j. Returns false (never errors) for malformed input.
    pub fn verify(&self, curve: Curve, commitment: &Commitment) -> bool {
        if self.threshold < 1 || self.threshold != commitment.coeffs.len() {
            return false;
        }
        if curve != commitment.curve {
            return false;
        }

        let n = curve.order();

        // result = C_0, then fold in C_j · index^j for j = 1..t-1 with an
        // incrementally maintained power of the index.
        let mut result = commitment.coeffs[0].clone();
        let mut exp = self.index.clone();
        for coeff in &commitment.coeffs[1..] {
            let term = coeff.scalar_mult(&exp);
            result = match result.add(&term) {
                Some(sum) => sum,
                None => return false,
            };
            exp = arith::mod_mul(&exp, &self.index, &n);
        }

        let expected = curve.scalar_base_mult(&self.value);
        result == expected
    }
}

/// Normalize indices mod N, rejecting zeros and duplicates. Input order is
/// preserved.
pub fn check_indices(curve: Curve, indices: &[BigInt]) -> Result<Vec<BigInt>, VssError> {
    if indices.is_empty() {
        return Err(VssError::EmptyIndices);
    }
    let n = curve.order();
    let mut seen = HashSet::with_capacity(indices.len());
    let mut normalized = Vec::with_capacity(indices.len());
    for index in indices {
        let norm = arith::modulo(index, &n);
        if norm.is_zero() {
            return Err(VssError::ZeroIndex);
        }
        if !seen.insert(norm.clone()) {
            return Err(VssError::DuplicateIndex);
        }
        normalized.push(norm);
    }
    Ok(normalized)
}

// Coefficients a_0 = secret, a_1..a_{t-1} uniform in [0, N).
fn random_polynomial(
    threshold: usize,
    secret: &BigInt,
    n: &BigInt,
) -> Result<Vec<BigInt>, VssError> {
    let mut coefficients = Vec::with_capacity(threshold);
    coefficients.push(secret.clone());
    for _ in 1..threshold {
        let coeff = arith::random_mod(n, &mut OsRng)
            .map_err(|e| VssError::RandomSource(e.to_string()))?;
        coefficients.push(coeff);
    }
    Ok(coefficients)
}

// f(index) = Σ_j a_j · index^j mod N with incrementally maintained powers.
fn compute_share(coefficients: &[BigInt], index: &BigInt, n: &BigInt) -> BigInt {
    let mut value = BigInt::zero();
    let mut x_power = BigInt::one();
    for coeff in coefficients {
        let term = arith::mod_mul(coeff, &x_power, n);
        value = arith::mod_add(&value, &term, n);
        x_power = arith::mod_mul(&x_power, index, n);
    }
    value
}

// λ_i = Π_{j≠i} x_j / (x_j - x_i) mod N. A zero denominator (duplicate
// indices mod N) shows up as a missing inverse.
fn lagrange_coefficients(shares: &[&Share], n: &BigInt) -> Result<Vec<BigInt>, VssError> {
    let mut lambdas = Vec::with_capacity(shares.len());
    for (i, share_i) in shares.iter().enumerate() {
        let mut num = BigInt::one();
        let mut den = BigInt::one();
        for (j, share_j) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            num = arith::mod_mul(&num, &share_j.index, n);
            let diff = arith::mod_sub(&share_j.index, &share_i.index, n);
            den = arith::mod_mul(&den, &diff, n);
        }
        let den_inv = arith::mod_inverse(&den, n).ok_or(VssError::NoInverse)?;
        lambdas.push(arith::mod_mul(&num, &den_inv, n));
    }
    Ok(lambdas)
}
