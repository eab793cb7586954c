//! Paillier additively homomorphic encryption.
//!
//! Public key (N, N², G = N + 1); ciphertexts are elements of Z*_{N²} with
//! c = G^m · r^N mod N². Multiplying ciphertexts adds plaintexts mod N, and
//! raising a ciphertext to a scalar multiplies its plaintext.

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroize;

use crate::arith;
use crate::prime;

/// Smallest accepted modulus size.
pub const MIN_MODULUS_BITS: usize = 2048;

#[derive(Error, Debug)]
pub enum PaillierError {
    #[error("modulus too small (min 2048 bits)")]
    ModulusTooSmall,
    #[error("plaintext must satisfy 0 <= m < N")]
    MessageOutOfRange,
    #[error("randomness must satisfy gcd(r, N) = 1 and 1 <= r < N")]
    RandomnessInvalid,
    #[error("ciphertext invalid")]
    CiphertextInvalid,
    #[error("modular inverse does not exist")]
    NoInverse,
    #[error("prime generation failed: {0}")]
    Prime(#[from] prime::PrimeError),
    #[error("random number generation failed: {0}")]
    RandomSource(String),
}

#[derive(Debug, Clone)]
pub struct PublicKey {
    pub n: BigInt,
    /// N²
    pub n2: BigInt,
    /// G = N + 1
    pub g: BigInt,
}

#[derive(Debug, Clone)]
pub struct PrivateKey {
    pub public_key: PublicKey,
    /// lcm(p-1, q-1)
    pub lambda: BigInt,
    /// (p-1)(q-1)
    pub phi_n: BigInt,
    pub p: BigInt,
    pub q: BigInt,
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.lambda = BigInt::zero();
        self.phi_n = BigInt::zero();
        self.p = BigInt::zero();
        self.q = BigInt::zero();
        // The public parameters are not sensitive.
    }
}

impl PrivateKey {
    /// Generate a key from two independent probable primes of bits/2 each.
    pub fn generate(rng: &mut impl RngCore, bits: usize) -> Result<PrivateKey, PaillierError> {
        Self::generate_inner(rng, bits, false)
    }

    /// Generate a key from a safe-prime pair: the pair (p, q) with p = 2q + 1
    /// supplies both factors of the modulus.
    pub fn generate_safe_prime(
        rng: &mut impl RngCore,
        bits: usize,
    ) -> Result<PrivateKey, PaillierError> {
        Self::generate_inner(rng, bits, true)
    }

    fn generate_inner(
        rng: &mut impl RngCore,
        bits: usize,
        safe: bool,
    ) -> Result<PrivateKey, PaillierError> {
        if bits < MIN_MODULUS_BITS {
            return Err(PaillierError::ModulusTooSmall);
        }
        let half = bits / 2;

        let (p, q) = loop {
            let (p, q) = if safe {
                let sp = prime::generate_safe_prime(half, &prime::Config::default(), rng)?;
                (sp.p, sp.q)
            } else {
                (
                    prime::generate_prime(half, rng)?,
                    prime::generate_prime(half, rng)?,
                )
            };
            if p != q {
                break (p, q);
            }
        };

        Ok(Self::from_primes(p, q))
    }

    fn from_primes(p: BigInt, q: BigInt) -> PrivateKey {
        let n = &p * &q;
        let n2 = &n * &n;
        let g = &n + 1u32;

        let p_minus_one = &p - 1u32;
        let q_minus_one = &q - 1u32;
        let phi_n = &p_minus_one * &q_minus_one;
        let gcd = p_minus_one.gcd(&q_minus_one);
        let lambda = &phi_n / &gcd;

        PrivateKey {
            public_key: PublicKey { n, n2, g },
            lambda,
            phi_n,
            p,
            q,
        }
    }

    pub fn public(&self) -> PublicKey {
        self.public_key.clone()
    }

    pub fn decrypt(&self, c: &BigInt) -> Result<BigInt, PaillierError> {
        let pk = &self.public_key;
        if c.sign() != Sign::Plus || *c >= pk.n2 {
            return Err(PaillierError::CiphertextInvalid);
        }
        if !c.gcd(&pk.n2).is_one() {
            return Err(PaillierError::CiphertextInvalid);
        }

        let u = arith::mod_exp(c, &self.lambda, &pk.n2);
        let l_c = l_function(&u, &pk.n);

        let u_g = arith::mod_exp(&pk.g, &self.lambda, &pk.n2);
        let l_g = l_function(&u_g, &pk.n);

        let mu = arith::mod_inverse(&l_g, &pk.n).ok_or(PaillierError::NoInverse)?;
        Ok(arith::mod_mul(&l_c, &mu, &pk.n))
    }

    /// Recover the randomness r used to produce c = G^m · r^N mod N².
    ///
    /// Multiplying by (1 - mN) cancels the G^m = 1 + mN term mod N², leaving
    /// r^N; the N-th root comes from exponentiation by N⁻¹ mod φ(N).
    pub fn recover_randomness(&self, c: &BigInt, m: &BigInt) -> Result<BigInt, PaillierError> {
        let pk = &self.public_key;

        let m_n = arith::mod_mul(m, &pk.n, &pk.n2);
        let one_minus_mn = arith::mod_sub(&BigInt::one(), &m_n, &pk.n2);
        let c_dash = arith::mod_mul(c, &one_minus_mn, &pk.n2);

        let n_inv = arith::mod_inverse(&pk.n, &self.phi_n).ok_or(PaillierError::NoInverse)?;
        Ok(arith::mod_exp(&c_dash, &n_inv, &pk.n))
    }
}

impl PublicKey {
    /// Encrypt m with randomness drawn from the supplied source.
    pub fn encrypt(&self, rng: &mut impl RngCore, m: &BigInt) -> Result<BigInt, PaillierError> {
        let r = random_relatively_prime(&self.n, rng)?;
        self.encrypt_with_randomness(m, &r)
    }

    /// Encrypt m with caller-chosen randomness r in Z*_N.
    pub fn encrypt_with_randomness(&self, m: &BigInt, r: &BigInt) -> Result<BigInt, PaillierError> {
        if m.sign() == Sign::Minus || *m >= self.n {
            return Err(PaillierError::MessageOutOfRange);
        }
        if r.sign() != Sign::Plus || *r >= self.n {
            return Err(PaillierError::RandomnessInvalid);
        }
        if !r.gcd(&self.n).is_one() {
            return Err(PaillierError::RandomnessInvalid);
        }

        // c = G^m * r^N mod N²
        let g_m = arith::mod_exp(&self.g, m, &self.n2);
        let r_n = arith::mod_exp(r, &self.n, &self.n2);
        Ok(arith::mod_mul(&g_m, &r_n, &self.n2))
    }

    /// Homomorphic addition: Enc(m1) · Enc(m2) = Enc(m1 + m2 mod N).
    pub fn add(&self, c1: &BigInt, c2: &BigInt) -> Result<BigInt, PaillierError> {
        self.check_ciphertext(c1)?;
        self.check_ciphertext(c2)?;
        Ok(arith::mod_mul(c1, c2, &self.n2))
    }

    /// Homomorphic scalar multiplication: Enc(m)^k = Enc(k·m mod N).
    pub fn mul(&self, c: &BigInt, k: &BigInt) -> Result<BigInt, PaillierError> {
        self.check_ciphertext(c)?;
        let k_mod = arith::modulo(k, &self.n);
        Ok(arith::mod_exp(c, &k_mod, &self.n2))
    }

    fn check_ciphertext(&self, c: &BigInt) -> Result<(), PaillierError> {
        if c.sign() != Sign::Plus || *c >= self.n2 {
            return Err(PaillierError::CiphertextInvalid);
        }
        Ok(())
    }
}

// L(u) = (u - 1) / N; exact whenever u ≡ 1 (mod N).
fn l_function(u: &BigInt, n: &BigInt) -> BigInt {
    (u - 1u32) / n
}

fn random_relatively_prime(
    n: &BigInt,
    rng: &mut impl RngCore,
) -> Result<BigInt, PaillierError> {
    loop {
        let r = arith::random_mod(n, rng)
            .map_err(|e| PaillierError::RandomSource(e.to_string()))?;
        if r.is_zero() {
            continue;
        }
        if r.gcd(n).is_one() {
            return Ok(r);
        }
    }
}
