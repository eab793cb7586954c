//! Safe-prime generation with a Wiener-style combined sieve.
//!
//! A safe prime is a prime p = 2q + 1 where q is also prime. The generator
//! draws a random odd starting point q0, normalizes it to q0 ≡ 2 (mod 3),
//! and scans the window q = q0 + delta for delta = 0, 6, 12, ... Every
//! candidate is first screened against 23 groups of small odd primes using a
//! single modular reduction per group product, and only the survivors reach
//! the Fermat and Miller-Rabin tests.
//!
//! Reference: <https://eprint.iacr.org/2003/186.pdf>

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrimeError {
    #[error("bits too small")]
    BitsTooSmall,
    #[error("random source failure: {0}")]
    RandomSource(String),
}

/// A safe prime together with its Sophie Germain half.
#[derive(Debug, Clone)]
pub struct SafePrime {
    /// The safe prime p = 2q + 1.
    pub p: BigInt,
    /// The Sophie Germain prime q = (p - 1) / 2.
    pub q: BigInt,
}

/// Tuning knobs for the generator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum delta offset scanned per random starting point. Deltas step
    /// by 6, so a window holds about window_delta_max / 6 candidates.
    pub window_delta_max: u64,
    /// Miller-Rabin rounds applied to both q and p.
    pub miller_rabin_rounds: usize,
    /// Fermat base-2 prescreen on q before Miller-Rabin.
    pub use_fermat_q: bool,
    /// Fermat base-2 prescreen on p before Miller-Rabin.
    pub use_fermat_p: bool,
    /// Additionally reject q ≡ 1 (mod r) in the sieve, which raises the
    /// yield when (q - 1) / 2 should avoid small factors too.
    pub filter_for_sophie: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window_delta_max: 1024,
            miller_rabin_rounds: 32,
            use_fermat_q: false,
            use_fermat_p: true,
            filter_for_sophie: true,
        }
    }
}

// Small odd primes starting at 5, grouped so each group's product fits in a
// u64. PRIME_PRODUCTS[i] is the exact product of PRIME_GROUPS[i].
const PRIME_GROUPS: [&[u64]; 23] = [
    &[5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53],
    &[59, 61, 67, 71, 73, 79, 83, 89, 97],
    &[101, 103, 107, 109, 113, 127, 131, 137, 139],
    &[149, 151, 157, 163, 167, 173, 179, 181],
    &[191, 193, 197, 199, 211, 223, 227, 229],
    &[233, 239, 241, 251, 257, 263, 269],
    &[271, 277, 281, 283, 293, 307, 311],
    &[317, 331, 337, 347, 349, 353, 359],
    &[367, 373, 379, 383, 389, 397, 401],
    &[409, 419, 421, 431, 433, 439, 443],
    &[449, 457, 461, 463, 467, 479, 487],
    &[491, 499, 503, 509, 521, 523, 541],
    &[557, 563, 569, 571, 577, 587],
    &[593, 599, 601, 607, 613, 617],
    &[619, 631, 641, 643, 647, 653],
    &[659, 661, 673, 677, 683, 691],
    &[701, 709, 719, 727, 733, 739],
    &[743, 751, 757, 761, 769, 773],
    &[787, 797, 809, 811, 821, 823],
    &[827, 829, 839, 853, 857, 859],
    &[863, 877, 881, 883, 887, 907],
    &[911, 919, 929, 937, 941, 947],
    &[953, 967, 971, 977, 983, 991],
];

const PRIME_PRODUCTS: [u64; 23] = [
    5431526412865007455,
    70746471270782959,
    4343678784233766587,
    538945254996352681,
    3534749459194562711,
    61247129307885343,
    166996819598798201,
    542676746453092519,
    1230544604996048471,
    2618501576975440661,
    4771180125133726009,
    9247077179230889629,
    34508483876655991,
    49010633640532829,
    68015277240951437,
    93667592535644987,
    140726526226538479,
    191079950785756457,
    278064420037666463,
    361197734649700343,
    473672212426732757,
    649424689916978839,
    851648411420003101,
];

// Cheap trial-division table for p (the sieve only constrains q).
const SMALL_PRIMES_FOR_P: [u64; 15] = [3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53];

/// Generate a safe prime of exactly `bits` bits. Blocks until one is found;
/// errors only on invalid input or a failing random source.
pub fn generate_safe_prime(
    bits: usize,
    cfg: &Config,
    rng: &mut impl RngCore,
) -> Result<SafePrime, PrimeError> {
    if bits < 3 {
        return Err(PrimeError::BitsTooSmall);
    }
    let q_bits = bits - 1;
    let mut buf = vec![0u8; (q_bits + 7) / 8];

    loop {
        let mut q0 = random_q0(&mut buf, q_bits, rng)?;
        normalize_mod3(&mut q0);
        let base_remainders = base_remainders(&q0);

        // q0 is odd and ≡ 2 (mod 3); stepping by 6 keeps every candidate
        // clear of 2 and 3.
        let mut delta = 0u64;
        while delta < cfg.window_delta_max {
            if passes_combined_sieve(&base_remainders, delta, cfg.filter_for_sophie) {
                let q = &q0 + delta;
                let p: BigInt = (&q << 1) + 1u32;
                if passes_filters(&q, &p, bits, cfg) {
                    return Ok(SafePrime { p, q });
                }
            }
            delta += 6;
        }
        // Window exhausted; resample q0.
    }
}

/// Generate an ordinary probable prime of exactly `bits` bits.
pub fn generate_prime(bits: usize, rng: &mut impl RngCore) -> Result<BigInt, PrimeError> {
    if bits < 2 {
        return Err(PrimeError::BitsTooSmall);
    }
    let byte_len = (bits + 7) / 8;
    let high_bits = match bits % 8 {
        0 => 8,
        h => h,
    };
    let mask = ((1u16 << high_bits) - 1) as u8;
    let mut buf = vec![0u8; byte_len];

    loop {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| PrimeError::RandomSource(e.to_string()))?;
        buf[0] &= mask;
        let mut candidate = BigUint::from_bytes_be(&buf);
        candidate.set_bit(0, true);
        // Top two bits set so the product of two such primes keeps its full
        // bit length.
        candidate.set_bit((bits - 1) as u64, true);
        candidate.set_bit((bits - 2) as u64, true);
        let candidate = BigInt::from(candidate);
        if !passes_small_prime_filter(&candidate) {
            continue;
        }
        if probably_prime(&candidate, 20) {
            return Ok(candidate);
        }
    }
}

// Random q0 of q_bits bits: odd, top two bits set, and bit 1 set so the
// window starts in the q ≡ 3 (mod 4) residue class.
fn random_q0(buf: &mut [u8], q_bits: usize, rng: &mut impl RngCore) -> Result<BigInt, PrimeError> {
    rng.try_fill_bytes(buf)
        .map_err(|e| PrimeError::RandomSource(e.to_string()))?;

    let high_bits = match q_bits % 8 {
        0 => 8,
        h => h,
    };
    buf[0] &= ((1u16 << high_bits) - 1) as u8;

    let mut q = BigUint::from_bytes_be(buf);
    q.set_bit(0, true);
    if q_bits > 1 {
        q.set_bit(1, true);
    }
    q.set_bit((q_bits - 1) as u64, true);
    if q_bits >= 2 {
        q.set_bit((q_bits - 2) as u64, true);
    }
    Ok(BigInt::from(q))
}

// Push q to q ≡ 2 (mod 3) while preserving oddness, so no candidate in the
// delta-6 window is divisible by 3.
fn normalize_mod3(q: &mut BigInt) {
    match (&*q % 3u32).to_u64() {
        Some(1) => *q += 4u32,
        Some(0) => *q += 2u32,
        _ => {}
    }
}

fn base_remainders(q0: &BigInt) -> Vec<u64> {
    PRIME_PRODUCTS
        .iter()
        .map(|&product| (q0 % product).to_u64().expect("remainder below a u64 product"))
        .collect()
}

// One modular reduction per group product screens the candidate against
// every prime in the group:
//   residue == 0        -> r divides q
//   residue == (r-1)/2  -> r divides 2q+1
//   residue == 1        -> r divides (q-1)/2 (only with filter_for_sophie)
fn passes_combined_sieve(base_remainders: &[u64], delta: u64, filter_for_sophie: bool) -> bool {
    for (i, &base) in base_remainders.iter().enumerate() {
        let product = PRIME_PRODUCTS[i];
        let q_mod_product = ((base as u128 + delta as u128) % product as u128) as u64;
        for &prime in PRIME_GROUPS[i] {
            let residue = q_mod_product % prime;
            if residue == 0 {
                return false;
            }
            if residue == (prime - 1) / 2 {
                return false;
            }
            if filter_for_sophie && residue == 1 {
                return false;
            }
        }
    }
    true
}

// Expensive checks in cheapest-first order; the combined sieve has already
// run by the time a candidate gets here.
fn passes_filters(q: &BigInt, p: &BigInt, bits: usize, cfg: &Config) -> bool {
    if p.bits() as usize != bits {
        return false;
    }
    if !passes_small_prime_filter(p) {
        return false;
    }
    if cfg.use_fermat_q && !fermat_base2(q) {
        return false;
    }
    if cfg.use_fermat_p && !fermat_base2(p) {
        return false;
    }
    if !probably_prime(q, cfg.miller_rabin_rounds) {
        return false;
    }
    probably_prime(p, cfg.miller_rabin_rounds)
}

// Trial division by the first few odd primes. Accepts outright once the
// candidate is no larger than the divisor.
fn passes_small_prime_filter(n: &BigInt) -> bool {
    for &small in SMALL_PRIMES_FOR_P.iter() {
        if *n <= BigInt::from(small) {
            return true;
        }
        if (n % small).is_zero() {
            return false;
        }
    }
    true
}

/// Fermat test with base 2: composite for sure when 2^(n-1) != 1 (mod n),
/// only probably prime otherwise.
pub fn fermat_base2(n: &BigInt) -> bool {
    let two = BigInt::from(2);
    if n < &two {
        return false;
    }
    if *n == two || *n == BigInt::from(3) {
        return true;
    }
    if n.is_even() {
        return false;
    }
    let exponent = n - 1u32;
    two.modpow(&exponent, n).is_one()
}

/// Miller-Rabin with `rounds` uniformly random witnesses, preceded by trial
/// division over the small-prime table.
pub fn probably_prime(n: &BigInt, rounds: usize) -> bool {
    let two = BigInt::from(2);
    if n < &two {
        return false;
    }
    if *n == two {
        return true;
    }
    if n.is_even() {
        return false;
    }
    for &small in SMALL_PRIMES_FOR_P.iter() {
        if *n == BigInt::from(small) {
            return true;
        }
        if (n % small).is_zero() {
            return false;
        }
    }

    // n - 1 = d * 2^s with d odd
    let n_minus_one = n - 1u32;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    // Witnesses drawn from [2, n-2].
    let witness_span = n - 3u32;
    'witness: for _ in 0..rounds {
        let a = random_below(&witness_span) + &two;
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = (&x * &x) % n;
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

// Uniform in [0, n) from the OS random source; n must be positive.
fn random_below(n: &BigInt) -> BigInt {
    let bits = n.bits();
    let byte_len = ((bits + 7) / 8) as usize;
    let top_mask = ((1u16 << (((bits - 1) % 8) + 1)) - 1) as u8;
    let mut buf = vec![0u8; byte_len];
    loop {
        OsRng.fill_bytes(&mut buf);
        buf[0] &= top_mask;
        let candidate = BigInt::from_bytes_be(Sign::Plus, &buf);
        if &candidate < n {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rug::integer::{IsPrime, Order};

    fn to_rug(n: &BigInt) -> rug::Integer {
        rug::Integer::from_digits(&n.to_bytes_be().1, Order::Msf)
    }

    fn is_prime_rug(n: &BigInt) -> bool {
        to_rug(n).is_probably_prime(40) != IsPrime::No
    }

    fn verify_safe_prime(sp: &SafePrime, expected_bits: u64) {
        assert_eq!(sp.p.bits(), expected_bits, "p has the wrong bit length");
        assert_eq!(sp.q.bits(), expected_bits - 1, "q has the wrong bit length");
        let two_q_plus_one: BigInt = (&sp.q << 1) + 1u32;
        assert_eq!(sp.p, two_q_plus_one, "p != 2q + 1");
        assert!(is_prime_rug(&sp.p), "p failed the primality check");
        assert!(is_prime_rug(&sp.q), "q failed the primality check");
    }

    #[test]
    fn test_prime_products_match_groups() {
        for (group, &product) in PRIME_GROUPS.iter().zip(PRIME_PRODUCTS.iter()) {
            let computed: u64 = group.iter().product();
            assert_eq!(computed, product);
        }
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.window_delta_max, 1024);
        assert_eq!(cfg.miller_rabin_rounds, 32);
        assert!(!cfg.use_fermat_q);
        assert!(cfg.use_fermat_p);
        assert!(cfg.filter_for_sophie);
    }

    #[test]
    fn test_bits_too_small() {
        let cfg = Config::default();
        assert!(generate_safe_prime(0, &cfg, &mut OsRng).is_err());
        assert!(generate_safe_prime(2, &cfg, &mut OsRng).is_err());
    }

    #[test]
    fn test_generate_256() {
        let sp = generate_safe_prime(256, &Config::default(), &mut OsRng).unwrap();
        verify_safe_prime(&sp, 256);
    }

    #[test]
    fn test_generate_512() {
        let sp = generate_safe_prime(512, &Config::default(), &mut OsRng).unwrap();
        verify_safe_prime(&sp, 512);
    }

    #[test]
    fn test_generate_small_sizes() {
        for bits in [16u64, 32, 64] {
            let sp = generate_safe_prime(bits as usize, &Config::default(), &mut OsRng).unwrap();
            verify_safe_prime(&sp, bits);
        }
    }

    #[test]
    fn test_generated_primes_distinct() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..5 {
            let sp = generate_safe_prime(256, &Config::default(), &mut OsRng).unwrap();
            assert!(seen.insert(sp.p.to_string()), "duplicate safe prime");
            verify_safe_prime(&sp, 256);
        }
    }

    #[test]
    fn test_config_variants() {
        let wider = Config {
            window_delta_max: 2048,
            ..Config::default()
        };
        verify_safe_prime(&generate_safe_prime(256, &wider, &mut OsRng).unwrap(), 256);

        let fermat_q = Config {
            use_fermat_q: true,
            ..Config::default()
        };
        verify_safe_prime(&generate_safe_prime(256, &fermat_q, &mut OsRng).unwrap(), 256);

        let no_sophie = Config {
            filter_for_sophie: false,
            ..Config::default()
        };
        verify_safe_prime(&generate_safe_prime(256, &no_sophie, &mut OsRng).unwrap(), 256);

        let more_rounds = Config {
            miller_rabin_rounds: 64,
            ..Config::default()
        };
        verify_safe_prime(&generate_safe_prime(256, &more_rounds, &mut OsRng).unwrap(), 256);
    }

    #[test]
    fn test_safe_prime_properties() {
        let sp = generate_safe_prime(256, &Config::default(), &mut OsRng).unwrap();
        assert!(sp.p.is_odd());
        assert!(sp.q.is_odd());
        assert!(sp.p > sp.q);
        let half: BigInt = (&sp.p - 1u32) >> 1;
        assert_eq!(half, sp.q);
    }

    #[test]
    fn test_generate_prime() {
        let p = generate_prime(64, &mut OsRng).unwrap();
        assert_eq!(p.bits(), 64);
        assert!(is_prime_rug(&p));

        let p2 = generate_prime(64, &mut OsRng).unwrap();
        assert_ne!(p, p2);

        assert!(generate_prime(1, &mut OsRng).is_err());
    }

    #[test]
    fn test_probably_prime_known_values() {
        for prime in [2u64, 3, 5, 53, 59, 97, 7919] {
            assert!(probably_prime(&BigInt::from(prime), 40), "{prime}");
        }
        // 2^61 - 1 is a Mersenne prime
        assert!(probably_prime(&BigInt::from(2305843009213693951u64), 40));

        for composite in [0u64, 1, 4, 100, 341, 561, 1105] {
            assert!(!probably_prime(&BigInt::from(composite), 40), "{composite}");
        }
        let product = BigInt::from(7919u64) * BigInt::from(7927u64);
        assert!(!probably_prime(&product, 40));
    }

    #[test]
    fn test_fermat_base2() {
        assert!(fermat_base2(&BigInt::from(2)));
        assert!(fermat_base2(&BigInt::from(3)));
        assert!(fermat_base2(&BigInt::from(7)));
        assert!(fermat_base2(&BigInt::from(65537)));

        assert!(!fermat_base2(&BigInt::from(0)));
        assert!(!fermat_base2(&BigInt::from(1)));
        assert!(!fermat_base2(&BigInt::from(4)));
        assert!(!fermat_base2(&BigInt::from(9)));

        // 341 = 11 * 31 is the smallest base-2 Fermat pseudoprime; the test
        // passes it and Miller-Rabin has to catch it.
        assert!(fermat_base2(&BigInt::from(341)));
        assert!(!probably_prime(&BigInt::from(341), 40));
    }
}
