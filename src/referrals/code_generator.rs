use std::future::Future;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::referrals::ReferralError;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const MIN_CODE_LENGTH: usize = 6;
pub const MAX_CODE_LENGTH: usize = 12;
pub const RANDOM_CODE_LENGTH: usize = 8;
pub const MAX_CODE_ATTEMPTS: u32 = 100;

/// Characters of the base kept on a retry, leaving room for a random suffix
const RETRY_PREFIX_LENGTH: usize = 9;
const RETRY_SUFFIX_LENGTH: usize = 3;

/// Uppercase the base and drop everything that is not ASCII alphanumeric
pub fn normalize_code(base: &str) -> String {
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Produces referral code candidates from an optional human-chosen base
pub struct CodeGenerator<R: Rng = StdRng> {
    rng: R,
}

impl CodeGenerator<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for CodeGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> CodeGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    fn random_chars(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| CODE_CHARSET[self.rng.gen_range(0..CODE_CHARSET.len())] as char)
            .collect()
    }

    fn pad(&mut self, mut code: String) -> String {
        if code.len() < MIN_CODE_LENGTH {
            let missing = MIN_CODE_LENGTH - code.len();
            code.push_str(&self.random_chars(missing));
        }
        code
    }

    /// Candidate code for the given attempt number, starting at 0
    pub fn candidate(&mut self, base: Option<&str>, attempt: u32) -> String {
        let normalized = base.map(normalize_code).unwrap_or_default();
        if normalized.is_empty() {
            return self.random_chars(RANDOM_CODE_LENGTH);
        }

        if attempt == 0 {
            let truncated: String = normalized.chars().take(MAX_CODE_LENGTH).collect();
            self.pad(truncated)
        } else {
            let mut code: String = normalized.chars().take(RETRY_PREFIX_LENGTH).collect();
            code.push_str(&self.random_chars(RETRY_SUFFIX_LENGTH));
            self.pad(code)
        }
    }

    /// Generates candidates until `is_taken` reports a free one
    ///
    /// Gives up with `CodeGeneration` after `MAX_CODE_ATTEMPTS` collisions.
    pub async fn generate_unique<F, Fut>(
        &mut self,
        base: Option<&str>,
        mut is_taken: F,
    ) -> Result<String, ReferralError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, ReferralError>>,
    {
        for attempt in 0..MAX_CODE_ATTEMPTS {
            let code = self.candidate(base, attempt);
            if !is_taken(code.clone()).await? {
                return Ok(code);
            }
            tracing::debug!("Referral code {} taken, attempt {}", code, attempt + 1);
        }

        Err(ReferralError::CodeGeneration)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Every candidate is 6 to 12 uppercase alphanumerics
    #[test]
    fn prop_candidates_are_well_formed() {
        proptest!(|(base in proptest::option::of(".{0,40}"), attempt in 0u32..5, seed in any::<u64>())| {
            let mut generator = CodeGenerator::with_rng(StdRng::seed_from_u64(seed));
            let code = generator.candidate(base.as_deref(), attempt);
            prop_assert!(code.len() >= MIN_CODE_LENGTH && code.len() <= MAX_CODE_LENGTH);
            prop_assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        });
    }
}
