//! Sample validation for style analysis.
//!
//! A sample qualifies when its trimmed text is longer than `MIN_SAMPLE_CHARS`
//! characters. Submissions need at least `MIN_QUALIFYING_SAMPLES` qualifying
//! samples and may contain at most `MAX_SAMPLES` entries.

use crate::errors::AppError;

pub const MIN_QUALIFYING_SAMPLES: usize = 3;
pub const MAX_SAMPLES: usize = 10;
pub const MIN_SAMPLE_CHARS: usize = 50;

/// Returns the trimmed samples that are long enough to analyze, in input order.
pub fn qualifying_samples(samples: &[String]) -> Vec<String> {
    samples
        .iter()
        .map(|s| s.trim())
        .filter(|s| s.chars().count() > MIN_SAMPLE_CHARS)
        .map(str::to_string)
        .collect()
}

/// Validates a submission and returns only the qualifying samples.
pub fn validate_samples(samples: &[String]) -> Result<Vec<String>, AppError> {
    if samples.len() > MAX_SAMPLES {
        return Err(AppError::Validation(format!(
            "At most {MAX_SAMPLES} sample posts can be analyzed, got {}",
            samples.len()
        )));
    }

    let qualifying = qualifying_samples(samples);
    if qualifying.len() < MIN_QUALIFYING_SAMPLES {
        return Err(AppError::Validation(format!(
            "Please provide at least {MIN_QUALIFYING_SAMPLES} posts longer than \
            {MIN_SAMPLE_CHARS} characters ({} qualified)",
            qualifying.len()
        )));
    }

    Ok(qualifying)
}
