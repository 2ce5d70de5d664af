//! Bloom filter over every short code known at startup.
//!
//! The filter answers "definitely absent" or "might exist" for a short code
//! without a network round-trip. It is built once from the mapping store and
//! never mutated afterwards, so it can be shared behind an `Arc` without a
//! lock.
//!
//! Codes created after the build are not in the filter. To keep redirects for
//! those codes working, the filter also records a *watermark*: the largest
//! sequence number decoded from any code at build time.
//!
//! Codes are not inserted in sequence order: a shorten call can draw a value
//! and store it after a later value was stored, possibly after the build. A
//! negative answer is therefore only trusted for codes at least
//! `in_flight_margin` below the watermark; see
//! [`ExistenceFilter::is_definitely_absent`].

use bloomfilter::Bloom;
use portal_core::{CacheError, ReadRepository, ShortCode};
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use crate::Result;

/// Extra capacity reserved on top of the codes present at build time.
const HEADROOM: usize = 1024;

/// Sequence values below the watermark that may still be pending insertion.
pub const DEFAULT_IN_FLIGHT_MARGIN: u64 = 1024;

/// Sizing of the Bloom filter.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ExistenceFilterConfig {
    /// Expected number of codes. Defaults to the number of codes present at
    /// build time plus headroom.
    #[builder(default, setter(strip_option))]
    pub expected_items: Option<usize>,

    /// Desired false positive rate, between 0.0 and 1.0.
    #[builder(default = 0.001)]
    pub false_positive_rate: f64,

    /// How many sequence values below the watermark are treated as possibly
    /// still in flight. Negative answers for them fall through to the store.
    #[builder(default = DEFAULT_IN_FLIGHT_MARGIN)]
    pub in_flight_margin: u64,
}

impl Default for ExistenceFilterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

pub struct ExistenceFilter {
    bloom: Bloom<ShortCode>,
    watermark: u64,
    trusted_up_to: u64,
    len: usize,
}

impl std::fmt::Debug for ExistenceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistenceFilter")
            .field("len", &self.len)
            .field("watermark", &self.watermark)
            .field("trusted_up_to", &self.trusted_up_to)
            .finish_non_exhaustive()
    }
}

impl ExistenceFilter {
    /// Builds the filter from every short code in the mapping store.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Initialization` if the store cannot be listed or
    /// the filter cannot be sized.
    pub async fn load<R>(repo: &R, config: ExistenceFilterConfig) -> Result<Self>
    where
        R: ReadRepository + ?Sized,
    {
        let codes = repo.list_short_codes().await.map_err(|e| {
            CacheError::Initialization(format!("failed to list short codes: {e}"))
        })?;

        let filter = Self::from_codes(&codes, config)?;
        info!(
            codes = filter.len,
            watermark = filter.watermark,
            "Existence filter built"
        );
        Ok(filter)
    }

    /// Builds the filter from an in-memory set of codes.
    pub fn from_codes(codes: &[ShortCode], config: ExistenceFilterConfig) -> Result<Self> {
        let rate = config.false_positive_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(CacheError::Initialization(format!(
                "false positive rate must be in (0, 1), got {rate}"
            )));
        }

        let expected_items = config
            .expected_items
            .unwrap_or(codes.len() + HEADROOM)
            .max(1);
        let mut bloom = Bloom::new_for_fp_rate(expected_items, rate)
            .map_err(|e| CacheError::Initialization(e.to_string()))?;

        let mut watermark = 0;
        for code in codes {
            bloom.set(code);
            match code.sequence() {
                Ok(sequence) => watermark = watermark.max(sequence),
                Err(e) => warn!(code = %code, error = %e, "Stored short code does not decode"),
            }
        }

        Ok(Self {
            bloom,
            watermark,
            trusted_up_to: watermark.saturating_sub(config.in_flight_margin),
            len: codes.len(),
        })
    }

    /// Returns `false` only if `code` was not present when the filter was built.
    pub fn might_exist(&self, code: &ShortCode) -> bool {
        self.bloom.check(code)
    }

    /// Returns `true` only when `code` is guaranteed not to exist: the filter
    /// has never seen it and its sequence is far enough below the watermark
    /// that it cannot be stored later.
    pub fn is_definitely_absent(&self, code: &ShortCode) -> bool {
        if self.might_exist(code) {
            return false;
        }
        matches!(code.sequence(), Ok(sequence) if sequence <= self.trusted_up_to)
    }

    /// Largest sequence number present at build time.
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// Largest sequence for which a negative answer is final.
    pub fn trusted_up_to(&self) -> u64 {
        self.trusted_up_to
    }

    /// Number of codes inserted at build time.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
