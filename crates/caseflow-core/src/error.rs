use thiserror::Error;

/// Errors raised by the booking domain.
///
/// Every variant is fatal: the model is deterministic and never retries.
/// Anything that is normal control flow (a patient referred out, a sampled
/// zero follow-ups) is represented in the event log instead.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input tables or configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A booker scanned the whole forward horizon without finding a free
    /// slot. The 1.5x horizon is sized to make this unreachable under
    /// reasonable demand, so hitting it is an invariant violation.
    #[error("capacity exhausted: no free slot from day {day} for clinic {clinic} ({booker} booker)")]
    CapacityExhausted {
        day: usize,
        clinic: usize,
        booker: &'static str,
    },

    /// A raw priority value outside {1, 2} reached a branch. Indicates an
    /// internal bug rather than bad input.
    #[error("unknown priority value: {0} (must be 1 or 2)")]
    UnknownPriority(u8),

    /// A sampling stream was constructed with parameters outside its
    /// domain.
    #[error("invalid distribution parameters: {0}")]
    DistributionDomain(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
