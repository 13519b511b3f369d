//! Size and destination policy
//!
//! Two checks run per job. The pre-flight check uses the size the probe
//! declared and only rejects when that size is known and above the ceiling.
//! The post-flight check uses the real size on disk, after any conversion,
//! and picks the delivery channel. Both limits are inclusive.

use crate::config::LimitsConfig;
use crate::error::{Error, Result};

/// Delivery channel chosen from the on-disk size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryDecision {
    /// Send through the chat directly
    Inline {
        /// Size in bytes
        size: u64,
    },
    /// Upload to offload storage and send a link
    Offload {
        /// Size in bytes
        size: u64,
    },
    /// Too large for any channel
    Rejected {
        /// Size in bytes
        size: u64,
        /// Ceiling that was exceeded
        ceiling: u64,
    },
}

/// Applies [`LimitsConfig`] thresholds
#[derive(Clone, Debug)]
pub struct SizePolicy {
    inline_limit: u64,
    ceiling: u64,
}

impl SizePolicy {
    /// Create a policy from explicit limits
    pub fn new(inline_limit: u64, ceiling: u64) -> Self {
        Self {
            inline_limit,
            ceiling,
        }
    }

    /// Create a policy from configuration
    pub fn from_limits(limits: &LimitsConfig) -> Self {
        Self::new(limits.inline_limit_bytes, limits.max_file_size_bytes)
    }

    /// Per-message delivery limit in bytes
    pub fn inline_limit(&self) -> u64 {
        self.inline_limit
    }

    /// Absolute job ceiling in bytes
    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Pre-flight check on the declared size. Unknown size passes.
    pub fn preflight(&self, declared: Option<u64>) -> Result<()> {
        match declared {
            Some(declared) if declared > self.ceiling => Err(Error::SizeRejectedPreflight {
                declared,
                ceiling: self.ceiling,
            }),
            _ => Ok(()),
        }
    }

    /// Post-flight decision on the actual on-disk size
    pub fn decide(&self, actual: u64) -> DeliveryDecision {
        if actual <= self.inline_limit {
            DeliveryDecision::Inline { size: actual }
        } else if actual <= self.ceiling {
            DeliveryDecision::Offload { size: actual }
        } else {
            DeliveryDecision::Rejected {
                size: actual,
                ceiling: self.ceiling,
            }
        }
    }
}
