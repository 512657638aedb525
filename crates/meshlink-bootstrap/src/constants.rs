//! Bootstrap timing constants.

use std::time::Duration;

/// Fixed delay before a failed bootstrap is restarted.
pub const RETRY_DELAY: Duration = Duration::from_millis(5000);

/// Timer identifier reserved for "restart bootstrap".
pub const TIMER_START_BOOTSTRAP: u8 = 1;
