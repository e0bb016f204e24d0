//! Alert sink for conditions that need a human (consistency violations,
//! persistent discrepancies, RPC outages), grounded in spec.md §4.6/§4.7's
//! "emit an alert" language. The out-of-scope Telegram notifier is one
//! possible external implementor; the engine only ever depends on this trait.

use slog::{error, Logger};

pub trait AlertSink: Send + Sync {
    fn alert(&self, message: &str);
}

/// Default sink: log at error level. Matches the teacher's habit of treating
/// `log::error!` as the baseline notification channel when no richer sink is
/// wired up.
pub struct LogAlertSink {
    logger: Logger,
}

impl LogAlertSink {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl AlertSink for LogAlertSink {
    fn alert(&self, message: &str) {
        error!(self.logger, "{}", message);
    }
}
