use crate::ping::ProbeOutcome;

/// Running aggregates for one session. Delays are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
    pub sent: u32,
    pub received: u32,
    pub lost: u32,
    min_delay: f64,
    max_delay: f64,
    sum_delay: f64,
}

impl SessionStats {
    pub fn new() -> Self {
        SessionStats {
            sent: 0,
            received: 0,
            lost: 0,
            min_delay: f64::INFINITY,
            max_delay: 0.0,
            sum_delay: 0.0,
        }
    }

    /// Fold one probe's outcome in. Every outcome counts as sent.
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.sent += 1;
        match *outcome {
            ProbeOutcome::Success(rtt) => {
                let delay = rtt * 1000.0;
                self.received += 1;
                self.sum_delay += delay;
                self.min_delay = self.min_delay.min(delay);
                self.max_delay = self.max_delay.max(delay);
            }
            _ => self.lost += 1,
        }
    }

    /// Percentage of probes answered, 0.0 when nothing was sent.
    pub fn success_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.received as f64 / self.sent as f64 * 100.0
        }
    }

    pub fn min_delay(&self) -> Option<f64> {
        self.when_received(self.min_delay)
    }

    pub fn max_delay(&self) -> Option<f64> {
        self.when_received(self.max_delay)
    }

    pub fn avg_delay(&self) -> Option<f64> {
        self.when_received(self.sum_delay / self.received as f64)
    }

    fn when_received(&self, value: f64) -> Option<f64> {
        if self.received == 0 {
            None
        } else {
            Some(value)
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_outcomes() {
        let mut stats = SessionStats::new();
        stats.record(&ProbeOutcome::Success(0.010));
        stats.record(&ProbeOutcome::Success(0.030));
        stats.record(&ProbeOutcome::TimedOut);
        stats.record(&ProbeOutcome::Unreachable);

        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 2);
        assert_eq!(stats.lost, 2);
        assert!((stats.min_delay().unwrap() - 10.0).abs() < 1e-9);
        assert!((stats.max_delay().unwrap() - 30.0).abs() < 1e-9);
        assert!((stats.avg_delay().unwrap() - 20.0).abs() < 1e-9);
        assert!((stats.success_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn nothing_received_has_no_delays() {
        let mut stats = SessionStats::new();
        stats.record(&ProbeOutcome::OtherFailure);

        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.min_delay(), None);
        assert_eq!(stats.max_delay(), None);
        assert_eq!(stats.avg_delay(), None);
    }

    #[test]
    fn empty_session() {
        let stats = SessionStats::default();
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.avg_delay(), None);
    }
}
