//! Operator recommendations derived from stored health state.

use sessionkeeper_types::{AccountHealthView, HealthStatus, Recommendation};

/// Uptime below this, over enough checks, is worth a look.
const LOW_UPTIME_PERCENT: f64 = 90.0;
const LOW_UPTIME_MIN_CHECKS: u64 = 10;

pub(crate) fn recommendations(
    accounts: &[AccountHealthView],
    failure_threshold: u32,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for account in accounts {
        let recommend = |severity, message: String| Recommendation {
            account_id: account.account_id.clone(),
            severity,
            message,
        };

        if account.needs_relink {
            out.push(recommend(
                HealthStatus::Unhealthy,
                "Automatic recovery is not possible. Re-link the device with a fresh QR scan."
                    .to_string(),
            ));
        } else if account.consecutive_failures >= failure_threshold {
            out.push(recommend(
                HealthStatus::Unhealthy,
                format!(
                    "Failed {} consecutive health checks; automatic recovery in progress.",
                    account.consecutive_failures
                ),
            ));
        } else if account.status == HealthStatus::Warning {
            out.push(recommend(
                HealthStatus::Warning,
                "Session exists but is not authenticated. Check for a pending QR scan.".to_string(),
            ));
        }

        if account.total_checks >= LOW_UPTIME_MIN_CHECKS && account.uptime < LOW_UPTIME_PERCENT {
            out.push(recommend(
                HealthStatus::Warning,
                format!(
                    "Uptime {:.1}% over {} checks. The session is unstable.",
                    account.uptime, account.total_checks
                ),
            ));
        }
    }

    out.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.account_id.cmp(&b.account_id)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: &str, status: HealthStatus) -> AccountHealthView {
        AccountHealthView {
            account_id: id.to_string(),
            status,
            consecutive_failures: 0,
            recovery_attempts: 0,
            total_checks: 1,
            successful_checks: 1,
            failed_checks: 0,
            uptime: 100.0,
            response_time_ms: 0,
            last_check: None,
            last_recovery: None,
            needs_relink: false,
            last_error: None,
        }
    }

    #[test]
    fn test_healthy_accounts_need_nothing() {
        assert!(recommendations(&[view("a", HealthStatus::Healthy)], 3).is_empty());
    }

    #[test]
    fn test_relink_ranks_first() {
        let mut relink = view("z", HealthStatus::Unhealthy);
        relink.needs_relink = true;
        let pending = view("a", HealthStatus::Warning);

        let recs = recommendations(&[pending, relink], 3);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].account_id, "z");
        assert_eq!(recs[0].severity, HealthStatus::Unhealthy);
        assert!(recs[0].message.contains("Re-link"));
        assert_eq!(recs[1].severity, HealthStatus::Warning);
    }

    #[test]
    fn test_low_uptime_flagged() {
        let mut flaky = view("a", HealthStatus::Healthy);
        flaky.total_checks = 20;
        flaky.successful_checks = 15;
        flaky.uptime = 75.0;

        let recs = recommendations(&[flaky], 3);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].message.contains("75.0%"));
    }
}
