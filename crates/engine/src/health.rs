use api_client::ApiClient;
use chrono::{DateTime, Utc};

/// The outcome of the most recent provider health check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthState {
    pub provider_ok: bool,
    pub last_error: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl HealthState {
    fn healthy(now: DateTime<Utc>) -> Self {
        Self { provider_ok: true, last_error: None, checked_at: Some(now) }
    }

    fn unhealthy(now: DateTime<Utc>, error: String) -> Self {
        Self { provider_ok: false, last_error: Some(error), checked_at: Some(now) }
    }
}

/// Pings the exchange and compares its clock with ours.
///
/// Signed requests are rejected once the local clock drifts too far from the
/// server's, so a skew above `max_clock_skew_ms` counts as a failure.
pub async fn check_provider(api_client: &dyn ApiClient, max_clock_skew_ms: i64) -> HealthState {
    if let Err(e) = api_client.ping().await {
        return HealthState::unhealthy(Utc::now(), format!("ping failed: {}", e));
    }

    let server_time = match api_client.server_time().await {
        Ok(time) => time,
        Err(e) => {
            let reason = format!("server time unavailable: {}", e);
            return HealthState::unhealthy(Utc::now(), reason);
        }
    };

    let now = Utc::now();
    let skew_ms = (now - server_time).num_milliseconds().abs();
    if skew_ms > max_clock_skew_ms {
        return HealthState::unhealthy(
            now,
            format!("clock skew of {} ms exceeds the {} ms limit", skew_ms, max_clock_skew_ms),
        );
    }

    tracing::debug!(skew_ms, "Provider health check passed");
    HealthState::healthy(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;
    use api_client::error::ApiError;
    use chrono::Duration;

    #[tokio::test]
    async fn reachable_provider_with_synced_clock_is_healthy() {
        let mut api = MockApi::new();
        api.expect_ping().times(1).returning(|| Ok(()));
        api.expect_server_time().times(1).returning(|| Ok(Utc::now()));

        let state = check_provider(&api, 1000).await;

        assert!(state.provider_ok);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn failed_ping_skips_the_clock_check() {
        let mut api = MockApi::new();
        api.expect_ping()
            .returning(|| Err(ApiError::InvalidData("connection refused".to_string())));
        api.expect_server_time().never();

        let state = check_provider(&api, 1000).await;

        assert!(!state.provider_ok);
        assert!(state.last_error.unwrap().contains("ping failed"));
    }

    #[tokio::test]
    async fn excessive_clock_skew_is_unhealthy() {
        let mut api = MockApi::new();
        api.expect_ping().returning(|| Ok(()));
        api.expect_server_time().returning(|| Ok(Utc::now() - Duration::seconds(5)));

        let state = check_provider(&api, 1000).await;

        assert!(!state.provider_ok);
        assert!(state.last_error.unwrap().contains("clock skew"));
    }
}
