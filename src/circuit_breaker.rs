use crate::errors::AppError;
use failsafe::{backoff, failure_policy, CircuitBreaker, Config, StateMachine};
use std::time::Duration;

/// Circuit breaker type guarding calls to the Brønnøysund registry.
pub type RegistryCircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Creates the circuit breaker for registry operations.
///
/// The registry is a public API with occasional maintenance windows; when it
/// goes down, every analyze request would otherwise stack a full timeout per
/// registry call.
///
/// # Configuration
///
/// - **Failure threshold**: 3 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 5s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, requests pass through.
/// - **OPEN**: Too many failures, requests fail fast.
/// - **HALF_OPEN**: Testing if service recovered.
pub fn create_registry_circuit_breaker() -> RegistryCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(5),  // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(3, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

/// Whether the breaker currently rejects new registry calls.
pub fn is_open(breaker: &RegistryCircuitBreaker) -> bool {
    !breaker.is_call_permitted()
}

/// Feeds an already-completed registry call outcome through the breaker so
/// failures trip it and successes let it recover. Callers check `is_open`
/// before issuing the HTTP request; this records the result afterwards.
pub fn record_outcome<T>(
    breaker: &RegistryCircuitBreaker,
    outcome: Result<T, AppError>,
) -> Result<T, AppError> {
    match breaker.call(|| outcome) {
        Ok(value) => Ok(value),
        Err(failsafe::Error::Inner(err)) => Err(err),
        Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
            "Registry temporarily unavailable (circuit open)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_opens_after_failures() {
        let cb = create_registry_circuit_breaker();

        // Simulate 3 consecutive registry failures
        for _ in 0..3 {
            let result = record_outcome::<()>(
                &cb,
                Err(AppError::ExternalApiError("simulated error".to_string())),
            );
            assert!(result.is_err());
        }

        // Next call should be rejected fast (circuit is open)
        assert!(is_open(&cb));
        let result = record_outcome(&cb, Ok(()));
        match result {
            Err(AppError::ExternalApiError(msg)) => {
                assert!(msg.contains("circuit open"));
            }
            _ => panic!("Expected circuit to be open and reject requests"),
        }
    }

    #[test]
    fn test_circuit_breaker_allows_success() {
        let cb = create_registry_circuit_breaker();

        assert!(!is_open(&cb));
        let result = record_outcome(&cb, Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_breaker_stays_closed_below_threshold() {
        let cb = create_registry_circuit_breaker();

        for _ in 0..2 {
            let _ = record_outcome::<()>(
                &cb,
                Err(AppError::ExternalApiError("simulated error".to_string())),
            );
        }
        assert!(!is_open(&cb));

        // A success resets the consecutive-failure count.
        let _ = record_outcome(&cb, Ok(()));
        assert!(!is_open(&cb));
    }
}
