//! Integration tests for delve-core infrastructure

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use delve_core::{
    call_with_retry, config_error, init_logging, invalid_argument, retry_async, with_timeout,
    DelveError, ErrorContext, LogFormat, LoggingConfig, RetryConfig,
};

fn fast_retry(max_attempts: usize) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay_ms: 5,
        max_delay_ms: 20,
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

#[tokio::test]
async fn test_error_handling() {
    let error = invalid_argument!("Question must not be empty", "question", "test_component");

    match &error {
        DelveError::InvalidArgument {
            message,
            field,
            context,
        } => {
            assert_eq!(message, "Question must not be empty");
            assert_eq!(field.as_deref(), Some("question"));
            assert_eq!(context.component, "test_component");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected InvalidArgument error"),
    }

    // Should not panic
    error.log();
    assert!(error.is_structural());

    let network_error = DelveError::Network {
        message: "Connection failed".to_string(),
        source: None,
        context: ErrorContext::new("test"),
    };
    assert!(network_error.is_recoverable());
    assert!(!network_error.is_structural());
    assert!(network_error.retry_delay_ms().is_none());

    let rate_limited = DelveError::RateLimit {
        message: "HTTP 429".to_string(),
        retry_after_ms: Some(3000),
        context: ErrorContext::new("test"),
    };
    assert!(rate_limited.is_recoverable());
    assert_eq!(rate_limited.retry_delay_ms(), Some(3000));

    let config_error = config_error!("Missing API key", "test");
    assert!(!config_error.is_recoverable());
    assert!(config_error.is_structural());
    assert!(config_error.retry_delay_ms().is_none());
}

#[tokio::test]
async fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Compact,
        filter_directives: vec!["delve_core=debug".to_string()],
        ..LoggingConfig::default()
    };

    // A subscriber can only be installed once per process, so a second call must
    // fail cleanly instead of panicking.
    let _ = init_logging(&config);
    assert!(init_logging(&config).is_err());
}

#[tokio::test]
async fn test_retry_mechanism() {
    let attempt_count = Arc::new(AtomicUsize::new(0));

    let result = retry_async(
        || {
            let attempt_count = Arc::clone(&attempt_count);
            async move {
                let count = attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count < 3 {
                    Err(DelveError::Network {
                        message: "Temporary failure".to_string(),
                        source: None,
                        context: ErrorContext::new("test"),
                    })
                } else {
                    Ok("Success")
                }
            }
        },
        &fast_retry(5),
        "test_operation",
    )
    .await;

    assert_eq!(result.unwrap(), "Success");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_stops_on_structural_error() {
    let attempt_count = Arc::new(AtomicUsize::new(0));

    let result: Result<(), DelveError> = retry_async(
        || {
            let attempt_count = Arc::clone(&attempt_count);
            async move {
                attempt_count.fetch_add(1, Ordering::SeqCst);
                Err(config_error!("no key", "test"))
            }
        },
        &fast_retry(5),
        "test_operation",
    )
    .await;

    assert!(result.is_err());
    assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_after_is_capped_by_max_delay() {
    let attempt_count = Arc::new(AtomicUsize::new(0));

    let retry_config = RetryConfig {
        jitter: true,
        ..fast_retry(2)
    };
    let run = retry_async(
        || {
            let attempt_count = Arc::clone(&attempt_count);
            async move {
                let count = attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count == 1 {
                    Err(DelveError::RateLimit {
                        message: "HTTP 429".to_string(),
                        retry_after_ms: Some(3_600_000),
                        context: ErrorContext::new("test"),
                    })
                } else {
                    Ok(count)
                }
            }
        },
        &retry_config,
        "rate_limited_call",
    );

    // An hour-long Retry-After must not hold the call beyond max_delay_ms
    let result = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("retry slept past max_delay_ms");
    assert_eq!(result.unwrap(), 2);
    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_timeout_mechanism() {
    let quick_operation = async {
        sleep(Duration::from_millis(10)).await;
        "Success"
    };

    let result = with_timeout(quick_operation, 500, "quick_test").await;
    assert_eq!(result.unwrap(), "Success");

    let slow_operation = async {
        sleep(Duration::from_millis(200)).await;
        "Should not reach here"
    };

    let result = with_timeout(slow_operation, 20, "slow_test").await;
    match result {
        Err(DelveError::Timeout {
            operation,
            duration_ms,
            ..
        }) => {
            assert_eq!(operation, "slow_test");
            assert_eq!(duration_ms, 20);
        }
        other => panic!("Expected timeout error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_timeouts_are_retried() {
    let attempt_count = Arc::new(AtomicUsize::new(0));

    let result = call_with_retry(
        || {
            let attempt_count = Arc::clone(&attempt_count);
            async move {
                let count = attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count == 1 {
                    sleep(Duration::from_millis(200)).await;
                }
                Ok::<_, DelveError>(count)
            }
        },
        30,
        &fast_retry(3),
        "flaky_call",
    )
    .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
}
