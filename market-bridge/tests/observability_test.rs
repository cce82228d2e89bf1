//! Global logger installation.
//!
//! Kept in its own test binary: installing the process-wide subscriber here
//! leaves the unit tests' log output untouched.

use market_bridge::{
    AdapterError,
    observability::{LogFormat, init_observability},
};

#[test]
fn test_logger_installs_once() {
    assert!(init_observability(LogFormat::Pretty).is_ok());

    let error = init_observability(LogFormat::Json).unwrap_err();
    assert!(matches!(error, AdapterError::InvalidConfig(_)));
    assert_eq!(error.code(), "invalid_config");
}
