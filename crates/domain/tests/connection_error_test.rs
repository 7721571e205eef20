use ferrous_orb_domain::ConnectionError;
use std::error::Error;
use std::io;

#[test]
fn test_creation_failure_keeps_io_kind() {
    let err = ConnectionError::creation_failed(
        &"tcp://10.0.0.1:2809",
        io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
    );

    assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    assert!(err.to_string().contains("10.0.0.1:2809"));
    assert!(err.source().is_some());
}

#[test]
fn test_into_io_error_returns_original() {
    let err = ConnectionError::creation_failed(
        &42u32,
        io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
    );

    let io_err = err.into_io_error();
    assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);
    assert_eq!(io_err.to_string(), "connect timed out");
}
