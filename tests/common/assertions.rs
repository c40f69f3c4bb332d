//! Assertion macros for sync results and cache state

/// Unwrap an `Ok`, failing the test with the error's debug output.
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        $crate::assert_ok!($result, "operation failed")
    };
    ($result:expr, $context:expr) => {
        match $result {
            Ok(value) => value,
            Err(error) => panic!("{}: {:?}", $context, error),
        }
    };
}

/// Expect an `Err`; with a pattern, the error must also match it.
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        if let Ok(value) = $result {
            panic!("operation succeeded unexpectedly: {:?}", value);
        }
    };
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Err(error) => panic!("wrong error: {:?} does not match {}", error, stringify!($pattern)),
            Ok(value) => panic!("operation succeeded unexpectedly: {:?}", value),
        }
    };
}

/// Substring check with both strings in the failure message.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {{
        let haystack = $haystack;
        assert!(haystack.contains($needle), "{:?} does not contain {:?}", haystack, $needle);
    }};
}

/// Cached status of one cell (`None` = unmarked).
#[macro_export]
macro_rules! assert_cell {
    ($engine:expr, $student:expr, $date:expr, $expected:expr) => {{
        let key = rollcall::shared::CellKey::parse($student, $date).expect("valid cell key");
        let actual = $engine.lookup(&key).await.map(|record| record.status);
        assert_eq!(actual, $expected, "unexpected status for {}", key);
    }};
}
