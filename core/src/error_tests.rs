#[cfg(test)]
mod tests {
    use crate::error::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_core_error_display() {
        let err = CoreError::PreconditionError("pool not started".to_string());
        assert_eq!(err.to_string(), "Precondition error: pool not started");

        let err = CoreError::ProcessSpawn("no such file".to_string());
        assert_eq!(err.to_string(), "Process spawn error: no such file");

        let err = CoreError::ProcessSignal("EINVAL".to_string());
        assert_eq!(err.to_string(), "Process signal error: EINVAL");

        let err = CoreError::InitializationError("init failed".to_string());
        assert_eq!(err.to_string(), "Initialization error: init failed");
    }

    #[test]
    fn test_core_error_from_std_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();

        if let CoreError::IoError(ref inner) = core_err {
            assert_eq!(inner.kind(), io::ErrorKind::NotFound);
        } else {
            panic!("Expected CoreError::IoError variant");
        }
        assert!(core_err.source().is_some());
    }

    #[test]
    fn test_result_type_alias() {
        #[allow(clippy::unnecessary_wraps)]
        fn returns_result() -> Result<usize> {
            Ok(4)
        }

        fn returns_error() -> Result<usize> {
            Err(CoreError::ConfigurationError("test".to_string()))
        }

        assert!(returns_result().is_ok());
        assert!(returns_error().is_err());
    }
}
