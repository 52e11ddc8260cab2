//! Generator protocol methods.
//!
//! `send` and `throw` are plain resumes with a different `ResumeMode`; the
//! only method with its own completion rules is `close`.

use super::resume::GeneratorStep;
use crate::error::{RuntimeError, VmResult};
use crate::exception::{ExceptionRef, ExceptionTypeId};

/// Creates the exception `close()` throws into a generator.
#[inline]
pub fn generator_exit() -> ExceptionRef {
    ExceptionRef::raise(ExceptionTypeId::GeneratorExit, "")
}

/// Interprets the outcome of throwing `GeneratorExit` into a generator.
///
/// - Returning, or letting `GeneratorExit` or `StopIteration` escape, is a
///   successful close.
/// - Yielding again is a `RuntimeError`.
/// - Any other exception propagates to the caller of `close()`.
pub fn complete_close(result: VmResult<GeneratorStep>) -> VmResult<()> {
    match result {
        Ok(GeneratorStep::Returned(_)) => Ok(()),
        Ok(GeneratorStep::Yielded(_)) => {
            Err(RuntimeError::runtime_error("generator ignored GeneratorExit"))
        }
        Err(err)
            if err.is_instance(ExceptionTypeId::GeneratorExit)
                || err.is_instance(ExceptionTypeId::StopIteration) =>
        {
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::Value;

    #[test]
    fn test_generator_exit_type() {
        let exc = generator_exit();
        assert_eq!(exc.type_id(), ExceptionTypeId::GeneratorExit);
        assert!(!exc.is_instance(ExceptionTypeId::Exception));
    }

    #[test]
    fn test_close_accepts_return_and_exit() {
        assert!(complete_close(Ok(GeneratorStep::Returned(Value::None))).is_ok());
        assert!(complete_close(Err(RuntimeError::raised(generator_exit()))).is_ok());
        assert!(complete_close(Err(RuntimeError::stop_iteration())).is_ok());
    }

    #[test]
    fn test_close_rejects_yield() {
        let err = complete_close(Ok(GeneratorStep::Yielded(Value::int(1)))).unwrap_err();
        assert_eq!(err.exception_type(), Some(ExceptionTypeId::RuntimeError));
        assert_eq!(
            err.exception_ref().unwrap().message(),
            "generator ignored GeneratorExit"
        );
    }

    #[test]
    fn test_close_propagates_other_errors() {
        let err = complete_close(Err(RuntimeError::value_error("bad"))).unwrap_err();
        assert_eq!(err.exception_type(), Some(ExceptionTypeId::ValueError));
    }
}
