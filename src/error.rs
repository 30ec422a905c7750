use thiserror::Error;

/// Failure reported by an editor host when it cannot apply an edit
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("no active buffer")]
    NoActiveBuffer,
    #[error("buffer is read-only")]
    ReadOnly,
    #[error("range {start}..{end} is outside a buffer of {len} characters")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    #[error("edit rejected: {0}")]
    Rejected(String),
}

/// Which half of a clear-then-insert sequence failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EditStep {
    Clear,
    Insert,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PracticeError {
    #[error("the active buffer has no text to practice on")]
    EmptyTarget,
    #[error("no editable buffer is active")]
    NoActiveSurface,
    #[error("a practice session is already running")]
    AlreadyActive,
    #[error("could not prepare the buffer ({step} failed): {source}")]
    BufferMutation {
        step: EditStep,
        #[source]
        source: HostError,
    },
    #[error("could not restore the original text ({step} failed): {source}")]
    RestoreFailed {
        step: EditStep,
        #[source]
        source: HostError,
    },
}

pub type Result<T, E = PracticeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failed_step() {
        let err = PracticeError::RestoreFailed {
            step: EditStep::Insert,
            source: HostError::ReadOnly,
        };
        assert_eq!(
            err.to_string(),
            "could not restore the original text (insert failed): buffer is read-only"
        );
    }

    #[test]
    fn source_is_exposed() {
        use std::error::Error as _;

        let err = PracticeError::BufferMutation {
            step: EditStep::Clear,
            source: HostError::RangeOutOfBounds {
                start: 0,
                end: 9,
                len: 3,
            },
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("range 0..9 is outside a buffer of 3 characters")
        );
    }
}
