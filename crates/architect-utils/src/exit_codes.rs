//! Exit code constants for the architect CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `UNKNOWN_ARTIFACT` | Artifact type has no candidates |
//! | 4 | `GENERATION_EXHAUSTED` | No candidate produced usable output |
//! | 5 | `VERSIONING_CONFLICT` | Version commit kept racing |
//! | 130 | `CANCELLED` | Request cancelled (Ctrl-C) |

use crate::error::ArchitectError;
use crate::types::ErrorKind;

/// Type-safe process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const INTERNAL: ExitCode = ExitCode(1);
    pub const CLI_ARGS: ExitCode = ExitCode(2);
    pub const UNKNOWN_ARTIFACT: ExitCode = ExitCode(3);
    pub const GENERATION_EXHAUSTED: ExitCode = ExitCode(4);
    pub const VERSIONING_CONFLICT: ExitCode = ExitCode(5);
    pub const CANCELLED: ExitCode = ExitCode(130);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Exit code for an error kind.
    #[must_use]
    pub const fn for_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Configuration => Self::CLI_ARGS,
            ErrorKind::UnknownArtifactType => Self::UNKNOWN_ARTIFACT,
            ErrorKind::GenerationExhausted
            | ErrorKind::BackendUnreachable
            | ErrorKind::EmptyOutput
            | ErrorKind::Timeout => Self::GENERATION_EXHAUSTED,
            ErrorKind::VersioningConflict => Self::VERSIONING_CONFLICT,
            ErrorKind::Cancelled => Self::CANCELLED,
            ErrorKind::Internal => Self::INTERNAL,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl ArchitectError {
    /// Map this error to the documented exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::for_kind(self.kind())
    }
}
