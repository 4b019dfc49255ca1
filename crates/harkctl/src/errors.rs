//! Exit codes for harkctl failure modes

use hark_common::{AuditError, CatalogueError, ClassifierError};

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the catalogue is missing or invalid
pub const EXIT_BAD_CATALOGUE: i32 = 64;

/// Exit code when the classifier backend is unreachable
pub const EXIT_CLASSIFIER_UNAVAILABLE: i32 = 69;

/// Exit code when the audit store cannot be written
pub const EXIT_AUDIT_WRITE_FAILED: i32 = 74;

/// Map an error chain to its exit code.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if cause.downcast_ref::<CatalogueError>().is_some() {
            return EXIT_BAD_CATALOGUE;
        }
        if cause.downcast_ref::<ClassifierError>().is_some() {
            return EXIT_CLASSIFIER_UNAVAILABLE;
        }
        if cause.downcast_ref::<AuditError>().is_some() {
            return EXIT_AUDIT_WRITE_FAILED;
        }
    }
    EXIT_GENERAL_ERROR
}
