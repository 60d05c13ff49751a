//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `lidsweep` exit codes.
//! Exit codes are part of the shell contract: cron jobs and deploy hooks
//! rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, missing file, bad context)    |
//! | 3    | Config file invalid                                  |
//! | 4    | Contact storage unreachable or unreadable            |
//! | 5    | Sweep finished but some record writes failed         |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// Database could not be opened, or the contact snapshot could not be read.
/// Nothing was written.
pub const EXIT_STORAGE_UNAVAILABLE: u8 = 4;

/// The sweep completed, but at least one update/delete failed.
/// The report lists the failing records; re-running is safe.
pub const EXIT_RECORD_ERRORS: u8 = 5;
