//! Process exit codes shared by all subcommands.

/// Command completed successfully.
pub const SUCCESS: i32 = 0;

/// Bad arguments, missing file, or a recording that cannot be parsed.
pub const INPUT_ERROR: i32 = 1;

/// The analysis itself failed, or results could not be written.
pub const EXECUTION_ERROR: i32 = 2;

/// A batch run where some files succeeded and some failed.
pub const PARTIAL_FAILURE: i32 = 3;
