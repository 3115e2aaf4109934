/// Constants used throughout the grace codebase
// Exit codes used when a halt terminates the process directly
pub const DEFAULT_SUCCESS_EXIT_CODE: i32 = 0;
pub const DEFAULT_FAILURE_EXIT_CODE: i32 = 1;

// Environment variable names
pub const GRACE_LOG_VAR: &str = "GRACE_LOG";
pub const GRACE_SIGNALS_VAR: &str = "GRACE_SIGNALS";
pub const GRACE_LISTEN_FOR_SIGNALS_VAR: &str = "GRACE_LISTEN_FOR_SIGNALS";
pub const GRACE_FAILURE_EXIT_CODE_VAR: &str = "GRACE_FAILURE_EXIT_CODE";

// Default log filter when neither RUST_LOG nor GRACE_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info";

// Lifecycle messages
pub const MSG_TERMINATED_GRACEFULLY: &str = "Program was terminated gracefully.";
pub const MSG_TERMINATED_WITH_ERROR: &str = "Program was terminated with error";
pub const MSG_WAITING: &str = "Waiting...";
