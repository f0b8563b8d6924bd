//! Process exit codes of `rita`
//!
//! Codes 2-6 tell CI jobs which stage failed; 64 is `EX_USAGE` from sysexits.h.

pub const SUCCESS: i32 = 0;

/// Any failure without a more specific code, including failed deployment tests
pub const ERROR: i32 = 1;

/// Values rejected by a schema, schema file out of date, unknown chart model
pub const VALIDATION_ERROR: i32 = 2;

/// An application could not be rendered or dry-run tested
pub const RENDER_ERROR: i32 = 3;

/// Invalid `.rita.yaml`, unknown environment or application
pub const CONFIG_ERROR: i32 = 4;

/// Filesystem failure
pub const IO_ERROR: i32 = 5;

/// An external binary is missing or exited unsuccessfully
pub const TOOL_ERROR: i32 = 6;

/// Invalid combination of arguments
pub const USAGE_ERROR: i32 = 64;
