//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                          |
//! |-----------|-------------------------------------------|
//! | `run`     | `Install`, `Update`, `Checks`, `Tests`, `Run` |
//! | `clean`   | `Clean`                                   |
//! | `compile` | `Compile`                                 |
//! | `project` | `Init`, `List`, `Status`, `Config`        |

pub mod clean;
pub mod compile;
pub mod project;
pub mod run;

pub use clean::cmd_clean;
pub use compile::cmd_compile;
pub use project::{cmd_config, cmd_init, cmd_list, cmd_status};
pub use run::{cmd_checks, cmd_install, cmd_run, cmd_tests, cmd_update};
