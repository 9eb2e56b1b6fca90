pub mod checks;
pub mod clean;
pub mod compile;
pub mod errors;
pub mod history;
pub mod hooks;
pub mod logging;
pub mod manifest;
pub mod task;
pub mod ui;
pub mod workspace;
