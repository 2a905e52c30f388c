pub mod fetch;
pub mod latest;
pub mod setup;
pub mod ui;
