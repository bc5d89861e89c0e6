pub mod config_port;
pub mod report_port;
pub mod tick_port;
