pub mod absence;
pub mod matcher;
pub mod metrics;
pub mod presence;
pub mod sweeper;
pub mod timeparse;
