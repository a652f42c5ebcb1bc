pub mod attendance;
pub mod employee;
pub mod organization;
pub mod presence;
pub mod role;
pub mod shift;
