pub mod attendance;
pub mod ids;
pub mod role;
pub mod session;
pub mod student;
