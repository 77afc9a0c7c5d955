pub mod course;
pub mod event;
pub mod scheduler;
pub mod session;
