pub mod attendance;
pub mod auth;
pub mod camera;
pub mod classes;
pub mod dashboard;
pub mod email;
pub mod export;
pub mod frames;
pub mod logs;
pub mod reports;
pub mod students;
pub mod terminal;
pub mod ws;
