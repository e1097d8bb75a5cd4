pub mod admin_routes;
pub mod health;
pub mod student_routes;
pub mod super_admin_routes;
pub mod views;
