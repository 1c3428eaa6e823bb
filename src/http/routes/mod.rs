pub mod auth;
pub mod pages;
pub mod realtime;
pub mod todos;
