pub mod feed;
pub mod repository;
pub mod todo;
pub mod user;
