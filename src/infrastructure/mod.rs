pub mod backend;
pub mod db;
pub mod feed;
pub mod sqlite_auth;
pub mod sqlite_repo;
pub mod stub;

pub use backend::Backend;
