pub mod actions;
pub mod auth;
pub mod guard;
pub mod live_list;
pub mod scoped;
pub mod view;
