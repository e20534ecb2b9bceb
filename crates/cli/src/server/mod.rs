pub mod web;

pub use web::{start_status_server, StatusState};
