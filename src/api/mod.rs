pub mod employee;
pub mod profile_change_request;
