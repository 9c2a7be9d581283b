pub mod auth;
pub mod track;
