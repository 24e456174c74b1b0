pub mod anamnesis;
pub mod app;
pub mod auth;
pub mod clients;
pub mod courses;
pub mod knowledge;
pub mod photos;
