pub mod date_window;
pub mod job;
pub mod location;
pub mod observation;
