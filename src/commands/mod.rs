pub mod doctor;
pub mod start;
pub mod status;
pub mod stop;
pub mod tickle;
