pub mod agent;
pub mod doctor;
pub mod onboard;
pub mod status;
