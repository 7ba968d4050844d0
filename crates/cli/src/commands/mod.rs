pub mod ask;
pub mod chat;
pub mod doctor;
pub mod onboard;
pub mod remember;
pub mod serve;
pub mod status;
