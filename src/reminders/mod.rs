pub mod dispatcher;
pub mod email;
pub mod endpoints;
pub mod scheduler;
pub mod telegram;
pub mod traits;
pub mod whatsapp;
