pub mod notification;
pub mod question;
pub mod quiz_session;
pub mod user;
