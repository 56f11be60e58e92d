pub mod backend;
pub mod http;
pub mod noop;

pub use backend::{Mailer, OutboundMail};
pub use http::HttpMailer;
pub use noop::NoopMailer;
