pub mod auth;
pub mod client;
pub mod openai;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod traits;
pub mod util;

pub use client::ChatClient;
pub use openai::ReqwestTransport;
pub use traits::{HttpReply, HttpRequest, HttpTransport, Sleeper, TokioSleeper};
