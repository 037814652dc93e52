pub mod api;
pub mod decoders;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use api::MailApi;
pub use transport::{HttpTransport, ReqwestTransport};
