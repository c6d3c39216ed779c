pub mod authenticator;
pub mod codec;
pub mod config;
pub mod conn;
pub mod credentials;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod negotiator;
pub mod quirk;
pub mod response;
pub mod sasl;

pub use authenticator::{mechanisms_from_capabilities, SaslAuthenticator};
pub use config::SaslConfig;
pub use conn::{Conn, Transport};
pub use dispatch::{FinalStatus, NegotiationResult};
pub use error::SaslError;
