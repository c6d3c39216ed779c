pub mod login;
pub mod plain;
pub mod sasl;
pub mod xoauth2;

pub use sasl::*;
pub use login::*;
pub use plain::*;
pub use xoauth2::*;
