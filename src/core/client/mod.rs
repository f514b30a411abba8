pub mod retrying;
pub mod signer;
pub mod transport;
