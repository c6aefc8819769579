//! Connection-pool controller and duplex byte-bridge for the slaver half of a reverse TCP
//! tunnel. See the crate's design document for the protocol this module speaks with the
//! master peer; this library has no opinion on how it is wired up (that is the `slaver`
//! binary's job).

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod framed;
pub mod pool;
pub mod session;
pub mod state;

pub use config::Config;
pub use pool::PoolController;
