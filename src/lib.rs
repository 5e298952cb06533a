#![warn(clippy::all)]
#![allow(clippy::pedantic)]

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub mod erc20;
mod error;
pub mod fee;
pub mod ledger;
pub mod pool;
pub mod registry;
mod router;
pub mod types;
mod v2;
mod v3;


pub use error::RouterError;
pub use ledger::{Ledger, SendTxOption};
pub use registry::{ContractRegistry, ContractSet, StaticRegistry};
pub use router::DexRouter;
pub use types::{ProtocolVersion, Token};
