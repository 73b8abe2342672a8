#[macro_use]
extern crate serde;

mod audit;
mod ballot;
mod error;
mod hash;
mod keys;
mod ledger;
mod registration;
pub(crate) mod serde_b64;
mod system;
mod tally;
mod voting;

pub use audit::*;
pub use ballot::*;
pub use error::*;
pub use hash::*;
pub use keys::*;
pub use ledger::*;
pub use registration::*;
pub use system::*;
pub use tally::*;
pub use voting::*;
