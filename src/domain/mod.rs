mod account;
mod entry;
mod fee;
mod money;
mod notification;
mod payment;
mod transfer;
mod wallet;

pub use account::*;
pub use entry::*;
pub use fee::*;
pub use money::*;
pub use notification::*;
pub use payment::*;
pub use transfer::*;
pub use wallet::*;
