//! Wallet balances and the transaction ledger.
//!
//! Registration deducts a round's ticket price from the user's wallet; an
//! accepted win claim credits nothing directly but records a pending `win`
//! transaction for administrator payout review. Deposits (and their
//! payment-proof review) happen outside the core and only land here as
//! ledger rows.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use manager::WalletManager;
pub use models::{NewTransaction, TxStatus, TxType, Wallet};
