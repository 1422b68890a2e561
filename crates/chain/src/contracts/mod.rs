//! Contract helpers: a typed ERC-20 binding for token-mode payouts, and a
//! dynamic ABI binding for the refill vault (whose function names and
//! arguments are configuration, not compile-time knowledge).

pub mod erc20;
pub mod vault;

pub use erc20::Erc20Token;
pub use vault::VaultContract;
