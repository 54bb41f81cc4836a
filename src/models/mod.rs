pub mod balance;
pub mod order;
pub mod token;

pub use balance::BalanceSnapshot;
pub use order::{Order, OrderId, OrderRequest, OrderStatus};
pub use token::{TokenInfo, NATIVE_DECIMALS, NATIVE_SYMBOL};
