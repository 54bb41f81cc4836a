pub mod bindings;
pub mod exchange;
pub mod token;

pub use exchange::Exchange;
pub use token::TokenContract;
