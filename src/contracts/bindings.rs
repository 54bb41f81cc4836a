//! Solidity interface of the exchange and the token.
//!
//! The exchange emits its events with every field in the data section. The
//! token indexes the addresses of `Transfer` and `LogTokensMinted`.

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    event OrderSubmitted(
        bytes32 id,
        address maker,
        address bidToken,
        uint256 bidAmount,
        address askToken,
        uint256 askAmount
    );

    #[derive(Debug, PartialEq, Eq)]
    event OrderExecuted(
        bytes32 id,
        address maker,
        address taker,
        address bidToken,
        uint256 bidAmount,
        address askToken,
        uint256 askAmount
    );

    #[derive(Debug, PartialEq, Eq)]
    event Transfer(address indexed from, address indexed to, uint256 value);

    #[derive(Debug, PartialEq, Eq)]
    event LogTokensMinted(address indexed to, uint256 amount);

    #[derive(Debug, PartialEq, Eq)]
    event LogErrorString(string message);

    function submitOrder(address bidToken, uint256 bidAmount, address askToken, uint256 askAmount);
    function executeOrder(bytes32 id) payable;
    /// Public getter of the order mapping. A deleted entry reads back as zeros.
    function orderBook_(bytes32 id) view returns (
        address maker,
        address bidToken,
        uint256 bidAmount,
        address askToken,
        uint256 askAmount
    );

    function approve(address spender, uint256 amount) returns (bool);
    function transfer(address to, uint256 amount) returns (bool);
    function mint(address to, uint256 amount) returns (bool);
    /// Tokens at `rate()` per wei sent.
    function buy() payable;
    function balanceOf(address owner) view returns (uint256);
    function allowance(address owner, address spender) view returns (uint256);
    function symbol() view returns (string);
    function decimals() view returns (uint8);
    function rate() view returns (uint256);
}
