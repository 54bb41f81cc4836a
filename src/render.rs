//! Plain-text and JSON rendering of the book and balances for the CLI.

use serde::Serialize;

use crate::models::{BalanceSnapshot, Order, TokenInfo, NATIVE_DECIMALS, NATIVE_SYMBOL};
use crate::utils::{format_units, to_hex};

/// One order, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRow {
    pub id: String,
    pub maker: String,
    pub bid: String,
    pub ask: String,
    /// Native units per token unit, when both legs are non-zero.
    pub price: Option<String>,
}

fn amount(value: alloy_primitives::U256, symbol: &str, decimals: u8) -> String {
    format!("{} {}", format_units(value, decimals), symbol)
}

pub fn order_row(order: &Order, token: &TokenInfo) -> OrderRow {
    let (bid_symbol, bid_decimals) = token.describe(&order.bid_token);
    let (ask_symbol, ask_decimals) = token.describe(&order.ask_token);
    let price = if order.bid_amount.is_zero() || order.ask_amount.is_zero() {
        None
    } else {
        let bid: f64 = format_units(order.bid_amount, bid_decimals).parse().unwrap_or(0.0);
        let ask: f64 = format_units(order.ask_amount, ask_decimals).parse().unwrap_or(0.0);
        (bid > 0.0).then(|| format!("{:.6}", ask / bid))
    };
    OrderRow {
        id: order.id.to_string(),
        maker: to_hex(order.maker.as_slice()),
        bid: amount(order.bid_amount, &bid_symbol, bid_decimals),
        ask: amount(order.ask_amount, &ask_symbol, ask_decimals),
        price,
    }
}

pub fn rows(orders: &[Order], token: &TokenInfo) -> Vec<OrderRow> {
    orders.iter().map(|o| order_row(o, token)).collect()
}

pub fn table(rows: &[OrderRow]) -> String {
    if rows.is_empty() {
        return "No open orders.".to_string();
    }
    let bid_width = rows.iter().map(|r| r.bid.len()).max().unwrap_or(0).max(3);
    let ask_width = rows.iter().map(|r| r.ask.len()).max().unwrap_or(0).max(3);
    let mut out = format!(
        "{:<66}  {:<42}  {:>bw$}  {:>aw$}  {}\n",
        "ID",
        "MAKER",
        "BID",
        "ASK",
        "PRICE",
        bw = bid_width,
        aw = ask_width
    );
    for row in rows {
        out.push_str(&format!(
            "{:<66}  {:<42}  {:>bw$}  {:>aw$}  {}\n",
            row.id,
            row.maker,
            row.bid,
            row.ask,
            row.price.as_deref().unwrap_or("-"),
            bw = bid_width,
            aw = ask_width
        ));
    }
    out
}

pub fn balances_line(snapshot: &BalanceSnapshot, token: &TokenInfo) -> String {
    format!(
        "{}  {}  {}",
        to_hex(snapshot.account.as_slice()),
        amount(snapshot.native, NATIVE_SYMBOL, NATIVE_DECIMALS),
        amount(snapshot.token, &token.symbol, token.decimals)
    )
}
