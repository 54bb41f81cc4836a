use alloy_primitives::U256;
use anyhow::{anyhow, Result};
use tracing::warn;

pub fn remove_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url[..url.len() - 1].to_string()
    } else {
        url.to_string()
    }
}

pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Lowercase `0x`-prefixed hex of any byte slice.
pub fn to_hex<T: AsRef<[u8]>>(bytes: T) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(strip_hex_prefix(s)).map_err(|e| anyhow!("invalid hex {:?}: {}", s, e))
}

/// Parse a JSON-RPC quantity (`"0x1a"`). An empty quantity (`"0x"`) is zero.
pub fn parse_quantity(s: &str) -> Result<U256> {
    let digits = strip_hex_prefix(s);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| anyhow!("invalid quantity {:?}: {}", s, e))
}

pub fn parse_quantity_u64(s: &str) -> Result<u64> {
    let digits = strip_hex_prefix(s);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| anyhow!("invalid quantity {:?}: {}", s, e))
}

pub fn quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

/// Scale a human decimal amount (`"1.5"`) to base units with `decimals` places.
///
/// Fractional digits beyond `decimals` are rejected rather than rounded.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() || amount.starts_with('-') {
        return Err(anyhow!("invalid amount {:?}", amount));
    }
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if frac.len() > decimals as usize {
        return Err(anyhow!(
            "amount {} has more than {} decimal places",
            amount,
            decimals
        ));
    }
    let digits = format!(
        "{}{}{}",
        whole,
        frac,
        "0".repeat(decimals as usize - frac.len())
    );
    if !digits.chars().all(|c| c.is_ascii_digit()) || digits.is_empty() {
        return Err(anyhow!("invalid amount {:?}", amount));
    }
    U256::from_str_radix(&digits, 10).map_err(|e| anyhow!("amount {} out of range: {}", amount, e))
}

/// Render base units as a human decimal string, trimming trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let base = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / base;
    let frac = value % base;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

pub async fn retry<T, E, F, Fut>(mut retries: u32, base_delay_ms: u64, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if retries == 0 => return Err(e),
            Err(e) => {
                // Exponential backoff: base_delay * 2^attempt, capped at 30s
                let delay = (base_delay_ms * (1u64 << attempt.min(5))).min(30_000);
                warn!(attempt = attempt + 1, error = ?e, delay_ms = delay, "request failed, retrying");
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                retries -= 1;
                attempt += 1;
            }
        }
    }
}
