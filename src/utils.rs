//! Small parsing helpers shared by the payment handlers.

/// Decode the human-readable amount part of a bolt11 payment request to
/// sats. Returns 0 when the invoice carries no amount or cannot be parsed.
///
/// The amount sits in the hrp between the network prefix and the bech32
/// separator, scaled by an optional multiplier: `lnbc100u…` is 100
/// micro-bitcoin, i.e. 10_000 sats.
pub fn invoice_amount_sats(payment_request: &str) -> u64 {
    // The bech32 data part never contains '1', so the last '1' is the
    // hrp separator.
    let Some(separator) = payment_request.rfind('1') else {
        return 0;
    };
    let hrp = &payment_request[..separator];

    let Some(amount_part) = hrp
        .strip_prefix("lnbcrt")
        .or_else(|| hrp.strip_prefix("lnbc"))
    else {
        return 0;
    };
    if amount_part.is_empty() {
        return 0;
    }

    let digits_end = amount_part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(amount_part.len());
    let (digits, multiplier) = amount_part.split_at(digits_end);
    let Ok(value) = digits.parse::<u64>() else {
        return 0;
    };

    // Multipliers scale a bitcoin amount; one bitcoin is 100_000_000 sats.
    match multiplier {
        "m" => value * 100_000,
        "u" => value * 100,
        "n" => value / 10,
        "p" => value / 10_000,
        "" => value * 100_000_000,
        _ => 0,
    }
}
