//! Display formatting for on-chain fixed-point amounts.
//!
//! Amounts arrive as integer strings in the token's smallest unit. Display
//! form shifts the decimal point, trims trailing zeros, and comma-groups the
//! integer part.

/// Decimal places of the platform token.
pub const AUDIO_DECIMALS: u32 = 8;
/// Decimal places of USDC.
pub const USDC_DECIMALS: u32 = 6;

pub fn format_audio(raw: &str) -> String {
    format_fixed_point(raw, AUDIO_DECIMALS)
}

pub fn format_usdc(raw: &str) -> String {
    format_fixed_point(raw, USDC_DECIMALS)
}

/// `"500000000"` with 8 decimals renders as `"5"`; `"123450000000"` as
/// `"1,234.5"`. Unparseable input renders as `"0"`.
pub fn format_fixed_point(raw: &str, decimals: u32) -> String {
    let value: u128 = match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!("Unparseable fixed-point amount '{}'", raw);
            return "0".to_string();
        }
    };

    let scale = 10u128.pow(decimals);
    let whole = value / scale;
    let frac = value % scale;

    let grouped = group_thousands(whole);
    if frac == 0 {
        return grouped;
    }

    let frac_digits = format!("{:0width$}", frac, width = decimals as usize);
    let trimmed = frac_digits.trim_end_matches('0');
    format!("{}.{}", grouped, trimmed)
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_amount_formats_exactly() {
        assert_eq!(format_audio("500000000"), "5");
    }

    #[test]
    fn challenge_reward_formats_exactly() {
        assert_eq!(format_audio("100000000"), "1");
    }

    #[test]
    fn fractional_part_trims_trailing_zeros() {
        assert_eq!(format_fixed_point("150000000", 8), "1.5");
        assert_eq!(format_fixed_point("123456789", 8), "1.23456789");
    }

    #[test]
    fn whole_part_groups_thousands() {
        assert_eq!(format_fixed_point("123450000000", 8), "1,234.5");
        assert_eq!(format_fixed_point("100000000000000", 8), "1,000,000");
    }

    #[test]
    fn sub_unit_amounts_keep_leading_zero() {
        assert_eq!(format_fixed_point("5000000", 8), "0.05");
    }

    #[test]
    fn usdc_uses_six_decimals() {
        assert_eq!(format_usdc("1000000"), "1");
        assert_eq!(format_usdc("2500000"), "2.5");
    }

    #[test]
    fn garbage_renders_as_zero() {
        assert_eq!(format_fixed_point("not-a-number", 8), "0");
    }
}
