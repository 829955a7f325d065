use std::fmt;

/// Credit quantities are fractional (consumption is usually entered in quarter
/// steps) and are kept as integer hundredths: 1.00 = 100, 0.25 = 25.
pub type Quantity = i64;

/// Hundredths in one whole unit of credit.
pub const QUANTITY_SCALE: Quantity = 100;

/// Format a quantity as a decimal string.
/// Example: 1025 -> "10.25", -50 -> "-0.50"
pub fn format_quantity(quantity: Quantity) -> String {
    let sign = if quantity < 0 { "-" } else { "" };
    let abs = quantity.abs();
    format!(
        "{}{}.{:02}",
        sign,
        abs / QUANTITY_SCALE,
        abs % QUANTITY_SCALE
    )
}

/// Parse a decimal string into a quantity.
/// Example: "10.25" -> 1025, "2.5" -> 250, "3" -> 300
pub fn parse_quantity(input: &str) -> Result<Quantity, ParseQuantityError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    if digits.is_empty() {
        return Err(ParseQuantityError::Empty);
    }

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(ParseQuantityError::InvalidFormat);
    }
    if fraction.len() > 2 {
        return Err(ParseQuantityError::TooPrecise);
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| ParseQuantityError::InvalidFormat)?
    };

    let hundredths: i64 = match fraction.len() {
        0 => 0,
        1 => {
            fraction
                .parse::<i64>()
                .map_err(|_| ParseQuantityError::InvalidFormat)?
                * 10
        }
        _ => fraction
            .parse()
            .map_err(|_| ParseQuantityError::InvalidFormat)?,
    };

    let quantity = units
        .checked_mul(QUANTITY_SCALE)
        .and_then(|q| q.checked_add(hundredths))
        .ok_or(ParseQuantityError::Overflow)?;

    Ok(if negative { -quantity } else { quantity })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseQuantityError {
    Empty,
    InvalidFormat,
    TooPrecise,
    Overflow,
}

impl fmt::Display for ParseQuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseQuantityError::Empty => write!(f, "empty quantity"),
            ParseQuantityError::InvalidFormat => write!(f, "invalid quantity format"),
            ParseQuantityError::TooPrecise => {
                write!(f, "quantities support at most two decimal places")
            }
            ParseQuantityError::Overflow => write!(f, "quantity is too large"),
        }
    }
}

impl std::error::Error for ParseQuantityError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(1025), "10.25");
        assert_eq!(format_quantity(100), "1.00");
        assert_eq!(format_quantity(25), "0.25");
        assert_eq!(format_quantity(0), "0.00");
        assert_eq!(format_quantity(-50), "-0.50");
        assert_eq!(format_quantity(-1500), "-15.00");
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("10.25"), Ok(1025));
        assert_eq!(parse_quantity("10"), Ok(1000));
        assert_eq!(parse_quantity("2.5"), Ok(250));
        assert_eq!(parse_quantity(".75"), Ok(75));
        assert_eq!(parse_quantity(" 3. "), Ok(300));
        assert_eq!(parse_quantity("-1.5"), Ok(-150));
    }

    #[test]
    fn test_parse_quantity_rejects_garbage() {
        assert_eq!(parse_quantity(""), Err(ParseQuantityError::Empty));
        assert_eq!(parse_quantity("-"), Err(ParseQuantityError::Empty));
        assert_eq!(
            parse_quantity("1.2.3"),
            Err(ParseQuantityError::InvalidFormat)
        );
        assert_eq!(parse_quantity("abc"), Err(ParseQuantityError::InvalidFormat));
        assert_eq!(parse_quantity("0.125"), Err(ParseQuantityError::TooPrecise));
        assert_eq!(
            parse_quantity("99999999999999999"),
            Err(ParseQuantityError::Overflow)
        );
    }
}
