//! Division, rounding and number formatting helpers
//!
//! Formatting is a pure function of its inputs: callers pass a
//! [`NumberFormat`] explicitly instead of relying on process or thread locale.

use serde::{Deserialize, Serialize};

/// Divide without ever failing
///
/// Division by zero yields `+∞` for a positive dividend, `-∞` for a negative
/// one and `NaN` when the dividend is zero or `NaN`.
///
/// # Example
/// ```
/// use perfgate::numeric::safe_divide;
///
/// assert_eq!(safe_divide(10.0, 4.0), 2.5);
/// assert_eq!(safe_divide(1.0, 0.0), f64::INFINITY);
/// assert!(safe_divide(0.0, 0.0).is_nan());
/// ```
pub fn safe_divide(dividend: f64, divisor: f64) -> f64 {
    if divisor == 0.0 {
        if dividend.is_nan() || dividend == 0.0 {
            f64::NAN
        } else if dividend > 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    } else {
        dividend / divisor
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Explicit number rendering rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberFormat {
    /// Digits after the decimal separator
    pub decimals: usize,
    /// Character between integer and fractional part
    pub decimal_separator: char,
    /// Thousands grouping character (none when `None`)
    pub grouping_separator: Option<char>,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimals: 3,
            decimal_separator: '.',
            grouping_separator: None,
        }
    }
}

impl NumberFormat {
    /// Same separators, different precision
    pub fn with_decimals(&self, decimals: usize) -> Self {
        Self {
            decimals,
            ..self.clone()
        }
    }

    /// Render a value
    ///
    /// Non-finite values are rendered as `NaN`, `Infinity` and `-Infinity`.
    ///
    /// # Example
    /// ```
    /// use perfgate::numeric::NumberFormat;
    ///
    /// let german = NumberFormat {
    ///     decimals: 2,
    ///     decimal_separator: ',',
    ///     grouping_separator: Some('.'),
    /// };
    /// assert_eq!(german.format(1234567.891), "1.234.567,89");
    /// ```
    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "NaN".to_string();
        }
        if value.is_infinite() {
            return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }

        let plain = format!("{:.*}", self.decimals, value.abs());
        let (int_part, frac_part) = match plain.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (plain.as_str(), None),
        };

        let mut out = String::with_capacity(plain.len() + 4);
        if value < 0.0 && plain.chars().any(|c| c.is_ascii_digit() && c != '0') {
            out.push('-');
        }

        match self.grouping_separator {
            Some(sep) => {
                let digits = int_part.len();
                for (i, c) in int_part.chars().enumerate() {
                    if i > 0 && (digits - i) % 3 == 0 {
                        out.push(sep);
                    }
                    out.push(c);
                }
            }
            None => out.push_str(int_part),
        }

        if let Some(frac) = frac_part {
            out.push(self.decimal_separator);
            out.push_str(frac);
        }
        out
    }
}
