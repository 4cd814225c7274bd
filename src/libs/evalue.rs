use crate::libs::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// An alignment e-value kept as `coefficient × 10^exponent`.
///
/// The coefficient is rounded to two decimals and lies in `[1, 10)`, or is
/// zero. Parsing works on the text directly, so values such as `1e-400` that
/// underflow an `f64` keep their magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EValue {
    coefficient: f64,
    exponent: i32,
}

impl EValue {
    pub fn zero() -> Self {
        Self::default()
    }

    /// ```
    /// # use hitgff::libs::evalue::EValue;
    /// let e = EValue::new(2.94, -266);
    /// assert_eq!(e.coefficient(), 2.94);
    /// assert_eq!(e.exponent(), -266);
    ///
    /// let e = EValue::new(123.456, 0);
    /// assert_eq!(e.to_string(), "1.23e+02");
    /// ```
    pub fn new(coefficient: f64, exponent: i32) -> Self {
        Self::normalize(coefficient, exponent)
    }

    // Immutable accessors
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.coefficient == 0.0
    }

    /// Lossy conversion, very small values become `0.0`.
    pub fn to_f64(&self) -> f64 {
        self.coefficient * 10f64.powi(self.exponent)
    }

    fn normalize(coefficient: f64, exponent: i32) -> Self {
        let (coefficient, exponent) = Self::scale(coefficient, exponent);
        Self {
            coefficient,
            exponent: exponent.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        }
    }

    // Coefficient in [1, 10) and the matching exponent, which may leave the
    // range of `i32`
    fn scale(coefficient: f64, exponent: i32) -> (f64, i64) {
        if coefficient == 0.0 || !coefficient.is_finite() {
            return (0.0, 0);
        }

        let mut c = coefficient.abs();
        let mut e = exponent as i64;
        while c >= 10.0 {
            c /= 10.0;
            e += 1;
        }
        while c < 1.0 {
            c *= 10.0;
            e -= 1;
        }

        c = (c * 100.0).round() / 100.0;
        if c >= 10.0 {
            c /= 10.0;
            e += 1;
        }
        (c, e)
    }
}

impl From<f64> for EValue {
    fn from(value: f64) -> Self {
        Self::normalize(value, 0)
    }
}

impl std::str::FromStr for EValue {
    type Err = Error;

    /// ```
    /// # use hitgff::libs::evalue::EValue;
    /// let e: EValue = "1e-400".parse().unwrap();
    /// assert_eq!(e.exponent(), -400);
    /// assert!(e < "1e-300".parse().unwrap());
    ///
    /// let zero: EValue = "0.0".parse().unwrap();
    /// assert!(zero.is_zero());
    /// assert!("abc".parse::<EValue>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (mantissa, exponent) = match s.find(|c: char| c == 'e' || c == 'E') {
            Some(idx) => (&s[..idx], &s[idx + 1..]),
            None => (s, "0"),
        };

        let mantissa: f64 = mantissa
            .parse()
            .map_err(|_| Error::parse(0, format!("Invalid e-value: {}", s)))?;
        let exponent: i32 = exponent
            .trim_start_matches('+')
            .parse()
            .map_err(|_| Error::parse(0, format!("Invalid e-value: {}", s)))?;
        if !mantissa.is_finite() {
            return Err(Error::parse(0, format!("Invalid e-value: {}", s)));
        }
        if mantissa < 0.0 {
            return Err(Error::parse(0, format!("Negative e-value: {}", s)));
        }

        let (coefficient, exponent) = Self::scale(mantissa, exponent);
        let exponent = i32::try_from(exponent)
            .map_err(|_| Error::parse(0, format!("E-value out of range: {}", s)))?;
        Ok(Self {
            coefficient,
            exponent,
        })
    }
}

impl PartialOrd for EValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for EValue {}

impl Ord for EValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .exponent
                .cmp(&other.exponent)
                .then_with(|| self.coefficient.total_cmp(&other.coefficient)),
        }
    }
}

impl fmt::Display for EValue {
    /// Printed like C's `%.2e`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.exponent < 0 { '-' } else { '+' };
        write!(
            f,
            "{:.2}e{}{:02}",
            self.coefficient,
            sign,
            self.exponent.unsigned_abs()
        )
    }
}
