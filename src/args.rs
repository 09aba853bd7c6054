//! Validation of row and column arguments.
//!
//! Every dimension and range argument of the grid commands must be an
//! integer. Arguments arrive as anything implementing [`GridIndex`], so the
//! same check applies whether the caller holds an integer, a float or a
//! string read from user input. Invalid arguments fail with
//! [`Error::InvalidArgument`] before a command is built.

use crate::error::{Error, Result};

/// A value usable as a grid row or column argument.
pub trait GridIndex {
    /// Convert to an integer index, naming the argument in the error.
    fn to_index(&self, name: &str) -> Result<i64>;
}

macro_rules! impl_grid_index_lossless {
    ($($t:ty),*) => {
        $(
            impl GridIndex for $t {
                fn to_index(&self, _name: &str) -> Result<i64> {
                    Ok(i64::from(*self))
                }
            }
        )*
    };
}

macro_rules! impl_grid_index_wide {
    ($($t:ty),*) => {
        $(
            impl GridIndex for $t {
                fn to_index(&self, name: &str) -> Result<i64> {
                    i64::try_from(*self).map_err(|_| {
                        Error::InvalidArgument(format!("{} is out of range: {}", name, self))
                    })
                }
            }
        )*
    };
}

impl_grid_index_lossless!(i8, i16, i32, i64, u8, u16, u32);
impl_grid_index_wide!(isize, usize, u64);

impl GridIndex for f64 {
    fn to_index(&self, name: &str) -> Result<i64> {
        if self.is_finite()
            && self.fract() == 0.0
            && *self >= i64::MIN as f64
            && *self <= i64::MAX as f64
        {
            Ok(*self as i64)
        } else {
            Err(Error::InvalidArgument(format!(
                "{} must be an integer, got {}",
                name, self
            )))
        }
    }
}

impl GridIndex for f32 {
    fn to_index(&self, name: &str) -> Result<i64> {
        f64::from(*self).to_index(name)
    }
}

impl GridIndex for str {
    fn to_index(&self, name: &str) -> Result<i64> {
        self.trim().parse::<i64>().map_err(|_| {
            Error::InvalidArgument(format!("{} must be an integer, got '{}'", name, self))
        })
    }
}

impl GridIndex for String {
    fn to_index(&self, name: &str) -> Result<i64> {
        self.as_str().to_index(name)
    }
}

impl<T: GridIndex + ?Sized> GridIndex for &T {
    fn to_index(&self, name: &str) -> Result<i64> {
        (**self).to_index(name)
    }
}

/// Convert a dimension argument, which must also be non-negative.
pub(crate) fn dimension(value: &impl GridIndex, name: &str) -> Result<usize> {
    let index = value.to_index(name)?;
    usize::try_from(index).map_err(|_| {
        Error::InvalidArgument(format!("{} must be non-negative, got {}", name, index))
    })
}

/// Row and column bounds of a `GRID.RANGE` or `GRID.SET` call.
///
/// Negative bounds count from the end of the grid (`-1` is the last row or
/// column), and a start past its end walks the grid backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBounds {
    pub row_start: i64,
    pub row_end: i64,
    pub column_start: i64,
    pub column_end: i64,
}

impl RangeBounds {
    /// Validate the four bounds of a range command.
    pub fn new(
        row_start: impl GridIndex,
        row_end: impl GridIndex,
        column_start: impl GridIndex,
        column_end: impl GridIndex,
    ) -> Result<Self> {
        Ok(Self {
            row_start: row_start.to_index("row_start")?,
            row_end: row_end.to_index("row_end")?,
            column_start: column_start.to_index("column_start")?,
            column_end: column_end.to_index("column_end")?,
        })
    }

    /// Whether every bound is absolute (non-negative).
    pub fn is_absolute(&self) -> bool {
        self.row_start >= 0 && self.row_end >= 0 && self.column_start >= 0 && self.column_end >= 0
    }

    /// The `(rows, columns)` covered by the range, when every bound is absolute.
    pub fn spans(&self) -> Option<(usize, usize)> {
        if !self.is_absolute() {
            return None;
        }
        let rows = self.row_start.abs_diff(self.row_end) as usize + 1;
        let columns = self.column_start.abs_diff(self.column_end) as usize + 1;
        Some((rows, columns))
    }

    /// Resolve negative bounds against the grid shape.
    ///
    /// Bounds are left for the server to reject when they fall outside the
    /// grid.
    pub fn resolve(&self, rows: usize, columns: usize) -> Self {
        let wrap = |value: i64, max: usize| {
            if value < 0 {
                max as i64 + value
            } else {
                value
            }
        };
        Self {
            row_start: wrap(self.row_start, rows),
            row_end: wrap(self.row_end, rows),
            column_start: wrap(self.column_start, columns),
            column_end: wrap(self.column_end, columns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_accepted() {
        assert_eq!(3i32.to_index("rows").unwrap(), 3);
        assert_eq!(7usize.to_index("rows").unwrap(), 7);
        assert_eq!((-1i64).to_index("row_end").unwrap(), -1);
    }

    #[test]
    fn test_integral_float_accepted() {
        assert_eq!(2.0f64.to_index("rows").unwrap(), 2);
    }

    #[test]
    fn test_fractional_float_rejected() {
        let err = 1.5f64.to_index("row_start").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("row_start")));
        assert!(f64::NAN.to_index("rows").is_err());
        assert!(f64::INFINITY.to_index("rows").is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!("12".to_index("columns").unwrap(), 12);
        assert_eq!(String::from(" -2 ").to_index("column_end").unwrap(), -2);
        let err = "abc".to_index("columns").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("columns")));
        assert!("1.5".to_index("rows").is_err());
    }

    #[test]
    fn test_dimension_rejects_negative() {
        assert_eq!(dimension(&4, "rows").unwrap(), 4);
        assert!(matches!(
            dimension(&-1, "rows"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_spans_forward_and_reversed() {
        let forward = RangeBounds::new(0, 1, 0, 2).unwrap();
        assert_eq!(forward.spans(), Some((2, 3)));

        let reversed = RangeBounds::new(3, 1, 2, 2).unwrap();
        assert_eq!(reversed.spans(), Some((3, 1)));
    }

    #[test]
    fn test_negative_bounds_resolve_against_shape() {
        let bounds = RangeBounds::new(0, -1, -2, -1).unwrap();
        assert!(!bounds.is_absolute());
        assert_eq!(bounds.spans(), None);

        let resolved = bounds.resolve(4, 5);
        assert_eq!(resolved, RangeBounds::new(0, 3, 3, 4).unwrap());
        assert_eq!(resolved.spans(), Some((4, 2)));
    }

    #[test]
    fn test_range_bounds_reject_non_integer() {
        assert!(RangeBounds::new(0, "x", 0, 1).is_err());
        assert!(RangeBounds::new(0, 1, 0.5f64, 1).is_err());
    }
}
