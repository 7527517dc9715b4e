/// Conversions between byte counts and the `(value, unit)` pairs the engine prints.
use anyhow::{bail, Result};

/// Convert a numeric string and a unit suffix into a byte count.  The engine prints sizes with
/// binary units, both in long form ("KB", "MB", ...) and short form ("K", "M", ...); an empty
/// suffix means plain bytes.  Any other suffix is an error.

pub fn value_by_unit(value: &str, unit: &str) -> Result<u64> {
    let multiplier: u64 = match unit.trim() {
        "" => 1,
        "K" | "KB" => 1 << 10,
        "M" | "MB" => 1 << 20,
        "G" | "GB" => 1 << 30,
        "T" | "TB" => 1 << 40,
        u => bail!("Unexpected size unit ({u})"),
    };
    let value = value.trim().parse::<f64>()?;
    Ok((value * multiplier as f64) as u64)
}

/// Render a byte count with the largest unit that keeps the value above 1, one decimal.

pub fn size_for_display(size_in_bytes: u64) -> String {
    let (divisor, unit) = if size_in_bytes < 1 << 10 {
        return format!("{size_in_bytes} B");
    } else if size_in_bytes < 1 << 20 {
        (1u64 << 10, "KB")
    } else if size_in_bytes < 1 << 30 {
        (1u64 << 20, "MB")
    } else if size_in_bytes < 1u64 << 40 {
        (1u64 << 30, "GB")
    } else {
        (1u64 << 40, "TB")
    };
    format!("{:.1} {}", size_in_bytes as f64 / divisor as f64, unit)
}

#[test]
fn test_value_by_unit() {
    assert!(value_by_unit("1.5", "MB").unwrap() == 1572864);
    assert!(value_by_unit("2", "GB").unwrap() == 2147483648);
    assert!(value_by_unit("100", "").unwrap() == 100);
    assert!(value_by_unit("0.0", "GB").unwrap() == 0);
    assert!(value_by_unit("3", "K").unwrap() == 3072);
    assert!(value_by_unit("1", "TB").unwrap() == 1099511627776);
    assert!(value_by_unit("1", "XB").is_err());
    assert!(value_by_unit("one", "KB").is_err());
}

#[test]
fn test_size_for_display() {
    assert!(size_for_display(100) == "100 B");
    assert!(size_for_display(1572864) == "1.5 MB");
    assert!(size_for_display(2147483648) == "2.0 GB");
}
