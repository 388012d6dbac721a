use anyhow::ensure;

pub fn not_blank(field: &str, value: &str) -> anyhow::Result<()> {
    ensure!(!value.trim().is_empty(), "{field} must not be blank");
    Ok(())
}

pub fn not_blank_opt(field: &str, value: Option<&str>) -> anyhow::Result<()> {
    value.map_or(Ok(()), |v| not_blank(field, v))
}

pub fn at_least(field: &str, value: Option<i32>, min: i32) -> anyhow::Result<()> {
    if let Some(v) = value {
        ensure!(v >= min, "{field} must be at least {min}");
    }
    Ok(())
}
