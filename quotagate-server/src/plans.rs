//! Plan table loading
//!
//! Tiers can be described in a TOML, JSON or YAML file (format picked from
//! the extension) and are read with the `config` crate:
//!
//! ```toml
//! [[plans]]
//! name = "guest"
//! daily_generation_limit = 3
//! weekly_generation_limit = 6
//! monthly_generation_limit = 9
//! weekly_catalog_quota = 5
//! total_catalog_quota = 10
//!
//! [[plans]]
//! name = "pro"
//! price = "9 EUR / month"
//! recommended = true
//! ```
//!
//! A limit that is left out is unlimited.

use anyhow::{Context, Result, anyhow};
use quotagate::{Plan, PlanTable};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PlansFile {
    plans: Vec<Plan>,
}

/// Load the plan table from `path`, or the built-in tiers when `None`
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or lists no plans.
pub fn load_plans(path: Option<&Path>) -> Result<PlanTable> {
    let Some(path) = path else {
        return Ok(PlanTable::default());
    };

    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path))
        .build()
        .with_context(|| format!("Failed to read plans file {}", path.display()))?;

    let file: PlansFile = settings
        .try_deserialize()
        .with_context(|| format!("Invalid plans file {}", path.display()))?;

    if file.plans.is_empty() {
        return Err(anyhow!("Plans file {} defines no plans", path.display()));
    }

    Ok(PlanTable::from_plans(file.plans))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotagate::QuotaPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // The extension picks the format
    fn temp_file(extension: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("quotagate-plans-")
            .suffix(&format!(".{extension}"))
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let table = load_plans(None).unwrap();
        assert!(table.limits_for("guest").is_ok());
        assert!(table.limits_for("free").is_ok());
        assert!(table.limits_for("pro").is_ok());
    }

    #[test]
    fn test_load_toml() {
        let file = temp_file(
            "toml",
            r#"
[[plans]]
name = "guest"
daily_generation_limit = 3
weekly_generation_limit = 6
monthly_generation_limit = 9

[[plans]]
name = "pro"
price = "9 EUR / month"
recommended = true
"#,
        );

        let table = load_plans(Some(file.path())).unwrap();

        let guest = table.limits_for("guest").unwrap();
        assert_eq!(guest.daily_generation_limit, Some(3));
        assert_eq!(guest.weekly_generation_limit, Some(6));
        assert_eq!(guest.monthly_generation_limit, Some(9));
        assert_eq!(guest.lifetime_generation_limit, None);

        let pro = table.limits_for("pro").unwrap();
        assert!(!pro.limits_generations());
        assert!(pro.recommended);

        assert!(table.limits_for("free").is_err());
    }

    #[test]
    fn test_load_json() {
        let file = temp_file(
            "json",
            r#"{ "plans": [ { "name": "free", "lifetime_generation_limit": 7 } ] }"#,
        );

        let table = load_plans(Some(file.path())).unwrap();

        assert_eq!(
            table.limits_for("free").unwrap().lifetime_generation_limit,
            Some(7)
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        assert!(load_plans(Some(&path)).is_err());
    }

    #[test]
    fn test_empty_plan_list_is_an_error() {
        let file = temp_file("json", r#"{ "plans": [] }"#);
        assert!(load_plans(Some(file.path())).is_err());
    }
}
