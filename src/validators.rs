//! Input validation for names passed to pfctl
//!
//! Anchor, table and interface names end up as pfctl arguments or inside rule
//! text. These checks keep them within pf's limits and free of characters that
//! would change the meaning of a generated rule.

/// Longest anchor path pf accepts (`MAXPATHLEN - 1`)
pub const MAX_ANCHOR_NAME_LEN: usize = 1023;

/// Longest table name pf accepts (`PF_TABLE_NAME_SIZE - 1`)
pub const MAX_TABLE_NAME_LEN: usize = 31;

/// Longest interface name (`IFNAMSIZ - 1`)
pub const MAX_INTERFACE_LEN: usize = 15;

/// Validates an anchor path such as `pfkit` or `pfkit/ssh`.
///
/// # Errors
///
/// Returns `Err` if the name is empty, too long, uses characters other than
/// ASCII alphanumerics and `_ - . /`, starts or ends with `/`, or contains an
/// empty, `.` or `..` component.
pub fn validate_anchor_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Anchor name cannot be empty".to_string());
    }

    if name.len() > MAX_ANCHOR_NAME_LEN {
        return Err(format!(
            "Anchor name too long (max {MAX_ANCHOR_NAME_LEN} characters)"
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
    {
        return Err("Anchor name contains invalid characters".to_string());
    }

    if name
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err("Anchor path has an empty or relative component".to_string());
    }

    Ok(())
}

/// Validates a table name.
///
/// # Errors
///
/// Returns `Err` if the name is empty, longer than 31 bytes, or uses
/// characters other than ASCII alphanumerics and `_ - .`.
pub fn validate_table_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Table name cannot be empty".to_string());
    }

    if name.len() > MAX_TABLE_NAME_LEN {
        return Err(format!(
            "Table name too long (max {MAX_TABLE_NAME_LEN} characters)"
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err("Table name contains invalid characters".to_string());
    }

    Ok(())
}

/// Validates a network interface name.
///
/// Interface name rules:
/// - Max 15 characters (IFNAMSIZ - 1)
/// - Alphanumeric, dot, dash, underscore only
/// - Cannot be "." or ".."
///
/// # Errors
///
/// Returns `Err` if interface name violates kernel constraints.
pub fn validate_interface(name: &str) -> Result<String, String> {
    if name.is_empty() {
        return Ok(String::new());
    }

    if name.len() > MAX_INTERFACE_LEN {
        return Err(format!(
            "Interface name too long (max {MAX_INTERFACE_LEN} characters)"
        ));
    }

    if name == "." || name == ".." {
        return Err("Invalid interface name".to_string());
    }

    // Check for valid characters (ASCII alphanumeric only, plus dot, dash, underscore)
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("Interface name contains invalid characters".to_string());
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_anchor_name_valid() {
        assert!(validate_anchor_name("pfkit").is_ok());
        assert!(validate_anchor_name("pfkit/ssh").is_ok());
        assert!(validate_anchor_name("com.example_fw-1").is_ok());
    }

    #[test]
    fn test_validate_anchor_name_empty() {
        assert!(validate_anchor_name("").is_err());
    }

    #[test]
    fn test_validate_anchor_name_path_tricks() {
        assert!(validate_anchor_name("/pfkit").is_err());
        assert!(validate_anchor_name("pfkit/").is_err());
        assert!(validate_anchor_name("pfkit//ssh").is_err());
        assert!(validate_anchor_name("../pfkit").is_err());
        assert!(validate_anchor_name("pfkit/./ssh").is_err());
    }

    #[test]
    fn test_validate_anchor_name_invalid_chars() {
        assert!(validate_anchor_name("pf kit").is_err());
        assert!(validate_anchor_name("pfkit;rm").is_err());
        assert!(validate_anchor_name("pfkit\n").is_err());
        assert!(validate_anchor_name("pfkit*").is_err());
    }

    #[test]
    fn test_validate_anchor_name_too_long() {
        let name = "a".repeat(MAX_ANCHOR_NAME_LEN + 1);
        assert!(validate_anchor_name(&name).is_err());
        let name = "a".repeat(MAX_ANCHOR_NAME_LEN);
        assert!(validate_anchor_name(&name).is_ok());
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("bruteforce").is_ok());
        assert!(validate_table_name("blocked_v6").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("<bruteforce>").is_err());
        assert!(validate_table_name(&"t".repeat(32)).is_err());
        assert!(validate_table_name(&"t".repeat(31)).is_ok());
    }

    #[test]
    fn test_validate_interface_valid() {
        assert_eq!(validate_interface("em0").unwrap(), "em0");
        assert_eq!(validate_interface("vlan.100").unwrap(), "vlan.100");
        assert_eq!(validate_interface("wg_home-1").unwrap(), "wg_home-1");
    }

    #[test]
    fn test_validate_interface_empty() {
        assert_eq!(validate_interface("").unwrap(), "");
    }

    #[test]
    fn test_validate_interface_invalid() {
        assert!(validate_interface("em0 proto").is_err());
        assert!(validate_interface("..").is_err());
        assert!(validate_interface("em0;").is_err());
    }

    #[test]
    fn test_validate_interface_too_long() {
        assert!(validate_interface("abcdefghijklmnop").is_err());
    }

    #[test]
    fn test_validate_interface_max_length() {
        assert!(validate_interface("abcdefghijklmno").is_ok());
    }
}
