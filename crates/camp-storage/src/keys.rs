//! Storage key layout

use camp_core::Id;
use uuid::Uuid;

/// Longest file name kept in a key
const MAX_NAME_LEN: usize = 100;

/// `contracts/<tenant>/<contract>/<uuid>-<name>`
pub fn contract_document_key(tenant_id: Id, contract_id: Id, file_name: &str) -> String {
    format!(
        "contracts/{}/{}/{}-{}",
        tenant_id,
        contract_id,
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

/// Reduce an uploaded file name to `[A-Za-z0-9._-]`, without leading dots
pub fn sanitize_file_name(file_name: &str) -> String {
    // browsers on Windows may send the full client path
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let trimmed = cleaned.trim_start_matches('.');

    let mut name: String = trimmed.chars().take(MAX_NAME_LEN).collect();
    if name.is_empty() {
        name.push_str("document");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::validate_key;

    #[test]
    fn test_contract_document_key_layout() {
        let key = contract_document_key(7, 42, "Field Lease 2026.pdf");
        assert!(key.starts_with("contracts/7/42/"));
        assert!(key.ends_with("-Field_Lease_2026.pdf"));
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("C:\\Users\\me\\lease.pdf"), "lease.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..hidden"), "hidden");
        assert_eq!(sanitize_file_name("a..b.pdf"), "a.b.pdf");
        assert_eq!(sanitize_file_name(""), "document");
        assert_eq!(sanitize_file_name("..."), "document");
        assert_eq!(sanitize_file_name(&"x".repeat(300)).len(), MAX_NAME_LEN);
    }
}
