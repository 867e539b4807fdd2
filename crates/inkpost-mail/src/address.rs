//! Address checks shared by the transports and the admin tools.

use lettre::Address;

use inkpost_core::error::{AppError, ErrorKind};
use inkpost_core::result::AppResult;

/// Parse a bare `user@domain` address and return it in canonical form.
pub fn normalize_address(address: &str) -> AppResult<String> {
    let parsed: Address = address.trim().parse().map_err(|e| {
        AppError::with_source(
            ErrorKind::Validation,
            format!("Invalid email address '{address}'"),
            e,
        )
    })?;
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_valid_address() {
        assert_eq!(
            normalize_address("  reader@blog.test ").unwrap(),
            "reader@blog.test"
        );
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for bad in ["reader", "@blog.test", "reader@", "a@b@c", "reader @blog.test"] {
            let err = normalize_address(bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "{bad}");
        }
    }
}
