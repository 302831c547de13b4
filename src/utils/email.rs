//! 邮箱校验与规范化

use crate::errors::{FundlinkerError, Result};

/// 规范化邮箱：trim + 小写，作为组织内的去重键
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 语法校验（不做 DNS 检查）
///
/// 规则：恰好一个 `@`，local 部分非空，域名含点且各段非空，不含空白。
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(FundlinkerError::invalid_email("email cannot be empty"));
    }
    if email.len() > 254 {
        return Err(FundlinkerError::invalid_email("email is too long"));
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(FundlinkerError::invalid_email(format!(
            "email '{}' contains whitespace",
            email
        )));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(FundlinkerError::invalid_email(format!(
            "email '{}' is missing '@'",
            email
        )));
    };

    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return Err(FundlinkerError::invalid_email(format!(
            "email '{}' has an invalid local part",
            email
        )));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2
        || labels.iter().any(|l| {
            l.is_empty()
                || l.starts_with('-')
                || l.ends_with('-')
                || !l.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
    {
        return Err(FundlinkerError::invalid_email(format!(
            "email '{}' has an invalid domain",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        for email in ["jane@x.com", " Jane.Doe+pta@school.k12.us ", "a@b-c.org"] {
            assert!(validate_email(email).is_ok(), "{}", email);
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in [
            "",
            "jane",
            "jane@",
            "@x.com",
            "jane@x",
            "jane@@x.com",
            "jane doe@x.com",
            "jane@x..com",
            "jane@-x.com",
        ] {
            let err = validate_email(email).unwrap_err();
            assert!(matches!(err, FundlinkerError::InvalidEmail(_)), "{}", email);
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_email("  Jane@X.COM "), "jane@x.com");
    }
}
