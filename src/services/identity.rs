//! Identity resolver
//!
//! 组织内按邮箱找到或创建卖家。没有邮箱的报名没有去重键，总是新建。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{FundlinkerError, Result};
use crate::storage::backend::retry;
use crate::storage::{NewSeller, SeaOrmStorage, Seller};
use crate::utils::email::validate_email;
use crate::utils::non_blank;

/// 报名表单里的卖家资料
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SellerProfile {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSeller {
    pub seller: Seller,
    pub created: bool,
}

/// 校验并规范化资料（写入前完成）
pub fn validate_profile(organization_id: &str, profile: &SellerProfile) -> Result<NewSeller> {
    let name = profile.name.trim();
    if name.is_empty() {
        return Err(FundlinkerError::missing_field("name is required"));
    }
    if name.chars().count() > 200 {
        return Err(FundlinkerError::validation("name is too long"));
    }

    let email = non_blank(profile.email.as_deref());
    if let Some(ref email) = email {
        validate_email(email)?;
    }

    Ok(NewSeller {
        organization_id: organization_id.to_string(),
        name: name.to_string(),
        email,
        phone: non_blank(profile.phone.as_deref()),
        grade: non_blank(profile.grade.as_deref()),
        group: non_blank(profile.group.as_deref()),
    })
}

pub struct IdentityResolver {
    storage: Arc<SeaOrmStorage>,
    code_length: usize,
}

impl IdentityResolver {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let code_length = crate::config::get_config().links.seller_code_length;
        Self {
            storage,
            code_length,
        }
    }

    /// 找到或创建卖家，已有资料不会被覆盖
    pub async fn resolve_or_create_seller(
        &self,
        organization_id: &str,
        profile: &SellerProfile,
    ) -> Result<ResolvedSeller> {
        let new_seller = validate_profile(organization_id, profile)?;

        let storage = &self.storage;
        let code_length = self.code_length;
        let new_seller = &new_seller;
        let (seller, created) = retry::with_retry(
            "resolve_or_create_seller",
            storage.retry_config(),
            move || async move { storage.resolve_or_create_seller(new_seller, code_length).await },
        )
        .await?;

        Ok(ResolvedSeller { seller, created })
    }

    pub async fn get_seller(&self, student_id: &str) -> Result<Seller> {
        self.storage
            .get_seller(student_id)
            .await?
            .ok_or_else(|| FundlinkerError::not_found(format!("Seller '{}' not found", student_id)))
    }

    pub async fn set_seller_active(&self, student_id: &str, active: bool) -> Result<Seller> {
        let seller = self.storage.set_seller_active(student_id, active).await?;
        info!(
            "IdentityResolver: seller '{}' is now {}",
            seller.name,
            if active { "active" } else { "inactive" }
        );
        Ok(seller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, email: Option<&str>) -> SellerProfile {
        SellerProfile {
            name: name.to_string(),
            email: email.map(str::to_string),
            phone: Some("  ".to_string()),
            grade: Some(" 7 ".to_string()),
            group: None,
        }
    }

    #[test]
    fn test_validate_profile_trims() {
        let new = validate_profile("org", &profile("  Jane Doe ", Some(" jane@x.com "))).unwrap();
        assert_eq!(new.name, "Jane Doe");
        assert_eq!(new.email.as_deref(), Some("jane@x.com"));
        assert_eq!(new.phone, None);
        assert_eq!(new.grade.as_deref(), Some("7"));
    }

    #[test]
    fn test_validate_profile_requires_name() {
        let err = validate_profile("org", &profile("   ", None)).unwrap_err();
        assert!(matches!(err, FundlinkerError::MissingField(_)));
    }

    #[test]
    fn test_validate_profile_rejects_bad_email() {
        let err = validate_profile("org", &profile("Jane", Some("jane@"))).unwrap_err();
        assert!(matches!(err, FundlinkerError::InvalidEmail(_)));
    }

    #[test]
    fn test_blank_email_means_anonymous() {
        let new = validate_profile("org", &profile("Jane", Some(""))).unwrap();
        assert!(new.email.is_none());
    }
}
