//! Attribution ledger：卖家报名与 magic link
//!
//! 报名是幂等的：同一卖家重复提交得到同一个 magic link，`already_registered = true`。
//! 可重试错误会自动重试；下单不是幂等的，见 order_service。

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use super::identity::{SellerProfile, validate_profile};
use super::notifier::{Notifier, WelcomeMessage, dispatch_welcome};
use crate::errors::{FundlinkerError, Result};
use crate::storage::backend::retry;
use crate::storage::{Campaign, CampaignStatus, Product, SeaOrmStorage, TrackingMode};
use crate::utils::links::LinkRenderer;

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub student_id: String,
    pub campaign_id: String,
    pub magic_link_code: String,
    pub selling_url: String,
    pub portal_url: String,
    pub already_registered: bool,
    pub seller_created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResult {
    pub magic_link_code: String,
    pub already_registered: bool,
}

/// 报名页展示的活动信息
#[derive(Debug, Clone, Serialize)]
pub struct CampaignPublicInfo {
    pub campaign_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_location: Option<String>,
    pub status: CampaignStatus,
    pub registration_open: bool,
    /// 可分享的报名页链接；售卖页不展示
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_url: Option<String>,
}

impl From<&Campaign> for CampaignPublicInfo {
    fn from(campaign: &Campaign) -> Self {
        Self {
            campaign_id: campaign.id.clone(),
            name: campaign.name.clone(),
            start_date: campaign.start_date,
            end_date: campaign.end_date,
            pickup_date: campaign.pickup_date,
            pickup_location: campaign.pickup_location.clone(),
            status: campaign.status,
            registration_open: campaign.registration_open(),
            join_url: None,
        }
    }
}

impl CampaignPublicInfo {
    pub fn with_join_url(mut self, links: &LinkRenderer, register_code: &str) -> Self {
        self.join_url = Some(links.join_url(register_code));
        self
    }
}

/// 售卖页/卖家中心需要的全部上下文（只含公开字段）
#[derive(Debug, Clone, Serialize)]
pub struct SellingContext {
    pub campaign: CampaignPublicInfo,
    pub tracking_mode: TrackingMode,
    pub student_id: String,
    pub seller_name: String,
    pub seller_active: bool,
    pub total_sales: Decimal,
    pub order_count: u64,
    pub products: Vec<Product>,
    pub selling_url: String,
    pub portal_url: String,
}

/// 报名前置条件：状态为 draft/active 且开放自助报名
pub fn ensure_registration_open(campaign: &Campaign) -> Result<()> {
    if !campaign.status.accepts_registration() {
        return Err(FundlinkerError::registration_closed(format!(
            "Campaign '{}' is {} and no longer accepts registrations",
            campaign.name, campaign.status
        )));
    }
    if !campaign.self_registration_open {
        return Err(FundlinkerError::registration_closed(format!(
            "Self registration for campaign '{}' is closed",
            campaign.name
        )));
    }
    Ok(())
}

pub struct RegistrationService {
    storage: Arc<SeaOrmStorage>,
    links: LinkRenderer,
    notifier: Arc<dyn Notifier>,
    seller_code_length: usize,
    magic_code_bytes: usize,
}

impl RegistrationService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        links: LinkRenderer,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let config = crate::config::get_config();
        Self {
            storage,
            links,
            notifier,
            seller_code_length: config.links.seller_code_length,
            magic_code_bytes: config.links.magic_code_bytes,
        }
    }

    async fn campaign_by_register_code(&self, register_code: &str) -> Result<Campaign> {
        let code = register_code.trim();
        if code.is_empty() {
            return Err(FundlinkerError::registration_link_invalid(
                "Registration link is invalid",
            ));
        }
        self.storage
            .find_campaign_by_register_code(code)
            .await?
            .ok_or_else(|| {
                FundlinkerError::registration_link_invalid(
                    "Registration link is invalid or has expired",
                )
            })
    }

    pub async fn campaign_public_info(&self, register_code: &str) -> Result<CampaignPublicInfo> {
        let campaign = self.campaign_by_register_code(register_code).await?;
        Ok(CampaignPublicInfo::from(&campaign)
            .with_join_url(&self.links, &campaign.self_register_code))
    }

    /// 公开报名流程
    ///
    /// 1. 报名码 → 活动（未知报名码为 link invalid）
    /// 2. 前置条件检查，失败时不写入任何数据
    /// 3. 卖家与归属在同一事务内写入
    /// 4. 新报名时后台发送欢迎消息
    pub async fn register(
        &self,
        register_code: &str,
        profile: &SellerProfile,
    ) -> Result<RegistrationOutcome> {
        let campaign = self.campaign_by_register_code(register_code).await?;
        ensure_registration_open(&campaign)?;

        let new_seller = validate_profile(&campaign.organization_id, profile)?;

        let storage = &self.storage;
        let campaign_id = campaign.id.as_str();
        let new_seller = &new_seller;
        let (code_length, magic_bytes) = (self.seller_code_length, self.magic_code_bytes);
        let enrollment = retry::with_retry("register", storage.retry_config(), move || async move {
            storage
                .enroll(campaign_id, new_seller, code_length, magic_bytes)
                .await
        })
        .await?;

        let code = &enrollment.attribution.magic_link_code;
        let outcome = RegistrationOutcome {
            student_id: enrollment.seller.id.clone(),
            campaign_id: campaign.id.clone(),
            magic_link_code: code.clone(),
            selling_url: self.links.selling_url(code),
            portal_url: self.links.portal_url(code),
            already_registered: enrollment.already_registered,
            seller_created: enrollment.seller_created,
        };

        if outcome.already_registered {
            debug!(
                student_id = %outcome.student_id,
                campaign_id = %outcome.campaign_id,
                "Repeat registration, returning existing link"
            );
        } else {
            info!(
                student_id = %outcome.student_id,
                campaign_id = %outcome.campaign_id,
                seller_created = outcome.seller_created,
                "Seller registered"
            );
            dispatch_welcome(
                self.notifier.clone(),
                WelcomeMessage {
                    student_id: outcome.student_id.clone(),
                    seller_name: enrollment.seller.name.clone(),
                    email: enrollment.seller.email.clone(),
                    campaign_id: campaign.id.clone(),
                    campaign_name: campaign.name.clone(),
                    selling_url: outcome.selling_url.clone(),
                    portal_url: outcome.portal_url.clone(),
                },
            );
        }

        Ok(outcome)
    }

    /// 已有卖家加入活动
    pub async fn join_campaign(&self, campaign_id: &str, student_id: &str) -> Result<JoinResult> {
        let campaign = self
            .storage
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| FundlinkerError::not_found(format!("Campaign '{}' not found", campaign_id)))?;
        ensure_registration_open(&campaign)?;

        let seller = self
            .storage
            .get_seller(student_id)
            .await?
            .ok_or_else(|| FundlinkerError::not_found(format!("Seller '{}' not found", student_id)))?;
        if seller.organization_id != campaign.organization_id {
            // 跨组织视为不存在
            return Err(FundlinkerError::not_found(format!(
                "Seller '{}' not found",
                student_id
            )));
        }

        let storage = &self.storage;
        let magic_bytes = self.magic_code_bytes;
        let (attribution, already_registered) =
            retry::with_retry("join_campaign", storage.retry_config(), move || async move {
                storage
                    .join_campaign(campaign_id, student_id, magic_bytes)
                    .await
            })
            .await?;

        Ok(JoinResult {
            magic_link_code: attribution.magic_link_code,
            already_registered,
        })
    }

    /// magic code → 售卖上下文
    pub async fn resolve_magic_code(&self, code: &str) -> Result<SellingContext> {
        let not_found = || FundlinkerError::not_found("Selling link not found");

        let attribution = self
            .storage
            .find_attribution_by_magic_code(code.trim())
            .await?
            .ok_or_else(not_found)?;
        let campaign = self
            .storage
            .get_campaign(&attribution.campaign_id)
            .await?
            .ok_or_else(not_found)?;
        let seller = self
            .storage
            .get_seller(&attribution.student_id)
            .await?
            .ok_or_else(not_found)?;
        let products = self.storage.list_products(&campaign.id).await?;

        Ok(SellingContext {
            campaign: CampaignPublicInfo::from(&campaign),
            tracking_mode: campaign.tracking_mode,
            student_id: seller.id,
            seller_name: seller.name,
            seller_active: seller.is_active,
            total_sales: attribution.total_sales,
            order_count: attribution.order_count,
            products,
            selling_url: self.links.selling_url(&attribution.magic_link_code),
            portal_url: self.links.portal_url(&attribution.magic_link_code),
        })
    }
}
