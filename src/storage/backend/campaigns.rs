//! 组织、活动与活动商品
//!
//! 活动的增删改属于宿主系统的后台功能，这里只保留报名/下单/对账需要的读取，
//! 以及建档用的插入。

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::{model_to_campaign, model_to_organization, model_to_product};
use crate::errors::{FundlinkerError, Result};
use crate::storage::models::{Campaign, CampaignStatus, Organization, Product, TrackingMode};
use crate::utils::{generate_random_code, money::to_cents};
use migration::entities::{campaign, campaign_product, organization};

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub organization_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_location: Option<String>,
    pub status: CampaignStatus,
    pub self_registration_open: bool,
    /// 为空时自动生成
    pub self_register_code: Option<String>,
    pub tracking_mode: TrackingMode,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub campaign_id: String,
    pub name: String,
    pub retail_price: Decimal,
    pub max_quantity: Option<u32>,
}

pub(super) async fn find_campaign<C: ConnectionTrait>(conn: &C, id: &str) -> Result<Option<Campaign>> {
    campaign::Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(model_to_campaign)
        .transpose()
}

pub(super) async fn find_products<C: ConnectionTrait>(
    conn: &C,
    campaign_id: &str,
) -> Result<Vec<Product>> {
    let models = campaign_product::Entity::find()
        .filter(campaign_product::Column::CampaignId.eq(campaign_id))
        .order_by_asc(campaign_product::Column::CreatedAt)
        .order_by_asc(campaign_product::Column::Id)
        .all(conn)
        .await?;
    Ok(models.into_iter().map(model_to_product).collect())
}

impl SeaOrmStorage {
    pub async fn create_organization(&self, name: &str) -> Result<Organization> {
        let model = organization::Model {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };
        organization::Entity::insert(organization::ActiveModel {
            id: Set(model.id.clone()),
            name: Set(model.name.clone()),
            created_at: Set(model.created_at),
        })
        .exec_without_returning(&self.db)
        .await?;

        info!(organization_id = %model.id, "Organization created");
        Ok(model_to_organization(model))
    }

    pub async fn get_organization(&self, id: &str) -> Result<Option<Organization>> {
        Ok(organization::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(model_to_organization))
    }

    pub async fn create_campaign(&self, new: NewCampaign) -> Result<Campaign> {
        if new.end_date < new.start_date {
            return Err(FundlinkerError::validation(
                "end_date must not be before start_date",
            ));
        }
        if self.get_organization(&new.organization_id).await?.is_none() {
            return Err(FundlinkerError::not_found(format!(
                "组织不存在: {}",
                new.organization_id
            )));
        }

        let model = campaign::Model {
            id: uuid::Uuid::new_v4().to_string(),
            organization_id: new.organization_id,
            name: new.name.trim().to_string(),
            start_date: new.start_date,
            end_date: new.end_date,
            pickup_date: new.pickup_date,
            pickup_location: new.pickup_location,
            status: new.status.to_string(),
            self_registration_open: new.self_registration_open,
            self_register_code: new
                .self_register_code
                .unwrap_or_else(|| generate_random_code(10)),
            tracking_mode: new.tracking_mode.to_string(),
            created_at: Utc::now(),
        };

        campaign::Entity::insert(campaign::ActiveModel {
            id: Set(model.id.clone()),
            organization_id: Set(model.organization_id.clone()),
            name: Set(model.name.clone()),
            start_date: Set(model.start_date),
            end_date: Set(model.end_date),
            pickup_date: Set(model.pickup_date),
            pickup_location: Set(model.pickup_location.clone()),
            status: Set(model.status.clone()),
            self_registration_open: Set(model.self_registration_open),
            self_register_code: Set(model.self_register_code.clone()),
            tracking_mode: Set(model.tracking_mode.clone()),
            created_at: Set(model.created_at),
        })
        .exec_without_returning(&self.db)
        .await
        .map_err(|e| {
            if super::retry::is_unique_violation(&e) {
                FundlinkerError::conflict(format!(
                    "报名码已被占用: {}",
                    model.self_register_code
                ))
            } else {
                FundlinkerError::from(e)
            }
        })?;

        info!(campaign_id = %model.id, "Campaign created");
        model_to_campaign(model)
    }

    pub async fn add_product(&self, new: NewProduct) -> Result<Product> {
        if new.retail_price < Decimal::ZERO {
            return Err(FundlinkerError::validation("retail_price must not be negative"));
        }
        let max_quantity = new
            .max_quantity
            .map(|q| {
                i32::try_from(q)
                    .map_err(|_| FundlinkerError::invalid_quantity("max_quantity is too large"))
            })
            .transpose()?;

        let model = campaign_product::Model {
            id: uuid::Uuid::new_v4().to_string(),
            campaign_id: new.campaign_id,
            name: new.name.trim().to_string(),
            retail_price_cents: to_cents(new.retail_price)?,
            max_quantity,
            created_at: Utc::now(),
        };

        campaign_product::Entity::insert(campaign_product::ActiveModel {
            id: Set(model.id.clone()),
            campaign_id: Set(model.campaign_id.clone()),
            name: Set(model.name.clone()),
            retail_price_cents: Set(model.retail_price_cents),
            max_quantity: Set(model.max_quantity),
            created_at: Set(model.created_at),
        })
        .exec_without_returning(&self.db)
        .await?;

        Ok(model_to_product(model))
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>> {
        find_campaign(&self.db, id).await
    }

    pub async fn find_campaign_by_register_code(&self, code: &str) -> Result<Option<Campaign>> {
        campaign::Entity::find()
            .filter(campaign::Column::SelfRegisterCode.eq(code))
            .one(&self.db)
            .await?
            .map(model_to_campaign)
            .transpose()
    }

    pub async fn list_products(&self, campaign_id: &str) -> Result<Vec<Product>> {
        find_products(&self.db, campaign_id).await
    }
}
