//! 卖家与活动的归属（campaign_students 表）
//!
//! (campaign_id, student_id) 唯一，magic_link_code 全局唯一。
//! total_sales / order_count 只从 orders 表重新汇总，不做增量更新。

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info, warn};

use super::SeaOrmStorage;
use super::converters::model_to_attribution;
use super::students::{self, NewSeller};
use crate::errors::{FundlinkerError, Result};
use crate::storage::models::{Attribution, Seller};
use crate::utils::generate_magic_code;
use migration::entities::{campaign_student, order};

const MAX_MAGIC_ATTEMPTS: usize = 4;

/// 一次报名在存储层的结果
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub seller: Seller,
    pub attribution: Attribution,
    pub seller_created: bool,
    pub already_registered: bool,
}

pub(super) async fn find_pair<C: ConnectionTrait>(
    conn: &C,
    campaign_id: &str,
    student_id: &str,
) -> Result<Option<Attribution>> {
    Ok(campaign_student::Entity::find()
        .filter(campaign_student::Column::CampaignId.eq(campaign_id))
        .filter(campaign_student::Column::StudentId.eq(student_id))
        .one(conn)
        .await?
        .map(model_to_attribution))
}

/// 查找或创建归属，返回 (attribution, already_registered)
pub(super) async fn find_or_create<C: ConnectionTrait>(
    conn: &C,
    campaign_id: &str,
    student_id: &str,
    magic_code_bytes: usize,
) -> Result<(Attribution, bool)> {
    if let Some(existing) = find_pair(conn, campaign_id, student_id).await? {
        return Ok((existing, true));
    }

    for _ in 0..MAX_MAGIC_ATTEMPTS {
        let model = campaign_student::Model {
            id: uuid::Uuid::new_v4().to_string(),
            campaign_id: campaign_id.to_string(),
            student_id: student_id.to_string(),
            magic_link_code: generate_magic_code(magic_code_bytes),
            total_sales_cents: 0,
            order_count: 0,
            created_at: Utc::now(),
        };

        let inserted = campaign_student::Entity::insert(campaign_student::ActiveModel {
            id: Set(model.id.clone()),
            campaign_id: Set(model.campaign_id.clone()),
            student_id: Set(model.student_id.clone()),
            magic_link_code: Set(model.magic_link_code.clone()),
            total_sales_cents: Set(0),
            order_count: Set(0),
            created_at: Set(model.created_at),
        })
        .on_conflict(
            OnConflict::new()
                .do_nothing_on([campaign_student::Column::Id])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        if inserted == 1 {
            info!(
                campaign_id = %campaign_id,
                student_id = %student_id,
                "Seller joined campaign"
            );
            return Ok((model_to_attribution(model), false));
        }

        // 并发的同一报名先写入了
        if let Some(winner) = find_pair(conn, campaign_id, student_id).await? {
            debug!(campaign_id = %campaign_id, student_id = %student_id, "Concurrent join won the insert");
            return Ok((winner, true));
        }
    }

    Err(FundlinkerError::conflict(
        "无法生成唯一的 magic link code".to_string(),
    ))
}

/// 从订单表重新汇总某卖家在活动中的销售额与订单数
pub(super) async fn refresh_aggregates<C: ConnectionTrait>(
    conn: &C,
    campaign_id: &str,
    student_id: &str,
) -> Result<()> {
    let totals: Vec<i64> = order::Entity::find()
        .select_only()
        .column(order::Column::TotalCents)
        .filter(order::Column::CampaignId.eq(campaign_id))
        .filter(order::Column::StudentId.eq(student_id))
        .into_tuple()
        .all(conn)
        .await?;

    let total_sales: i64 = totals.iter().sum();
    let order_count = totals.len() as i64;

    campaign_student::Entity::update_many()
        .col_expr(
            campaign_student::Column::TotalSalesCents,
            Expr::value(total_sales),
        )
        .col_expr(campaign_student::Column::OrderCount, Expr::value(order_count))
        .filter(campaign_student::Column::CampaignId.eq(campaign_id))
        .filter(campaign_student::Column::StudentId.eq(student_id))
        .exec(conn)
        .await?;

    debug!(
        campaign_id = %campaign_id,
        student_id = %student_id,
        total_sales,
        order_count,
        "Attribution aggregates refreshed"
    );
    Ok(())
}

impl SeaOrmStorage {
    /// 报名：卖家与归属在同一事务内写入
    ///
    /// 失败时显式回滚；回滚本身失败则记录可能遗留的卖家 id，原始错误照常返回。
    pub async fn enroll(
        &self,
        campaign_id: &str,
        new_seller: &NewSeller,
        seller_code_length: usize,
        magic_code_bytes: usize,
    ) -> Result<Enrollment> {
        let txn = self.begin().await?;

        let mut created_seller_id: Option<String> = None;
        let result: Result<Enrollment> = async {
            let (seller, seller_created) =
                students::find_or_create(&txn, new_seller, seller_code_length).await?;
            if seller_created {
                created_seller_id = Some(seller.id.clone());
            }
            let (attribution, already_registered) =
                find_or_create(&txn, campaign_id, &seller.id, magic_code_bytes).await?;
            Ok(Enrollment {
                seller,
                attribution,
                seller_created,
                already_registered,
            })
        }
        .await;

        match result {
            Ok(enrollment) => {
                txn.commit().await?;
                Ok(enrollment)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    if let Some(ref orphaned_student_id) = created_seller_id {
                        warn!(
                            orphaned_student_id = %orphaned_student_id,
                            campaign_id = %campaign_id,
                            "Registration rollback failed, seller may be left without a campaign: {}",
                            rollback_err
                        );
                    } else {
                        warn!("Registration rollback failed: {}", rollback_err);
                    }
                }
                Err(e)
            }
        }
    }

    /// 已有卖家加入活动（幂等）
    pub async fn join_campaign(
        &self,
        campaign_id: &str,
        student_id: &str,
        magic_code_bytes: usize,
    ) -> Result<(Attribution, bool)> {
        find_or_create(&self.db, campaign_id, student_id, magic_code_bytes).await
    }

    pub async fn get_attribution(
        &self,
        campaign_id: &str,
        student_id: &str,
    ) -> Result<Option<Attribution>> {
        find_pair(&self.db, campaign_id, student_id).await
    }

    pub async fn find_attribution_by_magic_code(&self, code: &str) -> Result<Option<Attribution>> {
        Ok(campaign_student::Entity::find()
            .filter(campaign_student::Column::MagicLinkCode.eq(code))
            .one(&self.db)
            .await?
            .map(model_to_attribution))
    }

    pub async fn list_attributions(&self, campaign_id: &str) -> Result<Vec<Attribution>> {
        let models = campaign_student::Entity::find()
            .filter(campaign_student::Column::CampaignId.eq(campaign_id))
            .order_by_asc(campaign_student::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_attribution).collect())
    }

    pub async fn refresh_attribution(&self, campaign_id: &str, student_id: &str) -> Result<()> {
        let txn = self.db.begin().await?;
        refresh_aggregates(&txn, campaign_id, student_id).await?;
        txn.commit().await?;
        Ok(())
    }
}
