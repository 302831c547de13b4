//! 卖家身份（students 表）
//!
//! 组织内按 lower(trim(email)) 去重。并发首次报名同一邮箱时依赖唯一索引：
//! 插入冲突后重新查询，返回胜出的那一行。

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::model_to_seller;
use crate::errors::{FundlinkerError, Result};
use crate::storage::models::Seller;
use crate::utils::{email::normalize_email, generate_random_code};
use migration::entities::student;

/// 卖家编号碰撞时的最大重试次数
const MAX_CODE_ATTEMPTS: usize = 8;

/// 已校验、已 trim 的卖家资料
#[derive(Debug, Clone)]
pub struct NewSeller {
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub grade: Option<String>,
    pub group: Option<String>,
}

pub(super) async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    organization_id: &str,
    email: &str,
) -> Result<Option<Seller>> {
    let model = student::Entity::find()
        .filter(student::Column::OrganizationId.eq(organization_id))
        .filter(student::Column::EmailNormalized.eq(normalize_email(email)))
        .one(conn)
        .await?;
    Ok(model.map(model_to_seller))
}

pub(super) async fn find_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> Result<Option<Seller>> {
    Ok(student::Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(model_to_seller))
}

/// 查找或创建卖家，返回 (seller, created)
///
/// 已存在的资料不会被后来的报名覆盖。
pub(super) async fn find_or_create<C: ConnectionTrait>(
    conn: &C,
    new: &NewSeller,
    code_length: usize,
) -> Result<(Seller, bool)> {
    if let Some(ref email) = new.email
        && let Some(existing) = find_by_email(conn, &new.organization_id, email).await?
    {
        debug!(student_id = %existing.id, "Seller already exists for email");
        return Ok((existing, false));
    }

    for _ in 0..MAX_CODE_ATTEMPTS {
        let model = student::Model {
            id: uuid::Uuid::new_v4().to_string(),
            organization_id: new.organization_id.clone(),
            name: new.name.clone(),
            email: new.email.clone(),
            email_normalized: new.email.as_deref().map(normalize_email),
            phone: new.phone.clone(),
            grade: new.grade.clone(),
            group_name: new.group.clone(),
            unique_code: generate_random_code(code_length),
            is_active: true,
            created_at: Utc::now(),
        };

        let active = student::ActiveModel {
            id: Set(model.id.clone()),
            organization_id: Set(model.organization_id.clone()),
            name: Set(model.name.clone()),
            email: Set(model.email.clone()),
            email_normalized: Set(model.email_normalized.clone()),
            phone: Set(model.phone.clone()),
            grade: Set(model.grade.clone()),
            group_name: Set(model.group_name.clone()),
            unique_code: Set(model.unique_code.clone()),
            is_active: Set(model.is_active),
            created_at: Set(model.created_at),
        };

        let inserted = student::Entity::insert(active)
            .on_conflict(
                OnConflict::new()
                    .do_nothing_on([student::Column::Id])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        if inserted == 1 {
            info!(
                student_id = %model.id,
                organization_id = %model.organization_id,
                "Seller created"
            );
            return Ok((model_to_seller(model), true));
        }

        // 冲突：要么同邮箱被并发请求抢先插入，要么卖家编号碰撞
        if let Some(ref email) = new.email
            && let Some(winner) = find_by_email(conn, &new.organization_id, email).await?
        {
            debug!(student_id = %winner.id, "Concurrent registration won the insert");
            return Ok((winner, false));
        }
        debug!("Seller code collision, regenerating");
    }

    Err(FundlinkerError::conflict(format!(
        "无法为组织 {} 分配唯一卖家编号",
        new.organization_id
    )))
}

impl SeaOrmStorage {
    pub async fn resolve_or_create_seller(
        &self,
        new: &NewSeller,
        code_length: usize,
    ) -> Result<(Seller, bool)> {
        find_or_create(&self.db, new, code_length).await
    }

    pub async fn get_seller(&self, id: &str) -> Result<Option<Seller>> {
        find_by_id(&self.db, id).await
    }

    pub async fn find_seller_by_email(
        &self,
        organization_id: &str,
        email: &str,
    ) -> Result<Option<Seller>> {
        find_by_email(&self.db, organization_id, email).await
    }

    /// 批量加载卖家（报表用）
    pub async fn list_sellers(&self, ids: &[String]) -> Result<Vec<Seller>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = student::Entity::find()
            .filter(student::Column::Id.is_in(ids.iter().cloned()))
            .order_by_asc(student::Column::Name)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_seller).collect())
    }

    /// 启用/停用卖家，历史订单不受影响
    pub async fn set_seller_active(&self, id: &str, active: bool) -> Result<Seller> {
        // MySQL 对未变化的行返回 0，因此以重新查询判断是否存在
        student::Entity::update_many()
            .col_expr(student::Column::IsActive, Expr::value(active))
            .filter(student::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        let seller = self
            .get_seller(id)
            .await?
            .ok_or_else(|| FundlinkerError::not_found(format!("卖家不存在: {}", id)))?;
        info!(student_id = %id, active, "Seller active flag updated");
        Ok(seller)
    }
}
