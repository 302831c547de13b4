//! 订单与付款
//!
//! 订单号来自每个组织一行的计数器，在下单事务内自增，永不复用。
//! 标记付款是一条带 `payment_status = 'pending'` 条件的 UPDATE，
//! 同一订单的并发请求只有一个能成功。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    ExprTrait, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info, warn};

use super::SeaOrmStorage;
use super::attributions::refresh_aggregates;
use super::converters::{model_to_order, model_to_order_item};
use crate::errors::{FundlinkerError, Result};
use crate::storage::models::{
    EntryMethod, Order, OrderFilter, OrderItem, PaymentMethod, PaymentStatus,
};
use crate::utils::money::to_cents;
use migration::entities::{order, order_item, order_sequence};

/// 已定价、已校验的订单
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub campaign_id: String,
    pub organization_id: String,
    pub student_id: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub payment_status: PaymentStatus,
    pub entry_method: EntryMethod,
    pub payment_method: PaymentMethod,
    pub check_number: Option<String>,
    pub collected_by: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// 幂等键只在同一渠道内比较
    pub idempotency_scope: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderInsert {
    pub order: Order,
    /// 命中幂等键，返回的是已有订单
    pub replayed: bool,
}

/// 人工登记付款
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub method: PaymentMethod,
    pub check_number: Option<String>,
    pub collected_by: Option<String>,
    pub notes: Option<String>,
}

pub fn format_order_number(prefix: &str, value: i64, width: usize) -> String {
    format!("{}-{:0width$}", prefix, value, width = width)
}

/// 在事务内取下一个订单号
async fn next_order_number<C: ConnectionTrait>(
    conn: &C,
    organization_id: &str,
    prefix: &str,
    width: usize,
) -> Result<String> {
    order_sequence::Entity::insert(order_sequence::ActiveModel {
        organization_id: Set(organization_id.to_string()),
        last_value: Set(0),
    })
    .on_conflict(
        OnConflict::new()
            .do_nothing_on([order_sequence::Column::OrganizationId])
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    order_sequence::Entity::update_many()
        .col_expr(
            order_sequence::Column::LastValue,
            Expr::col(order_sequence::Column::LastValue).add(1),
        )
        .filter(order_sequence::Column::OrganizationId.eq(organization_id))
        .exec(conn)
        .await?;

    let sequence = order_sequence::Entity::find_by_id(organization_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| {
            FundlinkerError::database_operation(format!(
                "订单号计数器丢失: {}",
                organization_id
            ))
        })?;

    Ok(format_order_number(prefix, sequence.last_value, width))
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_ids: Vec<String>,
) -> Result<HashMap<String, Vec<OrderItem>>> {
    let mut grouped: HashMap<String, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    // 分批，避免 SQLite 的参数个数上限
    for chunk in order_ids.chunks(500) {
        let models = order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(chunk.iter().cloned()))
            .order_by_asc(order_item::Column::OrderId)
            .order_by_asc(order_item::Column::Position)
            .all(conn)
            .await?;
        for model in models {
            grouped
                .entry(model.order_id.clone())
                .or_default()
                .push(model_to_order_item(model));
        }
    }
    Ok(grouped)
}

async fn hydrate<C: ConnectionTrait>(conn: &C, models: Vec<order::Model>) -> Result<Vec<Order>> {
    let mut items = load_items(conn, models.iter().map(|m| m.id.clone()).collect()).await?;
    models
        .into_iter()
        .map(|model| {
            let order_items = items.remove(&model.id).unwrap_or_default();
            model_to_order(model, order_items)
        })
        .collect()
}

async fn find_order<C: ConnectionTrait>(conn: &C, id: &str) -> Result<Option<Order>> {
    let Some(model) = order::Entity::find_by_id(id.to_string()).one(conn).await? else {
        return Ok(None);
    };
    Ok(hydrate(conn, vec![model]).await?.pop())
}

async fn find_by_idempotency_key<C: ConnectionTrait>(
    conn: &C,
    campaign_id: &str,
    scope: &str,
    key: &str,
) -> Result<Option<Order>> {
    let Some(model) = order::Entity::find()
        .filter(order::Column::CampaignId.eq(campaign_id))
        .filter(order::Column::IdempotencyScope.eq(scope))
        .filter(order::Column::IdempotencyKey.eq(key))
        .one(conn)
        .await?
    else {
        return Ok(None);
    };
    Ok(hydrate(conn, vec![model]).await?.pop())
}

/// 已有订单是否就是这次提交的重放
///
/// 比较卖家、渠道、顾客与购物车；价格快照不参与比较。
fn is_same_submission(existing: &Order, new: &NewOrder) -> bool {
    let same_items = existing.items.len() == new.items.len()
        && existing.items.iter().zip(&new.items).all(|(stored, submitted)| {
            stored.campaign_product_id == submitted.campaign_product_id
                && stored.quantity == submitted.quantity
                && stored.recipient_name == submitted.recipient_name
        });

    // 待付款订单之后被人工标记付款，付款方式可能已变
    let settled_since = existing.payment_status == PaymentStatus::Paid
        && new.payment_status == PaymentStatus::Pending;

    same_items
        && existing.student_id == new.student_id
        && existing.entry_method == new.entry_method
        && (settled_since || existing.payment_method == new.payment_method)
        && existing.customer_name == new.customer_name
        && existing.customer_email == new.customer_email
        && existing.customer_phone == new.customer_phone
}

/// 命中幂等键：相同提交返回已有订单，否则冲突且不回显已有订单
fn replay_or_conflict(existing: Order, new: &NewOrder) -> Result<OrderInsert> {
    if !is_same_submission(&existing, new) {
        warn!(
            campaign_id = %new.campaign_id,
            scope = %new.idempotency_scope,
            "Idempotency key reused for a different order"
        );
        return Err(FundlinkerError::conflict(
            "idempotency_key was already used for a different order",
        ));
    }
    debug!(order_number = %existing.order_number, "Idempotency key replayed");
    Ok(OrderInsert {
        order: existing,
        replayed: true,
    })
}

fn append_note(existing: Option<String>, addition: Option<&str>) -> Option<String> {
    match (existing, addition.map(str::trim).filter(|n| !n.is_empty())) {
        (Some(old), Some(new)) if !old.is_empty() => Some(format!("{}\n{}", old, new)),
        (_, Some(new)) => Some(new.to_string()),
        (old, None) => old,
    }
}

impl SeaOrmStorage {
    /// 写入订单及明细、分配订单号、刷新卖家汇总，全部在一个事务内
    pub async fn insert_order(
        &self,
        new: &NewOrder,
        number_prefix: &str,
        number_width: usize,
    ) -> Result<OrderInsert> {
        if let Some(ref key) = new.idempotency_key
            && let Some(existing) =
                find_by_idempotency_key(&self.db, &new.campaign_id, &new.idempotency_scope, key)
                    .await?
        {
            return replay_or_conflict(existing, new);
        }

        let subtotal_cents = to_cents(new.subtotal)?;
        let total_cents = to_cents(new.total)?;
        let mut item_models = Vec::with_capacity(new.items.len());
        let order_id = uuid::Uuid::new_v4().to_string();
        for (position, item) in new.items.iter().enumerate() {
            item_models.push(order_item::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                order_id: Set(order_id.clone()),
                position: Set(position as i32),
                campaign_product_id: Set(item.campaign_product_id.clone()),
                product_name: Set(item.product_name.clone()),
                quantity: Set(i32::try_from(item.quantity).map_err(|_| {
                    FundlinkerError::invalid_quantity(format!(
                        "quantity {} is too large",
                        item.quantity
                    ))
                })?),
                unit_price_cents: Set(to_cents(item.unit_price)?),
                recipient_name: Set(item.recipient_name.clone()),
            });
        }

        let txn = self.begin().await?;

        let order_number = next_order_number(
            &txn,
            &new.organization_id,
            number_prefix,
            number_width,
        )
        .await?;
        let created_at = Utc::now();

        let inserted = order::Entity::insert(order::ActiveModel {
            id: Set(order_id.clone()),
            campaign_id: Set(new.campaign_id.clone()),
            student_id: Set(new.student_id.clone()),
            order_number: Set(order_number.clone()),
            customer_name: Set(new.customer_name.clone()),
            customer_email: Set(new.customer_email.clone()),
            customer_phone: Set(new.customer_phone.clone()),
            subtotal_cents: Set(subtotal_cents),
            total_cents: Set(total_cents),
            payment_status: Set(new.payment_status.to_string()),
            entry_method: Set(new.entry_method.to_string()),
            payment_method: Set(new.payment_method.to_string()),
            check_number: Set(new.check_number.clone()),
            collected_by: Set(new.collected_by.clone()),
            paid_at: Set(new.paid_at),
            notes: Set(new.notes.clone()),
            idempotency_scope: Set(new
                .idempotency_key
                .as_ref()
                .map(|_| new.idempotency_scope.clone())),
            idempotency_key: Set(new.idempotency_key.clone()),
            created_at: Set(created_at),
        })
        .on_conflict(
            OnConflict::new()
                .do_nothing_on([
                    order::Column::CampaignId,
                    order::Column::IdempotencyScope,
                    order::Column::IdempotencyKey,
                ])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        if inserted == 0 {
            // 唯一冲突只可能来自并发的同幂等键请求；计数器自增随事务一起回滚
            txn.rollback().await?;
            if let Some(ref key) = new.idempotency_key
                && let Some(existing) = find_by_idempotency_key(
                    &self.db,
                    &new.campaign_id,
                    &new.idempotency_scope,
                    key,
                )
                .await?
            {
                return replay_or_conflict(existing, new);
            }
            return Err(FundlinkerError::conflict(format!(
                "订单号冲突: {}",
                order_number
            )));
        }

        order_item::Entity::insert_many(item_models)
            .exec_without_returning(&txn)
            .await?;

        if let Some(ref student_id) = new.student_id {
            refresh_aggregates(&txn, &new.campaign_id, student_id).await?;
        }

        txn.commit().await?;

        info!(
            order_number = %order_number,
            campaign_id = %new.campaign_id,
            student_id = ?new.student_id,
            total = %new.total,
            payment_status = %new.payment_status,
            "Order created"
        );

        Ok(OrderInsert {
            order: Order {
                id: order_id,
                campaign_id: new.campaign_id.clone(),
                student_id: new.student_id.clone(),
                order_number,
                customer_name: new.customer_name.clone(),
                customer_email: new.customer_email.clone(),
                customer_phone: new.customer_phone.clone(),
                items: new.items.clone(),
                subtotal: new.subtotal,
                total: new.total,
                payment_status: new.payment_status,
                entry_method: new.entry_method,
                payment_method: new.payment_method,
                check_number: new.check_number.clone(),
                collected_by: new.collected_by.clone(),
                paid_at: new.paid_at,
                notes: new.notes.clone(),
                idempotency_key: new.idempotency_key.clone(),
                created_at,
            },
            replayed: false,
        })
    }

    pub async fn get_order(&self, id: &str) -> Result<Option<Order>> {
        find_order(&self.db, id).await
    }

    /// 按活动列出订单，新的在前
    pub async fn list_orders(&self, campaign_id: &str, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut query = order::Entity::find().filter(order::Column::CampaignId.eq(campaign_id));

        if let Some(status) = filter.payment_status {
            query = query.filter(order::Column::PaymentStatus.eq(status.to_string()));
        }
        if let Some(method) = filter.entry_method {
            query = query.filter(order::Column::EntryMethod.eq(method.to_string()));
        }
        if let Some(ref student_id) = filter.student_id {
            query = query.filter(order::Column::StudentId.eq(student_id.as_str()));
        }

        let models = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::OrderNumber)
            .all(&self.db)
            .await?;

        hydrate(&self.db, models).await
    }

    /// 将待付款订单标记为已付款（不可逆）
    ///
    /// 已付款再次调用返回 `OrderAlreadyPaid`，状态与汇总都不变。
    pub async fn mark_paid(&self, order_id: &str, payment: &PaymentUpdate) -> Result<Order> {
        let txn = self.db.begin().await?;

        let Some(current) = order::Entity::find_by_id(order_id.to_string())
            .one(&txn)
            .await?
        else {
            return Err(FundlinkerError::not_found(format!(
                "订单不存在: {}",
                order_id
            )));
        };

        if current.payment_status != PaymentStatus::Pending.to_string() {
            warn!(order_number = %current.order_number, "Order is already paid");
            return Err(FundlinkerError::order_already_paid(format!(
                "订单 {} 已付款",
                current.order_number
            )));
        }

        let notes = append_note(current.notes.clone(), payment.notes.as_deref());

        let result = order::Entity::update_many()
            .col_expr(
                order::Column::PaymentStatus,
                Expr::value(PaymentStatus::Paid.to_string()),
            )
            .col_expr(
                order::Column::EntryMethod,
                Expr::value(EntryMethod::Manual.to_string()),
            )
            .col_expr(
                order::Column::PaymentMethod,
                Expr::value(payment.method.to_string()),
            )
            .col_expr(
                order::Column::CheckNumber,
                Expr::value(payment.check_number.clone()),
            )
            .col_expr(
                order::Column::CollectedBy,
                Expr::value(payment.collected_by.clone()),
            )
            .col_expr(order::Column::PaidAt, Expr::value(Some(Utc::now())))
            .col_expr(order::Column::Notes, Expr::value(notes))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::PaymentStatus.eq(PaymentStatus::Pending.to_string()))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            warn!(order_number = %current.order_number, "Order was paid concurrently");
            return Err(FundlinkerError::order_already_paid(format!(
                "订单 {} 已付款",
                current.order_number
            )));
        }

        if let Some(ref student_id) = current.student_id {
            refresh_aggregates(&txn, &current.campaign_id, student_id).await?;
        }

        let updated = find_order(&txn, order_id).await?.ok_or_else(|| {
            FundlinkerError::not_found(format!("订单不存在: {}", order_id))
        })?;

        txn.commit().await?;

        info!(
            order_number = %updated.order_number,
            method = %payment.method,
            collected_by = ?payment.collected_by,
            "Order marked paid"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_order_number() {
        assert_eq!(format_order_number("FR", 1, 6), "FR-000001");
        assert_eq!(format_order_number("BAKE", 1234567, 6), "BAKE-1234567");
    }

    fn stored_order() -> Order {
        Order {
            id: "o1".into(),
            campaign_id: "c1".into(),
            student_id: Some("alice".into()),
            order_number: "FR-000001".into(),
            customer_name: "Pat Buyer".into(),
            customer_email: Some("pat@example.com".into()),
            customer_phone: "555-0100".into(),
            items: vec![OrderItem {
                campaign_product_id: "p1".into(),
                product_name: "Cookie Dough".into(),
                quantity: 2,
                unit_price: Decimal::new(1250, 2),
                recipient_name: None,
            }],
            subtotal: Decimal::new(2500, 2),
            total: Decimal::new(2500, 2),
            payment_status: PaymentStatus::Pending,
            entry_method: EntryMethod::Manual,
            payment_method: PaymentMethod::Cash,
            check_number: None,
            collected_by: None,
            paid_at: None,
            notes: None,
            idempotency_key: Some("k1".into()),
            created_at: Utc::now(),
        }
    }

    fn resubmission(order: &Order) -> NewOrder {
        NewOrder {
            campaign_id: order.campaign_id.clone(),
            organization_id: "org1".into(),
            student_id: order.student_id.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            customer_phone: order.customer_phone.clone(),
            items: order.items.clone(),
            subtotal: order.subtotal,
            total: order.total,
            payment_status: PaymentStatus::Pending,
            entry_method: order.entry_method,
            payment_method: order.payment_method,
            check_number: None,
            collected_by: None,
            paid_at: None,
            notes: None,
            idempotency_scope: "staff".into(),
            idempotency_key: order.idempotency_key.clone(),
        }
    }

    #[test]
    fn test_same_submission_matches() {
        let order = stored_order();
        assert!(is_same_submission(&order, &resubmission(&order)));

        // 价格快照不同不影响
        let mut repriced = resubmission(&order);
        repriced.items[0].unit_price = Decimal::new(1500, 2);
        assert!(is_same_submission(&order, &repriced));

        // 之后被标记为支票付款
        let mut paid = order.clone();
        paid.payment_status = PaymentStatus::Paid;
        paid.payment_method = PaymentMethod::Check;
        assert!(is_same_submission(&paid, &resubmission(&order)));
    }

    #[test]
    fn test_different_submission_does_not_match() {
        let order = stored_order();

        let mut other_seller = resubmission(&order);
        other_seller.student_id = Some("bob".into());
        assert!(!is_same_submission(&order, &other_seller));

        let mut other_customer = resubmission(&order);
        other_customer.customer_phone = "555-1111".into();
        assert!(!is_same_submission(&order, &other_customer));

        let mut other_cart = resubmission(&order);
        other_cart.items[0].quantity = 3;
        assert!(!is_same_submission(&order, &other_cart));

        let mut online = resubmission(&order);
        online.entry_method = EntryMethod::Online;
        online.payment_method = PaymentMethod::Online;
        online.payment_status = PaymentStatus::Paid;
        assert!(!is_same_submission(&order, &online));

        let mut check = resubmission(&order);
        check.payment_method = PaymentMethod::Check;
        assert!(!is_same_submission(&order, &check));
    }

    #[test]
    fn test_replay_or_conflict_hides_other_order() {
        let order = stored_order();
        let mut other = resubmission(&order);
        other.customer_name = "Someone Else".into();
        let err = replay_or_conflict(order.clone(), &other).unwrap_err();
        assert!(matches!(err, FundlinkerError::Conflict(_)));
        assert!(!err.to_string().contains("Pat Buyer"));

        let replay = replay_or_conflict(order.clone(), &resubmission(&order)).unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.order.order_number, "FR-000001");
    }

    #[test]
    fn test_append_note() {
        assert_eq!(append_note(None, Some(" paid at pickup ")), Some("paid at pickup".into()));
        assert_eq!(
            append_note(Some("call first".into()), Some("cash in envelope")),
            Some("call first\ncash in envelope".into())
        );
        assert_eq!(append_note(Some("keep".into()), Some("  ")), Some("keep".into()));
        assert_eq!(append_note(None, None), None);
    }
}
