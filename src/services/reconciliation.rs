//! Reconciliation
//!
//! 汇总均为订单集合上的纯函数。对任意订单快照恒有
//! `total_expected == collected_online + collected_offline + outstanding`。

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::{FundlinkerError, Result};
use crate::storage::{
    EntryMethod, Order, OrderFilter, PaymentMethod, PaymentStatus, SeaOrmStorage, Seller,
};
use crate::utils::csv_handler::render_csv;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub total_expected: Decimal,
    pub collected_online: Decimal,
    pub collected_offline: Decimal,
    pub outstanding: Decimal,
    /// 线下收款中的现金部分
    pub collected_cash: Decimal,
    /// 线下收款中的支票部分
    pub collected_check: Decimal,
    pub order_count: usize,
    pub paid_count: usize,
    pub pending_count: usize,
}

impl ReconciliationSummary {
    pub fn is_balanced(&self) -> bool {
        self.total_expected == self.collected_online + self.collected_offline + self.outstanding
    }
}

pub fn summarize(orders: &[Order]) -> ReconciliationSummary {
    let mut summary = ReconciliationSummary::default();
    for order in orders {
        summary.order_count += 1;
        summary.total_expected += order.total;
        match order.payment_status {
            PaymentStatus::Pending => {
                summary.pending_count += 1;
                summary.outstanding += order.total;
            }
            PaymentStatus::Paid => {
                summary.paid_count += 1;
                match order.entry_method {
                    EntryMethod::Online => summary.collected_online += order.total,
                    EntryMethod::Manual => {
                        summary.collected_offline += order.total;
                        match order.payment_method {
                            PaymentMethod::Check => summary.collected_check += order.total,
                            // 人工登记却标成 online 的旧数据按现金计
                            PaymentMethod::Cash | PaymentMethod::Online => {
                                summary.collected_cash += order.total
                            }
                        }
                    }
                }
            }
        }
    }
    summary
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerTotals {
    /// None 表示未归属任何卖家的订单
    pub student_id: Option<String>,
    pub seller_name: String,
    pub expected: Decimal,
    pub collected: Decimal,
    pub outstanding: Decimal,
    pub order_count: usize,
}

pub const UNATTRIBUTED_LABEL: &str = "(unattributed)";

/// 按卖家拆分，按应收降序、名字升序
pub fn seller_breakdown(orders: &[Order], sellers: &[Seller]) -> Vec<SellerTotals> {
    let names: HashMap<&str, &str> = sellers
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();

    let mut totals: HashMap<Option<&str>, SellerTotals> = HashMap::new();
    for order in orders {
        let key = order.student_id.as_deref();
        let entry = totals.entry(key).or_insert_with(|| SellerTotals {
            student_id: key.map(str::to_string),
            seller_name: match key {
                Some(id) => names.get(id).copied().unwrap_or(id).to_string(),
                None => UNATTRIBUTED_LABEL.to_string(),
            },
            expected: Decimal::ZERO,
            collected: Decimal::ZERO,
            outstanding: Decimal::ZERO,
            order_count: 0,
        });
        entry.order_count += 1;
        entry.expected += order.total;
        match order.payment_status {
            PaymentStatus::Paid => entry.collected += order.total,
            PaymentStatus::Pending => entry.outstanding += order.total,
        }
    }

    let mut rows: Vec<SellerTotals> = totals.into_values().collect();
    rows.sort_by(|a, b| match b.expected.cmp(&a.expected) {
        Ordering::Equal => a
            .seller_name
            .cmp(&b.seller_name)
            .then_with(|| a.student_id.cmp(&b.student_id)),
        other => other,
    });
    rows
}

/// 对账报表的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub order_number: String,
    pub customer_name: String,
    pub recipient: Option<String>,
    pub seller: Option<String>,
    pub total: Decimal,
    pub payment_status: PaymentStatus,
    pub entry_method: EntryMethod,
    pub date: DateTime<Utc>,
}

/// 订单投影为报表行，按 (created_at, order_number) 排序，无副作用
pub fn report_rows(orders: &[Order], sellers: &[Seller], filter: &OrderFilter) -> Vec<ReportRow> {
    let names: HashMap<&str, &str> = sellers
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();

    let mut selected: Vec<&Order> = orders.iter().filter(|o| filter.matches(o)).collect();
    selected.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.order_number.cmp(&b.order_number))
    });

    selected
        .into_iter()
        .map(|order| {
            let recipients: BTreeSet<&str> = order
                .items
                .iter()
                .filter_map(|i| i.recipient_name.as_deref())
                .collect();
            ReportRow {
                order_number: order.order_number.clone(),
                customer_name: order.customer_name.clone(),
                recipient: if recipients.is_empty() {
                    None
                } else {
                    Some(recipients.into_iter().collect::<Vec<_>>().join("; "))
                },
                seller: order
                    .student_id
                    .as_deref()
                    .map(|id| names.get(id).copied().unwrap_or(id).to_string()),
                total: order.total,
                payment_status: order.payment_status,
                entry_method: order.entry_method,
                date: order.created_at,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignReconciliation {
    pub campaign_id: String,
    pub campaign_name: String,
    pub summary: ReconciliationSummary,
    pub sellers: Vec<SellerTotals>,
}

pub struct ReconciliationService {
    storage: Arc<SeaOrmStorage>,
}

impl ReconciliationService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    async fn load(&self, campaign_id: &str) -> Result<(String, Vec<Order>, Vec<Seller>)> {
        let campaign = self
            .storage
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| FundlinkerError::not_found(format!("Campaign '{}' not found", campaign_id)))?;

        let orders = self
            .storage
            .list_orders(campaign_id, &OrderFilter::default())
            .await?;

        let seller_ids: Vec<String> = orders
            .iter()
            .filter_map(|o| o.student_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let sellers = self.storage.list_sellers(&seller_ids).await?;

        Ok((campaign.name, orders, sellers))
    }

    pub async fn campaign_report(&self, campaign_id: &str) -> Result<CampaignReconciliation> {
        let (campaign_name, orders, sellers) = self.load(campaign_id).await?;
        let summary = summarize(&orders);
        if !summary.is_balanced() {
            // 纯加法下不可能出现；出现即说明数据被外部改动
            tracing::error!(campaign_id = %campaign_id, "Reconciliation totals do not balance");
        }
        Ok(CampaignReconciliation {
            campaign_id: campaign_id.to_string(),
            campaign_name,
            summary,
            sellers: seller_breakdown(&orders, &sellers),
        })
    }

    pub async fn export_rows(&self, campaign_id: &str, filter: &OrderFilter) -> Result<Vec<ReportRow>> {
        let (_, orders, sellers) = self.load(campaign_id).await?;
        Ok(report_rows(&orders, &sellers, filter))
    }

    pub async fn export_csv(&self, campaign_id: &str, filter: &OrderFilter) -> Result<String> {
        let rows = self.export_rows(campaign_id, filter).await?;
        render_csv(&rows)
    }
}
