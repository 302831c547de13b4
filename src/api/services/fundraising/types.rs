//! API 请求 / 响应类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{EntryMethod, OrderFilter, PaymentStatus, Seller};

/// 统一 JSON 信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 订单列表 / 导出的过滤参数
///
/// `status` 与 `payment_status` 等价，导出接口习惯用前者
#[derive(Deserialize, Clone, Debug, Default)]
pub struct OrderQuery {
    #[serde(default, alias = "status")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub entry_method: Option<EntryMethod>,
    #[serde(default)]
    pub seller_id: Option<String>,
}

impl From<OrderQuery> for OrderFilter {
    fn from(query: OrderQuery) -> Self {
        OrderFilter {
            payment_status: query.payment_status,
            entry_method: query.entry_method,
            student_id: query.seller_id.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// 卖家公开字段（不含联系方式）
#[derive(Serialize, Clone, Debug)]
pub struct SellerResponse {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub grade: Option<String>,
    pub group: Option<String>,
    pub unique_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Seller> for SellerResponse {
    fn from(seller: Seller) -> Self {
        Self {
            id: seller.id,
            organization_id: seller.organization_id,
            name: seller.name,
            grade: seller.grade,
            group: seller.group,
            unique_code: seller.unique_code,
            is_active: seller.is_active,
            created_at: seller.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_status_alias() {
        let query: OrderQuery =
            serde_json::from_str(r#"{"status":"pending","seller_id":"  "}"#).unwrap();
        let filter = OrderFilter::from(query);
        assert_eq!(filter.payment_status, Some(PaymentStatus::Pending));
        assert!(filter.student_id.is_none());
        assert!(filter.entry_method.is_none());
    }

    #[test]
    fn test_envelope_omits_empty_data() {
        let body = ApiResponse::<()> {
            code: 1004,
            message: "missing".into(),
            data: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["code"], 1004);
    }
}
