use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 活动状态
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CampaignStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    /// 只有草稿和进行中的活动接受报名
    pub fn accepts_registration(self) -> bool {
        matches!(self, CampaignStatus::Draft | CampaignStatus::Active)
    }
}

/// 卖家归属追踪方式
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TrackingMode {
    None,
    Manual,
    SelfRegister,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// 付款的收取渠道：在线网关 / 人工登记
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntryMethod {
    Online,
    Manual,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentMethod {
    Online,
    Cash,
    Check,
}

impl PaymentMethod {
    pub fn entry_method(self) -> EntryMethod {
        match self {
            PaymentMethod::Online => EntryMethod::Online,
            PaymentMethod::Cash | PaymentMethod::Check => EntryMethod::Manual,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// 卖家（学生）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seller {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub grade: Option<String>,
    pub group: Option<String>,
    pub unique_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_location: Option<String>,
    pub status: CampaignStatus,
    pub self_registration_open: bool,
    pub self_register_code: String,
    pub tracking_mode: TrackingMode,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn registration_open(&self) -> bool {
        self.status.accepts_registration() && self.self_registration_open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    pub retail_price: Decimal,
    pub max_quantity: Option<u32>,
}

/// 卖家与活动的归属记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribution {
    pub id: String,
    pub campaign_id: String,
    pub student_id: String,
    pub magic_link_code: String,
    pub total_sales: Decimal,
    pub order_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub campaign_product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub recipient_name: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub campaign_id: String,
    pub student_id: Option<String>,
    pub order_number: String,
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
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// 订单列表过滤条件
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct OrderFilter {
    pub payment_status: Option<PaymentStatus>,
    pub entry_method: Option<EntryMethod>,
    pub student_id: Option<String>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.payment_status
            && order.payment_status != status
        {
            return false;
        }
        if let Some(method) = self.entry_method
            && order.entry_method != method
        {
            return false;
        }
        if let Some(ref student_id) = self.student_id
            && order.student_id.as_deref() != Some(student_id.as_str())
        {
            return false;
        }
        true
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageConfig {
    pub storage_type: String,
}
