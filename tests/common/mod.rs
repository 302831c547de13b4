//! 集成测试共用的 fixture：临时 SQLite 数据库 + 一个组织、一个活动、两件商品

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use fundlinker::errors::{FundlinkerError, Result};
use fundlinker::runtime::lifetime::startup::StartupContext;
use fundlinker::services::{
    CartItem, CreateOrderRequest, CustomerInfo, Notifier, PaymentInput, SellerProfile,
    WelcomeMessage,
};
use fundlinker::storage::{
    Campaign, CampaignStatus, NewCampaign, NewProduct, Organization, PaymentMethod, Product,
    SeaOrmStorage, TrackingMode,
};

/// 记录发送过的欢迎消息
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<WelcomeMessage>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            return Err(FundlinkerError::transient("smtp unavailable"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub struct Fixture {
    // 保持临时目录存活
    _dir: TempDir,
    pub storage: Arc<SeaOrmStorage>,
    pub ctx: StartupContext,
    pub notifier: Arc<RecordingNotifier>,
    pub organization: Organization,
    pub campaign: Campaign,
    /// 12.50
    pub pie: Product,
    /// 5.00
    pub cookies: Product,
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn open_storage(dir: &TempDir) -> Arc<SeaOrmStorage> {
    let db_path = dir.path().join("fundlinker_test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    Arc::new(
        SeaOrmStorage::new(&url, "sqlite")
            .await
            .expect("Failed to create storage"),
    )
}

pub fn new_campaign(organization_id: &str, status: CampaignStatus, code: &str) -> NewCampaign {
    NewCampaign {
        organization_id: organization_id.to_string(),
        name: "Spring Pie Sale".to_string(),
        start_date: date(2026, 3, 1),
        end_date: date(2026, 3, 31),
        pickup_date: Some(date(2026, 4, 5)),
        pickup_location: Some("School gym".to_string()),
        status,
        self_registration_open: true,
        self_register_code: Some(code.to_string()),
        tracking_mode: TrackingMode::SelfRegister,
    }
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default()).await
    }

    pub async fn with_notifier(notifier: RecordingNotifier) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let storage = open_storage(&dir).await;

        let organization = storage.create_organization("Lincoln PTA").await.unwrap();
        let campaign = storage
            .create_campaign(new_campaign(
                &organization.id,
                CampaignStatus::Active,
                "SPRING26",
            ))
            .await
            .unwrap();
        let pie = storage
            .add_product(NewProduct {
                campaign_id: campaign.id.clone(),
                name: "Apple Pie".to_string(),
                retail_price: dec("12.50"),
                max_quantity: None,
            })
            .await
            .unwrap();
        let cookies = storage
            .add_product(NewProduct {
                campaign_id: campaign.id.clone(),
                name: "Cookie Dough".to_string(),
                retail_price: dec("5.00"),
                max_quantity: Some(10),
            })
            .await
            .unwrap();

        let notifier = Arc::new(notifier);
        let ctx = StartupContext::from_storage(storage.clone(), notifier.clone());

        Self {
            _dir: dir,
            storage,
            ctx,
            notifier,
            organization,
            campaign,
            pie,
            cookies,
        }
    }

    /// 新建一个额外的活动（同一组织）
    pub async fn extra_campaign(&self, status: CampaignStatus, code: &str) -> Campaign {
        self.storage
            .create_campaign(new_campaign(&self.organization.id, status, code))
            .await
            .unwrap()
    }

    /// 通过公开报名注册一个卖家，返回 (student_id, magic_link_code)
    pub async fn register(&self, name: &str, email: &str) -> (String, String) {
        let outcome = self
            .ctx
            .registration
            .register(&self.campaign.self_register_code, &profile(name, Some(email)))
            .await
            .unwrap();
        (outcome.student_id, outcome.magic_link_code)
    }

    /// 2 × Apple Pie + 1 × Cookie Dough = 30.00
    pub fn standard_cart(&self) -> Vec<CartItem> {
        vec![
            item(&self.pie.id, 2, Some("Grandma")),
            item(&self.cookies.id, 1, None),
        ]
    }
}

pub fn profile(name: &str, email: Option<&str>) -> SellerProfile {
    SellerProfile {
        name: name.to_string(),
        email: email.map(str::to_string),
        ..Default::default()
    }
}

pub fn item(product_id: &str, quantity: i64, recipient: Option<&str>) -> CartItem {
    CartItem {
        product_id: product_id.to_string(),
        quantity,
        recipient_name: recipient.map(str::to_string),
    }
}

pub fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Pat Customer".to_string(),
        email: Some("pat@example.com".to_string()),
        phone: "555-0100".to_string(),
    }
}

pub fn manual_order(
    seller_id: Option<&str>,
    items: Vec<CartItem>,
    method: PaymentMethod,
    collected: bool,
) -> CreateOrderRequest {
    CreateOrderRequest {
        seller_id: seller_id.map(str::to_string),
        customer: customer(),
        items,
        payment: PaymentInput {
            method,
            collected,
            amount: None,
            collected_by: collected.then(|| "Staff A".to_string()),
            check_number: None,
        },
        notes: None,
        idempotency_key: None,
    }
}
