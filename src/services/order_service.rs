//! Order entry
//!
//! 下单不是幂等操作：只有调用方提供 `idempotency_key` 时才会自动重试，
//! 否则超时后盲目重试可能产生重复订单。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OrdersConfig;
use crate::errors::{FundlinkerError, Result};
use crate::storage::backend::retry::{self, RetryConfig};
use crate::storage::{
    Campaign, CampaignStatus, EntryMethod, NewOrder, Order, OrderFilter, OrderItem, PaymentMethod,
    PaymentStatus, Product, SeaOrmStorage,
};
use crate::utils::email::validate_email;
use crate::utils::non_blank;

pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 64;

/// 员工录单共用的幂等键作用域
pub const STAFF_IDEMPOTENCY_SCOPE: &str = "staff";

/// 售卖链接各自的幂等键作用域，不同卖家的顾客互不干扰
pub fn link_idempotency_scope(student_id: &str) -> String {
    format!("link:{}", student_id)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub recipient_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    pub method: PaymentMethod,
    /// 人工收款时是否已收到钱
    #[serde(default)]
    pub collected: bool,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub collected_by: Option<String>,
    #[serde(default)]
    pub check_number: Option<String>,
}

/// 员工录单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub seller_id: Option<String>,
    pub customer: CustomerInfo,
    pub items: Vec<CartItem>,
    pub payment: PaymentInput,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// 顾客通过售卖链接下单（网关已完成收款）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineOrderRequest {
    pub customer: CustomerInfo,
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderReceipt {
    pub order: Order,
    pub replayed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentState {
    pub status: PaymentStatus,
    pub entry_method: EntryMethod,
    pub paid_at: Option<DateTime<Utc>>,
    pub check_number: Option<String>,
    pub collected_by: Option<String>,
}

/// 按下单时的商品价格计价
///
/// 单价与商品名作为快照写入订单行，之后改价不影响历史订单。
pub fn price_cart(products: &[Product], items: &[CartItem], max_items: usize) -> Result<PricedCart> {
    if items.is_empty() {
        return Err(FundlinkerError::empty_cart("Order must contain at least one item"));
    }
    if items.len() > max_items {
        return Err(FundlinkerError::validation(format!(
            "Order has {} items, the limit is {}",
            items.len(),
            max_items
        )));
    }

    let catalog: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut priced = Vec::with_capacity(items.len());
    let mut subtotal = Decimal::ZERO;
    for (idx, item) in items.iter().enumerate() {
        let product = catalog.get(item.product_id.trim()).ok_or_else(|| {
            FundlinkerError::product_not_in_campaign(format!(
                "items[{}]: product '{}' is not part of this campaign",
                idx, item.product_id
            ))
        })?;

        if item.quantity < 1 {
            return Err(FundlinkerError::invalid_quantity(format!(
                "items[{}]: quantity must be at least 1, got {}",
                idx, item.quantity
            )));
        }
        let quantity = u32::try_from(item.quantity).map_err(|_| {
            FundlinkerError::invalid_quantity(format!(
                "items[{}]: quantity {} is too large",
                idx, item.quantity
            ))
        })?;
        if let Some(max) = product.max_quantity
            && quantity > max
        {
            return Err(FundlinkerError::invalid_quantity(format!(
                "items[{}]: at most {} of '{}' per line",
                idx, max, product.name
            )));
        }

        let line = OrderItem {
            campaign_product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price: product.retail_price,
            recipient_name: non_blank(item.recipient_name.as_deref()),
        };
        subtotal += line.line_total();
        priced.push(line);
    }

    Ok(PricedCart {
        items: priced,
        subtotal,
        total: subtotal,
    })
}

/// 校验并规范化顾客信息
pub fn validate_customer(customer: &CustomerInfo) -> Result<CustomerInfo> {
    let name = customer.name.trim();
    if name.is_empty() {
        return Err(FundlinkerError::missing_field("customer.name is required"));
    }
    let phone = customer.phone.trim();
    if phone.is_empty() {
        return Err(FundlinkerError::missing_field("customer.phone is required"));
    }
    let email = non_blank(customer.email.as_deref());
    if let Some(ref email) = email {
        validate_email(email)?;
    }
    Ok(CustomerInfo {
        name: name.to_string(),
        email,
        phone: phone.to_string(),
    })
}

/// 初始付款状态
///
/// - online：网关已收款，直接 paid
/// - cash / check：entry_method = manual；只有 collected 时才是 paid
pub fn initial_payment(
    payment: &PaymentInput,
    total: Decimal,
    now: DateTime<Utc>,
) -> Result<PaymentState> {
    let entry_method = payment.method.entry_method();
    let collected = match payment.method {
        PaymentMethod::Online => true,
        PaymentMethod::Cash | PaymentMethod::Check => payment.collected,
    };

    if collected
        && entry_method == EntryMethod::Manual
        && let Some(amount) = payment.amount
        && amount != total
    {
        return Err(FundlinkerError::validation(format!(
            "payment.amount {} does not match order total {}",
            amount, total
        )));
    }

    let check_number = if payment.method == PaymentMethod::Check {
        non_blank(payment.check_number.as_deref())
    } else {
        None
    };

    Ok(PaymentState {
        status: if collected {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        },
        entry_method,
        paid_at: collected.then_some(now),
        check_number,
        collected_by: if collected && entry_method == EntryMethod::Manual {
            non_blank(payment.collected_by.as_deref())
        } else {
            None
        },
    })
}

fn validate_idempotency_key(key: Option<&str>) -> Result<Option<String>> {
    let Some(key) = non_blank(key) else {
        return Ok(None);
    };
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(FundlinkerError::validation(format!(
            "idempotency_key must be at most {} characters",
            MAX_IDEMPOTENCY_KEY_LEN
        )));
    }
    Ok(Some(key))
}

pub struct OrderService {
    storage: Arc<SeaOrmStorage>,
    config: OrdersConfig,
}

impl OrderService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self {
            storage,
            config: crate::config::get_config().orders.clone(),
        }
    }

    async fn load_campaign(&self, campaign_id: &str) -> Result<Campaign> {
        self.storage
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| FundlinkerError::not_found(format!("Campaign '{}' not found", campaign_id)))
    }

    /// 员工录单（现金/支票/线上补录）
    pub async fn create_order(
        &self,
        campaign_id: &str,
        req: CreateOrderRequest,
    ) -> Result<OrderReceipt> {
        let campaign = self.load_campaign(campaign_id).await?;
        if campaign.status == CampaignStatus::Cancelled {
            return Err(FundlinkerError::campaign_closed(format!(
                "Campaign '{}' is cancelled",
                campaign.name
            )));
        }
        self.place_order(&campaign, req, STAFF_IDEMPOTENCY_SCOPE.to_string())
            .await
    }

    /// 顾客通过售卖链接下单
    pub async fn create_order_via_link(
        &self,
        magic_link_code: &str,
        req: OnlineOrderRequest,
    ) -> Result<OrderReceipt> {
        let attribution = self
            .storage
            .find_attribution_by_magic_code(magic_link_code.trim())
            .await?
            .ok_or_else(|| FundlinkerError::not_found("Selling link not found"))?;

        let seller = self
            .storage
            .get_seller(&attribution.student_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| FundlinkerError::not_found("Selling link is no longer active"))?;

        let campaign = self.load_campaign(&attribution.campaign_id).await?;
        if campaign.status != CampaignStatus::Active {
            return Err(FundlinkerError::campaign_closed(format!(
                "Campaign '{}' is not accepting orders",
                campaign.name
            )));
        }

        let scope = link_idempotency_scope(&seller.id);
        self.place_order(
            &campaign,
            CreateOrderRequest {
                seller_id: Some(seller.id),
                customer: req.customer,
                items: req.items,
                payment: PaymentInput {
                    method: PaymentMethod::Online,
                    collected: true,
                    amount: None,
                    collected_by: None,
                    check_number: None,
                },
                notes: req.notes,
                idempotency_key: req.idempotency_key,
            },
            scope,
        )
        .await
    }

    async fn place_order(
        &self,
        campaign: &Campaign,
        req: CreateOrderRequest,
        idempotency_scope: String,
    ) -> Result<OrderReceipt> {
        // 校验全部在写入之前完成
        let customer = validate_customer(&req.customer)?;
        let idempotency_key = validate_idempotency_key(req.idempotency_key.as_deref())?;

        let student_id = match non_blank(req.seller_id.as_deref()) {
            Some(id) => {
                if self.storage.get_attribution(&campaign.id, &id).await?.is_none() {
                    return Err(FundlinkerError::validation(format!(
                        "Seller '{}' is not registered for this campaign",
                        id
                    )));
                }
                Some(id)
            }
            None => None,
        };

        let products = self.storage.list_products(&campaign.id).await?;
        let cart = price_cart(&products, &req.items, self.config.max_items)?;
        let payment = initial_payment(&req.payment, cart.total, Utc::now())?;

        let new_order = NewOrder {
            campaign_id: campaign.id.clone(),
            organization_id: campaign.organization_id.clone(),
            student_id,
            customer_name: customer.name,
            customer_email: customer.email,
            customer_phone: customer.phone,
            items: cart.items,
            subtotal: cart.subtotal,
            total: cart.total,
            payment_status: payment.status,
            entry_method: payment.entry_method,
            payment_method: req.payment.method,
            check_number: payment.check_number,
            collected_by: payment.collected_by,
            paid_at: payment.paid_at,
            notes: non_blank(req.notes.as_deref()),
            idempotency_scope,
            idempotency_key,
        };

        // 没有幂等键时绝不自动重试
        let retry_config = if new_order.idempotency_key.is_some() {
            self.storage.retry_config()
        } else {
            RetryConfig::NONE
        };

        let storage = &self.storage;
        let config = &self.config;
        let new_order = &new_order;
        let inserted = retry::with_retry("create_order", retry_config, move || async move {
            storage
                .insert_order(new_order, &config.number_prefix, config.number_width)
                .await
        })
        .await?;

        if inserted.replayed {
            debug!(order_number = %inserted.order.order_number, "Order replayed");
        } else {
            info!(
                "OrderService: created order {} ({} items, total {})",
                inserted.order.order_number,
                inserted.order.items.len(),
                inserted.order.total
            );
        }

        Ok(OrderReceipt {
            order: inserted.order,
            replayed: inserted.replayed,
        })
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.storage
            .get_order(order_id)
            .await?
            .ok_or_else(|| FundlinkerError::not_found(format!("Order '{}' not found", order_id)))
    }

    pub async fn list_orders(&self, campaign_id: &str, filter: &OrderFilter) -> Result<Vec<Order>> {
        self.load_campaign(campaign_id).await?;
        self.storage.list_orders(campaign_id, filter).await
    }
}
