//! 数据库 Model 与领域模型互转
//!
//! 枚举以 snake_case 字符串落库，金额以分落库。

use std::str::FromStr;

use crate::errors::{FundlinkerError, Result};
use crate::storage::models::{
    Attribution, Campaign, Order, OrderItem, Organization, Product, Seller,
};
use crate::utils::money::from_cents;
use migration::entities::{
    campaign, campaign_product, campaign_student, order, order_item, organization, student,
};

/// 解析落库的枚举字符串
fn parse_stored<T: FromStr>(column: &str, value: &str) -> Result<T> {
    T::from_str(value).map_err(|_| {
        FundlinkerError::database_operation(format!(
            "列 {} 含有无法识别的值: '{}'",
            column, value
        ))
    })
}

pub fn model_to_organization(model: organization::Model) -> Organization {
    Organization {
        id: model.id,
        name: model.name,
        created_at: model.created_at,
    }
}

pub fn model_to_seller(model: student::Model) -> Seller {
    Seller {
        id: model.id,
        organization_id: model.organization_id,
        name: model.name,
        email: model.email,
        phone: model.phone,
        grade: model.grade,
        group: model.group_name,
        unique_code: model.unique_code,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

pub fn model_to_campaign(model: campaign::Model) -> Result<Campaign> {
    Ok(Campaign {
        status: parse_stored("campaigns.status", &model.status)?,
        tracking_mode: parse_stored("campaigns.tracking_mode", &model.tracking_mode)?,
        id: model.id,
        organization_id: model.organization_id,
        name: model.name,
        start_date: model.start_date,
        end_date: model.end_date,
        pickup_date: model.pickup_date,
        pickup_location: model.pickup_location,
        self_registration_open: model.self_registration_open,
        self_register_code: model.self_register_code,
        created_at: model.created_at,
    })
}

pub fn model_to_product(model: campaign_product::Model) -> Product {
    Product {
        id: model.id,
        campaign_id: model.campaign_id,
        name: model.name,
        retail_price: from_cents(model.retail_price_cents),
        max_quantity: model
            .max_quantity
            .and_then(|q| u32::try_from(q).ok()),
    }
}

pub fn model_to_attribution(model: campaign_student::Model) -> Attribution {
    Attribution {
        id: model.id,
        campaign_id: model.campaign_id,
        student_id: model.student_id,
        magic_link_code: model.magic_link_code,
        total_sales: from_cents(model.total_sales_cents),
        order_count: model.order_count.max(0) as u64,
        created_at: model.created_at,
    }
}

pub fn model_to_order_item(model: order_item::Model) -> OrderItem {
    OrderItem {
        campaign_product_id: model.campaign_product_id,
        product_name: model.product_name,
        quantity: model.quantity.max(0) as u32,
        unit_price: from_cents(model.unit_price_cents),
        recipient_name: model.recipient_name,
    }
}

pub fn model_to_order(model: order::Model, items: Vec<OrderItem>) -> Result<Order> {
    Ok(Order {
        payment_status: parse_stored("orders.payment_status", &model.payment_status)?,
        entry_method: parse_stored("orders.entry_method", &model.entry_method)?,
        payment_method: parse_stored("orders.payment_method", &model.payment_method)?,
        id: model.id,
        campaign_id: model.campaign_id,
        student_id: model.student_id,
        order_number: model.order_number,
        customer_name: model.customer_name,
        customer_email: model.customer_email,
        customer_phone: model.customer_phone,
        items,
        subtotal: from_cents(model.subtotal_cents),
        total: from_cents(model.total_cents),
        check_number: model.check_number,
        collected_by: model.collected_by,
        paid_at: model.paid_at,
        notes: model.notes,
        idempotency_key: model.idempotency_key,
        created_at: model.created_at,
    })
}
