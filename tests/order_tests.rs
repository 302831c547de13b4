//! Order entry tests

mod common;

use std::mem::discriminant;

use proptest::prelude::*;
use rust_decimal::Decimal;

use common::{Fixture, dec, item, manual_order};
use fundlinker::errors::FundlinkerError;
use fundlinker::services::{CartItem, CustomerInfo, OnlineOrderRequest, price_cart};
use fundlinker::storage::{
    CampaignStatus, EntryMethod, NewProduct, OrderFilter, PaymentMethod, PaymentStatus, Product,
};

/// 商品目录：价格为任意两位小数
fn catalog_strategy() -> impl Strategy<Value = Vec<Product>> {
    prop::collection::vec(1i64..10_000_000, 1..8).prop_map(|prices| {
        prices
            .into_iter()
            .enumerate()
            .map(|(idx, cents)| Product {
                id: format!("p{}", idx),
                campaign_id: "c1".to_string(),
                name: format!("Product {}", idx),
                retail_price: Decimal::new(cents, 2),
                max_quantity: None,
            })
            .collect()
    })
}

fn priced_cart_strategy() -> impl Strategy<Value = (Vec<Product>, Vec<CartItem>)> {
    catalog_strategy().prop_flat_map(|products| {
        let count = products.len();
        let lines = prop::collection::vec((0..count, 1i64..500), 1..20);
        (Just(products), lines)
            .prop_map(|(products, lines)| {
                let items = lines
                    .into_iter()
                    .map(|(idx, quantity)| item(&products[idx].id, quantity, None))
                    .collect();
                (products, items)
            })
    })
}

proptest! {
    #[test]
    fn prop_order_total_is_sum_of_lines((products, items) in priced_cart_strategy()) {
        let cart = price_cart(&products, &items, 100).unwrap();

        let expected: Decimal = items
            .iter()
            .map(|line| {
                let product = products.iter().find(|p| p.id == line.product_id).unwrap();
                product.retail_price * Decimal::from(line.quantity)
            })
            .sum();

        prop_assert_eq!(cart.total, expected);
        prop_assert_eq!(cart.subtotal, cart.total);
        prop_assert!(cart.total.scale() <= 2);
        prop_assert_eq!(cart.items.len(), items.len());
        for (priced, line) in cart.items.iter().zip(&items) {
            prop_assert_eq!(&priced.campaign_product_id, &line.product_id);
            prop_assert_eq!(i64::from(priced.quantity), line.quantity);
            prop_assert!(priced.unit_price.scale() <= 2);
        }
    }
}

#[tokio::test]
async fn test_manual_pending_order_scenario() {
    let fx = Fixture::new().await;
    let (student_id, _) = fx.register("Jane Doe", "jane@x.com").await;

    let receipt = fx
        .ctx
        .orders
        .create_order(
            &fx.campaign.id,
            manual_order(
                Some(&student_id),
                fx.standard_cart(),
                PaymentMethod::Cash,
                false,
            ),
        )
        .await
        .unwrap();

    let order = receipt.order;
    assert!(!receipt.replayed);
    assert_eq!(order.total, dec("30.00"));
    assert_eq!(order.subtotal, order.total);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.entry_method, EntryMethod::Manual);
    assert!(order.paid_at.is_none());
    assert!(order.collected_by.is_none());
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].unit_price, dec("12.50"));
    assert_eq!(order.items[0].recipient_name.as_deref(), Some("Grandma"));

    let line_sum: rust_decimal::Decimal = order.items.iter().map(|i| i.line_total()).sum();
    assert_eq!(line_sum, order.total);

    let stored = fx.ctx.orders.get_order(&order.id).await.unwrap();
    assert_eq!(stored.order_number, order.order_number);
    assert_eq!(stored.total, order.total);
    assert_eq!(stored.items, order.items);
    assert_eq!(stored.customer_phone, "555-0100");
}

#[tokio::test]
async fn test_online_order_is_paid_immediately() {
    let fx = Fixture::new().await;
    let (_, code) = fx.register("Jane Doe", "jane@x.com").await;

    let receipt = fx
        .ctx
        .orders
        .create_order_via_link(
            &code,
            OnlineOrderRequest {
                customer: common::customer(),
                items: vec![item(&fx.cookies.id, 3, None)],
                notes: Some("leave at door".to_string()),
                idempotency_key: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.order.payment_status, PaymentStatus::Paid);
    assert_eq!(receipt.order.entry_method, EntryMethod::Online);
    assert_eq!(receipt.order.payment_method, PaymentMethod::Online);
    assert!(receipt.order.paid_at.is_some());
    assert_eq!(receipt.order.total, dec("15.00"));
}

#[tokio::test]
async fn test_order_numbers_are_sequential_and_unique() {
    let fx = Fixture::new().await;
    let other = fx.extra_campaign(CampaignStatus::Active, "OTHER26").await;
    let other_product = fx
        .storage
        .add_product(NewProduct {
            campaign_id: other.id.clone(),
            name: "Wreath".to_string(),
            retail_price: dec("20.00"),
            max_quantity: None,
        })
        .await
        .unwrap();

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let receipt = fx
            .ctx
            .orders
            .create_order(
                &fx.campaign.id,
                manual_order(None, fx.standard_cart(), PaymentMethod::Cash, true),
            )
            .await
            .unwrap();
        numbers.push(receipt.order.order_number);
    }
    // 同一组织的其他活动共用计数器
    let receipt = fx
        .ctx
        .orders
        .create_order(
            &other.id,
            manual_order(
                None,
                vec![item(&other_product.id, 1, None)],
                PaymentMethod::Check,
                false,
            ),
        )
        .await
        .unwrap();
    numbers.push(receipt.order.order_number);

    assert_eq!(numbers, vec!["FR-000001", "FR-000002", "FR-000003", "FR-000004"]);
}

#[tokio::test]
async fn test_concurrent_orders_get_distinct_numbers() {
    let fx = Fixture::new().await;

    let mut handles = Vec::new();
    for i in 0..5 {
        let orders = fx.ctx.orders.clone();
        let campaign_id = fx.campaign.id.clone();
        let mut req = manual_order(None, fx.standard_cart(), PaymentMethod::Cash, false);
        // 带幂等键才会在锁冲突时自动重试
        req.idempotency_key = Some(format!("concurrent-{}", i));
        handles.push(tokio::spawn(async move {
            orders.create_order(&campaign_id, req).await
        }));
    }

    let mut numbers = std::collections::HashSet::new();
    let mut created = 0;
    for handle in handles {
        if let Ok(receipt) = handle.await.unwrap() {
            numbers.insert(receipt.order.order_number);
            created += 1;
        }
    }
    assert_eq!(numbers.len(), created);

    let stored = fx
        .ctx
        .orders
        .list_orders(&fx.campaign.id, &OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), created);
}

#[tokio::test]
async fn test_idempotency_key_replays_existing_order() {
    let fx = Fixture::new().await;
    let mut req = manual_order(None, fx.standard_cart(), PaymentMethod::Cash, true);
    req.idempotency_key = Some("tablet-7-0001".to_string());

    let first = fx
        .ctx
        .orders
        .create_order(&fx.campaign.id, req.clone())
        .await
        .unwrap();
    let second = fx
        .ctx
        .orders
        .create_order(&fx.campaign.id, req)
        .await
        .unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.order.id, second.order.id);
    assert_eq!(first.order.order_number, second.order.order_number);

    let all = fx
        .ctx
        .orders
        .list_orders(&fx.campaign.id, &OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

fn link_order(customer: CustomerInfo, items: Vec<CartItem>, key: &str) -> OnlineOrderRequest {
    OnlineOrderRequest {
        customer,
        items,
        notes: None,
        idempotency_key: Some(key.to_string()),
    }
}

#[tokio::test]
async fn test_link_idempotency_keys_are_scoped_per_seller() {
    let fx = Fixture::new().await;
    let (alice_id, alice_code) = fx.register("Alice Seller", "alice@x.com").await;
    let (bob_id, bob_code) = fx.register("Bob Seller", "bob@x.com").await;

    let alice_order = fx
        .ctx
        .orders
        .create_order_via_link(
            &alice_code,
            link_order(
                CustomerInfo {
                    name: "Victim Buyer".to_string(),
                    email: Some("victim@home.com".to_string()),
                    phone: "555-1111".to_string(),
                },
                vec![item(&fx.pie.id, 1, None)],
                "1",
            ),
        )
        .await
        .unwrap();

    // 另一个卖家的顾客碰巧用了同一个键
    let bob_order = fx
        .ctx
        .orders
        .create_order_via_link(
            &bob_code,
            link_order(common::customer(), vec![item(&fx.cookies.id, 2, None)], "1"),
        )
        .await
        .unwrap();

    assert!(!bob_order.replayed);
    assert_ne!(bob_order.order.id, alice_order.order.id);
    assert_eq!(bob_order.order.student_id.as_deref(), Some(bob_id.as_str()));
    assert_eq!(bob_order.order.customer_name, "Pat Customer");
    assert_eq!(bob_order.order.total, dec("10.00"));

    // 员工录单的键空间也独立
    let mut staff = manual_order(None, fx.standard_cart(), PaymentMethod::Cash, true);
    staff.idempotency_key = Some("1".to_string());
    let staff_order = fx
        .ctx
        .orders
        .create_order(&fx.campaign.id, staff)
        .await
        .unwrap();
    assert!(!staff_order.replayed);

    let all = fx
        .ctx
        .orders
        .list_orders(&fx.campaign.id, &OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let bob = fx
        .storage
        .get_attribution(&fx.campaign.id, &bob_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bob.total_sales, dec("10.00"));
    assert_eq!(bob.order_count, 1);
    let alice = fx
        .storage
        .get_attribution(&fx.campaign.id, &alice_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice.total_sales, dec("12.50"));
}

#[tokio::test]
async fn test_reused_key_with_different_submission_conflicts() {
    let fx = Fixture::new().await;
    let (_, code) = fx.register("Alice Seller", "alice@x.com").await;

    let first = fx
        .ctx
        .orders
        .create_order_via_link(
            &code,
            link_order(common::customer(), vec![item(&fx.pie.id, 1, None)], "checkout-9"),
        )
        .await
        .unwrap();

    let mut stranger = common::customer();
    stranger.name = "Someone Else".to_string();
    stranger.phone = "555-2222".to_string();
    let err = fx
        .ctx
        .orders
        .create_order_via_link(
            &code,
            link_order(stranger, vec![item(&fx.cookies.id, 4, None)], "checkout-9"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FundlinkerError::Conflict(_)));
    assert!(!err.to_string().contains("Pat Customer"));
    assert!(!err.to_string().contains(&first.order.order_number));

    // 同一次提交重放仍然返回原订单
    let replay = fx
        .ctx
        .orders
        .create_order_via_link(
            &code,
            link_order(common::customer(), vec![item(&fx.pie.id, 1, None)], "checkout-9"),
        )
        .await
        .unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.order.id, first.order.id);

    let all = fx
        .ctx
        .orders
        .list_orders(&fx.campaign.id, &OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_validation_rejects_before_write() {
    let fx = Fixture::new().await;
    let other = fx.extra_campaign(CampaignStatus::Active, "OTHER26").await;
    let foreign = fx
        .storage
        .add_product(NewProduct {
            campaign_id: other.id.clone(),
            name: "Wreath".to_string(),
            retail_price: dec("20.00"),
            max_quantity: None,
        })
        .await
        .unwrap();

    let cases = vec![
        (vec![], FundlinkerError::empty_cart("")),
        (
            vec![item(&fx.pie.id, 0, None)],
            FundlinkerError::invalid_quantity(""),
        ),
        (
            vec![item(&fx.pie.id, -2, None)],
            FundlinkerError::invalid_quantity(""),
        ),
        (
            vec![item(&fx.cookies.id, 11, None)],
            FundlinkerError::invalid_quantity(""),
        ),
        (
            vec![item(&foreign.id, 1, None)],
            FundlinkerError::product_not_in_campaign(""),
        ),
    ];

    for (items, expected) in cases {
        let err = fx
            .ctx
            .orders
            .create_order(
                &fx.campaign.id,
                manual_order(None, items, PaymentMethod::Cash, false),
            )
            .await
            .unwrap_err();
        assert_eq!(discriminant(&err), discriminant(&expected), "{:?}", err);
        assert!(err.is_validation());
    }

    let mut missing_phone = manual_order(None, fx.standard_cart(), PaymentMethod::Cash, false);
    missing_phone.customer = CustomerInfo {
        name: "No Phone".to_string(),
        email: None,
        phone: "  ".to_string(),
    };
    let err = fx
        .ctx
        .orders
        .create_order(&fx.campaign.id, missing_phone)
        .await
        .unwrap_err();
    assert!(matches!(err, FundlinkerError::MissingField(_)));

    let mut bad_email = manual_order(None, fx.standard_cart(), PaymentMethod::Cash, false);
    bad_email.customer.email = Some("pat@".to_string());
    let err = fx
        .ctx
        .orders
        .create_order(&fx.campaign.id, bad_email)
        .await
        .unwrap_err();
    assert!(matches!(err, FundlinkerError::InvalidEmail(_)));

    let mut mismatch = manual_order(None, fx.standard_cart(), PaymentMethod::Cash, true);
    mismatch.payment.amount = Some(dec("29.99"));
    let err = fx
        .ctx
        .orders
        .create_order(&fx.campaign.id, mismatch)
        .await
        .unwrap_err();
    assert!(matches!(err, FundlinkerError::Validation(_)));

    let unattributed = manual_order(
        Some("not-a-seller"),
        fx.standard_cart(),
        PaymentMethod::Cash,
        false,
    );
    let err = fx
        .ctx
        .orders
        .create_order(&fx.campaign.id, unattributed)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let all = fx
        .ctx
        .orders
        .list_orders(&fx.campaign.id, &OrderFilter::default())
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_aggregates_recomputed_from_orders() {
    let fx = Fixture::new().await;
    let (student_id, code) = fx.register("Jane Doe", "jane@x.com").await;

    fx.ctx
        .orders
        .create_order(
            &fx.campaign.id,
            manual_order(
                Some(&student_id),
                fx.standard_cart(),
                PaymentMethod::Cash,
                false,
            ),
        )
        .await
        .unwrap();
    fx.ctx
        .orders
        .create_order_via_link(
            &code,
            OnlineOrderRequest {
                customer: common::customer(),
                items: vec![item(&fx.pie.id, 1, None)],
                notes: None,
                idempotency_key: None,
            },
        )
        .await
        .unwrap();
    // 未归属的订单不影响卖家汇总
    fx.ctx
        .orders
        .create_order(
            &fx.campaign.id,
            manual_order(None, fx.standard_cart(), PaymentMethod::Cash, true),
        )
        .await
        .unwrap();

    let attribution = fx
        .storage
        .get_attribution(&fx.campaign.id, &student_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(attribution.order_count, 2);
    assert_eq!(attribution.total_sales, dec("42.50"));

    fx.storage
        .refresh_attribution(&fx.campaign.id, &student_id)
        .await
        .unwrap();
    let refreshed = fx
        .storage
        .get_attribution(&fx.campaign.id, &student_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed, attribution);
}

#[tokio::test]
async fn test_list_orders_filters() {
    let fx = Fixture::new().await;
    let (student_id, _) = fx.register("Jane Doe", "jane@x.com").await;

    fx.ctx
        .orders
        .create_order(
            &fx.campaign.id,
            manual_order(
                Some(&student_id),
                fx.standard_cart(),
                PaymentMethod::Cash,
                false,
            ),
        )
        .await
        .unwrap();
    fx.ctx
        .orders
        .create_order(
            &fx.campaign.id,
            manual_order(None, fx.standard_cart(), PaymentMethod::Check, true),
        )
        .await
        .unwrap();

    let pending = fx
        .ctx
        .orders
        .list_orders(
            &fx.campaign.id,
            &OrderFilter {
                payment_status: Some(PaymentStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].student_id.as_deref(), Some(student_id.as_str()));

    let by_seller = fx
        .ctx
        .orders
        .list_orders(
            &fx.campaign.id,
            &OrderFilter {
                student_id: Some(student_id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_seller.len(), 1);

    let all = fx
        .ctx
        .orders
        .list_orders(&fx.campaign.id, &OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    // 最新的在前
    assert!(all[0].created_at >= all[1].created_at);

    let err = fx
        .ctx
        .orders
        .list_orders("missing", &OrderFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FundlinkerError::NotFound(_)));
}

#[tokio::test]
async fn test_campaign_state_rules() {
    let fx = Fixture::new().await;
    let cancelled = fx.extra_campaign(CampaignStatus::Cancelled, "GONE26").await;
    let err = fx
        .ctx
        .orders
        .create_order(
            &cancelled.id,
            manual_order(None, vec![], PaymentMethod::Cash, false),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FundlinkerError::CampaignClosed(_)));

    // 停用卖家的售卖链接不再接单
    let (student_id, code) = fx.register("Jane Doe", "jane@x.com").await;
    fx.ctx
        .identity
        .set_seller_active(&student_id, false)
        .await
        .unwrap();
    let err = fx
        .ctx
        .orders
        .create_order_via_link(
            &code,
            OnlineOrderRequest {
                customer: common::customer(),
                items: fx.standard_cart(),
                notes: None,
                idempotency_key: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FundlinkerError::NotFound(_)));
}

#[tokio::test]
async fn test_price_snapshot_survives_catalogue_changes() {
    let fx = Fixture::new().await;
    let receipt = fx
        .ctx
        .orders
        .create_order(
            &fx.campaign.id,
            manual_order(None, fx.standard_cart(), PaymentMethod::Cash, false),
        )
        .await
        .unwrap();

    // 新增商品不影响历史订单
    fx.storage
        .add_product(NewProduct {
            campaign_id: fx.campaign.id.clone(),
            name: "Pumpkin Pie".to_string(),
            retail_price: dec("14.00"),
            max_quantity: None,
        })
        .await
        .unwrap();

    let stored = fx.ctx.orders.get_order(&receipt.order.id).await.unwrap();
    assert_eq!(stored.total, dec("30.00"));
    assert_eq!(stored.items[0].product_name, "Apple Pie");
}
