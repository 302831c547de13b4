use sea_orm::entity::prelude::*;

/// 订单行，product_name / unit_price 为下单时快照
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub position: i32,
    pub campaign_product_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub recipient_name: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
