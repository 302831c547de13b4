//! 筹款核心表
//!
//! organizations / students / campaigns / campaign_products /
//! campaign_students / orders / order_items / order_sequences
//!
//! 金额一律以分（BIGINT）存储。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizations::Name).string().not_null())
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // students
        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Students::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Students::OrganizationId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Students::Name).string().not_null())
                    .col(ColumnDef::new(Students::Email).string().null())
                    .col(ColumnDef::new(Students::EmailNormalized).string().null())
                    .col(ColumnDef::new(Students::Phone).string_len(64).null())
                    .col(ColumnDef::new(Students::Grade).string_len(64).null())
                    .col(ColumnDef::new(Students::GroupName).string_len(128).null())
                    .col(
                        ColumnDef::new(Students::UniqueCode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Students::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Students::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一组织内 email 唯一（NULL 不参与唯一性比较）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_students_org_email")
                    .table(Students::Table)
                    .col(Students::OrganizationId)
                    .col(Students::EmailNormalized)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_students_org_code")
                    .table(Students::Table)
                    .col(Students::OrganizationId)
                    .col(Students::UniqueCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // campaigns
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::OrganizationId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Campaigns::Name).string().not_null())
                    .col(ColumnDef::new(Campaigns::StartDate).date().not_null())
                    .col(ColumnDef::new(Campaigns::EndDate).date().not_null())
                    .col(ColumnDef::new(Campaigns::PickupDate).date().null())
                    .col(ColumnDef::new(Campaigns::PickupLocation).string().null())
                    .col(
                        ColumnDef::new(Campaigns::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Campaigns::SelfRegistrationOpen)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Campaigns::SelfRegisterCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::TrackingMode)
                            .string_len(16)
                            .not_null()
                            .default("none"),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_campaigns_register_code")
                    .table(Campaigns::Table)
                    .col(Campaigns::SelfRegisterCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // campaign_products
        manager
            .create_table(
                Table::create()
                    .table(CampaignProducts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CampaignProducts::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CampaignProducts::CampaignId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CampaignProducts::Name).string().not_null())
                    .col(
                        ColumnDef::new(CampaignProducts::RetailPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignProducts::MaxQuantity)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CampaignProducts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaign_products_campaign")
                    .table(CampaignProducts::Table)
                    .col(CampaignProducts::CampaignId)
                    .to_owned(),
            )
            .await?;

        // campaign_students (attribution)
        manager
            .create_table(
                Table::create()
                    .table(CampaignStudents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CampaignStudents::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CampaignStudents::CampaignId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignStudents::StudentId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignStudents::MagicLinkCode)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignStudents::TotalSalesCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CampaignStudents::OrderCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CampaignStudents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_campaign_students_pair")
                    .table(CampaignStudents::Table)
                    .col(CampaignStudents::CampaignId)
                    .col(CampaignStudents::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_campaign_students_magic_code")
                    .table(CampaignStudents::Table)
                    .col(CampaignStudents::MagicLinkCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // orders
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::CampaignId).string_len(64).not_null())
                    .col(ColumnDef::new(Orders::StudentId).string_len(64).null())
                    .col(
                        ColumnDef::new(Orders::OrderNumber)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                    .col(ColumnDef::new(Orders::CustomerEmail).string().null())
                    .col(
                        ColumnDef::new(Orders::CustomerPhone)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::SubtotalCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::TotalCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::EntryMethod)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentMethod)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::CheckNumber).string_len(64).null())
                    .col(ColumnDef::new(Orders::CollectedBy).string().null())
                    .col(
                        ColumnDef::new(Orders::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::Notes).text().null())
                    .col(ColumnDef::new(Orders::IdempotencyScope).string_len(80).null())
                    .col(ColumnDef::new(Orders::IdempotencyKey).string_len(64).null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_orders_order_number")
                    .table(Orders::Table)
                    .col(Orders::CampaignId)
                    .col(Orders::OrderNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_orders_idempotency")
                    .table(Orders::Table)
                    .col(Orders::CampaignId)
                    .col(Orders::IdempotencyScope)
                    .col(Orders::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 卖家聚合重算走这个索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_campaign_student")
                    .table(Orders::Table)
                    .col(Orders::CampaignId)
                    .col(Orders::StudentId)
                    .to_owned(),
            )
            .await?;

        // order_items
        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).string_len(64).not_null())
                    .col(ColumnDef::new(OrderItems::Position).integer().not_null())
                    .col(
                        ColumnDef::new(OrderItems::CampaignProductId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                    .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(OrderItems::UnitPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderItems::RecipientName).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_items_order")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        // order_sequences
        manager
            .create_table(
                Table::create()
                    .table(OrderSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderSequences::OrganizationId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrderSequences::LastValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderSequences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CampaignStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CampaignProducts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    OrganizationId,
    Name,
    Email,
    EmailNormalized,
    Phone,
    Grade,
    GroupName,
    UniqueCode,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Campaigns {
    Table,
    Id,
    OrganizationId,
    Name,
    StartDate,
    EndDate,
    PickupDate,
    PickupLocation,
    Status,
    SelfRegistrationOpen,
    SelfRegisterCode,
    TrackingMode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CampaignProducts {
    Table,
    Id,
    CampaignId,
    Name,
    RetailPriceCents,
    MaxQuantity,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CampaignStudents {
    Table,
    Id,
    CampaignId,
    StudentId,
    MagicLinkCode,
    TotalSalesCents,
    OrderCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    CampaignId,
    StudentId,
    OrderNumber,
    CustomerName,
    CustomerEmail,
    CustomerPhone,
    SubtotalCents,
    TotalCents,
    PaymentStatus,
    EntryMethod,
    PaymentMethod,
    CheckNumber,
    CollectedBy,
    PaidAt,
    Notes,
    IdempotencyScope,
    IdempotencyKey,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    Position,
    CampaignProductId,
    ProductName,
    Quantity,
    UnitPriceCents,
    RecipientName,
}

#[derive(DeriveIden)]
enum OrderSequences {
    Table,
    OrganizationId,
    LastValue,
}
