use sea_orm::entity::prelude::*;

/// 卖家（学生）身份，按组织隔离
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    /// lower(trim(email))，与 organization_id 组成唯一键
    pub email_normalized: Option<String>,
    pub phone: Option<String>,
    pub grade: Option<String>,
    pub group_name: Option<String>,
    pub unique_code: String,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
