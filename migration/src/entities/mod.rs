pub mod campaign;
pub mod campaign_product;
pub mod campaign_student;
pub mod order;
pub mod order_item;
pub mod order_sequence;
pub mod organization;
pub mod student;

pub use campaign::Entity as CampaignEntity;
pub use campaign_product::Entity as CampaignProductEntity;
pub use campaign_student::Entity as CampaignStudentEntity;
pub use order::Entity as OrderEntity;
pub use order_item::Entity as OrderItemEntity;
pub use order_sequence::Entity as OrderSequenceEntity;
pub use organization::Entity as OrganizationEntity;
pub use student::Entity as StudentEntity;
