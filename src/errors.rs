use std::fmt;

use actix_web::http::StatusCode;

/// 错误分类
///
/// - 校验错误：在任何写入之前拒绝
/// - 状态错误：重复提交同一请求不会改变结果
/// - 冲突：仅在确属调用方错误时上报，竞态在存储层通过重新查询消化
/// - 基础设施错误：数据库/文件/序列化
#[derive(Debug, Clone)]
pub enum FundlinkerError {
    // 校验
    Validation(String),
    InvalidEmail(String),
    EmptyCart(String),
    InvalidQuantity(String),
    ProductNotInCampaign(String),
    MissingField(String),
    // 状态
    RegistrationClosed(String),
    RegistrationLinkInvalid(String),
    OrderAlreadyPaid(String),
    InvalidPaymentMethod(String),
    CampaignClosed(String),
    NotFound(String),
    Conflict(String),
    // 基础设施
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Transient(String),
    FileOperation(String),
    Serialization(String),
}

impl FundlinkerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            FundlinkerError::Validation(_) => "E001",
            FundlinkerError::InvalidEmail(_) => "E002",
            FundlinkerError::EmptyCart(_) => "E003",
            FundlinkerError::InvalidQuantity(_) => "E004",
            FundlinkerError::ProductNotInCampaign(_) => "E005",
            FundlinkerError::MissingField(_) => "E006",
            FundlinkerError::RegistrationClosed(_) => "E010",
            FundlinkerError::RegistrationLinkInvalid(_) => "E011",
            FundlinkerError::OrderAlreadyPaid(_) => "E012",
            FundlinkerError::InvalidPaymentMethod(_) => "E013",
            FundlinkerError::CampaignClosed(_) => "E016",
            FundlinkerError::NotFound(_) => "E014",
            FundlinkerError::Conflict(_) => "E015",
            FundlinkerError::DatabaseConfig(_) => "E020",
            FundlinkerError::DatabaseConnection(_) => "E021",
            FundlinkerError::DatabaseOperation(_) => "E022",
            FundlinkerError::Transient(_) => "E023",
            FundlinkerError::FileOperation(_) => "E024",
            FundlinkerError::Serialization(_) => "E025",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            FundlinkerError::Validation(_) => "Validation Error",
            FundlinkerError::InvalidEmail(_) => "Invalid Email",
            FundlinkerError::EmptyCart(_) => "Empty Cart",
            FundlinkerError::InvalidQuantity(_) => "Invalid Quantity",
            FundlinkerError::ProductNotInCampaign(_) => "Product Not In Campaign",
            FundlinkerError::MissingField(_) => "Missing Field",
            FundlinkerError::RegistrationClosed(_) => "Registration Closed",
            FundlinkerError::RegistrationLinkInvalid(_) => "Registration Link Invalid",
            FundlinkerError::OrderAlreadyPaid(_) => "Order Already Paid",
            FundlinkerError::InvalidPaymentMethod(_) => "Invalid Payment Method",
            FundlinkerError::CampaignClosed(_) => "Campaign Closed",
            FundlinkerError::NotFound(_) => "Resource Not Found",
            FundlinkerError::Conflict(_) => "Conflict",
            FundlinkerError::DatabaseConfig(_) => "Database Configuration Error",
            FundlinkerError::DatabaseConnection(_) => "Database Connection Error",
            FundlinkerError::DatabaseOperation(_) => "Database Operation Error",
            FundlinkerError::Transient(_) => "Temporary Failure",
            FundlinkerError::FileOperation(_) => "File Operation Error",
            FundlinkerError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            FundlinkerError::Validation(msg)
            | FundlinkerError::InvalidEmail(msg)
            | FundlinkerError::EmptyCart(msg)
            | FundlinkerError::InvalidQuantity(msg)
            | FundlinkerError::ProductNotInCampaign(msg)
            | FundlinkerError::MissingField(msg)
            | FundlinkerError::RegistrationClosed(msg)
            | FundlinkerError::RegistrationLinkInvalid(msg)
            | FundlinkerError::OrderAlreadyPaid(msg)
            | FundlinkerError::InvalidPaymentMethod(msg)
            | FundlinkerError::CampaignClosed(msg)
            | FundlinkerError::NotFound(msg)
            | FundlinkerError::Conflict(msg)
            | FundlinkerError::DatabaseConfig(msg)
            | FundlinkerError::DatabaseConnection(msg)
            | FundlinkerError::DatabaseOperation(msg)
            | FundlinkerError::Transient(msg)
            | FundlinkerError::FileOperation(msg)
            | FundlinkerError::Serialization(msg) => msg,
        }
    }

    /// 映射为 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            FundlinkerError::Validation(_)
            | FundlinkerError::InvalidEmail(_)
            | FundlinkerError::EmptyCart(_)
            | FundlinkerError::InvalidQuantity(_)
            | FundlinkerError::ProductNotInCampaign(_)
            | FundlinkerError::MissingField(_)
            | FundlinkerError::InvalidPaymentMethod(_) => StatusCode::BAD_REQUEST,
            FundlinkerError::RegistrationLinkInvalid(_) | FundlinkerError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            FundlinkerError::RegistrationClosed(_) | FundlinkerError::CampaignClosed(_) => {
                StatusCode::FORBIDDEN
            }
            FundlinkerError::OrderAlreadyPaid(_) | FundlinkerError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            FundlinkerError::Transient(_) | FundlinkerError::DatabaseConnection(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            FundlinkerError::DatabaseConfig(_)
            | FundlinkerError::DatabaseOperation(_)
            | FundlinkerError::FileOperation(_)
            | FundlinkerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 调用方原样重试是否可能成功
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FundlinkerError::Transient(_) | FundlinkerError::DatabaseConnection(_)
        )
    }

    /// 是否属于校验类错误（写入前拒绝）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FundlinkerError::Validation(_)
                | FundlinkerError::InvalidEmail(_)
                | FundlinkerError::EmptyCart(_)
                | FundlinkerError::InvalidQuantity(_)
                | FundlinkerError::ProductNotInCampaign(_)
                | FundlinkerError::MissingField(_)
        )
    }

    /// 在消息前追加上下文，保留错误分类
    pub fn with_context(mut self, context: &str) -> Self {
        let msg = match &mut self {
            FundlinkerError::Validation(msg)
            | FundlinkerError::InvalidEmail(msg)
            | FundlinkerError::EmptyCart(msg)
            | FundlinkerError::InvalidQuantity(msg)
            | FundlinkerError::ProductNotInCampaign(msg)
            | FundlinkerError::MissingField(msg)
            | FundlinkerError::RegistrationClosed(msg)
            | FundlinkerError::RegistrationLinkInvalid(msg)
            | FundlinkerError::OrderAlreadyPaid(msg)
            | FundlinkerError::InvalidPaymentMethod(msg)
            | FundlinkerError::CampaignClosed(msg)
            | FundlinkerError::NotFound(msg)
            | FundlinkerError::Conflict(msg)
            | FundlinkerError::DatabaseConfig(msg)
            | FundlinkerError::DatabaseConnection(msg)
            | FundlinkerError::DatabaseOperation(msg)
            | FundlinkerError::Transient(msg)
            | FundlinkerError::FileOperation(msg)
            | FundlinkerError::Serialization(msg) => msg,
        };
        *msg = format!("{}: {}", context, msg);
        self
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for FundlinkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for FundlinkerError {}

// 便捷的构造函数
impl FundlinkerError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::Validation(msg.into())
    }

    pub fn invalid_email<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::InvalidEmail(msg.into())
    }

    pub fn empty_cart<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::EmptyCart(msg.into())
    }

    pub fn invalid_quantity<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::InvalidQuantity(msg.into())
    }

    pub fn product_not_in_campaign<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::ProductNotInCampaign(msg.into())
    }

    pub fn missing_field<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::MissingField(msg.into())
    }

    pub fn registration_closed<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::RegistrationClosed(msg.into())
    }

    pub fn registration_link_invalid<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::RegistrationLinkInvalid(msg.into())
    }

    pub fn order_already_paid<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::OrderAlreadyPaid(msg.into())
    }

    pub fn invalid_payment_method<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::InvalidPaymentMethod(msg.into())
    }

    pub fn campaign_closed<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::CampaignClosed(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::Conflict(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::DatabaseOperation(msg.into())
    }

    pub fn transient<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::Transient(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        FundlinkerError::Serialization(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for FundlinkerError {
    fn from(err: sea_orm::DbErr) -> Self {
        if crate::storage::backend::retry::is_retryable_error(&err) {
            FundlinkerError::Transient(err.to_string())
        } else {
            FundlinkerError::DatabaseOperation(err.to_string())
        }
    }
}

impl From<std::io::Error> for FundlinkerError {
    fn from(err: std::io::Error) -> Self {
        FundlinkerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for FundlinkerError {
    fn from(err: serde_json::Error) -> Self {
        FundlinkerError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for FundlinkerError {
    fn from(err: csv::Error) -> Self {
        FundlinkerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FundlinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_family_maps_to_bad_request() {
        let errors = [
            FundlinkerError::validation("x"),
            FundlinkerError::invalid_email("x"),
            FundlinkerError::empty_cart("x"),
            FundlinkerError::invalid_quantity("x"),
            FundlinkerError::product_not_in_campaign("x"),
            FundlinkerError::missing_field("x"),
        ];
        for err in errors {
            assert!(err.is_validation(), "{:?}", err);
            assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_registration_outcomes_are_distinguishable() {
        let closed = FundlinkerError::registration_closed("closed");
        let invalid = FundlinkerError::registration_link_invalid("bad link");
        let transient = FundlinkerError::transient("database is locked");

        assert_eq!(closed.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(invalid.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(transient.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!closed.is_retryable());
        assert!(!invalid.is_retryable());
        assert!(transient.is_retryable());
    }

    #[test]
    fn test_already_paid_is_conflict() {
        let err = FundlinkerError::order_already_paid("FR-000001");
        assert_eq!(err.http_status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "E012");
        assert_eq!(err.message(), "FR-000001");
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = FundlinkerError::not_found("order 42");
        assert_eq!(err.to_string(), "Resource Not Found: order 42");
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let err = FundlinkerError::transient("database is locked").with_context("create order");
        assert!(err.is_retryable());
        assert_eq!(err.message(), "create order: database is locked");
    }

    #[test]
    fn test_db_err_conversion() {
        let err: FundlinkerError = sea_orm::DbErr::RecordNotFound("x".into()).into();
        assert!(matches!(err, FundlinkerError::DatabaseOperation(_)));

        let err: FundlinkerError = sea_orm::DbErr::ConnectionAcquire(
            sea_orm::error::ConnAcquireErr::Timeout,
        )
        .into();
        assert!(err.is_retryable());
    }
}
