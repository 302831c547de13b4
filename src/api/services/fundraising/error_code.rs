//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::FundlinkerError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 报名错误
/// - 3000-3099: 订单错误
/// - 4000-4099: 导出错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,
    ServiceUnavailable = 1030,
    RateLimitExceeded = 1040,

    // 报名错误 2000-2099
    InvalidEmail = 2000,
    RegistrationClosed = 2001,
    RegistrationLinkInvalid = 2002,

    // 订单错误 3000-3099
    EmptyCart = 3000,
    InvalidQuantity = 3001,
    ProductNotInCampaign = 3002,
    MissingField = 3003,
    OrderAlreadyPaid = 3004,
    InvalidPaymentMethod = 3005,
    CampaignClosed = 3006,

    // 导出错误 4000-4099
    ExportFailed = 4000,
}

impl From<&FundlinkerError> for ErrorCode {
    fn from(err: &FundlinkerError) -> Self {
        match err {
            FundlinkerError::Validation(_) => ErrorCode::BadRequest,
            FundlinkerError::InvalidEmail(_) => ErrorCode::InvalidEmail,
            FundlinkerError::EmptyCart(_) => ErrorCode::EmptyCart,
            FundlinkerError::InvalidQuantity(_) => ErrorCode::InvalidQuantity,
            FundlinkerError::ProductNotInCampaign(_) => ErrorCode::ProductNotInCampaign,
            FundlinkerError::MissingField(_) => ErrorCode::MissingField,
            FundlinkerError::RegistrationClosed(_) => ErrorCode::RegistrationClosed,
            FundlinkerError::RegistrationLinkInvalid(_) => ErrorCode::RegistrationLinkInvalid,
            FundlinkerError::OrderAlreadyPaid(_) => ErrorCode::OrderAlreadyPaid,
            FundlinkerError::InvalidPaymentMethod(_) => ErrorCode::InvalidPaymentMethod,
            FundlinkerError::CampaignClosed(_) => ErrorCode::CampaignClosed,
            FundlinkerError::NotFound(_) => ErrorCode::NotFound,
            FundlinkerError::Conflict(_) => ErrorCode::Conflict,
            FundlinkerError::Transient(_) | FundlinkerError::DatabaseConnection(_) => {
                ErrorCode::ServiceUnavailable
            }
            FundlinkerError::FileOperation(_) | FundlinkerError::Serialization(_) => {
                ErrorCode::ExportFailed
            }
            FundlinkerError::DatabaseConfig(_) | FundlinkerError::DatabaseOperation(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderAlreadyPaid).unwrap();
        assert_eq!(json, "3004");
        let parsed: ErrorCode = serde_json::from_str("2001").unwrap();
        assert_eq!(parsed, ErrorCode::RegistrationClosed);
    }

    #[test]
    fn test_maps_domain_errors() {
        assert_eq!(
            ErrorCode::from(&FundlinkerError::registration_link_invalid("x")),
            ErrorCode::RegistrationLinkInvalid
        );
        assert_eq!(
            ErrorCode::from(&FundlinkerError::transient("locked")),
            ErrorCode::ServiceUnavailable
        );
        assert_eq!(
            ErrorCode::from(&FundlinkerError::database_operation("boom")),
            ErrorCode::InternalServerError
        );
    }
}
