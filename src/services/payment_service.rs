//! Payment ledger
//!
//! pending → paid 只发生一次且不可逆。重复标记会被拒绝而不是静默成功：
//! 第二次登记很可能是重复录入，需要人工核查。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{FundlinkerError, Result};
use crate::storage::{Order, PaymentMethod, PaymentUpdate, SeaOrmStorage};
use crate::utils::non_blank;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPaidRequest {
    pub method: PaymentMethod,
    #[serde(default)]
    pub check_number: Option<String>,
    #[serde(default)]
    pub collected_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MarkPaidRequest {
    fn into_update(self) -> Result<PaymentUpdate> {
        if self.method == PaymentMethod::Online {
            return Err(FundlinkerError::invalid_payment_method(
                "Only cash or check payments can be recorded manually",
            ));
        }
        let check_number = if self.method == PaymentMethod::Check {
            non_blank(self.check_number.as_deref())
        } else {
            None
        };
        Ok(PaymentUpdate {
            method: self.method,
            check_number,
            collected_by: non_blank(self.collected_by.as_deref()),
            notes: non_blank(self.notes.as_deref()),
        })
    }
}

pub struct PaymentService {
    storage: Arc<SeaOrmStorage>,
}

impl PaymentService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 标记付款，不做自动重试
    pub async fn mark_paid(&self, order_id: &str, req: MarkPaidRequest) -> Result<Order> {
        let update = req.into_update()?;
        self.storage.mark_paid(order_id, &update).await
    }
}
