//! Payment gateway seam
//!
//! Checkout and refunds talk to a `PaymentGateway`. The shipping gateway is
//! `ManualGateway`, which records cash and cheque payments with a synthetic
//! reference; a card processor plugs in behind the same trait.

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use camp_core::{CampError, CampResult, Cents, Id};

/// Token that makes `ManualGateway` decline, for exercising failure paths
pub const DECLINE_TOKEN: &str = "decline";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Declined(String),
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

impl From<PaymentError> for CampError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Declined(reason) => CampError::PaymentDeclined(reason),
            PaymentError::Unavailable(message) => CampError::ExternalService {
                service: "payments".to_string(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub tenant_id: Id,
    pub payer_id: Id,
    pub amount: Cents,
    pub token: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub reference: String,
    pub amount: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub tenant_id: Id,
    /// Reference of the original charge, when known
    pub charge_reference: Option<String>,
    pub amount: Cents,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub reference: String,
    pub amount: Cents,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: ChargeRequest) -> Result<PaymentReceipt, PaymentError>;

    async fn refund(&self, request: RefundRequest) -> Result<RefundReceipt, PaymentError>;
}

/// Offline gateway: every charge succeeds unless the token is `decline`
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualGateway;

#[async_trait]
impl PaymentGateway for ManualGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<PaymentReceipt, PaymentError> {
        if request.token.trim().eq_ignore_ascii_case(DECLINE_TOKEN) {
            return Err(PaymentError::Declined("card was declined".to_string()));
        }
        if !request.amount.is_positive() {
            return Err(PaymentError::Declined("amount must be positive".to_string()));
        }

        let reference = format!("man_ch_{}", Uuid::new_v4().simple());
        info!(
            tenant_id = request.tenant_id,
            payer_id = request.payer_id,
            amount_cents = request.amount.value(),
            reference = %reference,
            "Manual charge recorded"
        );
        Ok(PaymentReceipt {
            reference,
            amount: request.amount,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundReceipt, PaymentError> {
        if !request.amount.is_positive() {
            return Err(PaymentError::Declined("refund must be positive".to_string()));
        }

        let reference = format!("man_re_{}", Uuid::new_v4().simple());
        info!(
            tenant_id = request.tenant_id,
            amount_cents = request.amount.value(),
            charge = ?request.charge_reference,
            reference = %reference,
            "Manual refund recorded"
        );
        Ok(RefundReceipt {
            reference,
            amount: request.amount,
        })
    }
}

/// Return a charge whose follow-up write failed; failures are only logged
pub(crate) async fn refund_failed_charge(
    gateway: &dyn PaymentGateway,
    tenant_id: Id,
    receipt: &PaymentReceipt,
    reason: &str,
) {
    let request = RefundRequest {
        tenant_id,
        charge_reference: Some(receipt.reference.clone()),
        amount: receipt.amount,
        reason: Some(reason.to_string()),
    };
    if let Err(e) = gateway.refund(request).await {
        tracing::error!(
            payment_ref = %receipt.reference,
            amount_cents = receipt.amount.value(),
            error = %e,
            "Compensating refund failed"
        );
    }
}

/// Charge (when there is something to charge), then run `persist` with the
/// charge reference. If `persist` fails the charge is refunded and the
/// failure surfaces as a server error.
pub(crate) async fn charge_then_persist<T, F, Fut>(
    gateway: &dyn PaymentGateway,
    charge: Option<ChargeRequest>,
    operation: &str,
    persist: F,
) -> CampResult<(T, Option<PaymentReceipt>)>
where
    F: FnOnce(Option<String>) -> Fut,
    Fut: Future<Output = CampResult<T>>,
{
    let tenant_id = charge.as_ref().map(|c| c.tenant_id);
    let receipt = match charge {
        Some(request) => Some(gateway.charge(request).await?),
        None => None,
    };

    match persist(receipt.as_ref().map(|r| r.reference.clone())).await {
        Ok(value) => Ok((value, receipt)),
        Err(e) => {
            if let (Some(tenant_id), Some(receipt)) = (tenant_id, &receipt) {
                error!(
                    tenant_id,
                    payment_ref = %receipt.reference,
                    amount_cents = receipt.amount.value(),
                    error = %e,
                    "{} failed after charging; refunding", operation
                );
                refund_failed_charge(
                    gateway,
                    tenant_id,
                    receipt,
                    &format!("{operation} could not be completed"),
                )
                .await;
            }
            Err(CampError::Internal(format!("{operation} failed: {e}")))
        }
    }
}

/// Refund through the gateway, then run `record` with the receipt. The
/// gateway goes last: a decline leaves nothing recorded, and a failed
/// `record` after a completed refund is logged with its reference.
pub(crate) async fn refund_then_record<T, F, Fut>(
    gateway: &dyn PaymentGateway,
    request: RefundRequest,
    record: F,
) -> CampResult<T>
where
    F: FnOnce(RefundReceipt) -> Fut,
    Fut: Future<Output = CampResult<T>>,
{
    let tenant_id = request.tenant_id;
    let charge_reference = request.charge_reference.clone();
    let receipt = gateway.refund(request).await?;
    let reference = receipt.reference.clone();
    let amount = receipt.amount;

    record(receipt).await.map_err(|e| {
        error!(
            tenant_id,
            charge = ?charge_reference,
            refund_ref = %reference,
            amount_cents = amount.value(),
            error = %e,
            "Refund issued by the gateway but not recorded"
        );
        CampError::Internal(format!(
            "refund {reference} was issued but could not be recorded: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge(token: &str, cents: i64) -> ChargeRequest {
        ChargeRequest {
            tenant_id: 1,
            payer_id: 2,
            amount: Cents(cents),
            token: token.to_string(),
            description: "Summer Soccer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_manual_gateway_charges() {
        let receipt = ManualGateway.charge(charge("cash", 29_900)).await.unwrap();
        assert_eq!(receipt.amount, Cents(29_900));
        assert!(receipt.reference.starts_with("man_ch_"));
    }

    #[tokio::test]
    async fn test_manual_gateway_declines() {
        let err = ManualGateway.charge(charge("DECLINE", 100)).await.unwrap_err();
        assert!(matches!(err, PaymentError::Declined(_)));

        let camp_err: CampError = err.into();
        assert_eq!(camp_err.status_code(), 400);
        assert_eq!(camp_err.to_string(), "payment declined: card was declined");
    }

    #[tokio::test]
    async fn test_manual_gateway_refunds() {
        let receipt = ManualGateway
            .refund(RefundRequest {
                tenant_id: 1,
                charge_reference: Some("man_ch_1".into()),
                amount: Cents(500),
                reason: None,
            })
            .await
            .unwrap();
        assert_eq!(receipt.amount, Cents(500));
        assert!(receipt.reference.starts_with("man_re_"));
    }

    #[tokio::test]
    async fn test_refund_failed_charge_refunds_full_amount() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund()
            .withf(|r| r.amount == Cents(4_200) && r.charge_reference.as_deref() == Some("ch_1"))
            .times(1)
            .returning(|r| {
                Ok(RefundReceipt {
                    reference: "re_1".into(),
                    amount: r.amount,
                })
            });

        let receipt = PaymentReceipt {
            reference: "ch_1".into(),
            amount: Cents(4_200),
        };
        refund_failed_charge(&gateway, 1, &receipt, "write failed").await;
    }

    fn charged(r: ChargeRequest) -> Result<PaymentReceipt, PaymentError> {
        Ok(PaymentReceipt {
            reference: "ch_9".into(),
            amount: r.amount,
        })
    }

    #[tokio::test]
    async fn test_failed_write_after_charge_is_refunded() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_charge().times(1).returning(charged);
        gateway
            .expect_refund()
            .withf(|r| r.amount == Cents(59_800) && r.charge_reference.as_deref() == Some("ch_9"))
            .times(1)
            .returning(|r| {
                Ok(RefundReceipt {
                    reference: "re_9".into(),
                    amount: r.amount,
                })
            });

        let result: CampResult<(Vec<Id>, _)> =
            charge_then_persist(&gateway, Some(charge("tok", 59_800)), "checkout", |payment_ref| async move {
                assert_eq!(payment_ref.as_deref(), Some("ch_9"));
                Err(CampError::Internal("connection reset".into()))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("checkout failed"));
    }

    #[tokio::test]
    async fn test_successful_write_keeps_the_charge() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_charge().times(1).returning(charged);
        gateway.expect_refund().times(0);

        let (ids, receipt) =
            charge_then_persist(&gateway, Some(charge("tok", 100)), "checkout", |_| async {
                Ok(vec![1, 2])
            })
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(receipt.unwrap().reference, "ch_9");
    }

    #[tokio::test]
    async fn test_declined_charge_writes_nothing() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_charge()
            .times(1)
            .returning(|_| Err(PaymentError::Declined("insufficient funds".into())));
        gateway.expect_refund().times(0);

        let result: CampResult<((), _)> =
            charge_then_persist(&gateway, Some(charge("tok", 100)), "checkout", |_| async {
                panic!("nothing is written after a decline")
            })
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "payment declined: insufficient funds"
        );
    }

    #[tokio::test]
    async fn test_free_cart_is_not_charged() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_charge().times(0);
        gateway.expect_refund().times(0);

        let result: CampResult<((), _)> =
            charge_then_persist(&gateway, None, "checkout", |payment_ref| async move {
                assert!(payment_ref.is_none());
                Err(CampError::Internal("constraint violated".into()))
            })
            .await;
        assert_eq!(result.unwrap_err().status_code(), 500);
    }

    fn refund_request(cents: i64) -> RefundRequest {
        RefundRequest {
            tenant_id: 1,
            charge_reference: Some("ch_9".into()),
            amount: Cents(cents),
            reason: Some("camp cancelled".into()),
        }
    }

    #[tokio::test]
    async fn test_declined_refund_records_nothing() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund()
            .times(1)
            .returning(|_| Err(PaymentError::Unavailable("gateway offline".into())));

        let result: CampResult<()> = refund_then_record(&gateway, refund_request(500), |_| async {
            panic!("nothing is recorded without a gateway refund")
        })
        .await;
        assert!(matches!(
            result.unwrap_err(),
            CampError::ExternalService { ref service, .. } if service == "payments"
        ));
    }

    #[tokio::test]
    async fn test_unrecorded_refund_reports_its_reference() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund().times(1).returning(|r| {
            Ok(RefundReceipt {
                reference: "re_42".into(),
                amount: r.amount,
            })
        });

        let result: CampResult<()> =
            refund_then_record(&gateway, refund_request(500), |receipt| async move {
                assert_eq!(receipt.amount, Cents(500));
                Err(CampError::Internal("commit failed".into()))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("re_42"));
    }

    #[tokio::test]
    async fn test_recorded_refund_returns_the_record() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund().times(1).returning(|r| {
            Ok(RefundReceipt {
                reference: "re_43".into(),
                amount: r.amount,
            })
        });

        let reference = refund_then_record(&gateway, refund_request(700), |receipt| async move {
            Ok(receipt.reference)
        })
        .await
        .unwrap();
        assert_eq!(reference, "re_43");
    }

    #[test]
    fn test_unavailable_maps_to_server_error() {
        let err: CampError = PaymentError::Unavailable("timeout".into()).into();
        assert!(err.is_server_error());
    }
}
