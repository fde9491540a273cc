// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order quoting and payment verification.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::pricing::price_courses;
use super::{CheckoutError, PaymentSignatureVerifier, PaymentState};
use crate::providers::{CreateOrderRequest, PaymentGateway};
use crate::storage::audit::record;
use crate::storage::{
    AuditEvent, AuditEventType, CourseRepository, Database, EnrollmentRepository, QuoteRepository,
    QuoteSettlement, QuoteStatus, StoreError, StoredAccount, StoredQuote,
};

/// Response to a checkout request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderQuote {
    /// Gateway order id
    pub order_id: String,
    /// Total to pay, whole currency units
    pub amount: u64,
    pub currency: String,
    pub subtotal: u64,
    pub platform_fee: u64,
    /// Public gateway key for the client's checkout widget
    pub key_id: String,
    pub course_ids: Vec<String>,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Payment completion reported by the client.
///
/// Accepts the gateway callback's own field names as aliases.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VerifyPayment {
    #[serde(default, alias = "razorpay_order_id", alias = "orderId")]
    pub order_id: String,
    #[serde(default, alias = "razorpay_payment_id", alias = "paymentId")]
    pub payment_id: String,
    #[serde(default, alias = "razorpay_signature")]
    pub signature: String,
    /// Must match the quoted courses when present
    #[serde(default, alias = "courseIds")]
    pub course_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnrollmentReceipt {
    pub success: bool,
    pub order_id: String,
    pub payment_id: String,
    pub enrolled_course_ids: Vec<String>,
    pub newly_enrolled_course_ids: Vec<String>,
    /// Purchased courses deleted before enrollment; flagged for reconciliation
    pub missing_course_ids: Vec<String>,
    /// This order had already been enrolled by an earlier call
    pub already_processed: bool,
}

pub struct CheckoutService {
    db: Arc<Database>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: PaymentSignatureVerifier,
    currency: String,
    quote_ttl: Duration,
}

impl CheckoutService {
    pub fn new(
        db: Arc<Database>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: PaymentSignatureVerifier,
        currency: impl Into<String>,
        quote_ttl: Duration,
    ) -> Self {
        Self {
            db,
            gateway,
            verifier,
            currency: currency.into(),
            quote_ttl,
        }
    }

    /// Price the requested courses and open a gateway order for the total.
    ///
    /// Nothing about the account or the courses changes; the only write is
    /// the quote record, made after the gateway accepted the order.
    pub async fn create_order(
        &self,
        account: &StoredAccount,
        course_ids: &[String],
    ) -> Result<OrderQuote, CheckoutError> {
        let ids: BTreeSet<String> = course_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Err(CheckoutError::InvalidOrder("no courses selected".to_string()));
        }

        let courses = CourseRepository::new(&self.db)
            .get_many(&ids)
            .map_err(CheckoutError::from_order_store)?;
        let breakdown = price_courses(&courses).ok_or(CheckoutError::AmountOverflow)?;
        if breakdown.total == 0 {
            return Err(CheckoutError::InvalidOrder(
                "order total must be greater than zero".to_string(),
            ));
        }
        let amount_minor = breakdown.amount_minor().ok_or(CheckoutError::AmountOverflow)?;

        let receipt = new_receipt();
        let notes = BTreeMap::from([
            ("account_id".to_string(), account.id.clone()),
            ("course_count".to_string(), ids.len().to_string()),
        ]);
        let order = self
            .gateway
            .create_order(CreateOrderRequest {
                amount_minor,
                currency: self.currency.clone(),
                receipt: receipt.clone(),
                notes,
            })
            .await
            .inspect_err(|e| {
                tracing::error!(account_id = %account.id, error = %e, "Gateway order creation failed");
            })?;

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.quote_ttl).unwrap_or(chrono::Duration::days(1));
        let quote = StoredQuote {
            order_id: order.id.clone(),
            account_id: account.id.clone(),
            course_ids: ids,
            subtotal: breakdown.subtotal,
            platform_fee: breakdown.platform_fee,
            total: breakdown.total,
            amount_minor,
            currency: self.currency.clone(),
            receipt,
            status: QuoteStatus::Quoted,
            payment_id: None,
            created_at: now,
            expires_at: now + ttl,
            enrolled_at: None,
        };
        QuoteRepository::new(&self.db).create(&quote).map_err(|e| {
            tracing::error!(
                order_id = %quote.order_id,
                account_id = %account.id,
                error = %e,
                "Gateway order opened but quote could not be saved"
            );
            CheckoutError::from_order_store(e)
        })?;

        tracing::info!(
            order_id = %quote.order_id,
            account_id = %account.id,
            subtotal = quote.subtotal,
            platform_fee = quote.platform_fee,
            total = quote.total,
            state = %PaymentState::Quoted,
            "Order quoted"
        );
        record(
            &self.db,
            AuditEvent::new(AuditEventType::OrderCreated)
                .with_actor(&account.id)
                .with_resource("order", &quote.order_id)
                .with_details(serde_json::json!({
                    "course_ids": quote.course_ids,
                    "total": quote.total,
                    "currency": quote.currency,
                })),
        );

        Ok(OrderQuote {
            order_id: quote.order_id,
            amount: quote.total,
            currency: quote.currency,
            subtotal: quote.subtotal,
            platform_fee: quote.platform_fee,
            key_id: self.gateway.key_id().to_string(),
            course_ids: quote.course_ids.into_iter().collect(),
            expires_at: quote.expires_at,
        })
    }

    /// Verify a payment report and enroll the buyer.
    ///
    /// Returns only after the enrollment committed. Replaying a verified
    /// payment succeeds again with `already_processed` set.
    pub fn verify_and_enroll(
        &self,
        account: &StoredAccount,
        payment: VerifyPayment,
    ) -> Result<EnrollmentReceipt, CheckoutError> {
        let order_id = payment.order_id.trim();
        let payment_id = payment.payment_id.trim();
        let signature = payment.signature.as_str();
        transition(order_id, &account.id, PaymentState::PaymentReceived);

        let missing: Vec<&str> = [
            ("order_id", order_id),
            ("payment_id", payment_id),
            ("signature", signature),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            let reason = format!("missing {}", missing.join(", "));
            return Err(self.reject(account, order_id, CheckoutError::InvalidPaymentPayload(reason)));
        }

        if !self.verifier.verify(order_id, payment_id, signature) {
            tracing::warn!(
                security_event = true,
                order_id,
                payment_id,
                account_id = %account.id,
                "Payment signature mismatch"
            );
            return Err(self.reject(account, order_id, CheckoutError::InvalidSignature));
        }
        transition(order_id, &account.id, PaymentState::Verified);

        // From here on the payment is genuine: failures may leave a paid
        // order without entitlement and are flagged for reconciliation.
        let quote = match QuoteRepository::new(&self.db).find(order_id) {
            Ok(Some(quote)) => quote,
            Ok(None) => {
                self.flag_reconciliation(account, order_id, payment_id, "no quote for verified order");
                return Err(self.reject(
                    account,
                    order_id,
                    CheckoutError::NotFound(format!("Order {order_id}")),
                ));
            }
            Err(e) => return Err(self.persistence_failure(account, order_id, payment_id, e)),
        };

        if quote.account_id != account.id {
            return Err(self.reject(account, order_id, CheckoutError::Forbidden(order_id.to_string())));
        }

        if let Some(requested) = payment.course_ids.filter(|ids| !ids.is_empty()) {
            let requested: BTreeSet<String> = requested.iter().map(|id| id.trim().to_string()).collect();
            if requested != quote.course_ids {
                return Err(self.reject(
                    account,
                    order_id,
                    CheckoutError::InvalidPaymentPayload(
                        "course_ids do not match the quoted order".to_string(),
                    ),
                ));
            }
        }

        let settlement = QuoteSettlement { order_id, payment_id };
        let outcome = match EnrollmentRepository::new(&self.db).commit(&account.id, &quote.course_ids, Some(settlement)) {
            Ok(outcome) => outcome,
            Err(StoreError::Conflict(_)) => {
                return Err(self.reject(account, order_id, CheckoutError::Forbidden(order_id.to_string())))
            }
            Err(e) => return Err(self.persistence_failure(account, order_id, payment_id, e)),
        };

        if !outcome.missing.is_empty() {
            tracing::warn!(
                order_id,
                payment_id,
                account_id = %account.id,
                missing_course_ids = ?outcome.missing,
                "Paid courses no longer exist; manual reconciliation required"
            );
            record(
                &self.db,
                AuditEvent::new(AuditEventType::EnrollmentReconciliationRequired)
                    .with_actor(&account.id)
                    .with_resource("order", order_id)
                    .with_details(serde_json::json!({
                        "payment_id": payment_id,
                        "missing_course_ids": outcome.missing,
                    })),
            );
        }

        transition(order_id, &account.id, PaymentState::Enrolled);
        record(
            &self.db,
            AuditEvent::new(AuditEventType::EnrollmentCompleted)
                .with_actor(&account.id)
                .with_resource("order", order_id)
                .with_details(serde_json::json!({
                    "payment_id": payment_id,
                    "newly_enrolled": outcome.newly_enrolled,
                    "already_processed": outcome.quote_already_settled,
                })),
        );

        Ok(EnrollmentReceipt {
            success: true,
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            enrolled_course_ids: outcome.enrolled.into_iter().collect(),
            newly_enrolled_course_ids: outcome.newly_enrolled.into_iter().collect(),
            missing_course_ids: outcome.missing.into_iter().collect(),
            already_processed: outcome.quote_already_settled,
        })
    }

    fn reject(&self, account: &StoredAccount, order_id: &str, error: CheckoutError) -> CheckoutError {
        tracing::warn!(
            order_id,
            account_id = %account.id,
            state = %PaymentState::Rejected,
            reason = %error,
            "Payment rejected"
        );
        record(
            &self.db,
            AuditEvent::new(AuditEventType::PaymentRejected)
                .with_actor(&account.id)
                .with_resource("order", order_id)
                .failed(error.to_string()),
        );
        error
    }

    fn flag_reconciliation(&self, account: &StoredAccount, order_id: &str, payment_id: &str, reason: &str) {
        tracing::error!(
            order_id,
            payment_id,
            account_id = %account.id,
            reason,
            "Verified payment could not be enrolled; manual reconciliation required"
        );
        record(
            &self.db,
            AuditEvent::new(AuditEventType::EnrollmentReconciliationRequired)
                .with_actor(&account.id)
                .with_resource("order", order_id)
                .with_details(serde_json::json!({ "payment_id": payment_id, "reason": reason }))
                .failed(reason),
        );
    }

    fn persistence_failure(
        &self,
        account: &StoredAccount,
        order_id: &str,
        payment_id: &str,
        error: StoreError,
    ) -> CheckoutError {
        let error = CheckoutError::from(error);
        self.flag_reconciliation(account, order_id, payment_id, &error.to_string());
        error
    }
}

fn transition(order_id: &str, account_id: &str, state: PaymentState) {
    tracing::debug!(order_id, account_id, state = %state, "Payment state transition");
}

/// `receipt_<unix-millis>_<8 hex chars>`, within the gateway's 40 char limit.
fn new_receipt() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("receipt_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::providers::GatewayError;
    use crate::storage::database::test_support::temp_db;
    use crate::storage::{AccountRepository, AuditQuery, AuditRepository, StoredCourse};
    use crate::test_support::FakeGateway;

    const SECRET: &str = "unit_test_secret";

    struct Harness {
        service: CheckoutService,
        gateway: Arc<FakeGateway>,
        db: Arc<Database>,
        _dir: tempfile::TempDir,
        buyer: StoredAccount,
        courses: Vec<StoredCourse>,
    }

    fn harness(prices: &[u64]) -> Harness {
        let (db, dir) = temp_db();
        let db = Arc::new(db);
        let teacher = StoredAccount::new("user_t", "t@example.com", "Teacher", Role::Teacher);
        let buyer = StoredAccount::new("user_b", "b@example.com", "Buyer", Role::Student);
        let accounts = AccountRepository::new(&db);
        accounts.create(&teacher).unwrap();
        accounts.create(&buyer).unwrap();

        let courses: Vec<StoredCourse> = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| StoredCourse::new(&teacher, format!("Course {i}"), "", price, "general"))
            .collect();
        for course in &courses {
            CourseRepository::new(&db).create(course).unwrap();
        }

        let gateway = Arc::new(FakeGateway::default());
        let service = CheckoutService::new(
            db.clone(),
            gateway.clone(),
            PaymentSignatureVerifier::new(SECRET),
            "INR",
            Duration::from_secs(3600),
        );
        Harness { service, gateway, db, _dir: dir, buyer, courses }
    }

    fn ids(courses: &[StoredCourse]) -> Vec<String> {
        courses.iter().map(|c| c.id.clone()).collect()
    }

    fn signed(order_id: &str, payment_id: &str) -> VerifyPayment {
        VerifyPayment {
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature: PaymentSignatureVerifier::new(SECRET).sign(order_id, payment_id),
            course_ids: None,
        }
    }

    fn rejections(db: &Database) -> usize {
        let mut query = AuditQuery::for_date(Utc::now().date_naive());
        query.event_type = Some(AuditEventType::PaymentRejected);
        AuditRepository::new(db).query(&query).unwrap().len()
    }

    #[tokio::test]
    async fn quote_prices_on_server() {
        let h = harness(&[100, 899]);
        let quote = h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap();

        assert_eq!(quote.subtotal, 999);
        assert_eq!(quote.platform_fee, 70);
        assert_eq!(quote.amount, 1069);
        assert_eq!(quote.currency, "INR");
        assert_eq!(quote.key_id, "rzp_test_fake");

        let sent = h.gateway.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].amount_minor, 106_900);
        assert!(sent[0].receipt.starts_with("receipt_"));
        assert!(sent[0].receipt.len() <= 40);

        let stored = QuoteRepository::new(&h.db).get(&quote.order_id).unwrap();
        assert_eq!(stored.account_id, h.buyer.id);
        assert_eq!(stored.status, QuoteStatus::Quoted);
    }

    #[tokio::test]
    async fn quote_does_not_touch_account_or_courses() {
        let h = harness(&[100]);
        h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap();

        let buyer = AccountRepository::new(&h.db).get(&h.buyer.id).unwrap();
        assert!(buyer.enrolled_courses.is_empty());
        let course = CourseRepository::new(&h.db).get(&h.courses[0].id).unwrap();
        assert!(course.students_enrolled.is_empty());
    }

    #[tokio::test]
    async fn quote_collapses_duplicate_ids() {
        let h = harness(&[100]);
        let id = h.courses[0].id.clone();
        let quote = h.service.create_order(&h.buyer, &[id.clone(), id]).await.unwrap();
        assert_eq!(quote.subtotal, 100);
        assert_eq!(quote.course_ids.len(), 1);
    }

    #[tokio::test]
    async fn quote_rejects_empty_and_unknown() {
        let h = harness(&[100]);
        assert!(matches!(
            h.service.create_order(&h.buyer, &[]).await,
            Err(CheckoutError::InvalidOrder(_))
        ));
        assert!(matches!(
            h.service.create_order(&h.buyer, &["  ".to_string()]).await,
            Err(CheckoutError::InvalidOrder(_))
        ));
        assert!(matches!(
            h.service.create_order(&h.buyer, &["ghost".to_string()]).await,
            Err(CheckoutError::NotFound(_))
        ));
        assert!(h.gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn quote_rejects_free_order() {
        let h = harness(&[0]);
        assert!(matches!(
            h.service.create_order(&h.buyer, &ids(&h.courses)).await,
            Err(CheckoutError::InvalidOrder(_))
        ));
    }

    #[tokio::test]
    async fn gateway_failure_persists_nothing() {
        let h = harness(&[100]);
        h.gateway.fail_next(GatewayError::Request("connection reset".into()));

        let result = h.service.create_order(&h.buyer, &ids(&h.courses)).await;
        assert!(matches!(result, Err(CheckoutError::Gateway(_))));
        assert!(QuoteRepository::new(&h.db).list_by_account(&h.buyer.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsaved_quote_is_an_order_failure_not_a_payment_failure() {
        let h = harness(&[100]);
        // The fake gateway's first order id is already taken
        QuoteRepository::new(&h.db)
            .create(&crate::storage::repository::quotes::sample_quote("order_fake1", &h.buyer.id, &["c1"]))
            .unwrap();

        let err = h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap_err();
        assert!(matches!(err, CheckoutError::OrderStorage(_)), "got {err:?}");
        assert!(err.is_retryable());

        let checkout_message = crate::error::ApiError::from(err).message;
        let verify_message =
            crate::error::ApiError::from(CheckoutError::Persistence(StoreError::Invalid("x".into()))).message;
        assert_ne!(checkout_message, verify_message);
        assert!(!checkout_message.to_lowercase().contains("payment received"));
    }

    #[tokio::test]
    async fn verified_payment_enrolls_both_sides() {
        let h = harness(&[100, 200]);
        AccountRepository::new(&h.db).add_to_cart(&h.buyer.id, &h.courses[0].id).unwrap();
        let quote = h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap();

        let receipt = h.service.verify_and_enroll(&h.buyer, signed(&quote.order_id, "pay_1")).unwrap();
        assert!(receipt.success);
        assert!(!receipt.already_processed);
        assert_eq!(receipt.newly_enrolled_course_ids.len(), 2);

        let buyer = AccountRepository::new(&h.db).get(&h.buyer.id).unwrap();
        assert!(buyer.cart.is_empty());
        for course in &h.courses {
            assert!(buyer.is_enrolled(&course.id));
            let stored = CourseRepository::new(&h.db).get(&course.id).unwrap();
            assert!(stored.students_enrolled.contains(&h.buyer.id));
        }

        let quote = QuoteRepository::new(&h.db).get(&quote.order_id).unwrap();
        assert_eq!(quote.status, QuoteStatus::Enrolled);
        assert_eq!(quote.payment_id.as_deref(), Some("pay_1"));
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let h = harness(&[100]);
        let quote = h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap();
        h.service.verify_and_enroll(&h.buyer, signed(&quote.order_id, "pay_1")).unwrap();
        let after_first = AccountRepository::new(&h.db).get(&h.buyer.id).unwrap();

        let replay = h.service.verify_and_enroll(&h.buyer, signed(&quote.order_id, "pay_1")).unwrap();
        assert!(replay.success);
        assert!(replay.already_processed);
        assert!(replay.newly_enrolled_course_ids.is_empty());
        assert_eq!(AccountRepository::new(&h.db).get(&h.buyer.id).unwrap(), after_first);
        let course = CourseRepository::new(&h.db).get(&h.courses[0].id).unwrap();
        assert_eq!(course.students_enrolled.len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_without_enrolling() {
        let h = harness(&[100]);
        let quote = h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap();

        let mut payment = signed(&quote.order_id, "pay_1");
        payment.payment_id = "   ".into();
        match h.service.verify_and_enroll(&h.buyer, payment) {
            Err(CheckoutError::InvalidPaymentPayload(msg)) => assert!(msg.contains("payment_id")),
            other => panic!("expected InvalidPaymentPayload, got {other:?}"),
        }

        let buyer = AccountRepository::new(&h.db).get(&h.buyer.id).unwrap();
        assert!(buyer.enrolled_courses.is_empty());
        assert_eq!(rejections(&h.db), 1);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_and_audited() {
        let h = harness(&[100]);
        let quote = h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap();

        let mut payment = signed(&quote.order_id, "pay_1");
        payment.payment_id = "pay_2".into();
        assert!(matches!(
            h.service.verify_and_enroll(&h.buyer, payment),
            Err(CheckoutError::InvalidSignature)
        ));

        let mut payment = signed(&quote.order_id, "pay_1");
        payment.signature = "zz".into();
        assert!(matches!(
            h.service.verify_and_enroll(&h.buyer, payment),
            Err(CheckoutError::InvalidSignature)
        ));

        let mut payment = signed(&quote.order_id, "pay_1");
        payment.signature.push(' ');
        assert!(matches!(
            h.service.verify_and_enroll(&h.buyer, payment),
            Err(CheckoutError::InvalidSignature)
        ));

        let buyer = AccountRepository::new(&h.db).get(&h.buyer.id).unwrap();
        assert!(buyer.enrolled_courses.is_empty());
        assert_eq!(QuoteRepository::new(&h.db).get(&quote.order_id).unwrap().status, QuoteStatus::Quoted);
        assert_eq!(rejections(&h.db), 3);
    }

    #[tokio::test]
    async fn course_set_must_match_quote() {
        let h = harness(&[100, 200]);
        let quote = h.service.create_order(&h.buyer, &ids(&h.courses[..1])).await.unwrap();

        // Valid signature reused for a larger course set
        let mut payment = signed(&quote.order_id, "pay_1");
        payment.course_ids = Some(ids(&h.courses));
        assert!(matches!(
            h.service.verify_and_enroll(&h.buyer, payment),
            Err(CheckoutError::InvalidPaymentPayload(_))
        ));

        let mut payment = signed(&quote.order_id, "pay_1");
        payment.course_ids = Some(ids(&h.courses[..1]));
        let receipt = h.service.verify_and_enroll(&h.buyer, payment).unwrap();
        assert_eq!(receipt.enrolled_course_ids, ids(&h.courses[..1]));
    }

    #[tokio::test]
    async fn other_accounts_order_is_forbidden() {
        let h = harness(&[100]);
        let quote = h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap();
        let intruder = StoredAccount::new("user_i", "i@example.com", "Intruder", Role::Student);
        AccountRepository::new(&h.db).create(&intruder).unwrap();

        assert!(matches!(
            h.service.verify_and_enroll(&intruder, signed(&quote.order_id, "pay_1")),
            Err(CheckoutError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let h = harness(&[100]);
        assert!(matches!(
            h.service.verify_and_enroll(&h.buyer, signed("order_unknown", "pay_1")),
            Err(CheckoutError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleted_course_is_reported_for_reconciliation() {
        let h = harness(&[100, 200]);
        let quote = h.service.create_order(&h.buyer, &ids(&h.courses)).await.unwrap();
        CourseRepository::new(&h.db).delete(&h.courses[1].id).unwrap();

        let receipt = h.service.verify_and_enroll(&h.buyer, signed(&quote.order_id, "pay_1")).unwrap();
        assert_eq!(receipt.enrolled_course_ids, vec![h.courses[0].id.clone()]);
        assert_eq!(receipt.missing_course_ids, vec![h.courses[1].id.clone()]);

        let mut query = AuditQuery::for_date(Utc::now().date_naive());
        query.event_type = Some(AuditEventType::EnrollmentReconciliationRequired);
        assert_eq!(AuditRepository::new(&h.db).query(&query).unwrap().len(), 1);
    }

    #[test]
    fn verify_payload_accepts_gateway_field_names() {
        let payment: VerifyPayment = serde_json::from_value(serde_json::json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "abc",
            "courseIds": ["c1"]
        }))
        .unwrap();
        assert_eq!(payment.order_id, "order_1");
        assert_eq!(payment.payment_id, "pay_1");
        assert_eq!(payment.signature, "abc");
        assert_eq!(payment.course_ids, Some(vec!["c1".to_string()]));
    }

    #[test]
    fn receipt_format() {
        let receipt = new_receipt();
        let parts: Vec<&str> = receipt.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "receipt");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }
}
