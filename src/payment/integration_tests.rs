//! Integration Tests for the Payment Flow
//!
//! These tests drive both directions (pay and receive) through the full
//! service path: store, lock coordinator, wallet, notifications. The
//! seal-before-transfer behavior is pinned down here, including the one
//! exception that keeps a record retryable.

use std::sync::Arc;

use crate::core_types::{PartyId, RecordId};
use crate::error::CoreError;
use crate::lock::LockCoordinator;
use crate::notify::{Event, RecordingSink};
use crate::payment::record::{PaymentDirection, PaymentRecord, PaymentState};
use crate::payment::service::PaymentService;
use crate::storage::MemoryStore;
use crate::wallet::MockWallet;

const ALICE: PartyId = 3001;
const BOB: PartyId = 3002;
const CAROL: PartyId = 3003;
const DAN: PartyId = 3004;

/// Helper wiring a service to in-memory doubles for testing
struct TestHarness {
    service: PaymentService,
    wallet: Arc<MockWallet>,
    sink: Arc<RecordingSink>,
    locks: Arc<LockCoordinator>,
}

impl TestHarness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let wallet = Arc::new(MockWallet::new());
        let sink = Arc::new(RecordingSink::new());
        let locks = Arc::new(LockCoordinator::with_defaults(store.clone()));

        let service = PaymentService::new(
            store.clone(),
            wallet.clone(),
            sink.clone(),
            locks.clone(),
        );

        Self {
            service,
            wallet,
            sink,
            locks,
        }
    }

    fn funded() -> Self {
        let h = Self::new();
        h.wallet.credit(ALICE, 100);
        h.wallet.credit(DAN, 100);
        h
    }
}

// ========================================================================
// Happy Path Tests
// ========================================================================

/// Test: pay offer confirmed by the payer moves the funds once
#[tokio::test]
async fn test_pay_confirm_moves_funds() {
    let h = TestHarness::funded();

    let payment = h
        .service
        .create_pay(ALICE, BOB, 40, Some("thanks".into()))
        .await
        .unwrap();
    let id = payment.id().clone();
    assert_eq!(payment.state, PaymentState::Pending);
    assert_eq!(payment.payer, Some(ALICE));

    let receipt = h.service.confirm(&id, ALICE).await.unwrap();
    assert_eq!(receipt.record_id, id);
    assert_eq!(receipt.direction, PaymentDirection::Pay);
    assert_eq!(receipt.payer, Some(ALICE));
    assert_eq!(receipt.payee, BOB);
    assert!(matches!(receipt.state, PaymentState::Confirmed { .. }));
    assert!(receipt.reference().unwrap().starts_with("mock-ref-"));

    assert_eq!(h.wallet.balance_of(ALICE), 60);
    assert_eq!(h.wallet.balance_of(BOB), 40);
    assert_eq!(h.wallet.transfer_count(), 1);

    // Both parties hear about it, and the chat message is refreshed.
    assert_eq!(h.sink.notify_count(), 2);
    assert_eq!(h.sink.display_count(), 1);
    match h.sink.last_display() {
        Some(Event::Payment(r)) => assert!(r.state.is_terminal()),
        other => panic!("expected a payment display update, got {other:?}"),
    }
}

/// Test: whoever confirms a receive request becomes the payer
#[tokio::test]
async fn test_receive_confirm_resolves_payer() {
    let h = TestHarness::funded();

    let request = h.service.create_receive(CAROL, 30, None).await.unwrap();
    let id = request.id().clone();
    assert_eq!(request.payer, None);
    assert_eq!(request.creator, CAROL);

    let receipt = h.service.confirm(&id, DAN).await.unwrap();
    assert_eq!(receipt.direction, PaymentDirection::Receive);
    assert_eq!(receipt.payer, Some(DAN));
    assert_eq!(receipt.payee, CAROL);

    assert_eq!(h.wallet.balance_of(DAN), 70);
    assert_eq!(h.wallet.balance_of(CAROL), 30);

    // The resolved payer survives the round trip through storage.
    let persisted = h.service.status(&id).await.unwrap();
    assert_eq!(persisted.payer, Some(DAN));
    assert!(matches!(persisted.state, PaymentState::Confirmed { .. }));
}

/// Test: status is a plain read of the live record
#[tokio::test]
async fn test_status_reads_pending_record() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 10, None).await.unwrap();
    let receipt = h.service.status(payment.id()).await.unwrap();
    assert_eq!(receipt.state, PaymentState::Pending);
    assert!(!receipt.state.is_terminal());
    assert_eq!(receipt.reference(), None);
    assert_eq!(h.wallet.transfer_count(), 0);
}

// ========================================================================
// Authorization Tests
// ========================================================================

/// Test: only the payer can confirm a pay offer
#[tokio::test]
async fn test_pay_confirm_is_payer_only() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    // Neither the payee nor a bystander can release the funds.
    let err = h.service.confirm(&id, BOB).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));
    let err = h.service.confirm(&id, CAROL).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));

    assert_eq!(h.wallet.transfer_count(), 0);
    let receipt = h.service.status(&id).await.unwrap();
    assert_eq!(receipt.state, PaymentState::Pending);
}

/// Test: a payee cannot confirm their own receive request
#[tokio::test]
async fn test_receive_self_confirm_rejected() {
    let h = TestHarness::funded();

    let request = h.service.create_receive(CAROL, 30, None).await.unwrap();
    let err = h.service.confirm(request.id(), CAROL).await.unwrap_err();
    assert!(matches!(err, CoreError::SelfTransfer));
    assert_eq!(h.wallet.transfer_count(), 0);
}

// ========================================================================
// Idempotency Tests
// ========================================================================

/// Test: a replayed confirm finds a spent record, not a second transfer
#[tokio::test]
async fn test_confirm_replay_is_terminal() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    h.service.confirm(&id, ALICE).await.unwrap();
    let err = h.service.confirm(&id, ALICE).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyTerminal(_)));

    assert_eq!(h.wallet.transfer_count(), 1);
    assert_eq!(h.wallet.balance_of(BOB), 40);
}

/// Test: two simultaneous confirm presses execute exactly one transfer
#[tokio::test]
async fn test_concurrent_confirms_transfer_once() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    let (first, second) = tokio::join!(
        h.service.confirm(&id, ALICE),
        h.service.confirm(&id, ALICE),
    );

    let oks = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(oks, 1);
    for result in [first, second] {
        if let Err(e) = result {
            assert!(matches!(e, CoreError::AlreadyTerminal(_)));
        }
    }

    assert_eq!(h.wallet.transfer_count(), 1);
    assert_eq!(h.wallet.balance_of(ALICE), 60);
    assert_eq!(h.wallet.balance_of(BOB), 40);
}

// ========================================================================
// Failure Tests
// ========================================================================

/// Test: a short balance at confirm leaves the record open for retry
#[tokio::test]
async fn test_insufficient_funds_keeps_record_confirmable() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    // The balance moved between create and confirm.
    h.wallet.drain(ALICE);
    let err = h.service.confirm(&id, ALICE).await.unwrap_err();
    assert!(matches!(err, CoreError::InsufficientFunds));
    assert!(err.is_retryable());
    assert_eq!(h.wallet.transfer_count(), 0);

    // Not sealed: this is the one pre-transfer failure that leaves the
    // record alive, so a top-up can finish the payment.
    let receipt = h.service.status(&id).await.unwrap();
    assert_eq!(receipt.state, PaymentState::Pending);

    h.wallet.credit(ALICE, 40);
    let receipt = h.service.confirm(&id, ALICE).await.unwrap();
    assert!(matches!(receipt.state, PaymentState::Confirmed { .. }));
}

/// Test: a rejected transfer burns the record permanently
#[tokio::test]
async fn test_rejected_transfer_fails_record() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    h.wallet.set_reject_transfer(true);
    let err = h.service.confirm(&id, ALICE).await.unwrap_err();
    assert!(matches!(err, CoreError::TransferFailed(_)));

    let receipt = h.service.status(&id).await.unwrap();
    assert!(matches!(receipt.state, PaymentState::Failed { .. }));
    assert!(receipt.state.is_terminal());
    assert_eq!(h.wallet.balance_of(BOB), 0);

    // Sealed before the wallet call: even with the wallet healthy again,
    // this record never asks for funds twice.
    h.wallet.set_reject_transfer(false);
    let err = h.service.confirm(&id, ALICE).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyTerminal(_)));
}

/// Test: a wallet outage mid-confirm also burns the record
#[tokio::test]
async fn test_wallet_outage_fails_record() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    h.wallet.set_fail_transfer(true);
    let err = h.service.confirm(&id, ALICE).await.unwrap_err();
    assert_eq!(err.code(), "WALLET_ERROR");

    // The transfer may or may not have landed on the wallet side, so the
    // record is spent either way.
    let receipt = h.service.status(&id).await.unwrap();
    assert!(matches!(receipt.state, PaymentState::Failed { .. }));

    h.wallet.set_fail_transfer(false);
    let err = h.service.confirm(&id, ALICE).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyTerminal(_)));
}

/// Test: confirm errors release the record lock
#[tokio::test]
async fn test_failed_confirm_releases_lock() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    h.wallet.drain(ALICE);
    h.service.confirm(&id, ALICE).await.unwrap_err();

    let record: PaymentRecord = h.locks.peek(&id).await.unwrap();
    assert!(!record.envelope.in_progress);
    assert!(record.envelope.active);
}

// ========================================================================
// Cancel Tests
// ========================================================================

/// Test: only the creator may cancel, for both directions
#[tokio::test]
async fn test_cancel_is_creator_only() {
    let h = TestHarness::funded();

    // Pay: the payer created it.
    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let err = h.service.cancel(payment.id(), BOB).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));
    let receipt = h.service.cancel(payment.id(), ALICE).await.unwrap();
    assert_eq!(receipt.state, PaymentState::Cancelled);

    // Receive: the payee created it.
    let request = h.service.create_receive(CAROL, 30, None).await.unwrap();
    let err = h.service.cancel(request.id(), DAN).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));
    let receipt = h.service.cancel(request.id(), CAROL).await.unwrap();
    assert_eq!(receipt.state, PaymentState::Cancelled);
}

/// Test: a cancelled record refuses confirmation
#[tokio::test]
async fn test_confirm_after_cancel_is_terminal() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    h.service.cancel(&id, ALICE).await.unwrap();
    let err = h.service.confirm(&id, ALICE).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyTerminal(_)));
    assert_eq!(h.wallet.transfer_count(), 0);
}

/// Test: a second cancel is a quiet no-op with the same answer
#[tokio::test]
async fn test_second_cancel_is_quiet() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    let first = h.service.cancel(&id, ALICE).await.unwrap();
    let second = h.service.cancel(&id, ALICE).await.unwrap();
    assert_eq!(first.state, PaymentState::Cancelled);
    assert_eq!(second.state, PaymentState::Cancelled);
}

/// Test: cancelling a confirmed payment changes nothing
#[tokio::test]
async fn test_cancel_after_confirm_keeps_confirmed_state() {
    let h = TestHarness::funded();

    let payment = h.service.create_pay(ALICE, BOB, 40, None).await.unwrap();
    let id = payment.id().clone();

    h.service.confirm(&id, ALICE).await.unwrap();
    let receipt = h.service.cancel(&id, ALICE).await.unwrap();
    assert!(matches!(receipt.state, PaymentState::Confirmed { .. }));
    assert_eq!(h.wallet.balance_of(BOB), 40);
}

// ========================================================================
// Validation Tests
// ========================================================================

/// Test: create rejects bad amounts, self-dealing, and broke payers
#[tokio::test]
async fn test_create_pay_validation() {
    let h = TestHarness::funded();

    let err = h.service.create_pay(ALICE, BOB, 0, None).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidAmount));

    let err = h
        .service
        .create_pay(ALICE, ALICE, 40, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::SelfTransfer));

    // BOB holds nothing.
    let err = h.service.create_pay(BOB, ALICE, 40, None).await.unwrap_err();
    assert!(matches!(err, CoreError::InsufficientFunds));
}

/// Test: a receive request validates the amount but not any balance
#[tokio::test]
async fn test_create_receive_validation() {
    let h = TestHarness::new();

    let err = h.service.create_receive(CAROL, 0, None).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidAmount));

    // No balance anywhere, yet the request stands: the payer is unknown
    // until someone confirms.
    let request = h.service.create_receive(CAROL, 30, None).await.unwrap();
    assert_eq!(request.payer, None);
    assert_eq!(h.wallet.balance_count(), 0);
}

/// Test: confirming an unknown record is NOT_FOUND
#[tokio::test]
async fn test_missing_record_is_not_found() {
    let h = TestHarness::funded();
    let id = RecordId::new("pay-1-1-zzzzz");

    let err = h.service.confirm(&id, ALICE).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    let err = h.service.cancel(&id, ALICE).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}
