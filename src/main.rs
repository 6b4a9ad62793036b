//! tipcore demo - scripted chat session against the coordination core
//!
//! Wires the library to an in-process wallet ledger and a logging
//! notification sink, then replays the flows a chat frontend would drive:
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│ JournalStore │───▶│  Locks   │───▶│ Services │
//! │  (YAML)  │    │(replay+append)│   │ (per-ID) │    │ (faucet, │
//! └──────────┘    └──────────────┘    └──────────┘    │ payment) │
//!                                                     └──────────┘
//! ```
//!
//! Run with `--env <name>` to pick a config file (default `dev`).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use tipcore::config::AppConfig;
use tipcore::core_types::{PartyId, Sats};
use tipcore::faucet::{ClaimOutcome, FaucetService};
use tipcore::janitor::Janitor;
use tipcore::lock::LockCoordinator;
use tipcore::logging::init_logging;
use tipcore::notify::LogSink;
use tipcore::payment::PaymentService;
use tipcore::storage::{JournalStore, RecordStore};
use tipcore::wallet::{TransferOutcome, TransferSpec, WalletError, WalletService};

// ============================================================
// DEMO CAST
// ============================================================

const HOST: PartyId = 1001;
const IVY: PartyId = 2001;
const JUNO: PartyId = 2002;
const KIRA: PartyId = 2003;
const LEO: PartyId = 2004;
const NOAH: PartyId = 2005;

const CAST: [(&str, PartyId); 6] = [
    ("host", HOST),
    ("ivy", IVY),
    ("juno", JUNO),
    ("kira", KIRA),
    ("leo", LEO),
    ("noah", NOAH),
];

// ============================================================
// IN-PROCESS WALLET
// ============================================================

/// Ledger standing in for the external wallet service.
struct DemoWallet {
    balances: DashMap<PartyId, Sats>,
    seq: AtomicU64,
}

impl DemoWallet {
    fn new() -> Self {
        Self {
            balances: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    fn seed(&self, party: PartyId, amount: Sats) {
        self.balances.insert(party, amount);
    }

    fn balance_of(&self, party: PartyId) -> Sats {
        self.balances.get(&party).map(|b| *b).unwrap_or(0)
    }
}

#[async_trait]
impl WalletService for DemoWallet {
    async fn balance(&self, party: PartyId) -> Result<Sats, WalletError> {
        self.balances
            .get(&party)
            .map(|b| *b)
            .ok_or(WalletError::UnknownParty(party))
    }

    async fn transfer(&self, spec: TransferSpec) -> Result<TransferOutcome, WalletError> {
        {
            let mut from = self
                .balances
                .get_mut(&spec.from)
                .ok_or(WalletError::UnknownParty(spec.from))?;
            if *from < spec.amount {
                return Ok(TransferOutcome::Rejected {
                    reason: "insufficient balance".to_string(),
                });
            }
            *from -= spec.amount;
        }
        *self.balances.entry(spec.to).or_insert(0) += spec.amount;

        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        Ok(TransferOutcome::Completed {
            reference: format!("demo-{:08}", n),
        })
    }
}

// ============================================================
// ARGUMENTS
// ============================================================

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _log_guard = init_logging(&config);

    tracing::info!("starting tipcore demo in {} env", env);

    let journal = Arc::new(JournalStore::open(&config.store)?);
    let store: Arc<dyn RecordStore> = journal.clone();
    let locks = Arc::new(LockCoordinator::new(store.clone(), &config.lock));

    let wallet = Arc::new(DemoWallet::new());
    wallet.seed(HOST, 1_000);
    wallet.seed(IVY, 120);
    wallet.seed(JUNO, 80);
    wallet.seed(KIRA, 50);
    wallet.seed(LEO, 200);
    wallet.seed(NOAH, 0);

    let notifier = Arc::new(LogSink);
    let faucets = FaucetService::new(
        store.clone(),
        wallet.clone(),
        notifier.clone(),
        locks.clone(),
    );
    let payments = PaymentService::new(
        store.clone(),
        wallet.clone(),
        notifier.clone(),
        locks.clone(),
    );

    let janitor = Janitor::new(store.clone(), &config.janitor);
    let janitor_task = tokio::spawn(async move { janitor.run().await });

    // --- Faucet round ---
    println!("=== Faucet: host opens 100 sat, 25 per claim ===");
    let faucet = faucets
        .create(HOST, 100, 25, Some("welcome round".into()))
        .await?;
    let faucet_id = faucet.id().clone();
    println!("opened {}", faucet_id);

    for claimant in [IVY, JUNO, KIRA] {
        match faucets.claim(&faucet_id, claimant).await? {
            ClaimOutcome::Served(receipt) => println!(
                "claim by {claimant}: +{} sat ({} of {} shares gone)",
                receipt.amount, receipt.served, receipt.total_shares
            ),
            ClaimOutcome::AlreadyServed => println!("claim by {claimant}: already served"),
        }
    }

    // Duplicate press: quietly served nothing.
    match faucets.claim(&faucet_id, IVY).await? {
        ClaimOutcome::AlreadyServed => println!("repeat claim by ivy: already served"),
        ClaimOutcome::Served(_) => println!("repeat claim by ivy: served twice?!"),
    }

    // Owner pressing their own button goes nowhere.
    if let Err(e) = faucets.claim(&faucet_id, HOST).await {
        println!("self-claim by host: {}", e.code());
    }

    // Last share, then exhaustion.
    let _ = faucets.claim(&faucet_id, LEO).await?;
    if let Err(e) = faucets.claim(&faucet_id, NOAH).await {
        println!("claim by noah after the pot ran dry: {}", e.code());
    }
    let status = faucets.status(&faucet_id).await?;
    println!(
        "faucet state: remaining={} served={}/{} closed={:?}",
        status.remaining, status.served, status.total_shares, status.closed
    );

    // --- Pay flow ---
    println!("\n=== Pay: host offers 50 sat to ivy ===");
    let pay = payments
        .create_pay(HOST, IVY, 50, Some("thanks!".into()))
        .await?;
    let pay_id = pay.id().clone();
    println!("offered {}", pay_id);

    if let Err(e) = payments.confirm(&pay_id, JUNO).await {
        println!("confirm by juno (not the payer): {}", e.code());
    }
    let receipt = payments.confirm(&pay_id, HOST).await?;
    println!(
        "confirmed by host: {} sat to {}, ref {:?}",
        receipt.amount,
        receipt.payee,
        receipt.reference()
    );
    if let Err(e) = payments.confirm(&pay_id, HOST).await {
        println!("second confirm press: {}", e.code());
    }

    // --- Receive flow ---
    println!("\n=== Receive: juno requests 30 sat ===");
    let receive = payments.create_receive(JUNO, 30, None).await?;
    let receive_id = receive.id().clone();
    println!("requested {}", receive_id);

    if let Err(e) = payments.confirm(&receive_id, JUNO).await {
        println!("juno pressing their own request: {}", e.code());
    }
    let receipt = payments.confirm(&receive_id, LEO).await?;
    println!(
        "confirmed by leo: payer resolved to {:?}, ref {:?}",
        receipt.payer,
        receipt.reference()
    );

    // --- Cancel flow ---
    println!("\n=== Cancel: host withdraws an offer ===");
    let doomed = payments.create_pay(HOST, KIRA, 10, None).await?;
    let doomed_id = doomed.id().clone();
    let receipt = payments.cancel(&doomed_id, HOST).await?;
    println!("cancelled {}: state {}", doomed_id, receipt.state);
    if let Err(e) = payments.confirm(&doomed_id, HOST).await {
        println!("confirm after cancel: {}", e.code());
    }

    // --- Broke payer ---
    println!("\n=== Noah (0 sat) tries to offer 5 sat ===");
    if let Err(e) = payments.create_pay(NOAH, IVY, 5, None).await {
        println!("offer rejected up front: {}", e.code());
    }

    // --- Wrap up ---
    println!("\n=== Balances ===");
    for (name, party) in CAST {
        println!("{:>5}: {} sat", name, wallet.balance_of(party));
    }

    janitor_task.abort();
    journal.sync().await?;
    println!("\nrecords persisted to {}", config.store.journal_path);
    println!("\n=== Done ===");
    Ok(())
}
