// Demo Orchestrator - drives a full ticketing scenario end to end:
// event creation, screened and signed mints, a two-phase resale, a refund,
// venue entry, and mining, finishing with chain and stats summaries.

use anyhow::Result;
use chrono::{Duration, Utc};
use colored::Colorize;
use fraud_screen::{FraudScreen, RuleScreen, TxContext, Verdict};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use ticket_ledger::{crypto, Address, Config, KeyPair, Ledger, NewEvent, TicketClass};
use tokio::time::{sleep, Duration as TokioDuration};

struct Patron {
    name: &'static str,
    address: Address,
    wallet: KeyPair,
}

impl Patron {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            address: Address::new(name),
            wallet: KeyPair::generate(),
        }
    }
}

/// Screen a proposed mint, then submit it with a signed authorization.
///
/// `Fraud` blocks the call before it reaches the ledger; `Suspect` is
/// logged and allowed through.
async fn screened_mint(
    ledger: &Ledger,
    screen: &RuleScreen,
    event_id: uuid::Uuid,
    patron: &Patron,
    class: TicketClass,
    fraud_prone: bool,
) -> Result<Option<ticket_ledger::Ticket>> {
    let recent = ledger.user_tickets(patron.address.clone()).await?.len() as u32;
    let judgment = screen.judge(&TxContext {
        wallet: patron.address.to_string(),
        event_id,
        ticket_class: class.code().to_string(),
        timestamp: Utc::now(),
        fraud_prone,
        recent_purchases: recent,
    });

    match judgment.verdict {
        Verdict::Fraud => {
            println!(
                "   {} mint for {} blocked by screening: {}",
                "✗".red(),
                patron.name,
                judgment.factors.join(", ")
            );
            return Ok(None);
        }
        Verdict::Suspect => {
            println!(
                "   {} {} looks suspect ({}), allowing through",
                "!".yellow(),
                patron.name,
                judgment.factors.join(", ")
            );
        }
        Verdict::Normal => {}
    }

    let payload = crypto::mint_payload(&event_id, &patron.address, class);
    let ticket = ledger
        .mint_ticket(
            event_id,
            patron.address.clone(),
            class,
            Some(patron.wallet.authorize(&payload)),
        )
        .await?;

    println!(
        "   {} {} minted a {} ticket at {} (qr {}…)",
        "✓".green(),
        patron.name,
        class,
        ticket.price,
        &ticket.qr_token[..8]
    );
    Ok(Some(ticket))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    println!("\n🎟️  =============================================================");
    println!("🎟️  Turnstile - Ticketing Ledger Demo");
    println!("🎟️  Mint → Resell → Refund → Enter → Mine");
    println!("🎟️  =============================================================\n");

    let mut config = Config::default();
    config.mining.difficulty = 2;
    let ledger = Ledger::open(config)?;
    let screen = RuleScreen::default();

    // Stage 1: the organizer lists an event
    println!("{}", "📅 Stage 1: Create event".bold());
    let now = Utc::now();
    let mut counts = BTreeMap::new();
    counts.insert(TicketClass::Regular, 100);
    counts.insert(TicketClass::Vip, 10);
    counts.insert(TicketClass::EarlyBird, 25);
    let mut prices = BTreeMap::new();
    prices.insert(TicketClass::Regular, dec!(50));
    prices.insert(TicketClass::Vip, dec!(150));
    prices.insert(TicketClass::EarlyBird, dec!(35));

    let event = ledger
        .create_event(NewEvent {
            name: "Midnight Arcade Tour".to_string(),
            venue: "Volt Hall".to_string(),
            date: now + Duration::days(30),
            class_counts: counts,
            class_prices: prices,
            organizer: Address::new("org-volthall"),
            description: "synthwave, all night".to_string(),
            category: "music".to_string(),
            max_per_user: 4,
            refundable_until: now + Duration::days(25),
        })
        .await?;
    println!(
        "   {} \"{}\" at {} ({} classes, resale floor {} for regular)\n",
        "✓".green(),
        event.name,
        event.venue,
        event.total.len(),
        event.min_resale[&TicketClass::Regular]
    );
    sleep(TokioDuration::from_millis(300)).await;

    // Stage 2: screened, signed mints
    println!("{}", "🛒 Stage 2: Screened mints".bold());
    let alice = Patron::new("alice");
    let bob = Patron::new("bob");
    let carol = Patron::new("carol");

    let alice_ticket =
        screened_mint(&ledger, &screen, event.event_id, &alice, TicketClass::Vip, false)
            .await?
            .expect("screening admits a quiet wallet");
    let _ = screened_mint(&ledger, &screen, event.event_id, &bob, TicketClass::Regular, false)
        .await?;
    let carol_ticket =
        screened_mint(&ledger, &screen, event.event_id, &carol, TicketClass::EarlyBird, false)
            .await?
            .expect("screening admits a quiet wallet");

    // A flagged wallet never reaches the ledger.
    let scalper = Patron::new("scalper-77");
    let judgment = screen.judge(&TxContext {
        wallet: scalper.address.to_string(),
        event_id: event.event_id,
        ticket_class: TicketClass::Regular.code().to_string(),
        timestamp: Utc::now(),
        fraud_prone: true,
        recent_purchases: 7,
    });
    println!(
        "   {} {} judged {:?} ({}) - mint never submitted\n",
        "✗".red(),
        scalper.name,
        judgment.verdict,
        judgment.factors.join(", ")
    );
    sleep(TokioDuration::from_millis(300)).await;

    // Stage 3: seal the first block
    println!("{}", "⛏️  Stage 3: Mine pending transactions".bold());
    mine_and_report(&ledger, "miner-node-1").await?;
    sleep(TokioDuration::from_millis(300)).await;

    // Stage 4: two-phase resale above the floor
    println!("{}", "🔁 Stage 4: Two-phase resale".bold());
    let resale_price = dec!(120);
    let payload = crypto::transfer_payload(
        &alice_ticket.ticket_id,
        &alice.address,
        &bob.address,
        &resale_price,
    );
    ledger
        .transfer_ticket(
            alice_ticket.ticket_id,
            alice.address.clone(),
            bob.address.clone(),
            resale_price,
            Some(alice.wallet.authorize(&payload)),
        )
        .await?;
    let parked = ledger.ticket(alice_ticket.ticket_id).await?;
    println!(
        "   {} alice → bob initiated at {}; owner is still {} until bob confirms",
        "✓".green(),
        resale_price,
        parked.owner
    );

    ledger
        .confirm_transfer(alice_ticket.ticket_id, bob.address.clone())
        .await?;
    let moved = ledger.ticket(alice_ticket.ticket_id).await?;
    println!(
        "   {} bob confirmed; owner is now {} ({} history entries)\n",
        "✓".green(),
        moved.owner,
        moved.history.len()
    );
    sleep(TokioDuration::from_millis(300)).await;

    // Stage 5: a refund, 30 days out pays in full
    println!("{}", "💸 Stage 5: Refund".bold());
    let amount = ledger
        .request_refund(carol_ticket.ticket_id, carol.address.clone())
        .await?;
    println!(
        "   {} carol refunded {} of {} (30 days before the event)\n",
        "✓".green(),
        amount,
        carol_ticket.price
    );
    sleep(TokioDuration::from_millis(300)).await;

    // Stage 6: bob enters the venue with his resold ticket
    println!("{}", "🚪 Stage 6: Venue entry".bold());
    ledger
        .use_ticket(alice_ticket.ticket_id, bob.address.clone())
        .await?;
    println!("   {} bob's ticket scanned and consumed\n", "✓".green());
    sleep(TokioDuration::from_millis(300)).await;

    // Stage 7: seal the rest and show the ledger
    println!("{}", "⛏️  Stage 7: Mine remaining transactions".bold());
    mine_and_report(&ledger, "miner-node-2").await?;

    println!("{}", "📊 Final state".bold());
    let stats = ledger.event_stats(event.event_id).await?;
    println!(
        "   sold {} / {} (regular {}, vip {}, early_bird {})",
        stats.sold_tickets,
        stats.total_tickets,
        stats.sold_by_class[&TicketClass::Regular],
        stats.sold_by_class[&TicketClass::Vip],
        stats.sold_by_class[&TicketClass::EarlyBird]
    );
    println!(
        "   used {}, cancelled {}, waitlisted {}, gross revenue {}",
        stats.used_tickets, stats.cancelled_tickets, stats.waitlist_size, stats.revenue
    );

    let chain = ledger.chain().await?;
    println!("\n{}", "⛓️  Chain".bold());
    for (height, block) in chain.iter().enumerate() {
        println!(
            "   #{} {}  nonce={:<6} txs={:<2} prev={}…",
            height,
            &block.hash[..16],
            block.nonce,
            block.transactions.len(),
            &block.previous_hash[..block.previous_hash.len().min(8)]
        );
    }

    let metrics = ledger.metrics();
    println!(
        "\n   minted={} initiated={} confirmed={} refunds={} used={} blocks={}",
        metrics.tickets_minted.get(),
        metrics.transfers_initiated.get(),
        metrics.transfers_confirmed.get(),
        metrics.refunds.get(),
        metrics.tickets_used.get(),
        metrics.blocks_mined.get()
    );

    println!("\n🎟️  Demo complete.\n");
    ledger.shutdown().await?;
    Ok(())
}

async fn mine_and_report(ledger: &Ledger, miner: &str) -> Result<()> {
    let pending = ledger.pending_count().await?;
    match ledger.mine_pending(Address::new(miner)).await? {
        Some(block) => println!(
            "   {} {} sealed {} records (+1 reward) with nonce {} → {}…\n",
            "✓".green(),
            miner,
            pending,
            block.nonce,
            &block.hash[..16]
        ),
        None => println!("   {} nothing to mine\n", "-".dimmed()),
    }
    Ok(())
}
