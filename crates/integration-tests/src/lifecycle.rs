//! Full-lifecycle tests driving the mock chain runtime.

use clearbid_chain::runtime::{ChainState, AUCTION_ADDRESS};
use clearbid_chain::RuntimeError;
use clearbid_engine::{handlers, AuctionError, AuctionGenesisConfig};
use clearbid_types::{
    Address, Amount, AssetMetadata, AuctionPhase, BidId, InputProof, Price, Quantity,
};

const OWNER: Address = [0xAA; 32];
const DEADLINE: u64 = 1_000;

fn setup(total_supply: Quantity) -> ChainState {
    let genesis = AuctionGenesisConfig::new(
        OWNER,
        total_supply,
        DEADLINE,
        AssetMetadata {
            name: "Clearbid Asset".to_string(),
            symbol: "CBD".to_string(),
        },
    );
    genesis.validate().expect("valid genesis");
    ChainState::new(genesis, 0)
}

fn bidder(tag: u8) -> Address {
    [tag; 32]
}

/// Encrypt and submit a sealed bid. The reveal stays queued until flushed.
fn place_bid(chain: &mut ChainState, sender: Address, quantity: Quantity, price: Price) -> BidId {
    let (quantity_handle, price_handle) = chain.gateway.encrypt_bid(&sender, quantity, price);
    chain
        .submit_bid(sender, quantity_handle, price_handle, InputProof(vec![0x01]))
        .expect("submission accepted")
        .bid_id
}

/// Fund the bidder with exactly the required payment and confirm.
fn fund_and_confirm(chain: &mut ChainState, sender: Address, bid_id: BidId) -> Amount {
    let required = chain
        .bid(bid_id)
        .unwrap()
        .terms()
        .expect("bid revealed")
        .required_payment;
    chain.bank.mint(sender, required);
    chain.confirm_bid(sender, bid_id, required).expect("confirmed");
    required
}

/// Step past the deadline, then drive both batched walks to completion.
fn resolve_all(chain: &mut ChainState, batch_size: u64) {
    chain.set_timestamp(DEADLINE + 1);
    while chain.summary().phase < AuctionPhase::Resolved {
        chain.resolve([0x99; 32], batch_size).expect("resolution batch");
    }
    while chain.summary().phase < AuctionPhase::Distributing {
        chain.finalize([0x99; 32], batch_size).expect("finalization batch");
    }
}

/// Test the complete auction flow on the canonical three-bidder scenario.
///
/// Supply 1,000,000. Carol (600k @ 8e12) fills first, Bob (500k @ 2e12)
/// takes a 400k partial fill and sets the clearing price, Dave (1M @ 1e7)
/// is shut out entirely.
#[test]
fn test_full_auction_flow() {
    let mut chain = setup(1_000_000);
    let bob = bidder(1);
    let carol = bidder(2);
    let dave = bidder(3);

    // ========================================
    // Phase 1: Sealed submissions and reveals
    // ========================================

    let bob_bid = place_bid(&mut chain, bob, 500_000, 2_000_000_000_000);
    let carol_bid = place_bid(&mut chain, carol, 600_000, 8_000_000_000_000);
    let dave_bid = place_bid(&mut chain, dave, 1_000_000, 10_000_000);

    // Terms are hidden until the gateway delivers the callbacks.
    assert!(chain.bid(bob_bid).unwrap().terms().is_none());
    assert_eq!(chain.flush_reveals(), 3);
    assert_eq!(
        chain.bid(bob_bid).unwrap().terms().unwrap().required_payment,
        500_000 * 2_000_000_000_000
    );

    // ========================================
    // Phase 2: Escrow confirmation
    // ========================================

    let mut total_locked = 0;
    total_locked += fund_and_confirm(&mut chain, bob, bob_bid);
    total_locked += fund_and_confirm(&mut chain, carol, carol_bid);
    total_locked += fund_and_confirm(&mut chain, dave, dave_bid);

    assert_eq!(chain.bank.balance(&AUCTION_ADDRESS), total_locked);
    assert_eq!(chain.summary().escrow_held, total_locked);

    // ========================================
    // Phase 3: Batched resolution
    // ========================================

    resolve_all(&mut chain, 2);

    let clearing: Amount = 2_000_000_000_000;
    assert_eq!(chain.summary().clearing_price, Some(clearing as Price));
    assert_eq!(chain.summary().total_allocated, 1_000_000);
    assert_eq!(chain.bid(carol_bid).unwrap().allocation, Some(600_000));
    assert_eq!(chain.bid(bob_bid).unwrap().allocation, Some(400_000));
    assert_eq!(chain.bid(dave_bid).unwrap().allocation, Some(0));

    // ========================================
    // Phase 4: Claims
    // ========================================

    // Carol: full fill, pays the clearing price instead of her bid price.
    assert_eq!(chain.claim_allocation(carol, carol_bid).unwrap(), 600_000);
    assert_eq!(chain.assets.balance(&carol), 600_000);
    assert_eq!(
        chain.claim_refund(carol, carol_bid).unwrap(),
        600_000 * (8_000_000_000_000 - clearing)
    );

    // Bob: partial fill, refunded for the 100k units he did not get.
    assert_eq!(chain.claim_allocation(bob, bob_bid).unwrap(), 400_000);
    assert_eq!(
        chain.claim_refund(bob, bob_bid).unwrap(),
        100_000 * clearing
    );

    // Dave: nothing won, full deposit back.
    let dave_claim = chain.claim_allocation(dave, dave_bid);
    assert!(matches!(
        dave_claim,
        Err(RuntimeError::Auction(AuctionError::InvalidState(_)))
    ));
    assert_eq!(
        chain.claim_refund(dave, dave_bid).unwrap(),
        1_000_000 * 10_000_000
    );

    // Owner: proceeds are supply times clearing price.
    assert_eq!(
        chain.claim_proceeds(OWNER).unwrap(),
        1_000_000 * clearing
    );
    assert_eq!(chain.bank.balance(&OWNER), 1_000_000 * clearing);

    // Everything conserved: no asset and no escrow left behind.
    assert_eq!(chain.assets.balance(&AUCTION_ADDRESS), 0);
    assert_eq!(chain.bank.balance(&AUCTION_ADDRESS), 0);
    assert_eq!(chain.summary().escrow_held, 0);
    assert_eq!(chain.summary().phase, AuctionPhase::Closed);
}

/// A bid requesting the entire supply clears at its own price and shuts
/// out every lower-priced bid.
#[test]
fn test_supply_exhausted_by_single_best_bid() {
    let mut chain = setup(1_000_000);
    let bob = bidder(1);
    let carol = bidder(2);
    let dave = bidder(3);

    let bob_bid = place_bid(&mut chain, bob, 500_000, 2_000_000_000_000);
    let carol_bid = place_bid(&mut chain, carol, 1_000_000, 8_000_000_000_000);
    let dave_bid = place_bid(&mut chain, dave, 1_000_000, 10_000_000);
    chain.flush_reveals();
    fund_and_confirm(&mut chain, bob, bob_bid);
    fund_and_confirm(&mut chain, carol, carol_bid);
    fund_and_confirm(&mut chain, dave, dave_bid);

    resolve_all(&mut chain, 100);

    assert_eq!(chain.summary().clearing_price, Some(8_000_000_000_000));
    assert_eq!(chain.bid(carol_bid).unwrap().allocation, Some(1_000_000));
    assert_eq!(chain.bid(bob_bid).unwrap().allocation, Some(0));
    assert_eq!(chain.bid(dave_bid).unwrap().allocation, Some(0));

    // Carol pays exactly her bid; no refund exists for her.
    assert_eq!(chain.bid(carol_bid).unwrap().refund_due, Some(0));
    let carol_refund = chain.claim_refund(carol, carol_bid);
    assert!(matches!(
        carol_refund,
        Err(RuntimeError::Auction(AuctionError::InvalidState(_)))
    ));

    // The shut-out bidders get their full deposits back.
    assert_eq!(
        chain.claim_refund(bob, bob_bid).unwrap(),
        500_000 * 2_000_000_000_000
    );
    assert_eq!(
        chain.claim_refund(dave, dave_bid).unwrap(),
        1_000_000 * 10_000_000
    );
}

/// A single bidder requesting exactly the supply fully clears at their own
/// price with zero refund.
#[test]
fn test_single_bidder_exact_supply() {
    let mut chain = setup(1_000_000);
    let alice = bidder(1);

    let bid = place_bid(&mut chain, alice, 1_000_000, 10_000);
    chain.flush_reveals();
    fund_and_confirm(&mut chain, alice, bid);

    resolve_all(&mut chain, 100);

    assert_eq!(chain.summary().clearing_price, Some(10_000));
    assert_eq!(chain.bid(bid).unwrap().allocation, Some(1_000_000));
    assert_eq!(chain.bid(bid).unwrap().refund_due, Some(0));

    assert_eq!(chain.claim_allocation(alice, bid).unwrap(), 1_000_000);
    assert_eq!(
        chain.claim_proceeds(OWNER).unwrap(),
        1_000_000u128 * 10_000
    );
    assert_eq!(chain.bank.balance(&AUCTION_ADDRESS), 0);
}

/// Cancelling before confirmation removes the bid from ranking entirely:
/// the outcome is identical to an auction where it never existed.
#[test]
fn test_cancel_before_confirm_does_not_affect_outcome() {
    let run = |with_cancelled: bool| {
        let mut chain = setup(1_000_000);
        let alice = bidder(1);
        let mallory = bidder(2);

        let alice_bid = place_bid(&mut chain, alice, 800_000, 5_000);
        let cancelled = with_cancelled.then(|| {
            // Highest price in the auction, withdrawn before confirming.
            place_bid(&mut chain, mallory, 1_000_000, 999_999)
        });
        chain.flush_reveals();

        if let Some(bid_id) = cancelled {
            chain.cancel_bid(mallory, bid_id).unwrap();
        }
        fund_and_confirm(&mut chain, alice, alice_bid);

        resolve_all(&mut chain, 100);
        (
            chain.summary().clearing_price,
            chain.bid(alice_bid).unwrap().allocation,
            chain.summary().total_allocated,
        )
    };

    assert_eq!(run(true), run(false));
    assert_eq!(run(false), (Some(5_000), Some(800_000), 800_000));
}

/// Any batch-size partition of resolution and finalization produces the
/// same clearing price, allocations and refunds.
#[test]
fn test_batch_partition_invariance() {
    let bids: [(Quantity, Price); 6] = [
        (300_000, 7_000),
        (500_000, 9_000),
        (400_000, 9_000),
        (250_000, 5_000),
        (100_000, 11_000),
        (50_000, 2_000),
    ];

    let run = |batch_size: u64| {
        let mut chain = setup(1_000_000);
        let mut ids = Vec::new();
        for (i, (quantity, price)) in bids.iter().enumerate() {
            let sender = bidder(i as u8 + 1);
            ids.push((sender, place_bid(&mut chain, sender, *quantity, *price)));
        }
        chain.flush_reveals();
        for (sender, bid_id) in &ids {
            fund_and_confirm(&mut chain, *sender, *bid_id);
        }

        resolve_all(&mut chain, batch_size);

        let outcome: Vec<_> = ids
            .iter()
            .map(|(_, bid_id)| {
                let bid = chain.bid(*bid_id).unwrap();
                (bid.allocation.unwrap(), bid.refund_due.unwrap())
            })
            .collect();
        (chain.summary().clearing_price.unwrap(), outcome)
    };

    let reference = run(u64::MAX);
    for batch_size in [1, 2, 3, 5] {
        assert_eq!(run(batch_size), reference, "batch size {batch_size}");
    }
}

/// Claims settle exactly once; a second attempt fails with AlreadySettled.
#[test]
fn test_no_double_claims() {
    let mut chain = setup(1_000);
    let winner = bidder(1);
    let loser = bidder(2);

    let win = place_bid(&mut chain, winner, 1_000, 100);
    let lose = place_bid(&mut chain, loser, 1_000, 1);
    chain.flush_reveals();
    fund_and_confirm(&mut chain, winner, win);
    fund_and_confirm(&mut chain, loser, lose);

    resolve_all(&mut chain, 100);

    chain.claim_allocation(winner, win).unwrap();
    assert!(matches!(
        chain.claim_allocation(winner, win),
        Err(RuntimeError::Auction(AuctionError::AlreadySettled))
    ));

    chain.claim_refund(loser, lose).unwrap();
    assert!(matches!(
        chain.claim_refund(loser, lose),
        Err(RuntimeError::Auction(AuctionError::AlreadySettled))
    ));

    chain.claim_proceeds(OWNER).unwrap();
    assert!(matches!(
        chain.claim_proceeds(OWNER),
        Err(RuntimeError::Auction(AuctionError::AlreadySettled))
    ));
}

/// The bank's view of the auction's escrow matches the engine's
/// bookkeeping at every step of the lifecycle.
#[test]
fn test_escrow_balance_tracks_engine_bookkeeping() {
    let mut chain = setup(1_000);
    let a = bidder(1);
    let b = bidder(2);

    let assert_escrow_consistent = |chain: &ChainState| {
        assert_eq!(
            chain.bank.balance(&AUCTION_ADDRESS),
            chain.summary().escrow_held
        );
    };

    let bid_a = place_bid(&mut chain, a, 600, 10);
    let bid_b = place_bid(&mut chain, b, 600, 20);
    chain.flush_reveals();
    assert_escrow_consistent(&chain);

    fund_and_confirm(&mut chain, a, bid_a);
    assert_escrow_consistent(&chain);
    fund_and_confirm(&mut chain, b, bid_b);
    assert_escrow_consistent(&chain);

    resolve_all(&mut chain, 1);
    assert_escrow_consistent(&chain);

    // b fills 600 @ clearing 10, a takes the 400 partial; both carry a
    // refund (a for unfilled units, b for the price difference).
    chain.claim_refund(a, bid_a).unwrap();
    assert_escrow_consistent(&chain);
    chain.claim_refund(b, bid_b).unwrap();
    assert_escrow_consistent(&chain);
    chain.claim_proceeds(OWNER).unwrap();
    assert_escrow_consistent(&chain);

    assert_eq!(chain.bank.balance(&AUCTION_ADDRESS), 0);
}

/// Reveal callbacks may arrive in any order relative to submission.
#[test]
fn test_out_of_order_reveals() {
    let mut chain = setup(1_000_000);
    let a = bidder(1);
    let b = bidder(2);
    let c = bidder(3);

    let bid_a = place_bid(&mut chain, a, 100, 10);
    let bid_b = place_bid(&mut chain, b, 200, 20);
    let bid_c = place_bid(&mut chain, c, 300, 30);

    // Deliver newest-first.
    let ChainState {
        engine, gateway, ..
    } = &mut chain;
    gateway.flush_reversed(|request_id, plaintexts| {
        handlers::handle_reveal_callback(engine, request_id, plaintexts).unwrap();
    });

    for (bid_id, quantity) in [(bid_a, 100), (bid_b, 200), (bid_c, 300)] {
        assert_eq!(chain.bid(bid_id).unwrap().terms().unwrap().quantity, quantity);
    }
}

/// A revealed bid that is never confirmed is excluded from ranking and has
/// nothing to claim.
#[test]
fn test_unconfirmed_bid_gets_nothing() {
    let mut chain = setup(1_000);
    let active = bidder(1);
    let passive = bidder(2);

    let active_bid = place_bid(&mut chain, active, 1_000, 5);
    let passive_bid = place_bid(&mut chain, passive, 1_000, 500);
    chain.flush_reveals();
    // Only the low-priced bid confirms; the high-priced one never funds.
    fund_and_confirm(&mut chain, active, active_bid);

    resolve_all(&mut chain, 100);

    assert_eq!(chain.summary().clearing_price, Some(5));
    assert_eq!(chain.bid(active_bid).unwrap().allocation, Some(1_000));
    assert_eq!(chain.bid(passive_bid).unwrap().allocation, None);

    let refund = chain.claim_refund(passive, passive_bid);
    assert!(matches!(
        refund,
        Err(RuntimeError::Auction(AuctionError::InvalidState(_)))
    ));
}

/// Resolution cannot start before the deadline, and repeating completed
/// walks is rejected or a no-op rather than a re-rank.
#[test]
fn test_resolution_window_and_idempotence() {
    let mut chain = setup(1_000);
    let alice = bidder(1);
    let bid = place_bid(&mut chain, alice, 1_000, 10);
    chain.flush_reveals();
    fund_and_confirm(&mut chain, alice, bid);

    // Still inside the submission window.
    assert!(matches!(
        chain.resolve([0x99; 32], 100),
        Err(RuntimeError::Auction(AuctionError::InvalidState(_)))
    ));

    resolve_all(&mut chain, 100);
    let clearing = chain.summary().clearing_price;

    assert!(matches!(
        chain.resolve([0x99; 32], 100),
        Err(RuntimeError::Auction(AuctionError::InvalidState(_)))
    ));
    let progress = chain.finalize([0x99; 32], 100).unwrap();
    assert_eq!(progress.processed, 0);
    assert_eq!(chain.summary().clearing_price, clearing);
}
