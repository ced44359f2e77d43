//! Asset issuance, transfers and the order book.

mod common;

use common::{address, apply, balance, coins, keypair, ledger_with, signer};
use namechain_protocol::crypto::Keypair;
use namechain_protocol::storage::DatabaseSet;
use namechain_protocol::transaction::{Amount, Transaction, ValidationResult};

const GOLD: u64 = 1;

/// Ledger where `issuer` holds 1000 divisible GOLD and everyone 1000 coins.
fn ledger_with_gold(issuer: &Keypair, others: &[&Keypair]) -> DatabaseSet {
    let mut allocations = vec![(issuer, 1000)];
    allocations.extend(others.iter().map(|k| (*k, 1000)));
    let mut db = ledger_with(&allocations);
    let issue = signer(&db, issuer).issue_asset("gold", "shiny", coins(1000), true);
    apply(&mut db, &issue);
    db
}

fn gold(db: &DatabaseSet, keypair: &Keypair) -> Amount {
    db.balance(&address(keypair), GOLD).unwrap()
}

// ---------------------------------------------------------------------------
// IssueAsset
// ---------------------------------------------------------------------------

#[test]
fn issue_asset_allocates_keys_and_orphans() {
    let issuer = keypair("issuer");
    let mut db = ledger_with(&[(&issuer, 1000)]);
    let before = db.state_root().unwrap();

    let first = signer(&db, &issuer).issue_asset("gold", "shiny", coins(1000), true);
    apply(&mut db, &first);
    let second = signer(&db, &issuer).issue_asset("wood", "", coins(5), false);
    assert_eq!(second.is_valid(&db).unwrap(), ValidationResult::InvalidDescriptionLength);
    let second = signer(&db, &issuer).issue_asset("wood", "logs", coins(5), false);
    apply(&mut db, &second);

    let asset = db.asset(GOLD).unwrap().unwrap();
    assert_eq!(asset.owner, address(&issuer));
    assert_eq!(&asset.reference, first.signature());
    assert_eq!(db.asset(2).unwrap().unwrap().name, "wood");
    assert_eq!(db.next_asset_key().unwrap(), 3);
    assert_eq!(gold(&db, &issuer), coins(1000));
    assert_eq!(balance(&db, &issuer), coins(998));

    second.orphan(&mut db).unwrap();
    assert_eq!(db.next_asset_key().unwrap(), 2);
    assert!(!db.contains_asset(2).unwrap());

    first.orphan(&mut db).unwrap();
    assert_eq!(db.state_root().unwrap(), before);
}

#[test]
fn issue_asset_quantity_rules() {
    let issuer = keypair("issuer");
    let db = ledger_with(&[(&issuer, 1000)]);

    let zero = signer(&db, &issuer).issue_asset("gold", "shiny", Amount::ZERO, true);
    assert_eq!(zero.is_valid(&db).unwrap(), ValidationResult::InvalidQuantity);

    let fractional = signer(&db, &issuer)
        .issue_asset("wood", "logs", Amount::from_units(150_000_000), false);
    assert_eq!(fractional.is_valid(&db).unwrap(), ValidationResult::InvalidQuantity);

    let nameless = signer(&db, &issuer).issue_asset("", "logs", coins(1), false);
    assert_eq!(nameless.is_valid(&db).unwrap(), ValidationResult::InvalidNameLength);
}

// ---------------------------------------------------------------------------
// TransferAsset
// ---------------------------------------------------------------------------

#[test]
fn transfer_asset_validation_order() {
    let issuer = keypair("issuer");
    let recipient = keypair("recipient");
    let db = ledger_with_gold(&issuer, &[]);

    let ok = signer(&db, &issuer).transfer_asset(address(&recipient), GOLD, coins(10));
    assert_eq!(ok.is_valid(&db).unwrap(), ValidationResult::Ok);

    let negative = signer(&db, &issuer).transfer_asset(address(&recipient), GOLD, coins(-1));
    assert_eq!(negative.is_valid(&db).unwrap(), ValidationResult::NegativeAmount);

    let unknown = signer(&db, &issuer).transfer_asset(address(&recipient), 99, coins(1));
    assert_eq!(unknown.is_valid(&db).unwrap(), ValidationResult::AssetDoesNotExist);

    let too_much = signer(&db, &issuer).transfer_asset(address(&recipient), GOLD, coins(1001));
    assert_eq!(too_much.is_valid(&db).unwrap(), ValidationResult::NoBalance);

    let native_too_much = signer(&db, &issuer).transfer_asset(address(&recipient), 0, coins(999));
    assert_eq!(native_too_much.is_valid(&db).unwrap(), ValidationResult::NoBalance);
}

#[test]
fn transfer_asset_process_and_orphan() {
    let issuer = keypair("issuer");
    let recipient = keypair("recipient");
    let mut db = ledger_with_gold(&issuer, &[]);
    let before = db.state_root().unwrap();

    let transfer = signer(&db, &issuer).transfer_asset(address(&recipient), GOLD, coins(10));
    apply(&mut db, &transfer);
    assert_eq!(gold(&db, &issuer), coins(990));
    assert_eq!(gold(&db, &recipient), coins(10));
    assert_eq!(balance(&db, &recipient), Amount::ZERO);
    assert_eq!(db.reference(&address(&recipient)).unwrap().as_ref(), Some(transfer.signature()));
    assert_eq!(transfer.amount(&address(&recipient)), Amount::ZERO);

    transfer.orphan(&mut db).unwrap();
    assert_eq!(db.reference(&address(&recipient)).unwrap(), None);
    assert_eq!(db.state_root().unwrap(), before);
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[test]
fn create_order_validation_order() {
    let issuer = keypair("issuer");
    let mut db = ledger_with_gold(&issuer, &[]);
    let wood = signer(&db, &issuer).issue_asset("wood", "logs", coins(10), false);
    apply(&mut db, &wood);

    let cases = [
        (GOLD, GOLD, coins(1), coins(1), ValidationResult::HaveEqualsWant),
        (GOLD, 0, Amount::ZERO, coins(1), ValidationResult::NegativeAmount),
        (GOLD, 0, coins(1), Amount::ZERO, ValidationResult::NegativePrice),
        (GOLD, 99, coins(1), coins(1), ValidationResult::AssetDoesNotExist),
        (2, 0, Amount::from_units(150_000_000), coins(1), ValidationResult::InvalidAmount),
        (GOLD, 0, coins(1001), coins(1), ValidationResult::NoBalance),
        (0, GOLD, coins(998), coins(1), ValidationResult::NoBalance),
        (GOLD, 0, coins(100), coins(2), ValidationResult::Ok),
    ];
    for (have, want, amount, price, expected) in cases {
        let tx = signer(&db, &issuer).create_order(have, want, amount, price);
        assert_eq!(tx.is_valid(&db).unwrap(), expected, "have {have} want {want} amount {amount}");
    }
}

#[test]
fn crossing_orders_trade_and_orphan_exactly() {
    let alice = keypair("alice");
    let bob = keypair("bob");
    let mut db = ledger_with_gold(&alice, &[&bob]);

    // Alice offers 100 GOLD at 2 coins each.
    let ask = signer(&db, &alice).create_order(GOLD, 0, coins(100), coins(2));
    apply(&mut db, &ask);
    let ask_id = ask.signature().clone();
    assert_eq!(gold(&db, &alice), coins(900));
    assert_eq!(db.orders_for_pair(GOLD, 0).unwrap().len(), 1);
    let before_bid = db.state_root().unwrap();

    // Bob spends 50 coins at 0.5 GOLD per coin, which crosses at Alice's price.
    let bid = signer(&db, &bob).create_order(0, GOLD, coins(50), Amount::from_units(50_000_000));
    apply(&mut db, &bid);

    assert_eq!(gold(&db, &bob), coins(25));
    assert_eq!(balance(&db, &bob), coins(949));
    assert_eq!(balance(&db, &alice), coins(1048));

    let resting = db.order(&ask_id).unwrap().unwrap();
    assert_eq!(resting.fulfilled, coins(25));
    assert_eq!(resting.remaining(), coins(75));

    let bid_id = bid.signature();
    assert!(db.order(bid_id).unwrap().is_none());
    let completed = db.completed_order(bid_id).unwrap().unwrap();
    assert_eq!(completed.fulfilled, coins(50));

    let trades = db.trades_initiated_by(bid_id).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].target, ask_id);
    assert_eq!(trades[0].amount, coins(25));
    assert_eq!(trades[0].price, coins(50));

    bid.orphan(&mut db).unwrap();
    assert_eq!(db.order(&ask_id).unwrap().unwrap().fulfilled, Amount::ZERO);
    assert!(db.trades_initiated_by(bid_id).unwrap().is_empty());
    assert_eq!(db.state_root().unwrap(), before_bid);
}

#[test]
fn filled_target_moves_to_completed_and_back() {
    let alice = keypair("alice");
    let bob = keypair("bob");
    let mut db = ledger_with_gold(&alice, &[&bob]);

    let ask = signer(&db, &alice).create_order(GOLD, 0, coins(10), coins(2));
    apply(&mut db, &ask);
    let before_bid = db.state_root().unwrap();

    // Bob would pay up to 100 coins but only 10 GOLD are offered.
    let bid = signer(&db, &bob).create_order(0, GOLD, coins(100), Amount::from_units(50_000_000));
    apply(&mut db, &bid);

    assert!(db.order(ask.signature()).unwrap().is_none());
    assert!(db.completed_order(ask.signature()).unwrap().is_some());
    let open_bid = db.order(bid.signature()).unwrap().unwrap();
    assert_eq!(open_bid.fulfilled, coins(20));
    assert_eq!(gold(&db, &bob), coins(10));
    assert!(db.orders_for_pair(GOLD, 0).unwrap().is_empty());
    assert_eq!(db.orders_for_pair(0, GOLD).unwrap().len(), 1);

    bid.orphan(&mut db).unwrap();
    assert!(db.completed_order(ask.signature()).unwrap().is_none());
    assert_eq!(db.state_root().unwrap(), before_bid);
}

#[test]
fn non_crossing_orders_rest() {
    let alice = keypair("alice");
    let bob = keypair("bob");
    let mut db = ledger_with_gold(&alice, &[&bob]);

    let ask = signer(&db, &alice).create_order(GOLD, 0, coins(10), coins(2));
    apply(&mut db, &ask);
    // Bob wants 0.6 GOLD per coin; Alice only gives 0.5.
    let bid = signer(&db, &bob).create_order(0, GOLD, coins(10), Amount::from_units(60_000_000));
    apply(&mut db, &bid);

    assert!(db.trades_initiated_by(bid.signature()).unwrap().is_empty());
    assert_eq!(db.orders_for_pair(GOLD, 0).unwrap().len(), 1);
    assert_eq!(db.orders_for_pair(0, GOLD).unwrap().len(), 1);
    assert_eq!(balance(&db, &bob), coins(989));
}

#[test]
fn cheapest_order_fills_first() {
    let alice = keypair("alice");
    let carol = keypair("carol");
    let bob = keypair("bob");
    let mut db = ledger_with_gold(&alice, &[&carol, &bob]);
    let share = signer(&db, &alice).transfer_asset(address(&carol), GOLD, coins(100));
    apply(&mut db, &share);

    let dear = signer(&db, &alice).create_order(GOLD, 0, coins(10), coins(3));
    apply(&mut db, &dear);
    let cheap = signer(&db, &carol).create_order(GOLD, 0, coins(10), coins(2));
    apply(&mut db, &cheap);

    let book = db.orders_for_pair(GOLD, 0).unwrap();
    assert_eq!(&book[0].id, cheap.signature());

    // 0.5 GOLD per coin only crosses the cheap order.
    let bid = signer(&db, &bob).create_order(0, GOLD, coins(10), Amount::from_units(50_000_000));
    apply(&mut db, &bid);
    let trades = db.trades_initiated_by(bid.signature()).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(&trades[0].target, cheap.signature());
    assert_eq!(db.order(dear.signature()).unwrap().unwrap().fulfilled, Amount::ZERO);
}

#[test]
fn cancel_order_refunds_remaining() {
    let alice = keypair("alice");
    let bob = keypair("bob");
    let mut db = ledger_with_gold(&alice, &[&bob]);

    let ask = signer(&db, &alice).create_order(GOLD, 0, coins(100), coins(2));
    apply(&mut db, &ask);
    let bid = signer(&db, &bob).create_order(0, GOLD, coins(50), Amount::from_units(50_000_000));
    apply(&mut db, &bid);
    let before_cancel = db.state_root().unwrap();

    let foreign = signer(&db, &bob).cancel_order(ask.signature().clone());
    assert_eq!(foreign.is_valid(&db).unwrap(), ValidationResult::InvalidOrderCreator);

    let Transaction::CreateOrder(inner) = &ask else {
        unreachable!()
    };
    let unknown = signer(&db, &alice).cancel_order(inner.header.reference.clone());
    assert_eq!(unknown.is_valid(&db).unwrap(), ValidationResult::OrderDoesNotExist);

    let cancel = signer(&db, &alice).cancel_order(ask.signature().clone());
    apply(&mut db, &cancel);
    assert_eq!(gold(&db, &alice), coins(975));
    assert!(db.order(ask.signature()).unwrap().is_none());
    assert!(db.orders_for_pair(GOLD, 0).unwrap().is_empty());

    cancel.orphan(&mut db).unwrap();
    assert_eq!(db.order(ask.signature()).unwrap().unwrap().remaining(), coins(75));
    assert_eq!(db.state_root().unwrap(), before_cancel);
}
