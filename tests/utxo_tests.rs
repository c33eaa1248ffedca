// Coin selection and fee estimation tests

use tipvault::{
    utxo::{self, FeePolicy, FeeRate, Utxo},
    WalletError,
};

fn utxo(n: u8, value: u64) -> Utxo {
    Utxo { txid: format!("{:02x}", n).repeat(32), vout: 0, value, height: 100 }
}

fn pair() -> Vec<Utxo> {
    vec![utxo(1, 100_000), utxo(2, 50_000)]
}

#[test]
fn test_vsize_and_fee_formula() {
    println!("🧪 Testing vsize and fee estimation...");

    assert_eq!(utxo::estimate_vsize(1, 2), 140);
    assert_eq!(utxo::estimate_vsize(2, 2), 208);
    assert_eq!(utxo::estimate_vsize(2, 1), 177);

    let policy = FeePolicy::default();
    let rate = FeeRate::from_sat_per_vb(10);
    assert_eq!(utxo::estimate_fee(2, 2, rate, &policy).unwrap(), 2081);
    assert_eq!(utxo::estimate_fee(2, 1, rate, &policy).unwrap(), 1771);

    // Fractional rates round up.
    let fractional = FeeRate::from_sat_per_kvb(1_500);
    assert_eq!(utxo::estimate_fee(1, 2, fractional, &policy).unwrap(), 211);

    // Below the relay floor the floor applies.
    let zero = FeeRate::from_sat_per_kvb(0);
    assert_eq!(utxo::estimate_fee(1, 2, zero, &policy).unwrap(), 141);

    println!("✅ Fee = ceil(vsize * rate) + 1 with the relay floor applied");
}

#[test]
fn test_selection_with_change() {
    println!("🧪 Testing largest-first selection with change...");

    let plan = utxo::select_utxos(&pair(), 120_000, FeeRate::from_sat_per_vb(10), &FeePolicy::default()).unwrap();
    assert_eq!(plan.selected.len(), 2);
    assert_eq!(plan.selected[0].value, 100_000, "largest input first");
    assert_eq!(plan.amount, 120_000);
    assert_eq!(plan.fee, 2081);
    assert_eq!(plan.change, Some(27_919));
    assert_eq!(plan.total_in(), plan.amount + plan.fee + plan.change.unwrap());

    println!("✅ 150000 in = 120000 out + 2081 fee + 27919 change");
}

#[test]
fn test_selection_stops_at_first_covering_prefix() {
    let plan = utxo::select_utxos(&pair(), 40_000, FeeRate::from_sat_per_vb(10), &FeePolicy::default()).unwrap();
    assert_eq!(plan.selected.len(), 1);
    assert_eq!(plan.selected[0].value, 100_000);
    // 140 vB at 10 sat/vB
    assert_eq!(plan.fee, 1401);
    assert_eq!(plan.change, Some(100_000 - 40_000 - 1401));
}

#[test]
fn test_sub_dust_leftover_goes_to_fee() {
    println!("🧪 Testing dust absorption...");

    let policy = FeePolicy::default();
    let rate = FeeRate::from_sat_per_vb(1);
    let plan = utxo::select_utxos(&[utxo(7, 10_000)], 10_000 - 141 - 300, rate, &policy).unwrap();
    assert_eq!(plan.change, None);
    assert_eq!(plan.fee, 141 + 300);
    assert_eq!(plan.amount + plan.fee, 10_000);

    // Exactly at the threshold is still absorbed; one more becomes change.
    let at = utxo::select_utxos(&[utxo(7, 10_000)], 10_000 - 141 - 546, rate, &policy).unwrap();
    assert_eq!(at.change, None);
    let above = utxo::select_utxos(&[utxo(7, 10_000)], 10_000 - 141 - 547, rate, &policy).unwrap();
    assert_eq!(above.change, Some(547));

    println!("✅ Leftovers at or below dust are never emitted as change");
}

#[test]
fn test_selection_errors() {
    println!("🧪 Testing selection failures...");

    let policy = FeePolicy::default();
    let rate = FeeRate::from_sat_per_vb(10);

    match utxo::select_utxos(&pair(), 200_000, rate, &policy) {
        Err(WalletError::InsufficientFunds { needed, available }) => {
            assert_eq!(available, 150_000);
            assert_eq!(needed, 200_000 + 2081);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    assert!(matches!(
        utxo::select_utxos(&[], 10_000, rate, &policy),
        Err(WalletError::InsufficientFunds { available: 0, .. })
    ));
    assert!(matches!(
        utxo::select_utxos(&pair(), 545, rate, &policy),
        Err(WalletError::DustOutput { amount: 545, threshold: 546 })
    ));
    assert!(matches!(utxo::select_utxos(&pair(), 0, rate, &policy), Err(WalletError::InvalidAmount(_))));

    let dup = vec![utxo(1, 100_000), utxo(1, 100_000)];
    assert!(matches!(utxo::select_utxos(&dup, 10_000, rate, &policy), Err(WalletError::TxBuild(_))));

    println!("✅ Insufficient funds, dust, zero and duplicate inputs rejected");
}

#[test]
fn test_sweep() {
    println!("🧪 Testing sweep planning...");

    let policy = FeePolicy::default();
    let plan = utxo::plan_sweep(&pair(), FeeRate::from_sat_per_vb(10), &policy).unwrap();
    assert_eq!(plan.selected.len(), 2);
    assert_eq!(plan.fee, 1771);
    assert_eq!(plan.amount, 148_229);
    assert_eq!(plan.change, None);

    assert!(matches!(
        utxo::plan_sweep(&[], FeeRate::from_sat_per_vb(10), &policy),
        Err(WalletError::InsufficientFunds { .. })
    ));
    // 109 vB at 10 sat/vB is 1091, more than the input
    assert!(matches!(
        utxo::plan_sweep(&[utxo(3, 1_000)], FeeRate::from_sat_per_vb(10), &policy),
        Err(WalletError::InsufficientFunds { .. })
    ));
    // 1500 - 1091 = 409, below dust
    assert!(matches!(
        utxo::plan_sweep(&[utxo(3, 1_500)], FeeRate::from_sat_per_vb(10), &policy),
        Err(WalletError::DustOutput { amount: 409, .. })
    ));

    println!("✅ Sweep spends everything minus a one-output fee");
}

#[test]
fn test_fee_policy_per_chain() {
    use tipvault::chain::Chain;
    assert_eq!(FeePolicy::for_chain(Chain::Bitcoin).unwrap(), FeePolicy::default());
    assert!(FeePolicy::for_chain(Chain::Grin).is_err());

    let strict = FeePolicy { min_fee_rate_sat_per_kvb: 5_000, dust_threshold: 1_000 };
    assert_eq!(strict.effective_rate(FeeRate::from_sat_per_vb(1)), FeeRate::from_sat_per_vb(5));
    assert_eq!(strict.effective_rate(FeeRate::from_sat_per_vb(9)), FeeRate::from_sat_per_vb(9));
}

#[test]
fn test_equal_values_prefer_older_outputs() {
    let newer = Utxo { txid: "01".repeat(32), vout: 0, value: 60_000, height: 900 };
    let older = Utxo { txid: "ff".repeat(32), vout: 0, value: 60_000, height: 10 };
    let plan = utxo::select_utxos(&[newer, older.clone()], 20_000, FeeRate::from_sat_per_vb(1), &FeePolicy::default()).unwrap();
    assert_eq!(plan.selected, vec![older]);
}

#[test]
fn test_equal_values_leave_unconfirmed_for_last() {
    let confirmed = Utxo { txid: "02".repeat(32), vout: 0, value: 60_000, height: 500 };
    let unconfirmed = Utxo { txid: "01".repeat(32), vout: 0, value: 60_000, height: 0 };
    let plan = utxo::select_utxos(&[unconfirmed.clone(), confirmed.clone()], 20_000, FeeRate::from_sat_per_vb(1), &FeePolicy::default()).unwrap();
    assert_eq!(plan.selected, vec![confirmed.clone()]);

    // Needing both still puts the confirmed one first.
    let plan = utxo::select_utxos(&[unconfirmed.clone(), confirmed.clone()], 100_000, FeeRate::from_sat_per_vb(1), &FeePolicy::default()).unwrap();
    assert_eq!(plan.selected, vec![confirmed, unconfirmed]);
}
