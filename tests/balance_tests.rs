// Verified balance tests
// Outputs are built from the sender's side (r·A) so the wallet's view-side
// derivation (a·R) is checked against an independent computation

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use tipvault::{
    balance::{self, ClaimOutcome, SpentOutputClaim},
    chain::Chain,
    keys::{self, CryptonoteKeys, Keyset},
    scalar,
    WalletError,
};

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn keyset() -> Keyset {
    keys::derive_keyset(ABANDON, None).unwrap()
}

/// A real spend of output `index` in a transaction with secret `r`.
fn genuine_claim(keys: &CryptonoteKeys, label: &[u8], index: u64, amount: u64) -> SpentOutputClaim {
    let r = scalar::hash_to_scalar(&[b"test tx key".as_slice(), label]);
    let tx_public = EdwardsPoint::mul_base(&r);

    // Sender side: D = 8·r·A, P = Hs(D || i)·G + B.
    let derivation = (keys.view.public_point() * r).mul_by_cofactor().compress().to_bytes();
    assert!(index < 0x80, "single-byte varint");
    let varint = [index as u8];
    let h = scalar::hash_to_scalar(&[derivation.as_slice(), varint.as_slice()]);
    let sender_p = EdwardsPoint::mul_base(&h) + keys.spend.public_point();

    let (x, p) = balance::derive_output_keys(keys.view.secret(), keys.spend.secret(), keys.spend.public_point(), &tx_public, index);
    assert_eq!(p, sender_p, "receiver and sender agree on the one-time key");
    assert_eq!(EdwardsPoint::mul_base(&x), p, "x is the discrete log of P");

    SpentOutputClaim {
        amount,
        key_image: hex::encode(balance::key_image(&x, &p)),
        tx_pub_key: hex::encode(tx_public.compress().to_bytes()),
        out_index: index,
    }
}

fn decoy(label: &[u8], amount: u64) -> SpentOutputClaim {
    let s = scalar::hash_to_scalar(&[b"decoy".as_slice(), label]);
    let point = EdwardsPoint::mul_base(&s).compress().to_bytes();
    SpentOutputClaim {
        amount,
        key_image: hex::encode(point),
        tx_pub_key: hex::encode(point),
        out_index: 0,
    }
}

#[test]
fn test_verified_balance_counts_only_real_spends() {
    println!("🧪 Testing verified balance against mixed claims...");

    let ks = keyset();
    let xmr = ks.cryptonote(Chain::Monero).unwrap();
    let first = genuine_claim(xmr, b"a", 0, 300_000);
    let claims = vec![
        first.clone(),
        genuine_claim(xmr, b"b", 1, 200_000),
        decoy(b"c", 400_000),
        first,
        SpentOutputClaim { amount: 5, key_image: "zz".into(), tx_pub_key: "00".repeat(32), out_index: 0 },
    ];

    let report = balance::verified_balance_with_keys(1_000_000, &claims, xmr).unwrap();
    assert_eq!(report.verified_spent, 500_000);
    assert_eq!(report.balance, 500_000);
    assert_eq!(report.verified_count, 2);
    assert_eq!(report.outcomes[0], ClaimOutcome::Verified);
    assert_eq!(report.outcomes[1], ClaimOutcome::Verified);
    assert_eq!(report.outcomes[2], ClaimOutcome::Unmatched);
    assert_eq!(report.outcomes[3], ClaimOutcome::Duplicate);
    assert!(matches!(report.outcomes[4], ClaimOutcome::Malformed(_)));

    println!("✅ Balance 500000: decoys, duplicates and garbage ignored");
}

#[test]
fn test_claim_for_other_chain_keys_is_unmatched() {
    let ks = keyset();
    let xmr = ks.cryptonote(Chain::Monero).unwrap();
    let wow = ks.cryptonote(Chain::Wownero).unwrap();
    let claim = genuine_claim(xmr, b"x", 0, 1_000);

    let report = balance::verified_balance_with_keys(1_000, &[claim.clone()], wow).unwrap();
    assert_eq!(report.balance, 1_000);
    assert_eq!(report.outcomes, vec![ClaimOutcome::Unmatched]);

    // Right transaction, wrong output index.
    let shifted = SpentOutputClaim { out_index: 1, ..claim };
    let report = balance::verified_balance_with_keys(1_000, &[shifted], xmr).unwrap();
    assert_eq!(report.outcomes, vec![ClaimOutcome::Unmatched]);
}

#[test]
fn test_no_claims_means_full_balance() {
    let ks = keyset();
    let report = balance::verified_balance_with_keys(42, &[], ks.cryptonote(Chain::Wownero).unwrap()).unwrap();
    assert_eq!(report.balance, 42);
    assert_eq!(report.verified_count, 0);
    assert!(report.outcomes.is_empty());
}

#[test]
fn test_inconsistent_server_total() {
    let ks = keyset();
    let xmr = ks.cryptonote(Chain::Monero).unwrap();
    let claim = genuine_claim(xmr, b"big", 0, 300_000);
    match balance::verified_balance_with_keys(100_000, &[claim], xmr) {
        Err(WalletError::InconsistentBalance { received, spent }) => {
            assert_eq!(received, 100_000);
            assert_eq!(spent, 300_000);
        }
        other => panic!("expected InconsistentBalance, got {:?}", other),
    }
}

#[test]
fn test_key_validation() {
    println!("🧪 Testing verified balance key validation...");

    let ks = keyset();
    let xmr = ks.cryptonote(Chain::Monero).unwrap();
    let view = xmr.view.secret_bytes();
    let spend = xmr.spend.secret_bytes();
    let spend_pub = xmr.spend.public_bytes();

    let unreduced = [0xffu8; 32];
    assert!(matches!(
        balance::verified_balance(0, &[], &unreduced, spend.as_slice(), &spend_pub),
        Err(WalletError::InvalidScalar(_))
    ));
    assert!(matches!(
        balance::verified_balance(0, &[], view.as_slice(), &spend[..31], &spend_pub),
        Err(WalletError::InvalidScalar(_))
    ));
    // Spend key that does not belong to the public key.
    assert!(matches!(
        balance::verified_balance(0, &[], view.as_slice(), view.as_slice(), &spend_pub),
        Err(WalletError::InvalidScalar(_))
    ));
    assert!(balance::verified_balance(0, &[], view.as_slice(), spend.as_slice(), &spend_pub[..16]).is_err());
    assert!(balance::verified_balance(7, &[], view.as_slice(), spend.as_slice(), &spend_pub).is_ok());

    println!("✅ Unreduced, short and mismatched keys rejected");
}

#[test]
fn test_claims_parse_light_wallet_json() {
    let json = r#"[
        {"amount": "300000", "key_image": "aa", "tx_pub_key": "bb", "out_index": 2, "mixin": 15},
        {"amount": 7, "key_image": "cc", "tx_pub_key": "dd", "out_index": 0}
    ]"#;
    let claims: Vec<SpentOutputClaim> = serde_json::from_str(json).unwrap();
    assert_eq!(claims[0].amount, 300_000);
    assert_eq!(claims[0].out_index, 2);
    assert_eq!(claims[1].amount, 7);

    assert!(serde_json::from_str::<Vec<SpentOutputClaim>>(r#"[{"amount": "x", "key_image": "", "tx_pub_key": "", "out_index": 0}]"#).is_err());
}

#[test]
fn test_key_image_is_stable_per_output() {
    let ks = keyset();
    let xmr = ks.cryptonote(Chain::Monero).unwrap();
    let a = genuine_claim(xmr, b"same", 3, 1);
    let b = genuine_claim(xmr, b"same", 3, 1);
    let c = genuine_claim(xmr, b"same", 4, 1);
    assert_eq!(a.key_image, b.key_image);
    assert_ne!(a.key_image, c.key_image);

    // Key images are points on the curve.
    let ki: [u8; 32] = hex::decode(&a.key_image).unwrap().try_into().unwrap();
    assert!(scalar::decompress_point(&ki).is_ok());
}

// Fixed vectors computed with Monero's ge_fromfe_frombytes_vartime / hash_to_ec.
// A hash-then-multiply-the-basepoint map produces different points.

fn hex32(s: &str) -> [u8; 32] {
    hex::decode(s).unwrap().try_into().unwrap()
}

fn point(s: &str) -> EdwardsPoint {
    scalar::decompress_point(&hex32(s)).unwrap()
}

fn secret(s: &str) -> Scalar {
    scalar::canonical_scalar(&hex32(s)).unwrap()
}

const VIEW: &str = "84301dc0ba6e835cda8bd3b7016b8433b90f3a86be72256b7d34a2ed25721304";
const SPEND: &str = "6c18ae193e7548e75d852ea8651be56a98b9b031bd5836cab82225b7b87f970c";
const SPEND_PUB: &str = "2bc868b98242118495c9d587759961d47e91e69070ffe162d3fff71918b37f94";
const TX_PUB: &str = "6134e31586565c8dda627709d89651f48b6a64daa5263b68764466ebcd6fefd8";

#[test]
fn test_hash_to_ec_vectors() {
    println!("🧪 Testing hash_to_ec known answers...");

    // x = 1 leaves Hp(P) itself.
    let basepoint = EdwardsPoint::mul_base(&Scalar::ONE);
    assert_eq!(
        hex::encode(balance::key_image(&Scalar::ONE, &basepoint)),
        "d6329b5b1f7c0805b5c345f4957554002a2f557845f64d7645dae0e051a6498a"
    );
    let p = point("d21dbaf2b2201974e492981569617b65101ccd881c8d0e20e2c9c3dfd92fda01");
    assert_eq!(
        hex::encode(balance::key_image(&Scalar::ONE, &p)),
        "2cb21f5a1588ffa07afefb7687aa9c6f06f4381939b728706cb91f779f677c56"
    );

    println!("✅ Hp matches Monero's hash_to_ec");
}

#[test]
fn test_key_image_vector() {
    let x = secret("4a623be964a59b25e15dce8e27fba9b1580b61e09ebc75ce0ca8c280a700cd06");
    let p = point("d21dbaf2b2201974e492981569617b65101ccd881c8d0e20e2c9c3dfd92fda01");
    assert_eq!(EdwardsPoint::mul_base(&x), p);
    assert_eq!(
        hex::encode(balance::key_image(&x, &p)),
        "f3cabe12be0d348d9793e0d830a919c9f055468ed38194f0ff49937eb11e997d"
    );
}

#[test]
fn test_output_derivation_vectors() {
    println!("🧪 Testing one-time key derivation vectors...");

    let view = secret(VIEW);
    let spend = secret(SPEND);
    let spend_pub = point(SPEND_PUB);
    let tx_pub = point(TX_PUB);
    assert_eq!(EdwardsPoint::mul_base(&spend), spend_pub);

    let cases = [
        (
            0u64,
            "adc20aaebd2ab24e957efccd33928df4c0bffb8249713de0b7c67a75c1a1de03",
            "7737bac87761257fa51cc93c22ed52af5cfa31ec0eaa32d6a9f892ecc0f46989",
            "4b5ec2d7d09b4476fe78accbb1391d9b10dcd0a0d1b4e53f89ba99b654ddc791",
        ),
        // Two-byte varint index.
        (
            130,
            "1d46ac05cc52d014f43a83be1e9d2adbf4064668bb345c19e185025efb85340c",
            "9a808ca6213450c2dacb1d97e859fe9c5cc3cbefc72ae09eae968450f8a40891",
            "c6ba6abe2dfc8f7bfbd51a2d3f8a7302ca84eae6ade8403b57f4082e675459ca",
        ),
    ];
    let mut claims = Vec::new();
    for (index, want_x, want_p, want_ki) in cases {
        let (x, p) = balance::derive_output_keys(&view, &spend, &spend_pub, &tx_pub, index);
        assert_eq!(hex::encode(x.to_bytes()), want_x, "one-time secret for output {}", index);
        assert_eq!(hex::encode(p.compress().to_bytes()), want_p, "one-time public for output {}", index);
        assert_eq!(hex::encode(balance::key_image(&x, &p)), want_ki, "key image for output {}", index);
        claims.push(SpentOutputClaim {
            amount: 1_000,
            key_image: want_ki.to_string(),
            tx_pub_key: TX_PUB.to_string(),
            out_index: index,
        });
    }

    let report = balance::verified_balance(5_000, &claims, &hex32(VIEW), &hex32(SPEND), &hex32(SPEND_PUB)).unwrap();
    assert_eq!(report.outcomes, vec![ClaimOutcome::Verified, ClaimOutcome::Verified]);
    assert_eq!(report.balance, 3_000);

    println!("✅ Derivation and key images match fixed vectors");
}
