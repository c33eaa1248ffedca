// ed25519 scalar helper tests

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use tipvault::{keys::Ed25519KeyPair, scalar, WalletError};

fn order_minus(n: u8) -> [u8; 32] {
    let mut bytes = scalar::CURVE_ORDER;
    bytes[0] -= n;
    bytes
}

#[test]
fn test_canonical_boundary() {
    println!("🧪 Testing canonical scalar boundary...");

    assert!(scalar::is_canonical(&[0u8; 32]));
    assert!(scalar::is_canonical(&order_minus(1)));
    assert!(!scalar::is_canonical(&scalar::CURVE_ORDER));
    assert!(!scalar::is_canonical(&[0xff; 32]));

    let mut above = scalar::CURVE_ORDER;
    above[0] += 1;
    assert!(!scalar::is_canonical(&above));

    assert!(scalar::canonical_scalar(&order_minus(1)).is_ok());
    assert!(matches!(scalar::canonical_scalar(&scalar::CURVE_ORDER), Err(WalletError::InvalidScalar(_))));
    assert!(matches!(scalar::canonical_scalar(&[1u8; 31]), Err(WalletError::InvalidScalar(_))));

    println!("✅ Only values below the group order are accepted");
}

#[test]
fn test_reduction() {
    // ℓ reduces to zero, ℓ + 1 to one.
    assert_eq!(scalar::bytes_to_scalar(&scalar::CURVE_ORDER).unwrap(), Scalar::ZERO);
    let mut plus_one = scalar::CURVE_ORDER;
    plus_one[0] += 1;
    assert_eq!(scalar::bytes_to_scalar(&plus_one).unwrap(), Scalar::ONE);

    let wide = [0u8; 64];
    assert_eq!(scalar::bytes_to_scalar(&wide).unwrap(), Scalar::ZERO);
    assert!(scalar::bytes_to_scalar(&[0u8; 33]).is_err());

    let s = scalar::bytes_to_scalar(&[0xff; 32]).unwrap();
    assert!(scalar::is_canonical(&scalar::scalar_to_bytes(&s)));
}

#[test]
fn test_hash_to_scalar_is_reduced_and_sensitive() {
    let a = scalar::hash_to_scalar(&[b"hello".as_slice()]);
    let b = scalar::hash_to_scalar(&[b"hel".as_slice(), b"lo".as_slice()]);
    let c = scalar::hash_to_scalar(&[b"hellp".as_slice()]);
    assert_eq!(a, b, "parts are concatenated");
    assert_ne!(a, c);
    assert!(scalar::is_canonical(&a.to_bytes()));
}

#[test]
fn test_keypair_from_bytes() {
    let secret = order_minus(5);
    let pair = Ed25519KeyPair::from_secret_bytes(&secret).unwrap();
    assert_eq!(*pair.public_point(), EdwardsPoint::mul_base(pair.secret()));
    assert_eq!(scalar::decompress_point(&pair.public_bytes()).unwrap(), *pair.public_point());
    assert!(Ed25519KeyPair::from_secret_bytes(&[0xff; 32]).is_err());
}
