use {
  super::*,
  argon2::{Algorithm, Argon2, ParamsBuilder, Version},
  bitcoin::{
    CompressedPublicKey, PublicKey,
    opcodes::all::OP_CHECKSIG,
    script::Builder,
  },
  chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
  },
  rand_core::{OsRng, RngCore},
  secp256k1::SECP256K1,
};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const SEED_AAD: &[u8] = b"tally-wallet-seed";

/// BIP84 purpose, the derivation scheme for P2WPKH addresses.
const PURPOSE: u32 = 84;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
  pub memory_kib: u32,
  pub iterations: u32,
  pub parallelism: u32,
}

impl Default for KdfParams {
  fn default() -> Self {
    Self {
      memory_kib: 64 * 1024,
      iterations: 3,
      parallelism: 1,
    }
  }
}

impl KdfParams {
  /// Minimal argon2 cost, for tests only.
  pub const INSECURE: KdfParams = KdfParams {
    memory_kib: 8,
    iterations: 1,
    parallelism: 1,
  };

  fn derive_key(
    self,
    password: &str,
    salt: &[u8; SALT_LEN],
  ) -> Result<Zeroizing<[u8; KEY_LEN]>, WalletError> {
    let params = ParamsBuilder::new()
      .m_cost(self.memory_kib)
      .t_cost(self.iterations)
      .p_cost(self.parallelism)
      .output_len(KEY_LEN)
      .build()
      .map_err(|_| WalletError::Encryption)?;

    let mut key = Zeroizing::new([0; KEY_LEN]);

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
      .hash_password_into(password.as_bytes(), salt, &mut *key)
      .map_err(|_| WalletError::Encryption)?;

    Ok(key)
  }
}

/// A wallet seed sealed with ChaCha20-Poly1305 under an argon2id key.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedSeed {
  pub kdf: KdfParams,
  #[serde_as(as = "serde_with::hex::Hex")]
  pub salt: [u8; SALT_LEN],
  #[serde_as(as = "serde_with::hex::Hex")]
  pub nonce: [u8; NONCE_LEN],
  #[serde_as(as = "serde_with::hex::Hex")]
  pub ciphertext: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedAddress {
  pub address: Address,
  pub pubkey: ScriptBuf,
  pub script_pubkey: ScriptBuf,
}

pub trait KeySource: Send + Sync {
  fn derive_address(
    &self,
    xpub: &Xpub,
    keychain: Keychain,
    index: u32,
  ) -> Result<DerivedAddress, WalletError>;

  fn derive_extended_key(
    &self,
    seed: &[u8],
    coin_type: u32,
    account: u32,
  ) -> Result<(Xpub, DerivationPath), WalletError>;

  fn chain_code(&self, seed: &[u8]) -> Result<[u8; 32], WalletError>;

  fn encrypt_seed(&self, seed: &[u8], password: &str) -> Result<EncryptedSeed, WalletError>;

  /// Fails with [`WalletError::Security`] when `password` does not open the seed.
  fn decrypt_seed(
    &self,
    seed: &EncryptedSeed,
    password: &str,
  ) -> Result<Zeroizing<Vec<u8>>, WalletError>;
}

#[derive(Debug, Clone)]
pub struct Bip32KeySource {
  kdf: KdfParams,
  network: Network,
}

impl Bip32KeySource {
  pub fn new(network: Network) -> Self {
    Self {
      kdf: KdfParams::default(),
      network,
    }
  }

  pub fn with_kdf(self, kdf: KdfParams) -> Self {
    Self { kdf, ..self }
  }

  fn master(&self, seed: &[u8]) -> Result<Xpriv, WalletError> {
    Xpriv::new_master(self.network, seed).snafu_context(error::KeyDerivation)
  }
}

impl KeySource for Bip32KeySource {
  fn derive_address(
    &self,
    xpub: &Xpub,
    keychain: Keychain,
    index: u32,
  ) -> Result<DerivedAddress, WalletError> {
    let path = [
      ChildNumber::from_normal_idx(keychain.index()).snafu_context(error::KeyDerivation)?,
      ChildNumber::from_normal_idx(index).snafu_context(error::KeyDerivation)?,
    ];

    let child = xpub
      .derive_pub(SECP256K1, &path)
      .snafu_context(error::KeyDerivation)?;

    let address = Address::p2wpkh(&CompressedPublicKey(child.public_key), self.network);

    Ok(DerivedAddress {
      pubkey: Builder::new()
        .push_key(&PublicKey::new(child.public_key))
        .push_opcode(OP_CHECKSIG)
        .into_script(),
      script_pubkey: address.script_pubkey(),
      address,
    })
  }

  fn derive_extended_key(
    &self,
    seed: &[u8],
    coin_type: u32,
    account: u32,
  ) -> Result<(Xpub, DerivationPath), WalletError> {
    let path = DerivationPath::from(vec![
      ChildNumber::from_hardened_idx(PURPOSE).snafu_context(error::KeyDerivation)?,
      ChildNumber::from_hardened_idx(coin_type).snafu_context(error::KeyDerivation)?,
      ChildNumber::from_hardened_idx(account).snafu_context(error::KeyDerivation)?,
    ]);

    let xpriv = self
      .master(seed)?
      .derive_priv(SECP256K1, &path)
      .snafu_context(error::KeyDerivation)?;

    Ok((Xpub::from_priv(SECP256K1, &xpriv), path))
  }

  fn chain_code(&self, seed: &[u8]) -> Result<[u8; 32], WalletError> {
    let mut chain_code = [0; 32];
    chain_code.copy_from_slice(&self.master(seed)?.chain_code[..]);
    Ok(chain_code)
  }

  fn encrypt_seed(&self, seed: &[u8], password: &str) -> Result<EncryptedSeed, WalletError> {
    let mut salt = [0; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = self.kdf.derive_key(password, &salt)?;

    let ciphertext = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()))
      .encrypt(
        Nonce::from_slice(&nonce),
        Payload {
          msg: seed,
          aad: SEED_AAD,
        },
      )
      .map_err(|_| WalletError::Encryption)?;

    Ok(EncryptedSeed {
      kdf: self.kdf,
      salt,
      nonce,
      ciphertext,
    })
  }

  fn decrypt_seed(
    &self,
    seed: &EncryptedSeed,
    password: &str,
  ) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    let key = seed.kdf.derive_key(password, &seed.salt)?;

    ChaCha20Poly1305::new(Key::from_slice(key.as_ref()))
      .decrypt(
        Nonce::from_slice(&seed.nonce),
        Payload {
          msg: &seed.ciphertext,
          aad: SEED_AAD,
        },
      )
      .map(Zeroizing::new)
      .map_err(|_| WalletError::Security)
  }
}

/// Generates a fresh 12-word English mnemonic from OS randomness.
pub fn generate_mnemonic() -> Result<Mnemonic, WalletError> {
  let mut entropy = Zeroizing::new([0; 16]);
  OsRng.fill_bytes(&mut *entropy);
  Mnemonic::from_entropy(&*entropy).snafu_context(error::Mnemonic)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn keys() -> Bip32KeySource {
    Bip32KeySource::new(Network::Regtest).with_kdf(KdfParams::INSECURE)
  }

  #[test]
  fn wrong_password_is_a_security_error() {
    let keys = keys();
    let sealed = keys.encrypt_seed(&[7; 64], "correct horse").unwrap();

    assert!(matches!(
      keys.decrypt_seed(&sealed, "battery staple"),
      Err(WalletError::Security)
    ));
    assert_eq!(
      keys.decrypt_seed(&sealed, "correct horse").unwrap().as_slice(),
      [7; 64].as_slice()
    );
  }

  #[test]
  fn sealing_uses_fresh_salt_and_nonce() {
    let keys = keys();
    let a = keys.encrypt_seed(&[1; 64], "pw").unwrap();
    let b = keys.encrypt_seed(&[1; 64], "pw").unwrap();
    assert_ne!(a.salt, b.salt);
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
  }

  #[test]
  fn account_paths_follow_bip84() {
    let seed = test::mnemonic().to_seed("");
    let (_, path) = keys().derive_extended_key(&seed, 1, 3).unwrap();
    assert_eq!(path, "m/84'/1'/3'".parse::<DerivationPath>().unwrap());
  }

  #[test]
  fn derivation_is_deterministic_per_keychain_and_index() {
    let keys = keys();
    let seed = test::mnemonic().to_seed("");
    let (xpub, _) = keys.derive_extended_key(&seed, 1, 0).unwrap();

    let first = keys.derive_address(&xpub, Keychain::External, 0).unwrap();
    assert_eq!(
      keys.derive_address(&xpub, Keychain::External, 0).unwrap(),
      first
    );
    assert_ne!(
      keys.derive_address(&xpub, Keychain::Internal, 0).unwrap(),
      first
    );
    assert_ne!(
      keys.derive_address(&xpub, Keychain::External, 1).unwrap(),
      first
    );

    assert!(first.script_pubkey.is_p2wpkh());
    assert!(first.pubkey.is_p2pk());
    assert!(first.address.to_string().starts_with("bcrt1q"));
  }

  #[test]
  fn passphrase_changes_keys() {
    let keys = keys();
    let mnemonic = test::mnemonic();
    let (plain, _) = keys
      .derive_extended_key(&mnemonic.to_seed(""), 1, 0)
      .unwrap();
    let (salted, _) = keys
      .derive_extended_key(&mnemonic.to_seed("extra"), 1, 0)
      .unwrap();
    assert_ne!(plain, salted);
  }

  #[test]
  fn generated_mnemonics_have_twelve_words() {
    assert_eq!(generate_mnemonic().unwrap().word_count(), 12);
  }
}
