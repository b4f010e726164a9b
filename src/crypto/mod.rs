//! AES-128-CBC encryption of configuration payloads.
//!
//! Key derivation: OpenSSL `EVP_BytesToKey(aes-128-cbc, sha1, salt, password, count = 5)`
//! Encryption:     AES-128-CBC, PKCS#7 padding, no header or embedded IV
//!
//! The paired encryption tool always keys with a 16-character password and
//! an 8-character salt.  [`Scramble`] itself accepts any lengths (the salt is
//! zero-padded or cut to 8 bytes), but only that exact shape reproduces the
//! tool's keys; callers check it with [`validate_credentials`].
//!
//! Whole buffers are processed in [`CHUNK_SIZE`] slices through a streaming
//! update step followed by a finalize step that pads (encrypt) or checks and
//! strips the padding (decrypt).

use std::fs;
use std::io;
use std::path::Path;

use aes::Aes128;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, IvSizeUser, KeyIvInit, KeySizeUser};
use sha1::{Digest, Sha1};
use thiserror::Error;

pub const AES128_KEY_SIZE:  usize = 16;
pub const AES128_SALT_SIZE: usize = 8;
/// Digest rounds per derived block; fixed by the paired tool.
pub const KDF_ITERATIONS:   usize = 5;
/// Slice size fed to each update step.
pub const CHUNK_SIZE:       usize = 1024;

const BLOCK_LEN: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("cipher context is not keyed")]
    NotInitialized,
    #[error("key size is {bits} bits, should be 128 bits")]
    KeySize { bits: usize },
    #[error("no data to decrypt")]
    EmptyInput,
    #[error("final block is {len} bytes, expected {BLOCK_LEN} (input is not whole AES blocks)")]
    BadFinalBlockLength { len: usize },
    #[error("bad padding after decryption: wrong password or salt")]
    BadPadding,
    #[error("password must be exactly {AES128_KEY_SIZE} characters, got {0}")]
    PasswordLength(usize),
    #[error("salt must be exactly {AES128_SALT_SIZE} characters, got {0}")]
    SaltLength(usize),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Check the 16/8-character shape the paired encryption tool relies on.
pub fn validate_credentials(password: &str, salt: &str) -> Result<(), CryptoError> {
    let pw_len = password.chars().count();
    if pw_len != AES128_KEY_SIZE {
        return Err(CryptoError::PasswordLength(pw_len));
    }
    let salt_len = salt.chars().count();
    if salt_len != AES128_SALT_SIZE {
        return Err(CryptoError::SaltLength(salt_len));
    }
    Ok(())
}

/// OpenSSL's `EVP_BytesToKey`.
///
/// `D_i = H^count(D_{i-1} || password || salt)`, concatenated until
/// `key_len + iv_len` bytes are available; the key is taken first, the IV
/// from what follows.
pub fn bytes_to_key<D: Digest>(
    password: &[u8],
    salt:     Option<&[u8]>,
    count:    usize,
    key_len:  usize,
    iv_len:   usize,
) -> (Vec<u8>, Vec<u8>) {
    let mut material = Vec::with_capacity(key_len + iv_len);
    let mut prev: Vec<u8> = Vec::new();

    while material.len() < key_len + iv_len {
        let mut hasher = D::new();
        hasher.update(&prev);
        hasher.update(password);
        if let Some(salt) = salt {
            hasher.update(salt);
        }
        let mut digest = hasher.finalize();
        for _ in 1..count {
            digest = D::digest(&digest);
        }
        prev = digest.to_vec();
        material.extend_from_slice(&digest);
    }

    let iv = material[key_len..key_len + iv_len].to_vec();
    material.truncate(key_len);
    (material, iv)
}

/// Key, IV and the normalized salt they were derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub key:  [u8; AES128_KEY_SIZE],
    pub iv:   [u8; AES128_KEY_SIZE],
    pub salt: [u8; AES128_SALT_SIZE],
}

impl KeyMaterial {
    pub fn derive(password: &str, salt: &str) -> Result<Self, CryptoError> {
        let mut salt_buf = [0u8; AES128_SALT_SIZE];
        let n = salt.len().min(AES128_SALT_SIZE);
        salt_buf[..n].copy_from_slice(&salt.as_bytes()[..n]);

        // Lengths come from the cipher, as EVP_BytesToKey takes them from
        // the cipher descriptor; the result must still be 128 bits.
        let (key, iv) = bytes_to_key::<Sha1>(
            password.as_bytes(),
            Some(&salt_buf[..]),
            KDF_ITERATIONS,
            Aes128CbcEnc::key_size(),
            Aes128CbcEnc::iv_size(),
        );
        Ok(Self { key: aes128_sized(key)?, iv: aes128_sized(iv)?, salt: salt_buf })
    }
}

/// Check derived material against the 128-bit size the engine works with.
fn aes128_sized(material: Vec<u8>) -> Result<[u8; AES128_KEY_SIZE], CryptoError> {
    material
        .try_into()
        .map_err(|m: Vec<u8>| CryptoError::KeySize { bits: m.len() * 8 })
}

enum Direction {
    Encrypt(Aes128CbcEnc),
    Decrypt(Aes128CbcDec),
}

/// Incremental CBC context: `update` emits whole blocks, `finalize` handles
/// the padding.  Decryption always holds back the last complete block so
/// `finalize` can verify its padding.
struct CipherStream {
    dir:     Direction,
    pending: Vec<u8>,
}

impl CipherStream {
    fn new(keys: &KeyMaterial, encrypt: bool) -> Self {
        let dir = if encrypt {
            Direction::Encrypt(Aes128CbcEnc::new(&keys.key.into(), &keys.iv.into()))
        } else {
            Direction::Decrypt(Aes128CbcDec::new(&keys.key.into(), &keys.iv.into()))
        };
        Self { dir, pending: Vec::with_capacity(CHUNK_SIZE + BLOCK_LEN) }
    }

    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) {
        self.pending.extend_from_slice(input);
        let ready = match self.dir {
            Direction::Encrypt(_) => self.pending.len() / BLOCK_LEN * BLOCK_LEN,
            Direction::Decrypt(_) => self.pending.len().saturating_sub(1) / BLOCK_LEN * BLOCK_LEN,
        };
        let start = out.len();
        out.extend(self.pending.drain(..ready));
        self.apply(&mut out[start..]);
    }

    fn finalize(mut self, out: &mut Vec<u8>) -> Result<(), CryptoError> {
        match self.dir {
            Direction::Encrypt(_) => {
                let pad = BLOCK_LEN - self.pending.len();
                self.pending.resize(BLOCK_LEN, pad as u8);
                let mut last = std::mem::take(&mut self.pending);
                self.apply(&mut last);
                out.extend_from_slice(&last);
                Ok(())
            }
            Direction::Decrypt(_) => {
                if self.pending.len() != BLOCK_LEN {
                    return Err(CryptoError::BadFinalBlockLength { len: self.pending.len() });
                }
                let mut last = std::mem::take(&mut self.pending);
                self.apply(&mut last);
                let pad = usize::from(last[BLOCK_LEN - 1]);
                if pad == 0 || pad > BLOCK_LEN || last[BLOCK_LEN - pad..].iter().any(|&b| usize::from(b) != pad) {
                    return Err(CryptoError::BadPadding);
                }
                out.extend_from_slice(&last[..BLOCK_LEN - pad]);
                Ok(())
            }
        }
    }

    fn apply(&mut self, buf: &mut [u8]) {
        for block in buf.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(block);
            match &mut self.dir {
                Direction::Encrypt(c) => c.encrypt_block_mut(block),
                Direction::Decrypt(c) => c.decrypt_block_mut(block),
            }
        }
    }
}

/// Password-keyed AES-128-CBC engine.
///
/// Starts unkeyed; [`Scramble::derive_key`] keys it, after which any number
/// of [`Scramble::decrypt`] / [`Scramble::encrypt`] calls may follow, each
/// starting from the derived IV.  [`Scramble::reset`] drops the key again.
#[derive(Debug, Default)]
pub struct Scramble {
    keys: Option<KeyMaterial>,
}

impl Scramble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive key and IV from `password` and `salt`, replacing any previous
    /// key material.
    pub fn derive_key(&mut self, password: &str, salt: &str) -> Result<&KeyMaterial, CryptoError> {
        let keys = KeyMaterial::derive(password, salt)?;
        log::debug!("derived AES-128 key for salt {}", hex::encode(keys.salt));
        Ok(self.keys.insert(keys))
    }

    pub fn is_keyed(&self) -> bool {
        self.keys.is_some()
    }

    pub fn key_material(&self) -> Option<&KeyMaterial> {
        self.keys.as_ref()
    }

    pub fn reset(&mut self) {
        self.keys = None;
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let keys = self.keys.as_ref().ok_or(CryptoError::NotInitialized)?;
        if data.is_empty() {
            return Err(CryptoError::EmptyInput);
        }
        run(CipherStream::new(keys, false), data, data.len())
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let keys = self.keys.as_ref().ok_or(CryptoError::NotInitialized)?;
        run(CipherStream::new(keys, true), data, data.len() + BLOCK_LEN)
    }

    pub fn decrypt_file(&self, path: &Path) -> Result<Vec<u8>, CryptoError> {
        self.decrypt(&fs::read(path)?)
    }

    pub fn encrypt_file(&self, path: &Path) -> Result<Vec<u8>, CryptoError> {
        self.encrypt(&fs::read(path)?)
    }
}

fn run(mut stream: CipherStream, data: &[u8], capacity: usize) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::with_capacity(capacity);
    for chunk in data.chunks(CHUNK_SIZE) {
        stream.update(chunk, &mut out);
    }
    if let Err(e) = stream.finalize(&mut out) {
        log::debug!(
            "finalize failed after {} bytes: {}",
            out.len(),
            hex::encode(&out[..out.len().min(24)]),
        );
        return Err(e);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PASSWORD: &str = "0123456789abcdef";
    const SALT:     &str = "saltsalt";

    fn keyed(password: &str, salt: &str) -> Scramble {
        let mut s = Scramble::new();
        s.derive_key(password, salt).unwrap();
        s
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i * 31 + 7) % 251) as u8).collect()
    }

    #[test]
    fn derivation_matches_openssl_bytes_to_key() {
        let keys = KeyMaterial::derive(PASSWORD, SALT).unwrap();
        assert_eq!(hex::encode(keys.key), "06e8db3c53838ac0f5f733292474e533");
        assert_eq!(hex::encode(keys.iv), "522c29ea1a0644c56021c309d558f2b4");
    }

    #[test]
    fn single_round_matches_openssl_enc() {
        // openssl enc -aes-128-cbc -P -md sha1 -S 73616c7473616c74 -k 0123456789abcdef
        let (key, _) = bytes_to_key::<Sha1>(PASSWORD.as_bytes(), Some(&b"saltsalt"[..]), 1, 16, 16);
        assert_eq!(hex::encode(key), "ea02646bbe80baa8eb202015e64615b1");
    }

    #[test]
    fn derived_material_must_be_128_bits() {
        let (key, iv) = bytes_to_key::<Sha1>(PASSWORD.as_bytes(), None, KDF_ITERATIONS, 24, 16);
        assert!(matches!(aes128_sized(key), Err(CryptoError::KeySize { bits: 192 })));
        assert_eq!(aes128_sized(iv).unwrap().len(), AES128_KEY_SIZE);
        assert_eq!(Aes128CbcEnc::key_size(), AES128_KEY_SIZE);
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = KeyMaterial::derive(PASSWORD, SALT).unwrap();
        let b = KeyMaterial::derive(PASSWORD, SALT).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, KeyMaterial::derive(PASSWORD, "saltsal!").unwrap());
    }

    #[test]
    fn short_salt_is_zero_padded_and_long_salt_truncated() {
        let short = KeyMaterial::derive(PASSWORD, "abc").unwrap();
        assert_eq!(&short.salt, b"abc\0\0\0\0\0");
        assert_eq!(hex::encode(short.key), "c0a86f521dda81a08a3ab906cd234153");
        let long = KeyMaterial::derive(PASSWORD, "saltsaltEXTRA").unwrap();
        assert_eq!(long, KeyMaterial::derive(PASSWORD, SALT).unwrap());
    }

    #[test]
    fn encrypts_known_vector() {
        let out = keyed(PASSWORD, SALT).encrypt(b"<panel>hello</panel>").unwrap();
        assert_eq!(
            hex::encode(&out),
            "8a19c5e13e5232cc74e1e4d83800e5d1c11a28838f585b37769da4450b70a73c"
        );
    }

    #[test]
    fn round_trips_across_chunk_boundaries() {
        let s = keyed(PASSWORD, SALT);
        for len in [0usize, 1, 15, 16, 17, 1023, 1024, 1025, 4096] {
            let data = payload(len);
            let enc = s.encrypt(&data).unwrap();
            assert_eq!(enc.len(), (len / 16 + 1) * 16, "len {len}");
            assert_eq!(s.decrypt(&enc).unwrap(), data, "len {len}");
        }
    }

    #[test]
    fn wrong_credentials_fail_instead_of_returning_garbage() {
        let good = keyed(PASSWORD, SALT);
        let other_pw = keyed("fedcba9876543210", SALT);
        let other_salt = keyed(PASSWORD, "pepper!!");
        for len in [0usize, 1, 1023, 1024, 1025, 4096] {
            let enc = good.encrypt(&payload(len)).unwrap();
            assert!(matches!(other_pw.decrypt(&enc), Err(CryptoError::BadPadding)), "len {len}");
            assert!(matches!(other_salt.decrypt(&enc), Err(CryptoError::BadPadding)), "len {len}");
        }
    }

    #[test]
    fn state_machine_guards_operations() {
        let mut s = Scramble::new();
        assert!(!s.is_keyed());
        assert!(matches!(s.decrypt(b"0123456789abcdef"), Err(CryptoError::NotInitialized)));
        assert!(matches!(s.encrypt(b"x"), Err(CryptoError::NotInitialized)));

        s.derive_key(PASSWORD, SALT).unwrap();
        assert!(s.is_keyed());
        assert!(matches!(s.decrypt(&[]), Err(CryptoError::EmptyInput)));

        s.reset();
        assert!(!s.is_keyed());
        assert!(s.key_material().is_none());
    }

    #[test]
    fn rekeying_replaces_key_material() {
        let mut s = keyed(PASSWORD, SALT);
        let first = s.key_material().cloned().unwrap();
        s.derive_key("fedcba9876543210", SALT).unwrap();
        assert_ne!(s.key_material().unwrap(), &first);
    }

    #[test]
    fn ragged_ciphertext_is_rejected() {
        let s = keyed(PASSWORD, SALT);
        let mut enc = s.encrypt(&payload(40)).unwrap();
        enc.pop();
        assert!(matches!(s.decrypt(&enc), Err(CryptoError::BadFinalBlockLength { len: 15 })));
    }

    #[test]
    fn credentials_shape() {
        assert!(validate_credentials(PASSWORD, SALT).is_ok());
        assert!(matches!(validate_credentials("short", SALT), Err(CryptoError::PasswordLength(5))));
        assert!(matches!(validate_credentials(PASSWORD, "salt"), Err(CryptoError::SaltLength(4))));
    }

    #[test]
    fn file_helpers_read_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prj.xml.enc");
        let s = keyed(PASSWORD, SALT);
        fs::write(&path, s.encrypt(b"<root/>").unwrap()).unwrap();
        assert_eq!(s.decrypt_file(&path).unwrap(), b"<root/>");
        assert!(s.encrypt_file(&dir.path().join("missing")).is_err());
    }

    proptest! {
        #[test]
        fn round_trip_any_payload(data in proptest::collection::vec(any::<u8>(), 0..3000)) {
            let s = keyed(PASSWORD, SALT);
            let enc = s.encrypt(&data).unwrap();
            prop_assert_eq!(enc.len() % 16, 0);
            prop_assert_eq!(s.decrypt(&enc).unwrap(), data);
        }
    }
}
