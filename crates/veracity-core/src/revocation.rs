//! A compact bit-indexed revocation set embedded in a DID document service.
use std::collections::BTreeMap;
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::did::{DIDError, DIDUrl};
use crate::service::{Service, ServiceEndpoint};

/// An error relating to revocation-bitmap encoding or decoding.
#[derive(Error, Debug)]
pub enum RevocationError {
    /// The service endpoint is not a revocation-bitmap data URL.
    #[error("Invalid revocation endpoint: {0}.")]
    InvalidEndpoint(&'static str),
    /// The bitmap byte stream could not be compressed.
    #[error("Bitmap compression failed: {0}.")]
    CompressionFailure(String),
    /// The endpoint payload could not be decompressed.
    #[error("Bitmap decompression failed: {0}.")]
    DecompressionFailure(String),
    /// The service id for an embedded bitmap was invalid.
    #[error("Invalid revocation service id: {0}")]
    InvalidServiceId(#[from] DIDError),
}

/// A sparse set of revoked credential indices, stored as 64-bit words keyed
/// by word index. Memory use is proportional to the number of set words, not
/// to the highest index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevocationBitmap(BTreeMap<u32, u64>);

const WORD_BITS: u32 = u64::BITS;

/// Bytes needed to address every `u32` bit index. Endpoint payloads that
/// decompress beyond this cannot be valid bitmaps.
const MAX_BITMAP_BYTES: u64 = (u32::MAX as u64 + 1) / 8;

impl RevocationBitmap {
    /// The service type identifying an embedded revocation bitmap.
    pub const TYPE: &'static str = "RevocationBitmap2022";

    /// The media-type prefix of the endpoint data URL.
    const DATA_URL_PREFIX: &'static str = "data:application/octet-stream;base64,";

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets bit `index`. Returns `true` iff the bit was previously unset.
    pub fn revoke(&mut self, index: u32) -> bool {
        let word = self.0.entry(index / WORD_BITS).or_insert(0);
        let mask = 1u64 << (index % WORD_BITS);
        let was_unset = *word & mask == 0;
        *word |= mask;
        was_unset
    }

    /// Clears bit `index`. Returns `true` iff the bit was previously set.
    pub fn unrevoke(&mut self, index: u32) -> bool {
        let key = index / WORD_BITS;
        let mask = 1u64 << (index % WORD_BITS);
        match self.0.get_mut(&key) {
            Some(word) if *word & mask != 0 => {
                *word &= !mask;
                if *word == 0 {
                    self.0.remove(&key);
                }
                true
            }
            _ => false,
        }
    }

    /// Whether bit `index` is set.
    pub fn is_revoked(&self, index: u32) -> bool {
        self.0
            .get(&(index / WORD_BITS))
            .map_or(false, |word| word & (1u64 << (index % WORD_BITS)) != 0)
    }

    /// The number of set bits.
    pub fn len(&self) -> u64 {
        self.0.values().map(|word| u64::from(word.count_ones())).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serializes as `data:application/octet-stream;base64,<base64url(zlib(bits))>`.
    pub fn to_endpoint(&self) -> Result<ServiceEndpoint, RevocationError> {
        let compressed = compress_zlib(&self.to_bytes())?;
        let payload = base64::encode_config(compressed, base64::URL_SAFE_NO_PAD);
        Ok(ServiceEndpoint::One(format!(
            "{}{}",
            Self::DATA_URL_PREFIX,
            payload
        )))
    }

    /// Deserializes a bitmap from a service endpoint data URL.
    pub fn from_endpoint(endpoint: &ServiceEndpoint) -> Result<Self, RevocationError> {
        let url = match endpoint {
            ServiceEndpoint::One(url) => url,
            _ => return Err(RevocationError::InvalidEndpoint("expected a single URL")),
        };
        let payload = url
            .strip_prefix(Self::DATA_URL_PREFIX)
            .ok_or(RevocationError::InvalidEndpoint("not a bitmap data URL"))?;
        // Tolerate padded payloads from other implementations.
        let payload = payload.trim_end_matches('=');
        let compressed = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
            .map_err(|_| RevocationError::InvalidEndpoint("not base64url"))?;
        Ok(Self::from_bytes(&decompress_zlib(&compressed)?))
    }

    /// Wraps this bitmap in a `RevocationBitmap2022` service with the given id.
    pub fn to_service(&self, id: DIDUrl) -> Result<Service, RevocationError> {
        let endpoint = self.to_endpoint()?;
        Ok(Service::new(id, Self::TYPE.to_owned(), endpoint)?)
    }

    /// Packs the bitmap LSB-first into bytes, up to the highest set bit.
    fn to_bytes(&self) -> Vec<u8> {
        let num_bytes = match self.0.iter().next_back() {
            Some((key, word)) => {
                let highest = u64::from(*key) * u64::from(WORD_BITS) + u64::from(63 - word.leading_zeros());
                (highest / 8 + 1) as usize
            }
            None => 0,
        };
        let mut bytes = vec![0u8; num_bytes];
        for (key, word) in &self.0 {
            for bit in 0..WORD_BITS {
                if word & (1u64 << bit) != 0 {
                    let index = u64::from(*key) * u64::from(WORD_BITS) + u64::from(bit);
                    bytes[(index / 8) as usize] |= 1 << (index % 8);
                }
            }
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let mut bitmap = Self::new();
        for (byte_index, byte) in bytes.iter().enumerate() {
            for bit in 0..8u32 {
                if byte & (1 << bit) != 0 {
                    bitmap.revoke(byte_index as u32 * 8 + bit);
                }
            }
        }
        bitmap
    }
}

impl FromIterator<u32> for RevocationBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut bitmap = Self::new();
        for index in iter {
            bitmap.revoke(index);
        }
        bitmap
    }
}

fn compress_zlib(bytes: &[u8]) -> Result<Vec<u8>, RevocationError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|_| encoder.finish())
        .map_err(|e| RevocationError::CompressionFailure(e.to_string()))
}

fn decompress_zlib(bytes: &[u8]) -> Result<Vec<u8>, RevocationError> {
    decompress_zlib_bounded(bytes, MAX_BITMAP_BYTES)
}

fn decompress_zlib_bounded(bytes: &[u8], limit: u64) -> Result<Vec<u8>, RevocationError> {
    let mut decoder = ZlibDecoder::new(bytes).take(limit + 1);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| RevocationError::DecompressionFailure(e.to_string()))?;
    if decompressed.len() as u64 > limit {
        return Err(RevocationError::InvalidEndpoint(
            "decompressed payload exceeds the bitmap address space",
        ));
    }
    Ok(decompressed)
}
