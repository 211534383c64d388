//! Image collaborators: fingerprint computation and image retrieval.
//!
//! The engine treats both as external capabilities behind traits:
//! [`Fingerprinter`] turns raw image bytes into a fixed-length
//! [`Fingerprint`], [`ImageFetcher`] turns a URL into raw bytes. The default
//! implementations use a perceptual hash ([`PerceptualFingerprinter`]) and a
//! blocking HTTP client ([`HttpImageFetcher`]).

use image_hasher::{HashAlg, HasherConfig};
use thiserror::Error;

use crate::engine::Fingerprint;
use crate::platform::ChannelMessage;

/// Default square hash size; 16x16 yields 256-bit fingerprints.
pub const DEFAULT_HASH_SIZE: u32 = 16;

/// Errors from fetching or fingerprinting a single image.
///
/// These are always counted, never fatal to a scan (one bad image must not
/// abort a walk).
#[derive(Debug, Error)]
pub enum ImagingError {
    /// The bytes could not be decoded as an image.
    #[error("unidentifiable image: {0}")]
    Unreadable(String),

    /// The image could not be downloaded.
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// The URL that failed.
        url: String,
        /// Why the fetch failed.
        reason: String,
    },
}

/// Computes a fixed-length fingerprint from raw image bytes.
pub trait Fingerprinter: Send + Sync {
    /// Fingerprint an image, or fail with
    /// [`ImagingError::Unreadable`] when the bytes are not a decodable image.
    fn fingerprint(&self, bytes: &[u8]) -> Result<Fingerprint, ImagingError>;

    /// Bit length of the fingerprints this instance produces.
    fn bit_len(&self) -> usize;
}

/// Retrieves raw image bytes from a URL.
pub trait ImageFetcher: Send + Sync {
    /// Download the bytes behind `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImagingError>;
}

/// Perceptual fingerprinter backed by a DCT-preprocessed median hash.
///
/// All fingerprints stored for a guild must come from the same hash-size
/// configuration; mixing sizes makes Hamming distances undefined and is
/// rejected at comparison time.
pub struct PerceptualFingerprinter {
    hasher: image_hasher::Hasher,
    hash_size: u32,
}

impl PerceptualFingerprinter {
    /// Create a fingerprinter producing `hash_size * hash_size`-bit hashes.
    #[must_use]
    pub fn new(hash_size: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Median)
            .preproc_dct()
            .to_hasher();
        Self { hasher, hash_size }
    }

    /// The configured square hash size.
    #[must_use]
    pub fn hash_size(&self) -> u32 {
        self.hash_size
    }
}

impl Default for PerceptualFingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_SIZE)
    }
}

impl Fingerprinter for PerceptualFingerprinter {
    fn fingerprint(&self, bytes: &[u8]) -> Result<Fingerprint, ImagingError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ImagingError::Unreadable(e.to_string()))?;
        let hash = self.hasher.hash_image(&img);
        Ok(Fingerprint::from_bytes(hash.as_bytes()))
    }

    fn bit_len(&self) -> usize {
        (self.hash_size * self.hash_size) as usize
    }
}

/// Blocking HTTP image fetcher.
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

impl HttpImageFetcher {
    /// Create a fetcher with a default client.
    pub fn new() -> Result<Self, ImagingError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("repostdupe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImagingError::Fetch {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImagingError> {
        let fetch_err = |reason: String| ImagingError::Fetch {
            url: url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| fetch_err(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Fingerprints extracted from one message, with failure tallies.
#[derive(Debug, Clone, Default)]
pub struct MessageImages {
    /// One fingerprint per successfully hashed image.
    pub fingerprints: Vec<Fingerprint>,
    /// Images that failed to download or decode.
    pub errors: usize,
    /// Embeds that carried no usable image URL.
    pub unhashable: usize,
}

/// Fingerprint every image attached to or embedded in a message.
///
/// Per-image failures are tallied, not propagated; a message full of broken
/// links still yields whatever fingerprints could be computed.
pub fn message_fingerprints(
    message: &ChannelMessage,
    fetcher: &dyn ImageFetcher,
    fingerprinter: &dyn Fingerprinter,
) -> MessageImages {
    let mut out = MessageImages {
        unhashable: message.opaque_embeds,
        ..MessageImages::default()
    };
    for url in &message.image_urls {
        match fetcher
            .fetch(url)
            .and_then(|bytes| fingerprinter.fingerprint(&bytes))
        {
            Ok(fingerprint) => out.fingerprints.push(fingerprint),
            Err(e) => {
                log::warn!("message {}: {e}", message.id);
                out.errors += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perceptual_fingerprint_bit_len() {
        let fingerprinter = PerceptualFingerprinter::new(16);
        assert_eq!(fingerprinter.bit_len(), 256);

        let img = image::RgbImage::new(32, 32);
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let fp = fingerprinter.fingerprint(&bytes).unwrap();
        assert_eq!(fp.bit_len(), 256);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let mut img = image::RgbImage::new(32, 32);
        for x in 0..32 {
            for y in 0..32 {
                let v = ((x * 8 + y) % 256) as u8;
                img.put_pixel(x, y, image::Rgb([v, 255 - v, v / 2]));
            }
        }
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let fingerprinter = PerceptualFingerprinter::default();
        let a = fingerprinter.fingerprint(&bytes).unwrap();
        let b = fingerprinter.fingerprint(&bytes).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unreadable_bytes_rejected() {
        let fingerprinter = PerceptualFingerprinter::default();
        let result = fingerprinter.fingerprint(b"not an image");
        assert!(matches!(result, Err(ImagingError::Unreadable(_))));
    }

    #[test]
    fn test_message_fingerprints_tallies_failures() {
        struct FailingFetcher;
        impl ImageFetcher for FailingFetcher {
            fn fetch(&self, url: &str) -> Result<Vec<u8>, ImagingError> {
                Err(ImagingError::Fetch {
                    url: url.to_string(),
                    reason: "offline".to_string(),
                })
            }
        }

        let message = ChannelMessage::new(1, 2, 3)
            .with_image_urls(vec!["http://a/img.png".to_string()]);
        let out = message_fingerprints(
            &message,
            &FailingFetcher,
            &PerceptualFingerprinter::default(),
        );
        assert!(out.fingerprints.is_empty());
        assert_eq!(out.errors, 1);
    }
}
