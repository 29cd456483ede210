//! Opaque token generation for sessions and content access.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand_core::{OsRng, RngCore as _};

/// Generate a fresh opaque token: 32 bytes from the OS RNG, URL-safe base64.
///
/// Tokens are bearer credentials; they carry no structure and are never
/// derived from other identifiers.
pub fn opaque_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}
