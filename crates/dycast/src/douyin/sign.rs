//! Request signing for the webcast endpoints.
//!
//! The push endpoint rejects unsigned URLs, so the query string carries an
//! X-Bogus value derived from the md5 of the signature stub. The scheme is a
//! small RC4 pass over a 10-byte payload followed by a base64 variant with a
//! shuffled alphabet.

use md5::{Digest, Md5};
use rand::Rng;

const XBOGUS_ALPHABET: &[u8; 64] =
    b"Dkdpgh4ZKsQB80/Mfvw36XI1R25+WUAlEi7NLboqYTOPuzmFjJnryx9HVGcaStCe";
const STANDARD_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

// Trailing pair of a double md5 over the empty string, verified by a test
// below against `md5_last2`.
const EMPTY_MD5_BYTES: [u8; 2] = [0x45, 0x3f];

const fn build_lookup() -> [u8; 128] {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < 64 {
        table[STANDARD_ALPHABET[i] as usize] = XBOGUS_ALPHABET[i];
        i += 1;
    }
    table
}
const ALPHABET_LOOKUP: [u8; 128] = build_lookup();

#[inline]
fn rc4_encrypt(key: u8, data: &mut [u8]) {
    let mut s: [u8; 256] = core::array::from_fn(|i| i as u8);
    let mut j: usize = 0;

    for i in 0..256 {
        j = (j + s[i] as usize + key as usize) % 256;
        s.swap(i, j);
    }

    let mut ii: usize = 0;
    j = 0;
    for byte in data.iter_mut() {
        ii = (ii + 1) % 256;
        j = (j + s[ii] as usize) % 256;
        s.swap(ii, j);
        *byte ^= s[(s[ii] as usize + s[j] as usize) % 256];
    }
}

/// Base64 over the shuffled alphabet; 12 bytes in, 16 ASCII out.
#[inline]
fn encode_base64(data: &[u8; 12], out: &mut [u8; 16]) {
    let mut i = 0;
    let mut o = 0;
    while i < 12 {
        let b0 = data[i] as usize;
        let b1 = data[i + 1] as usize;
        let b2 = data[i + 2] as usize;

        out[o] = ALPHABET_LOOKUP[STANDARD_ALPHABET[(b0 >> 2) & 0x3f] as usize];
        out[o + 1] = ALPHABET_LOOKUP[STANDARD_ALPHABET[((b0 << 4) | (b1 >> 4)) & 0x3f] as usize];
        out[o + 2] = ALPHABET_LOOKUP[STANDARD_ALPHABET[((b1 << 2) | (b2 >> 6)) & 0x3f] as usize];
        out[o + 3] = ALPHABET_LOOKUP[STANDARD_ALPHABET[b2 & 0x3f] as usize];

        i += 3;
        o += 4;
    }
}

#[inline]
fn hex_byte(h: u8, l: u8) -> u8 {
    let hi = if h >= b'a' { h - b'a' + 10 } else { h - b'0' };
    let lo = if l >= b'a' { l - b'a' + 10 } else { l - b'0' };
    (hi << 4) | lo
}

/// Last 2 bytes of md5(decode(hex_str)).
#[inline]
fn md5_last2(hex_str: &[u8; 32]) -> [u8; 2] {
    let mut bytes = [0u8; 16];
    for i in 0..16 {
        bytes[i] = hex_byte(hex_str[i * 2], hex_str[i * 2 + 1]);
    }
    let hash = Md5::digest(bytes);
    [hash[14], hash[15]]
}

/// md5 of `input` as a 32-char lowercase hex string.
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// X-Bogus signature over the md5 hex digest of the signature stub.
///
/// Returns 16 ASCII characters from the shuffled alphabet.
pub fn generate_xbogus(stub_md5: &[u8; 32], counter: u8) -> [u8; 16] {
    let random1 = rand::random::<u8>();
    let random2 = (rand::random::<u8>() as u16 * 255 / 256) as u8;

    // High bit pair carries the scheme version; the low five bits are noise.
    let header = 0x40 | (random1 & 0x1f);

    let md5_bytes = md5_last2(stub_md5);
    // Fixed field layout the endpoint expects: a counter byte, the constant
    // environment pair 0x0001, a browser-class byte, two digest pairs, the
    // RC4 key echoed back, and an xor of everything before it.
    let mut payload: [u8; 10] = [
        counter & 0x3f,
        0,
        1,
        0x0e,
        EMPTY_MD5_BYTES[0],
        EMPTY_MD5_BYTES[1],
        md5_bytes[0],
        md5_bytes[1],
        random2,
        0,
    ];
    payload[9] = payload[..9].iter().fold(0, |a, &x| a ^ x);

    rc4_encrypt(random2, &mut payload);

    let mut final_data: [u8; 12] = [0; 12];
    final_data[0] = header;
    final_data[1] = random2;
    final_data[2..].copy_from_slice(&payload);

    let mut result = [0u8; 16];
    encode_base64(&final_data, &mut result);
    result
}

/// X-Bogus for an arbitrary signature stub string.
pub fn xbogus_for_stub(stub: &str) -> String {
    let digest = md5_hex(stub);
    let mut hex = [0u8; 32];
    hex.copy_from_slice(digest.as_bytes());
    let sig = generate_xbogus(&hex, 0);
    // Only ASCII from the shuffled alphabet.
    String::from_utf8_lossy(&sig).into_owned()
}

/// Synthesized `user_unique_id` in the range the web client uses.
pub fn generate_user_unique_id() -> String {
    let now_ms = chrono::Utc::now().timestamp_millis() as u64;
    let id = 7_300_000_000_000_000_000u64 + (now_ms % 699_999_999_999_999_999u64);
    id.to_string()
}

/// Random alphanumeric msToken-shaped cookie value.
pub fn generate_ms_token(len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_last2() {
        let input = b"56a634b4228ef02b53388ada4e6f76c7";
        assert_eq!(md5_last2(input), [0x26, 0x54]);
    }

    #[test]
    fn test_empty_md5_constant() {
        let empty_md5 = md5_hex("");
        let mut stub = [0u8; 32];
        stub.copy_from_slice(empty_md5.as_bytes());
        assert_eq!(md5_last2(&stub), EMPTY_MD5_BYTES);
    }

    #[test]
    fn test_xbogus_shape() {
        let sig = xbogus_for_stub("live_id=1,aid=6383,room_id=123");
        assert_eq!(sig.len(), 16);
        assert!(sig.bytes().all(|b| XBOGUS_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_ms_token_shape() {
        let token = generate_ms_token(116);
        assert_eq!(token.len(), 116);
        assert!(token.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_user_unique_id_in_range() {
        let id: u64 = generate_user_unique_id().parse().unwrap();
        assert!(id >= 7_300_000_000_000_000_000);
        assert!(id < 8_000_000_000_000_000_000);
    }
}
