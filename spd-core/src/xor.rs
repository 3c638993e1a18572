/// Single-byte XOR transform

/// Applies `key` to every byte of `data`, returning a new buffer.
///
/// The transform is its own inverse: applying the same key twice
/// reproduces the input.
pub fn xor_bytes(data: &[u8], key: u8) -> Vec<u8> {
    data.iter().map(|&b| b ^ key).collect()
}
