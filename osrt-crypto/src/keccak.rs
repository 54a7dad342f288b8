//! Pure Keccak-256 (the pre-NIST construction used by Ethereum-style address
//! derivation, not SHA3-256 — the padding differs).
//!
//! Sponge with rate 136 bytes, capacity 64 bytes, 24-round Keccak-f[1600]
//! permutation. No heap allocation anywhere in the permutation or the
//! absorb/squeeze loop.

const RATE_BYTES: usize = 136;
const RATE_LANES: usize = RATE_BYTES / 8;

const ROUND_CONSTANTS: [u64; 24] = [
    0x0000000000000001,
    0x0000000000008082,
    0x800000000000808a,
    0x8000000080008000,
    0x000000000000808b,
    0x0000000080000001,
    0x8000000080008081,
    0x8000000000008009,
    0x000000000000008a,
    0x0000000000000088,
    0x0000000080008009,
    0x000000008000000a,
    0x000000008000808b,
    0x800000000000008b,
    0x8000000000008089,
    0x8000000000008003,
    0x8000000000008002,
    0x8000000000000080,
    0x000000000000800a,
    0x800000008000000a,
    0x8000000080008081,
    0x8000000000008080,
    0x0000000080000001,
    0x8000000080008008,
];

// Combined rho/pi step: PI[t] is the destination lane index, ROT[t] its
// rotation amount, walked starting from lane 1.
const PI: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4, 15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];
const ROT: [u32; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14, 27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];

fn keccak_f1600(a: &mut [u64; 25]) {
    for rc in ROUND_CONSTANTS {
        // Theta
        let mut c = [0u64; 5];
        for x in 0..5 {
            c[x] = a[x] ^ a[x + 5] ^ a[x + 10] ^ a[x + 15] ^ a[x + 20];
        }
        for x in 0..5 {
            let d = c[(x + 4) % 5] ^ c[(x + 1) % 5].rotate_left(1);
            for y in 0..5 {
                a[x + 5 * y] ^= d;
            }
        }

        // Rho + Pi
        let mut last = a[1];
        for t in 0..24 {
            let idx = PI[t];
            let tmp = a[idx];
            a[idx] = last.rotate_left(ROT[t]);
            last = tmp;
        }

        // Chi
        for y in 0..5 {
            let row = [a[5 * y], a[5 * y + 1], a[5 * y + 2], a[5 * y + 3], a[5 * y + 4]];
            for x in 0..5 {
                a[x + 5 * y] = row[x] ^ ((!row[(x + 1) % 5]) & row[(x + 2) % 5]);
            }
        }

        // Iota
        a[0] ^= rc;
    }
}

fn absorb_block(state: &mut [u64; 25], block: &[u8; RATE_BYTES]) {
    for i in 0..RATE_LANES {
        let lane = u64::from_le_bytes(block[i * 8..i * 8 + 8].try_into().unwrap());
        state[i] ^= lane;
    }
}

/// Hash `input` with Keccak-256, producing a 32-byte digest.
///
/// Pure function: deterministic, no side effects, identical output on every
/// platform regardless of endianness of the host.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut state = [0u64; 25];
    let mut offset = 0;

    while input.len() - offset >= RATE_BYTES {
        let block: &[u8; RATE_BYTES] = input[offset..offset + RATE_BYTES].try_into().unwrap();
        absorb_block(&mut state, block);
        keccak_f1600(&mut state);
        offset += RATE_BYTES;
    }

    let mut block = [0u8; RATE_BYTES];
    let remaining = input.len() - offset;
    block[..remaining].copy_from_slice(&input[offset..]);
    block[remaining] = 0x01;
    block[RATE_BYTES - 1] |= 0x80;
    absorb_block(&mut state, &block);
    keccak_f1600(&mut state);

    let mut output = [0u8; 32];
    for i in 0..4 {
        output[i * 8..i * 8 + 8].copy_from_slice(&state[i].to_le_bytes());
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn empty_input_known_answer() {
        let digest = keccak256(b"");
        assert_eq!(
            hex(&digest),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn hello_known_answer() {
        let digest = keccak256(b"hello");
        assert_eq!(
            hex(&digest),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn output_is_32_bytes() {
        assert_eq!(keccak256(b"").len(), 32);
        assert_eq!(keccak256(b"x").len(), 32);
        assert_eq!(keccak256(&vec![0u8; 1000]).len(), 32);
    }

    #[test]
    fn deterministic_across_calls() {
        let data = b"determinism check";
        assert_eq!(keccak256(data), keccak256(data));
    }

    #[test]
    fn single_bit_difference_changes_digest() {
        let a = keccak256(b"abc");
        let b = keccak256(b"abd");
        assert_ne!(a, b);
    }

    #[test]
    fn boundary_lengths_around_rate() {
        // Exercise the block-boundary padding edge cases explicitly:
        // exactly one rate block, and one byte short of two rate blocks.
        let exact = vec![0x42u8; RATE_BYTES];
        let short = vec![0x42u8; RATE_BYTES - 1];
        let over = vec![0x42u8; RATE_BYTES + 1];
        assert_eq!(keccak256(&exact).len(), 32);
        assert_eq!(keccak256(&short).len(), 32);
        assert_eq!(keccak256(&over).len(), 32);
        assert_ne!(keccak256(&exact), keccak256(&short));
    }
}
