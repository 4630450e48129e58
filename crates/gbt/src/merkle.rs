/// Canonical binary Merkle root with duplicate-last padding.
///
/// The first leaf is the coinbase hash, followed by the transaction hashes
/// in template order. `hash` is applied to every 64 byte pair.
pub fn merkle_root(
    coinbase_hash: [u8; 32],
    txn_hashes: &[[u8; 32]],
    hash: impl Fn(&[u8]) -> [u8; 32],
) -> [u8; 32] {
    let mut level = Vec::with_capacity(txn_hashes.len() + 2);
    level.push(coinbase_hash);
    level.extend_from_slice(txn_hashes);

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }

        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut concat = [0u8; 64];
                concat[..32].copy_from_slice(&pair[0]);
                concat[32..].copy_from_slice(&pair[1]);
                hash(&concat)
            })
            .collect();
    }

    level[0]
}
