use super::*;

/// Serializes a full block for `submitblock`: the 80 byte header in wire
/// order, the transaction count as a compact size, the coinbase, then every
/// template transaction verbatim.
pub fn serialize_block(
    header: &[u8; 80],
    txn_count: usize,
    coinbase: &Coinbase,
    txn_data: &[String],
) -> String {
    let mut block = hex::encode(header);
    block.push_str(&hex::encode(consensus::serialize(&VarInt(txn_count as u64))));
    block.push_str(&coinbase.to_hex());

    for txn in txn_data {
        block.push_str(txn);
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase() -> Coinbase {
        let mut tx = vec![0x01, 0, 0, 0, 0x01];
        tx.extend_from_slice(&[0u8; 32]);
        tx.extend_from_slice(&[0xff; 4]);
        tx.extend_from_slice(&[0x00, 0x51]);
        Coinbase::splice(&tx).unwrap()
    }

    #[test]
    fn layout() {
        let header = [0x42; 80];
        let coinbase = coinbase();
        let block = serialize_block(&header, 3, &coinbase, &["aa".into(), "bbcc".into()]);

        assert_eq!(&block[..160], "42".repeat(80));
        assert_eq!(&block[160..162], "03");
        assert!(block[162..].starts_with(&coinbase.to_hex()));
        assert!(block.ends_with("aabbcc"));
    }

    #[test]
    fn large_count_uses_compact_size() {
        let block = serialize_block(&[0; 80], 300, &coinbase(), &[]);
        assert_eq!(&block[160..166], "fd2c01");
    }
}
