use {
    super::*,
    hex_field::{optional_str, required_hex, required_str},
};

/// A decoded getblocktemplate result.
///
/// `previous_block_hash` is stored word-swapped and `target` fully
/// reversed, matching the layout the header builder expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub previous_block_hash: [u8; 32],
    pub target: [u8; 32],
    pub coinbasetxn: String,
    pub coinbase: Coinbase,
    pub longpollid: String,
    pub workid: Option<String>,
    pub expires: u64,
    pub version: u32,
    pub curtime: u32,
    pub bits: [u8; 4],
    pub submitold: bool,
    pub txn_hashes: Vec<[u8; 32]>,
    pub txn_data: Vec<String>,
}

fn required_nonzero(obj: &Value, field: &'static str) -> Result<u64> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField { field }),
        Some(value) => match value.as_u64() {
            Some(0) => Err(DecodeError::MissingField { field }),
            Some(n) => Ok(n),
            None => Err(DecodeError::InvalidField {
                field,
                reason: format!("expected unsigned integer, got {value}"),
            }),
        },
    }
}

fn required_u32(obj: &Value, field: &'static str) -> Result<u32> {
    u32::try_from(required_nonzero(obj, field)?).map_err(|_| DecodeError::InvalidField {
        field,
        reason: "does not fit in 32 bits".into(),
    })
}

impl Template {
    /// Decodes every field before returning, so callers can swap the result
    /// into shared state atomically and leave it untouched on failure.
    pub fn decode(result: &Value, hash: impl Fn(&[u8]) -> [u8; 32]) -> Result<Self> {
        if result.is_null() {
            return Err(DecodeError::NullResult);
        }

        let previousblockhash = required_hex::<32>(result, "previousblockhash")?;
        let target = required_hex::<32>(result, "target")?;

        let coinbasetxn = result
            .get("coinbasetxn")
            .filter(|value| !value.is_null())
            .ok_or(DecodeError::MissingField {
                field: "coinbasetxn",
            })?;
        let coinbasetxn = required_str(coinbasetxn, "data")?;

        let longpollid = required_str(result, "longpollid")?;
        let expires = required_nonzero(result, "expires")?;
        let version = required_u32(result, "version")?;
        let curtime = required_u32(result, "curtime")?;
        let bits = required_hex::<4>(result, "bits")?;
        let workid = optional_str(result, "workid")?;
        let submitold = result
            .get("submitold")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let coinbase = Coinbase::splice(
            &hex::decode(coinbasetxn).context(error::InvalidHexSnafu {
                field: "coinbasetxn",
            })?,
        )?;

        let (txn_hashes, txn_data) = Self::decode_transactions(result, &hash)?;

        Ok(Self {
            previous_block_hash: swap256(&previousblockhash),
            target: swab256(&target),
            coinbasetxn: coinbasetxn.into(),
            coinbase,
            longpollid: longpollid.into(),
            workid: workid.map(str::to_string),
            expires,
            version,
            curtime,
            bits,
            submitold,
            txn_hashes,
            txn_data,
        })
    }

    fn decode_transactions(
        result: &Value,
        hash: &impl Fn(&[u8]) -> [u8; 32],
    ) -> Result<(Vec<[u8; 32]>, Vec<String>)> {
        let Some(transactions) = result.get("transactions").and_then(Value::as_array) else {
            return Ok((Vec::new(), Vec::new()));
        };

        let mut hashes = Vec::with_capacity(transactions.len());
        let mut data = Vec::with_capacity(transactions.len());

        for transaction in transactions {
            let hexstr = required_str(transaction, "data")?;

            let mut bin = hex::decode(hexstr).context(error::InvalidHexSnafu {
                field: "transactions",
            })?;
            let len = bin.len();
            bin.resize(align_len(len), 0);

            hashes.push(hash(&bin[..len]));
            data.push(hexstr.to_string());
        }

        Ok((hashes, data))
    }

    /// Merkle root with the coinbase in its current nonce2 state.
    pub fn merkle_root(&self, hash: impl Fn(&[u8]) -> [u8; 32]) -> [u8; 32] {
        let coinbase_hash = hash(self.coinbase.as_bytes());
        merkle_root(coinbase_hash, &self.txn_hashes, hash)
    }

    /// Assembles the 128 byte header template:
    /// version | prevhash | merkleroot | curtime | bits | nonce | padding.
    /// Nonce and padding are left zeroed.
    pub fn header(&self, merkle_root: &[u8; 32]) -> [u8; 128] {
        let mut data = [0u8; 128];
        BigEndian::write_u32(&mut data[0..4], self.version);
        data[4..36].copy_from_slice(&self.previous_block_hash);
        data[36..68].copy_from_slice(&flip32(merkle_root));
        BigEndian::write_u32(&mut data[68..72], self.curtime);
        data[72..76].copy_from_slice(&self.bits);
        data
    }

    /// Number of transactions in the block, coinbase included.
    pub fn txn_count(&self) -> usize {
        self.txn_hashes.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        bitcoin::{BlockHash, CompactTarget, TxMerkleNode, block},
        pretty_assertions::assert_eq as pretty_assert_eq,
        std::str::FromStr,
    };

    const PREVHASH: &str = "000000000000000000024d5f8f5b5e1b2a9d3c4e5f60718293a4b5c6d7e8f901";
    const TARGET: &str = "00000000ffff0000000000000000000000000000000000000000000000000000";
    const COINBASETXN: &str = concat!(
        "01000000",
        "01",
        "0000000000000000000000000000000000000000000000000000000000000000",
        "ffffffff",
        "01",
        "51"
    );

    fn sample() -> Value {
        json!({
            "previousblockhash": PREVHASH,
            "target": TARGET,
            "coinbasetxn": { "data": COINBASETXN },
            "longpollid": "lp-1",
            "expires": 120,
            "version": 536870912,
            "curtime": 1700000000,
            "bits": "1d00ffff",
            "transactions": [],
        })
    }

    #[test]
    fn coinbase_sample_is_86_hex_chars() {
        assert_eq!(COINBASETXN.len(), 86);
    }

    #[test]
    fn decodes_required_fields() {
        let template = Template::decode(&sample(), sha256d).unwrap();

        assert_eq!(template.longpollid, "lp-1");
        assert_eq!(template.expires, 120);
        assert_eq!(template.version, 536870912);
        assert_eq!(template.curtime, 1700000000);
        assert_eq!(template.bits, [0x1d, 0x00, 0xff, 0xff]);
        assert_eq!(template.workid, None);
        assert!(!template.submitold);
        assert_eq!(template.txn_count(), 1);
        assert_eq!(template.coinbase.len(), 43 + NONCE2_SIZE);
        assert_eq!(template.coinbase.nonce2_offset(), 43);
    }

    #[test]
    fn endian_of_prevhash_and_target() {
        let template = Template::decode(&sample(), sha256d).unwrap();

        let raw: [u8; 32] = hex::decode(PREVHASH).unwrap().try_into().unwrap();
        assert_eq!(template.previous_block_hash, swap256(&raw));

        let raw: [u8; 32] = hex::decode(TARGET).unwrap().try_into().unwrap();
        let mut reversed = raw;
        reversed.reverse();
        assert_eq!(template.target, reversed);
    }

    #[test]
    fn missing_bits_is_missing_field() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("bits");

        let err = Template::decode(&value, sha256d).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "bits" }));
    }

    #[test]
    fn every_required_field_is_checked() {
        for field in [
            "previousblockhash",
            "target",
            "coinbasetxn",
            "longpollid",
            "expires",
            "version",
            "curtime",
            "bits",
        ] {
            let mut value = sample();
            value.as_object_mut().unwrap().remove(field);
            assert_eq!(
                Template::decode(&value, sha256d).unwrap_err().field(),
                Some(field),
                "{field}"
            );
        }
    }

    #[test]
    fn zero_expires_counts_as_missing() {
        let mut value = sample();
        value["expires"] = json!(0);
        assert!(matches!(
            Template::decode(&value, sha256d),
            Err(DecodeError::MissingField { field: "expires" })
        ));
    }

    #[test]
    fn optional_fields() {
        let mut value = sample();
        value["workid"] = json!("w42");
        value["submitold"] = json!(true);

        let template = Template::decode(&value, sha256d).unwrap();
        assert_eq!(template.workid.as_deref(), Some("w42"));
        assert!(template.submitold);
    }

    #[test]
    fn null_result() {
        assert!(matches!(
            Template::decode(&Value::Null, sha256d),
            Err(DecodeError::NullResult)
        ));
    }

    #[test]
    fn transactions_are_hashed_in_order() {
        let mut value = sample();
        value["transactions"] = json!([{ "data": "0102" }, { "data": "030405" }]);

        let template = Template::decode(&value, sha256d).unwrap();
        pretty_assert_eq!(
            template.txn_hashes,
            vec![sha256d(&[1, 2]), sha256d(&[3, 4, 5])]
        );
        pretty_assert_eq!(template.txn_data, vec!["0102", "030405"]);
        assert_eq!(template.txn_count(), 3);
    }

    #[test]
    fn bad_transaction_hex() {
        let mut value = sample();
        value["transactions"] = json!([{ "data": "zz" }]);
        assert!(matches!(
            Template::decode(&value, sha256d),
            Err(DecodeError::InvalidHex {
                field: "transactions",
                ..
            })
        ));
    }

    #[test]
    fn empty_block_merkle_root_is_coinbase_hash() {
        let template = Template::decode(&sample(), sha256d).unwrap();
        assert_eq!(
            template.merkle_root(sha256d),
            sha256d(template.coinbase.as_bytes())
        );
    }

    #[test]
    fn flipped_header_is_consensus_serialization() {
        let mut template = Template::decode(&sample(), sha256d).unwrap();
        template.coinbase.set_nonce2(7);

        let root = template.merkle_root(sha256d);
        let data = template.header(&root);

        let header = block::Header {
            version: block::Version::from_consensus(536870912),
            prev_blockhash: BlockHash::from_str(PREVHASH).unwrap(),
            merkle_root: TxMerkleNode::from_byte_array(root),
            time: 1700000000,
            bits: CompactTarget::from_consensus(0x1d00ffff),
            nonce: 0,
        };

        pretty_assert_eq!(flip80(&data).to_vec(), consensus::serialize(&header));
        assert!(data[76..].iter().all(|b| *b == 0));
    }
}
