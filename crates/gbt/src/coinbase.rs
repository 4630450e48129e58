use super::*;

/// Width of the nonce2 field spliced into the coinbase extra data.
pub const NONCE2_SIZE: usize = 8;

// version (4) + input count (1) + null outpoint (36)
const EXTRA_LEN_OFFSET: usize = 41;
const EXTRA_DATA_OFFSET: usize = EXTRA_LEN_OFFSET + 1;

/// A coinbase transaction with room for a client-incremented nonce2.
///
/// The nonce2 bytes are appended to the end of the original scriptSig
/// extra data and the extra data length byte grows by [`NONCE2_SIZE`].
/// The backing buffer is padded to a four byte boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coinbase {
    data: Vec<u8>,
    len: usize,
    nonce2_offset: usize,
}

impl Coinbase {
    pub fn splice(coinbasetxn: &[u8]) -> Result<Self> {
        if coinbasetxn.len() < EXTRA_DATA_OFFSET {
            return Err(DecodeError::CoinbaseTooShort {
                length: coinbasetxn.len(),
            });
        }

        let orig_len = usize::from(coinbasetxn[EXTRA_LEN_OFFSET]);
        let nonce2_offset = EXTRA_DATA_OFFSET + orig_len;

        if coinbasetxn.len() < nonce2_offset {
            return Err(DecodeError::CoinbaseTooShort {
                length: coinbasetxn.len(),
            });
        }

        let extra_len = u8::try_from(orig_len + NONCE2_SIZE).map_err(|_| {
            DecodeError::ExtraDataOverflow {
                length: orig_len + NONCE2_SIZE,
            }
        })?;

        let len = coinbasetxn.len() + NONCE2_SIZE;
        let mut data = Vec::with_capacity(align_len(len + 1));

        data.extend_from_slice(&coinbasetxn[..EXTRA_LEN_OFFSET]);
        data.push(extra_len);
        data.extend_from_slice(&coinbasetxn[EXTRA_DATA_OFFSET..nonce2_offset]);
        data.extend_from_slice(&[0u8; NONCE2_SIZE]);
        data.extend_from_slice(&coinbasetxn[nonce2_offset..]);
        data.resize(align_len(len + 1), 0);

        Ok(Self {
            data,
            len,
            nonce2_offset,
        })
    }

    pub fn set_nonce2(&mut self, nonce2: u64) {
        LittleEndian::write_u64(
            &mut self.data[self.nonce2_offset..self.nonce2_offset + NONCE2_SIZE],
            nonce2,
        );
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn nonce2_offset(&self) -> usize {
        self.nonce2_offset
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq as pretty_assert_eq};

    fn coinbasetxn(extra: &[u8], tail: &[u8]) -> Vec<u8> {
        let mut tx = vec![0x01, 0x00, 0x00, 0x00, 0x01];
        tx.extend_from_slice(&[0u8; 32]);
        tx.extend_from_slice(&[0xff; 4]);
        tx.push(extra.len() as u8);
        tx.extend_from_slice(extra);
        tx.extend_from_slice(tail);
        tx
    }

    #[test]
    fn nonce2_follows_original_extra_data() {
        let coinbase = Coinbase::splice(&coinbasetxn(&[0xaa, 0xbb], &[0xcc, 0xdd])).unwrap();

        assert_eq!(coinbase.nonce2_offset(), 44);
        assert_eq!(coinbase.len(), 46 + NONCE2_SIZE);
        assert_eq!(coinbase.as_bytes()[41], 2 + NONCE2_SIZE as u8);
        pretty_assert_eq!(&coinbase.as_bytes()[42..44], &[0xaa, 0xbb]);
        pretty_assert_eq!(&coinbase.as_bytes()[44..52], &[0u8; 8]);
        pretty_assert_eq!(&coinbase.as_bytes()[52..], &[0xcc, 0xdd]);
    }

    #[test]
    fn buffer_is_padded() {
        let coinbase = Coinbase::splice(&coinbasetxn(&[0x01], &[])).unwrap();
        assert_eq!(coinbase.len(), 51);
        assert_eq!(coinbase.capacity() % 4, 0);
        assert!(coinbase.capacity() > coinbase.len());
    }

    #[test]
    fn set_nonce2_writes_little_endian() {
        let mut coinbase = Coinbase::splice(&coinbasetxn(&[], &[0xee])).unwrap();
        coinbase.set_nonce2(0x0102);
        pretty_assert_eq!(
            &coinbase.as_bytes()[42..51],
            &[0x02, 0x01, 0, 0, 0, 0, 0, 0, 0xee]
        );
    }

    #[test]
    fn too_short() {
        assert!(matches!(
            Coinbase::splice(&[0u8; 20]),
            Err(DecodeError::CoinbaseTooShort { length: 20 })
        ));

        let mut truncated = coinbasetxn(&[1, 2, 3], &[]);
        truncated.truncate(43);
        assert!(matches!(
            Coinbase::splice(&truncated),
            Err(DecodeError::CoinbaseTooShort { length: 43 })
        ));
    }

    #[test]
    fn extra_data_overflow_is_checked() {
        let extra = vec![0u8; 250];
        assert!(matches!(
            Coinbase::splice(&coinbasetxn(&extra, &[])),
            Err(DecodeError::ExtraDataOverflow { length: 258 })
        ));
    }
}
