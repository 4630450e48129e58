use super::*;

/// A ready-to-hash job from the legacy getwork protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetworkJob {
    pub data: Vec<u8>,
    pub target: [u8; 32],
    pub midstate: Option<[u8; 32]>,
}

fn invalid(field: &'static str, err: DecodeError) -> DecodeError {
    match err {
        DecodeError::InvalidField { .. } => err,
        other => DecodeError::InvalidField {
            field,
            reason: other.to_string(),
        },
    }
}

fn field(result: &Value, name: &'static str, len: usize) -> Result<Vec<u8>> {
    let hexstr = hex_field::required_str(result, name).map_err(|err| invalid(name, err))?;
    hex_to_bin(name, hexstr, len).map_err(|err| invalid(name, err))
}

/// Decodes `data` (`work_len` bytes) and `target` from a getwork result.
///
/// `midstate` is decoded only when `wants_midstate` is set and the pool sent
/// one; callers compute it themselves otherwise. Every failure surfaces as
/// [`DecodeError::InvalidField`].
pub fn decode_getwork(result: &Value, work_len: usize, wants_midstate: bool) -> Result<GetworkJob> {
    if result.is_null() {
        return Err(DecodeError::NullResult);
    }

    let data = field(result, "data", work_len)?;

    let mut target = [0u8; 32];
    target.copy_from_slice(&field(result, "target", 32)?);

    let midstate = if wants_midstate && result.get("midstate").is_some_and(|m| !m.is_null()) {
        let mut midstate = [0u8; 32];
        midstate.copy_from_slice(&field(result, "midstate", 32)?);
        Some(midstate)
    } else {
        None
    };

    Ok(GetworkJob {
        data,
        target,
        midstate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(work_len: usize) -> Value {
        json!({
            "data": "ab".repeat(work_len),
            "target": "ff".repeat(32),
            "midstate": "11".repeat(32),
        })
    }

    #[test]
    fn decodes_each_header_width() {
        for work_len in [128, 168, 192] {
            let job = decode_getwork(&sample(work_len), work_len, false).unwrap();
            assert_eq!(job.data.len(), work_len);
            assert_eq!(job.target, [0xff; 32]);
            assert_eq!(job.midstate, None);
        }
    }

    #[test]
    fn midstate_only_when_wanted() {
        let job = decode_getwork(&sample(128), 128, true).unwrap();
        assert_eq!(job.midstate, Some([0x11; 32]));

        let mut value = sample(128);
        value.as_object_mut().unwrap().remove("midstate");
        let job = decode_getwork(&value, 128, true).unwrap();
        assert_eq!(job.midstate, None);
    }

    #[test]
    fn failures_are_invalid_field() {
        let mut missing = sample(128);
        missing.as_object_mut().unwrap().remove("target");

        let mut wrong_type = sample(128);
        wrong_type["data"] = json!(5);

        let mut short = sample(128);
        short["data"] = json!("abcd");

        let mut bad_hex = sample(128);
        bad_hex["target"] = json!("zz".repeat(32));

        for (value, expected) in [
            (missing, "target"),
            (wrong_type, "data"),
            (short, "data"),
            (bad_hex, "target"),
        ] {
            match decode_getwork(&value, 128, false) {
                Err(DecodeError::InvalidField { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidField for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn padded_data_is_truncated_to_work_len() {
        let mut value = sample(128);
        value["data"] = json!("00".repeat(160));
        assert_eq!(decode_getwork(&value, 128, false).unwrap().data.len(), 128);
    }
}
