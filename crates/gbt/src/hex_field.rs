use super::*;

pub fn bin_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes exactly `len` bytes from the front of `hexstr`. Trailing
/// characters past `2 * len` are ignored, which is what pools returning
/// padded getwork data rely on.
pub fn hex_to_bin(field: &'static str, hexstr: &str, len: usize) -> Result<Vec<u8>> {
    let wanted = len * 2;

    if hexstr.len() < wanted {
        return Err(DecodeError::InvalidLength {
            field,
            expected: len,
            actual: hexstr.len() / 2,
        });
    }

    let prefix = hexstr.get(..wanted).ok_or_else(|| DecodeError::InvalidField {
        field,
        reason: "not ASCII".into(),
    })?;

    hex::decode(prefix).context(error::InvalidHexSnafu { field })
}

pub(crate) fn required_str<'a>(obj: &'a Value, field: &'static str) -> Result<&'a str> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField { field }),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(DecodeError::InvalidField {
            field,
            reason: format!("expected string, got {other}"),
        }),
    }
}

pub(crate) fn optional_str<'a>(obj: &'a Value, field: &'static str) -> Result<Option<&'a str>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(DecodeError::InvalidField {
            field,
            reason: format!("expected string, got {other}"),
        }),
    }
}

pub(crate) fn required_hex<const N: usize>(obj: &Value, field: &'static str) -> Result<[u8; N]> {
    let bytes = hex_to_bin(field, required_str(obj, field)?, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}
