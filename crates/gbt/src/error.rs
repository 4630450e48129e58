use super::*;

pub type Result<T = (), E = DecodeError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    #[snafu(display("JSON key `{field}` not found"))]
    MissingField { field: &'static str },

    #[snafu(display("JSON key `{field}` invalid: {reason}"))]
    InvalidField { field: &'static str, reason: String },

    #[snafu(display("JSON key `{field}` is not valid hex: {source}"))]
    InvalidHex {
        field: &'static str,
        source: hex::FromHexError,
    },

    #[snafu(display("JSON key `{field}` decodes to {actual} bytes, expected {expected}"))]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[snafu(display("coinbase transaction is {length} bytes, too short to hold extra data"))]
    CoinbaseTooShort { length: usize },

    #[snafu(display("coinbase extra data would grow to {length} bytes, more than fits in one byte"))]
    ExtraDataOverflow { length: usize },

    #[snafu(display("JSON-RPC result is null"))]
    NullResult,
}

impl DecodeError {
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field }
            | Self::InvalidField { field, .. }
            | Self::InvalidHex { field, .. }
            | Self::InvalidLength { field, .. } => Some(field),
            _ => None,
        }
    }
}
