use thiserror::Error;

#[derive(Debug, Error)]
pub enum RlpError {
    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),
}

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    
    #[error("Invalid RLP data: {0}")]
    InvalidData(String),
    
    #[error("Integer overflow")]
    IntegerOverflow,
    
    #[error("Leading zeros in integer")]
    LeadingZeros,
    
    #[error("Trailing bytes after RLP item")]
    TrailingBytes,
}
