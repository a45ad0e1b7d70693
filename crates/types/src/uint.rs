use primitive_types::U256 as PrimitiveU256;

pub type U256 = PrimitiveU256;

pub trait UintExt: Sized {
    fn from_be_bytes_vec(bytes: &[u8]) -> Self;
    /// Big-endian bytes with leading zeros stripped; zero encodes as an empty vec.
    fn to_be_bytes_trimmed(&self) -> Vec<u8>;
    fn to_be_bytes_word(&self) -> [u8; 32];
}

impl UintExt for U256 {
    fn from_be_bytes_vec(bytes: &[u8]) -> Self {
        let mut array = [0u8; 32];
        let len = std::cmp::min(bytes.len(), 32);
        let offset = 32 - len;
        array[offset..].copy_from_slice(&bytes[bytes.len() - len..]);
        U256::from_big_endian(&array)
    }
    
    fn to_be_bytes_trimmed(&self) -> Vec<u8> {
        let bytes = self.to_be_bytes_word();
        match bytes.iter().position(|&b| b != 0) {
            Some(first_non_zero) => bytes[first_non_zero..].to_vec(),
            None => Vec::new(),
        }
    }
    
    fn to_be_bytes_word(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_u256_from_be_bytes() {
        let u = U256::from_be_bytes_vec(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(u, U256::from(0x12345678u64));
    }
    
    #[test]
    fn test_u256_to_be_bytes() {
        let u = U256::from(0x12345678u64);
        assert_eq!(u.to_be_bytes_trimmed(), vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(u.to_be_bytes_word()[28..], [0x12, 0x34, 0x56, 0x78]);
    }
    
    #[test]
    fn test_u256_zero() {
        assert!(U256::zero().to_be_bytes_trimmed().is_empty());
    }
}
