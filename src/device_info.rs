/// Identity fields reported by the controller's hardware info reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model_number: [u8; 8],
    pub type_code: u16,
    pub serial_number: u32,
    pub firmware_version: u32,
    pub hardware_version: u16,
}

impl DeviceInfo {
    /// Model number as text, NUL padding stripped.
    pub fn model_str(&self) -> String {
        String::from_utf8_lossy(&self.model_number)
            .trim_end_matches('\0')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_str_strips_padding() {
        let info = DeviceInfo {
            model_number: *b"KBD101\0\0",
            type_code: 16,
            serial_number: 28_000_001,
            firmware_version: 131_080,
            hardware_version: 1,
        };
        assert_eq!(info.model_str(), "KBD101");
    }
}
