/// A completed voice recording, handed off at most once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMessage {
    /// Encoded audio fragments in delivery order
    pub fragments: Vec<Vec<u8>>,
    /// Negotiated codec/container identifier, fixed for the whole session
    pub encoding_format: String,
    /// True recorded duration in milliseconds
    pub duration_ms: u64,
}

impl AudioMessage {
    /// Concatenate all fragments into a single payload
    pub fn combined(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.total_bytes());
        for fragment in &self.fragments {
            payload.extend_from_slice(fragment);
        }
        payload
    }

    pub fn total_bytes(&self) -> usize {
        self.fragments.iter().map(|f| f.len()).sum()
    }
}
