/// Where the filter state is mirrored: the query string of the current page.
///
/// Implementations hold the query without a leading `?`.
pub trait AddressBar {
    fn read(&self) -> String;

    /// Overwrites the current entry. Never adds a history entry.
    fn replace(&mut self, query: &str);
}

/// Address bar backed by a string, used per request by the HTTP and MCP surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAddressBar {
    current: String,
    history_len: usize,
    writes: usize,
}

impl MemoryAddressBar {
    pub fn new(query: &str) -> Self {
        Self {
            current: query.trim_start_matches('?').to_string(),
            history_len: 1,
            writes: 0,
        }
    }
}

#[cfg(test)]
impl MemoryAddressBar {
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Default for MemoryAddressBar {
    fn default() -> Self {
        Self::new("")
    }
}

impl AddressBar for MemoryAddressBar {
    fn read(&self) -> String {
        self.current.clone()
    }

    fn replace(&mut self, query: &str) {
        self.current = query.trim_start_matches('?').to_string();
        self.writes += 1;
    }
}
