#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Number of data rows a table prepares before it tries to place them.
    ///
    /// Rows of group bands wait for the row after them, so small batches
    /// only delay placement. Defaults to `10`.
    pub table_batch_size: usize,

    /// Upper bound of page attempts while counting pages. Reaching it means
    /// the content never completes and generation fails.
    ///
    /// Defaults to `10000`.
    pub max_page_attempts: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            table_batch_size: 10,
            max_page_attempts: 10_000,
        }
    }
}
