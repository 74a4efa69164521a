//! Build configuration.

/// Options for building the operation catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Keep range-splitting entry points beside the serial routines
    pub parallel_variants: bool,
    /// Only build operations whose name contains this substring
    pub filter: Option<String>,
}

impl BuildOptions {
    pub fn serial_only(mut self) -> Self {
        self.parallel_variants = false;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn accepts(&self, operation: &str) -> bool {
        self.filter
            .as_deref()
            .is_none_or(|pattern| operation.contains(pattern))
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            parallel_variants: true,
            filter: None,
        }
    }
}
