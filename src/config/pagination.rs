use std::env;

/// Items per page when `POSTS_PER_PAGE` is unset or invalid.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationConfig {
    pub fn new(page_size: u64) -> Self {
        if page_size == 0 {
            return Self::default();
        }
        Self { page_size }
    }

    pub fn from_env() -> Self {
        match env::var("POSTS_PER_PAGE") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(size) => Self::new(size),
                Err(_) => {
                    tracing::warn!("Invalid POSTS_PER_PAGE '{}', using {}", raw, DEFAULT_PAGE_SIZE);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_page_size_falls_back_to_default() {
        assert_eq!(PaginationConfig::new(0).page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn explicit_page_size_is_kept() {
        assert_eq!(PaginationConfig::new(25).page_size, 25);
    }
}
