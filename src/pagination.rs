//! Read-only windowing over ordered listings.
//!
//! Callers build a filtered, ordered `Select` and hand it over together with
//! the raw `page` query parameter; the paginator counts, clamps the page
//! number into range and fetches at most `page_size` rows.

use crate::config::pagination::PaginationConfig;
use crate::error::AppResult;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Select};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `?page=` as submitted. Kept as a string so that garbage never turns into
/// a rejected request.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PageQuery {
    /// 1-indexed page number
    pub page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> i64 {
        parse_page_number(self.page.as_deref())
    }
}

/// Absent or non-numeric input means the first page.
pub fn parse_page_number(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub total_pages: u64,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: u64,
}

impl Paginator {
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// An empty listing still has one (empty) page.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size).max(1)
    }

    /// Clamp `requested` into `1..=total_pages` and compute the slice bounds.
    pub fn window(&self, total: u64, requested: i64) -> PageWindow {
        let total_pages = self.total_pages(total);
        let page = if requested < 1 {
            1
        } else {
            (requested as u64).min(total_pages)
        };
        let offset = (page - 1) * self.page_size;
        let limit = self.page_size.min(total.saturating_sub(offset));

        PageWindow {
            page,
            total_pages,
            total,
            offset,
            limit,
        }
    }

    pub async fn fetch<E, C>(
        &self,
        db: &C,
        select: Select<E>,
        requested: i64,
    ) -> AppResult<Page<E::Model>>
    where
        C: ConnectionTrait,
        E: EntityTrait,
        E::Model: Send + Sync + 'static,
    {
        let total = select.clone().count(db).await?;
        let window = self.window(total, requested);

        let items = if window.limit == 0 {
            Vec::new()
        } else {
            select
                .offset(window.offset)
                .limit(window.limit)
                .all(db)
                .await?
        };

        Ok(Page::new(items, &window, self.page_size))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: &PageWindow, per_page: u64) -> Self {
        Self {
            items,
            total: window.total,
            page: window.page,
            per_page,
            total_pages: window.total_pages,
            has_previous: window.has_previous(),
            has_next: window.has_next(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }

    pub fn is_last(&self) -> bool {
        !self.has_next
    }
}
