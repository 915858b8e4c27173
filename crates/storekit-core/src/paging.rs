//! Pagination arithmetic
//!
//! `PagingCalculator` keeps `{total, per_page, page}` consistent and derives
//! offsets and page-navigation facts from it. Page numbers are 1-based; page
//! 0 is only valid for an empty set.
//!
//! `calculate_visible_page_range` is the pure windowing function used by
//! pagination controls to decide which page numbers to show.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use storekit::StoreKitConfig;

use crate::error::{StoreError, StoreResult};
use crate::events::EventEmitter;

const DEFAULT_VISIBLE_RANGE: usize = 5;

/// Where the current page sits inside the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Window ends at the current page
    Left,
    /// Window is centred on the current page
    #[default]
    Center,
    /// Window starts at the current page
    Right,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [Orientation::Left, Orientation::Center, Orientation::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Left => "left",
            Orientation::Center => "center",
            Orientation::Right => "right",
        }
    }
}

impl FromStr for Orientation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Orientation::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| StoreError::UnknownVariant {
                kind: "orientation",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive range of page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, page: usize) -> bool {
        (self.start..=self.end).contains(&page)
    }

    pub fn pages(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Number of pages needed for `total` items, `per_page` at a time.
pub fn page_count_for(total: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}

/// Check `page` against `(total, per_page)` without touching any state.
pub fn validate_page(total: usize, per_page: usize, page: usize) -> StoreResult<()> {
    if per_page == 0 {
        return Err(StoreError::InvalidPerPage);
    }
    let max_page = page_count_for(total, per_page);
    if (total > 0 && page == 0) || page > max_page {
        return Err(StoreError::InvalidPage { page, max_page });
    }
    Ok(())
}

/// Compute the window of page numbers to display around `page`.
///
/// Returns `None` when there are no pages. The window never leaves
/// `[1, page_count]`; when it is clipped on one side, the missing pages are
/// taken from the other side. If `size >= page_count` every page is shown.
pub fn calculate_visible_page_range(
    page: usize,
    page_count: usize,
    size: usize,
    orientation: Orientation,
) -> Option<PageRange> {
    if page_count == 0 {
        return None;
    }
    let size = size.max(1);
    if size >= page_count {
        return Some(PageRange {
            start: 1,
            end: page_count,
        });
    }
    let page = page.clamp(1, page_count);

    let (start, end) = match orientation {
        Orientation::Right => {
            let end = (page + size - 1).min(page_count);
            (end + 1 - size, end)
        }
        Orientation::Left => {
            let start = page.saturating_sub(size - 1).max(1);
            (start, start + size - 1)
        }
        Orientation::Center => {
            let before = size / 2;
            let after = size - 1 - before;
            if page <= before {
                (1, size)
            } else if page + after > page_count {
                (page_count + 1 - size, page_count)
            } else {
                (page - before, page + after)
            }
        }
    };

    Some(PageRange { start, end })
}

/// Field of a [`PagingCalculator`] that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingField {
    Total,
    PerPage,
    Page,
}

/// Change notification emitted by the calculator's setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingChange {
    pub field: PagingField,
    pub old: usize,
    pub new: usize,
}

/// Pagination state with validated page assignment.
#[derive(Debug)]
pub struct PagingCalculator {
    total: usize,
    per_page: usize,
    page: usize,
    auto_adjust_page: bool,
    visible_range_size: usize,
    changes: EventEmitter<PagingChange>,
}

impl PagingCalculator {
    /// Create a calculator. The page is validated before assignment,
    /// regardless of `auto_adjust_page`.
    pub fn new(
        total: usize,
        per_page: usize,
        page: usize,
        auto_adjust_page: bool,
    ) -> StoreResult<Self> {
        validate_page(total, per_page, page)?;
        Ok(Self {
            total,
            per_page,
            page,
            auto_adjust_page,
            visible_range_size: DEFAULT_VISIBLE_RANGE,
            changes: EventEmitter::new(),
        })
    }

    /// Create a calculator using `auto_adjust_page` and the visible range
    /// size from configuration.
    pub fn from_config(
        total: usize,
        per_page: usize,
        page: usize,
        config: &StoreKitConfig,
    ) -> StoreResult<Self> {
        let mut calc = Self::new(total, per_page, page, config.auto_adjust_page)?;
        calc.visible_range_size = config.visible_page_range.max(1);
        Ok(calc)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Current page, without re-validation.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Current page, failing if an earlier total/per_page change left it out
    /// of range (only possible with auto-adjust disabled).
    pub fn checked_page(&self) -> StoreResult<usize> {
        self.validate()?;
        Ok(self.page)
    }

    pub fn validate(&self) -> StoreResult<()> {
        validate_page(self.total, self.per_page, self.page)
    }

    pub fn auto_adjust_page(&self) -> bool {
        self.auto_adjust_page
    }

    pub fn set_auto_adjust_page(&mut self, enabled: bool) {
        self.auto_adjust_page = enabled;
    }

    pub fn changes(&self) -> &EventEmitter<PagingChange> {
        &self.changes
    }

    pub fn set_total(&mut self, total: usize) -> StoreResult<()> {
        if total == self.total {
            return Ok(());
        }
        let old = std::mem::replace(&mut self.total, total);
        self.notify(PagingField::Total, old, total);
        self.readjust_page()
    }

    pub fn set_per_page(&mut self, per_page: usize) -> StoreResult<()> {
        if per_page == 0 {
            return Err(StoreError::InvalidPerPage);
        }
        if per_page == self.per_page {
            return Ok(());
        }
        let old = std::mem::replace(&mut self.per_page, per_page);
        self.notify(PagingField::PerPage, old, per_page);
        self.readjust_page()
    }

    /// Assign a page. Out-of-range pages are clamped to the last page when
    /// auto-adjust is on, and rejected otherwise.
    pub fn set_page(&mut self, page: usize) -> StoreResult<()> {
        let page = match validate_page(self.total, self.per_page, page) {
            Ok(()) => page,
            Err(StoreError::InvalidPage { .. }) if self.auto_adjust_page => self.max_page(),
            Err(e) => return Err(e),
        };
        self.assign_page(page);
        Ok(())
    }

    /// After total/per_page changed: clamp an invalidated page when allowed,
    /// otherwise leave it for `validate`/`checked_page` to report.
    fn readjust_page(&mut self) -> StoreResult<()> {
        match self.validate() {
            Ok(()) => Ok(()),
            Err(StoreError::InvalidPage { .. }) => {
                if self.auto_adjust_page {
                    let max = self.max_page();
                    self.assign_page(max);
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn assign_page(&mut self, page: usize) {
        if page != self.page {
            let old = std::mem::replace(&mut self.page, page);
            self.notify(PagingField::Page, old, page);
        }
    }

    fn notify(&self, field: PagingField, old: usize, new: usize) {
        self.changes.emit(&PagingChange { field, old, new });
    }

    pub fn page_count(&self) -> usize {
        page_count_for(self.total, self.per_page)
    }

    pub fn max_page(&self) -> usize {
        self.page_count()
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.page_count()
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn is_first_page(&self) -> bool {
        self.page <= 1
    }

    pub fn is_last_page(&self) -> bool {
        self.page >= self.page_count()
    }

    pub fn next_page(&self) -> Option<usize> {
        self.has_next_page().then(|| self.page + 1)
    }

    pub fn previous_page(&self) -> Option<usize> {
        self.has_previous_page().then(|| self.page - 1)
    }

    /// Index of the first item on the current page.
    pub fn offset_start(&self) -> usize {
        self.page.saturating_sub(1) * self.per_page
    }

    /// One past the index of the last item on the current page.
    pub fn offset_end(&self) -> usize {
        (self.page * self.per_page).min(self.total)
    }

    pub fn visible_page_range(&self, size: usize, orientation: Orientation) -> Option<PageRange> {
        calculate_visible_page_range(self.page, self.page_count(), size, orientation)
    }

    /// Visible range using the configured window size.
    pub fn visible_page_range_default(&self, orientation: Orientation) -> Option<PageRange> {
        self.visible_page_range(self.visible_range_size, orientation)
    }
}
