#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Page links for a listing: the first page, two pages either side of `current`,
/// the last page, and ellipses over the gaps.
pub fn page_numbers(current: u32, total: u32) -> Vec<PageItem> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);

    let mut items = vec![PageItem::Page(1)];
    let range_start = current.saturating_sub(2).max(2);
    let range_end = (current + 2).min(total.saturating_sub(1));

    if range_start > 2 {
        items.push(PageItem::Ellipsis);
    }
    items.extend((range_start..=range_end).map(PageItem::Page));
    if range_end < total.saturating_sub(1) {
        items.push(PageItem::Ellipsis);
    }
    if total > 1 {
        items.push(PageItem::Page(total));
    }
    items
}

pub fn page_href(page: u32) -> String {
    format!("/?page={page}")
}
