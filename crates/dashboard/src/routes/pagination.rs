//! Page links for the invoice table.

use url::form_urlencoded;

use crate::actions::INVOICES_PATH;

/// One slot in the pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u64),
    Ellipsis,
}

/// Pages to show for `current` of `total`, with ellipses standing in for
/// skipped runs.
///
/// Up to seven pages are listed in full. Beyond that the first and last
/// pages are always shown, along with the current page and its neighbours.
#[must_use]
pub fn pagination(current: u64, total: u64) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total <= 7 {
        return (1..=total).map(Page).collect();
    }

    if current <= 3 {
        return vec![Page(1), Page(2), Page(3), Ellipsis, Page(total - 1), Page(total)];
    }

    if current >= total - 2 {
        return vec![
            Page(1),
            Page(2),
            Ellipsis,
            Page(total - 2),
            Page(total - 1),
            Page(total),
        ];
    }

    vec![
        Page(1),
        Ellipsis,
        Page(current - 1),
        Page(current),
        Page(current + 1),
        Ellipsis,
        Page(total),
    ]
}

/// URL of a page of the invoice list, keeping the search query.
#[must_use]
pub fn page_url(query: &str, page: u64) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if !query.is_empty() {
        params.append_pair("query", query);
    }
    params.append_pair("page", &page.to_string());
    format!("{INVOICES_PATH}?{}", params.finish())
}

/// A rendered pagination slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub label: String,
    /// `None` for ellipses and the current page.
    pub href: Option<String>,
    pub is_active: bool,
}

/// The pagination bar for the invoice list.
#[derive(Debug, Clone, Default)]
pub struct Pager {
    pub links: Vec<PageLink>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl Pager {
    #[must_use]
    pub fn new(query: &str, current: u64, total: u64) -> Self {
        let links = pagination(current, total)
            .into_iter()
            .map(|item| match item {
                PageItem::Page(page) => PageLink {
                    label: page.to_string(),
                    href: (page != current).then(|| page_url(query, page)),
                    is_active: page == current,
                },
                PageItem::Ellipsis => PageLink {
                    label: "...".to_string(),
                    href: None,
                    is_active: false,
                },
            })
            .collect();

        Self {
            links,
            previous: (current > 1).then(|| page_url(query, current - 1)),
            next: (current < total).then(|| page_url(query, current + 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PageItem::{Ellipsis, Page};
    use super::*;

    #[test]
    fn test_short_lists_show_every_page() {
        assert_eq!(pagination(1, 0), vec![]);
        assert_eq!(pagination(1, 1), vec![Page(1)]);
        assert_eq!(
            pagination(4, 7),
            (1..=7).map(Page).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_near_start() {
        assert_eq!(
            pagination(2, 10),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(9), Page(10)]
        );
        assert_eq!(pagination(3, 10), pagination(1, 10));
    }

    #[test]
    fn test_near_end() {
        assert_eq!(
            pagination(8, 10),
            vec![Page(1), Page(2), Ellipsis, Page(8), Page(9), Page(10)]
        );
        assert_eq!(pagination(10, 10), pagination(8, 10));
    }

    #[test]
    fn test_middle() {
        assert_eq!(
            pagination(5, 10),
            vec![
                Page(1),
                Ellipsis,
                Page(4),
                Page(5),
                Page(6),
                Ellipsis,
                Page(10)
            ]
        );
    }

    #[test]
    fn test_page_url_keeps_query() {
        assert_eq!(page_url("", 2), "/dashboard/invoices?page=2");
        assert_eq!(
            page_url("lee rob", 3),
            "/dashboard/invoices?query=lee+rob&page=3"
        );
    }

    #[test]
    fn test_pager_links() {
        let pager = Pager::new("", 1, 3);
        assert_eq!(pager.previous, None);
        assert_eq!(pager.next.as_deref(), Some("/dashboard/invoices?page=2"));
        assert!(pager.links[0].is_active);
        assert_eq!(pager.links[0].href, None);
        assert_eq!(
            pager.links[2].href.as_deref(),
            Some("/dashboard/invoices?page=3")
        );

        let last = Pager::new("", 3, 3);
        assert_eq!(last.next, None);
        assert_eq!(
            last.previous.as_deref(),
            Some("/dashboard/invoices?page=2")
        );
    }
}
