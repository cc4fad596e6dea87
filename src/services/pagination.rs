use serde::{Deserialize, Serialize};

pub const MAX_ITEMS_PER_PAGE: usize = 100;

/// Query-string half of every paginated endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub items_per_page: Option<i64>,
}

impl PageQuery {
    pub fn window(&self, default_items_per_page: usize) -> PageWindow {
        PageWindow::new(
            self.page.unwrap_or(1),
            self.items_per_page.unwrap_or(default_items_per_page as i64),
        )
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

/// 1-based page number and page size, both clamped into range so that
/// pagination never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub items_per_page: usize,
}

impl PageWindow {
    pub fn new(page: i64, items_per_page: i64) -> Self {
        Self {
            page: page.max(1) as usize,
            items_per_page: (items_per_page.max(1) as usize).min(MAX_ITEMS_PER_PAGE),
        }
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.items_per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub total_pages: usize,
}

/// Cuts one page out of an already filtered and sorted collection. Pages past
/// the end come back empty; there is always at least one page.
pub fn paginate<T>(items: Vec<T>, window: PageWindow) -> Page<T> {
    let total_count = items.len();
    let total_pages = total_count.div_ceil(window.items_per_page).max(1);

    let items = items
        .into_iter()
        .skip(window.offset())
        .take(window.items_per_page)
        .collect();

    Page {
        items,
        total_count,
        total_pages,
    }
}

/// Records exposing the fields a free-text search looks at.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

/// Case-insensitive substring match against any field. A missing or blank
/// term matches everything.
pub fn matches_search(fields: &[&str], term: Option<&str>) -> bool {
    match normalized_term(term) {
        Some(term) => fields.iter().any(|field| field.to_lowercase().contains(&term)),
        None => true,
    }
}

pub fn filter_by_search<T: Searchable>(items: Vec<T>, term: Option<&str>) -> Vec<T> {
    let Some(term) = normalized_term(term) else {
        return items;
    };

    items
        .into_iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
        })
        .collect()
}

fn normalized_term(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        name: &'static str,
        email: &'static str,
    }

    impl Searchable for Person {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.name, self.email]
        }
    }

    #[test]
    fn last_partial_page() {
        let page = paginate(vec![1, 2, 3, 4, 5], PageWindow::new(3, 2));
        assert_eq!(page.items, vec![5]);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = paginate(vec![1, 2, 3], PageWindow::new(9, 2));
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn empty_collection_has_one_page() {
        let page = paginate(Vec::<u8>::new(), PageWindow::new(1, 10));
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn invalid_window_is_clamped() {
        assert_eq!(PageWindow::new(0, 0), PageWindow { page: 1, items_per_page: 1 });
        assert_eq!(PageWindow::new(-4, -1), PageWindow { page: 1, items_per_page: 1 });
        assert_eq!(PageWindow::new(2, 5000).items_per_page, MAX_ITEMS_PER_PAGE);
    }

    #[test]
    fn pages_cover_everything_without_overlap() {
        for total in 0..23usize {
            for per_page in 1..7usize {
                let items: Vec<usize> = (0..total).collect();
                let pages = paginate(items.clone(), PageWindow::new(1, per_page as i64)).total_pages;

                let mut seen = Vec::new();
                for page in 1..=pages {
                    seen.extend(paginate(items.clone(), PageWindow::new(page as i64, per_page as i64)).items);
                }
                assert_eq!(seen, items, "total={} per_page={}", total, per_page);
            }
        }
    }

    #[test]
    fn paginate_is_repeatable() {
        let window = PageWindow::new(2, 3);
        let first = paginate((0..10).collect::<Vec<_>>(), window);
        let second = paginate((0..10).collect::<Vec<_>>(), window);
        assert_eq!(first, second);
    }

    #[test]
    fn query_defaults() {
        let query = PageQuery::default();
        assert_eq!(query.window(6), PageWindow { page: 1, items_per_page: 6 });
        assert_eq!(query.search_term(), None);
    }

    #[test]
    fn blank_term_matches_everything() {
        assert!(matches_search(&["Maria"], None));
        assert!(matches_search(&["Maria"], Some("")));
        assert!(matches_search(&["Maria"], Some("   ")));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        assert!(matches_search(&["Maria Santos", "maria@school.test"], Some("SANTOS")));
        assert!(matches_search(&["Maria Santos", "maria@school.test"], Some("school.")));
        assert!(!matches_search(&["Maria Santos", "maria@school.test"], Some("pedro")));
    }

    #[test]
    fn filter_by_search_keeps_matches_in_order() {
        let people = vec![
            Person { name: "Ana Cruz", email: "ana@school.test" },
            Person { name: "Ben Reyes", email: "ben@school.test" },
            Person { name: "Carla Anand", email: "carla@school.test" },
        ];

        let found: Vec<_> = filter_by_search(people, Some("an"))
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(found, vec!["Ana Cruz", "Carla Anand"]);
    }

    #[test]
    fn filter_without_term_returns_all() {
        let people: Vec<Person> = (0..10)
            .map(|_| Person { name: "x", email: "y" })
            .collect();
        assert_eq!(filter_by_search(people, None).len(), 10);
    }
}
