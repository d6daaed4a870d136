//! Offset/limit windows over a result set and the RFC 5988 links that
//! navigate between them.

use serde::Serialize;
use url::Url;

use crate::config::WikiConfig;

/// Clamp a user-provided limit to `[1, max]`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Computes windows from the configured limits.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    default_limit: i64,
    max_limit: i64,
}

impl Paginator {
    pub fn new(config: &WikiConfig) -> Self {
        Self {
            default_limit: config.default_page_limit,
            max_limit: config.max_page_limit,
        }
    }

    pub fn paginate(&self, total: i64, offset: Option<i64>, limit: Option<i64>) -> Window {
        let limit = clamp_limit(limit, self.default_limit, self.max_limit);
        let start = clamp_offset(offset);
        Window {
            start,
            end: start.saturating_add(limit - 1),
            limit,
            total: total.max(0),
        }
    }
}

/// One page of results. `start` and `end` are inclusive offsets; `end` may
/// point past the last item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: i64,
    pub end: i64,
    pub limit: i64,
    pub total: i64,
}

impl Window {
    /// Navigation links relative to `request`. Only the `offset` query
    /// parameter is rewritten; everything else is carried over in order.
    pub fn links(&self, request: &Url) -> Vec<Link> {
        let mut targets = Vec::with_capacity(4);
        if self.start > 0 {
            targets.push((Rel::First, 0));
        }
        if self.start - self.limit >= 0 {
            targets.push((Rel::Previous, self.start - self.limit));
        }
        if self.end < self.total {
            targets.push((Rel::Next, self.end + 1));
            targets.push((Rel::Last, self.total - self.limit));
        }

        targets
            .into_iter()
            .map(|(rel, offset)| Link {
                rel,
                offset,
                url: with_offset(request, offset),
            })
            .collect()
    }

    /// `Content-Range` style summary, e.g. `pages 50-104/120`.
    pub fn content_range(&self) -> String {
        let last = self.end.min(self.total - 1);
        if self.total == 0 || self.start > last {
            return format!("pages */{}", self.total);
        }
        format!("pages {}-{}/{}", self.start, last, self.total)
    }
}

fn with_offset(request: &Url, offset: i64) -> Url {
    let offset = offset.to_string();
    let mut replaced = false;
    let pairs: Vec<(String, String)> = request
        .query_pairs()
        .filter_map(|(key, value)| {
            if key != "offset" {
                return Some((key.into_owned(), value.into_owned()));
            }
            if replaced {
                return None;
            }
            replaced = true;
            Some((key.into_owned(), offset.clone()))
        })
        .collect();

    let mut url = request.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear().extend_pairs(&pairs);
        if !replaced {
            query.append_pair("offset", &offset);
        }
    }
    url
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rel {
    First,
    Previous,
    Next,
    Last,
}

impl Rel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rel::First => "first",
            Rel::Previous => "previous",
            Rel::Next => "next",
            Rel::Last => "last",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: Rel,
    pub offset: i64,
    pub url: Url,
}

impl Link {
    pub fn header_value(&self) -> String {
        format!("<{}>; rel=\"{}\"", self.url, self.rel.as_str())
    }
}

/// Join links into a single `Link` header value, `None` when there are none.
pub fn link_header(links: &[Link]) -> Option<String> {
    if links.is_empty() {
        return None;
    }
    Some(
        links
            .iter()
            .map(Link::header_value)
            .collect::<Vec<_>>()
            .join(", "),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator() -> Paginator {
        Paginator::new(&WikiConfig::default())
    }

    fn request(query: &str) -> Url {
        Url::parse(&format!("https://wiki.example.com/pages?{query}")).unwrap()
    }

    fn offsets(links: &[Link]) -> Vec<(Rel, i64)> {
        links.iter().map(|l| (l.rel, l.offset)).collect()
    }

    // -- clamp ---------------------------------------------------------------

    #[test]
    fn clamp_limit_uses_default_and_bounds() {
        assert_eq!(clamp_limit(None, 20, 100), 20);
        assert_eq!(clamp_limit(Some(500), 20, 100), 100);
        assert_eq!(clamp_limit(Some(0), 20, 100), 1);
        assert_eq!(clamp_limit(Some(55), 20, 100), 55);
    }

    #[test]
    fn clamp_offset_floors_at_zero() {
        assert_eq!(clamp_offset(None), 0);
        assert_eq!(clamp_offset(Some(-3)), 0);
        assert_eq!(clamp_offset(Some(7)), 7);
    }

    // -- paginate ------------------------------------------------------------

    #[test]
    fn window_from_offset_and_limit() {
        let window = paginator().paginate(120, Some(50), Some(55));
        assert_eq!(
            window,
            Window {
                start: 50,
                end: 104,
                limit: 55,
                total: 120
            }
        );
    }

    #[test]
    fn huge_offset_saturates_instead_of_overflowing() {
        let window = paginator().paginate(120, Some(i64::MAX), Some(20));
        assert_eq!(window.start, i64::MAX);
        assert_eq!(window.end, i64::MAX);

        let links = window.links(&request("offset=9223372036854775807"));
        assert_eq!(offsets(&links), vec![(Rel::First, 0), (Rel::Previous, i64::MAX - 20)]);
        assert_eq!(window.content_range(), "pages */120");
    }

    #[test]
    fn configured_limits_apply() {
        let config = WikiConfig {
            default_page_limit: 10,
            max_page_limit: 25,
            ..WikiConfig::default()
        };
        let paginator = Paginator::new(&config);
        assert_eq!(paginator.paginate(100, None, None).limit, 10);
        assert_eq!(paginator.paginate(100, None, Some(80)).limit, 25);
    }

    // -- links ---------------------------------------------------------------

    #[test]
    fn middle_window_links() {
        let window = paginator().paginate(120, Some(50), Some(55));
        let links = window.links(&request("q=menu&offset=50&limit=55"));
        assert_eq!(
            offsets(&links),
            vec![(Rel::First, 0), (Rel::Next, 105), (Rel::Last, 65)]
        );
        assert_eq!(
            links[1].url.query(),
            Some("q=menu&offset=105&limit=55")
        );
    }

    #[test]
    fn first_window_has_no_backward_links() {
        let window = paginator().paginate(50, None, Some(20));
        let links = window.links(&request("limit=20"));
        assert_eq!(offsets(&links), vec![(Rel::Next, 20), (Rel::Last, 30)]);
        assert_eq!(links[0].url.query(), Some("limit=20&offset=20"));
    }

    #[test]
    fn previous_requires_a_full_window_behind() {
        let window = paginator().paginate(100, Some(30), Some(20));
        let links = window.links(&request("offset=30"));
        assert!(offsets(&links).contains(&(Rel::Previous, 10)));

        let window = paginator().paginate(100, Some(10), Some(20));
        let links = window.links(&request("offset=10"));
        assert!(!links.iter().any(|l| l.rel == Rel::Previous));
    }

    #[test]
    fn final_window_has_no_forward_links() {
        let window = paginator().paginate(39, Some(20), Some(20));
        let links = window.links(&request("offset=20"));
        assert_eq!(offsets(&links), vec![(Rel::First, 0), (Rel::Previous, 0)]);
    }

    #[test]
    fn exactly_full_final_window_still_links_forward() {
        // `end` is inclusive, so the window ending on the last item is < total.
        let window = paginator().paginate(40, Some(20), Some(20));
        let links = window.links(&request("offset=20"));
        assert_eq!(
            offsets(&links),
            vec![(Rel::First, 0), (Rel::Previous, 0), (Rel::Next, 40), (Rel::Last, 20)]
        );
    }

    #[test]
    fn empty_result_has_no_links() {
        let window = paginator().paginate(0, None, None);
        assert!(window.links(&request("")).is_empty());
        assert_eq!(link_header(&[]), None);
    }

    #[test]
    fn duplicate_offsets_collapse_to_one() {
        let url = with_offset(&request("offset=1&a=b&offset=2"), 9);
        assert_eq!(url.query(), Some("offset=9&a=b"));
    }

    // -- headers -------------------------------------------------------------

    #[test]
    fn link_header_joins_values() {
        let window = paginator().paginate(120, Some(50), Some(55));
        let header = link_header(&window.links(&request("offset=50"))).unwrap();
        assert_eq!(
            header,
            "<https://wiki.example.com/pages?offset=0>; rel=\"first\", \
             <https://wiki.example.com/pages?offset=105>; rel=\"next\", \
             <https://wiki.example.com/pages?offset=65>; rel=\"last\""
        );
    }

    #[test]
    fn content_range_caps_at_total() {
        let paginator = paginator();
        assert_eq!(
            paginator.paginate(120, Some(50), Some(55)).content_range(),
            "pages 50-104/120"
        );
        assert_eq!(
            paginator.paginate(60, Some(50), Some(55)).content_range(),
            "pages 50-59/60"
        );
        assert_eq!(paginator.paginate(0, None, None).content_range(), "pages */0");
    }
}
