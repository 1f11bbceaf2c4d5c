//! Reading the request status page.
//!
//! Each request is a table row carrying the request id in its `id` attribute. A finished request
//! links to the download page, a failed one says so in the row.

use scraper::{Html, Selector};

/// Where a request is in the service's queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
    /// Still being prepared.
    Waiting,
    /// Ready to download.
    Ready,
    /// The service gave up on it.
    Failed,
}

/// One row of the status page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestStatus {
    #[allow(missing_docs)]
    pub id: u64,
    #[allow(missing_docs)]
    pub state: RequestState,
}

/// Pull the request rows out of the status page html.
pub fn parse_status_page(html: &str) -> Vec<RequestStatus> {
    let document = Html::parse_document(html);

    let (rows, links) = match (Selector::parse("tr[id]"), Selector::parse("a[href]")) {
        (Ok(rows), Ok(links)) => (rows, links),
        _ => return vec![],
    };

    document
        .select(&rows)
        .filter_map(|row| {
            let id = row.value().attr("id")?.trim().parse().ok()?;

            let ready = row.select(&links).any(|link| {
                let href = link.value().attr("href").unwrap_or_default();
                let text: String = link.text().collect();
                href.contains("download.php") || text.trim().eq_ignore_ascii_case("download")
            });

            let text = row.text().collect::<String>().to_lowercase();
            let state = if ready {
                RequestState::Ready
            } else if text.contains("error") || text.contains("fail") {
                RequestState::Failed
            } else {
                RequestState::Waiting
            };

            Some(RequestStatus { id, state })
        })
        .collect()
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    const PAGE: &str = r#"
<table>
<tr class="bghead"><th>ID</th><th>Status</th></tr>
<tr class="bglist1" id="1234567"><td>0101</td><td><a href="./cont_download.php?id=1234567">Download</a></td></tr>
<tr class="bglist2" id="1234568"><td>0103</td><td>Making</td></tr>
<tr class="bglist1" id="1234569"><td>0103</td><td class="error">Error</td></tr>
</table>
"#;

    #[test]
    fn test_parse_status_page() {
        let rows = parse_status_page(PAGE);

        assert_eq!(
            rows,
            vec![
                RequestStatus {
                    id: 1234567,
                    state: RequestState::Ready
                },
                RequestStatus {
                    id: 1234568,
                    state: RequestState::Waiting
                },
                RequestStatus {
                    id: 1234569,
                    state: RequestState::Failed
                },
            ]
        );
    }

    #[test]
    fn test_attribute_order_and_quotes() {
        let page = r#"
<table>
<tr id='42' class="bglist1"><td>0101</td><td><a class="dl" href='cont_download.php?id=42'>DL</a></td></tr>
<tr data-note="<tr id=7>" class='bglist2' id = "43"><td>0103</td><td>Making</td></tr>
</table>
"#;

        assert_eq!(
            parse_status_page(page),
            vec![
                RequestStatus {
                    id: 42,
                    state: RequestState::Ready
                },
                RequestStatus {
                    id: 43,
                    state: RequestState::Waiting
                },
            ]
        );
    }

    #[test]
    fn test_empty_page() {
        assert!(parse_status_page("<html><body>no requests</body></html>").is_empty());
    }
}
