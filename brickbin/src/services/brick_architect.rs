//! BrickArchitect taxonomy and image client
//!
//! For each part, the part page's breadcrumb navigation gives the ordered
//! taxonomy path, and a companion PNG gives the sorting-sheet image. Only the
//! breadcrumb contract is relied upon; the rest of the page is ignored.
//!
//! Fetch failures never fail the pipeline: a part without breadcrumbs falls
//! back to the root term alone, a part without an image stays imageless until
//! the daily refresher retries it.

use crate::types::ROOT_CATEGORY;
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

const BRICK_ARCHITECT_BASE_URL: &str = "https://brickarchitect.com";
const USER_AGENT: &str = concat!("brickbin/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Breadcrumb title the catalog uses for its root category
const GUIDE_TITLE: &str = "The LEGO Parts Guide";

/// Everything fetched for one part.
#[derive(Debug, Clone)]
pub struct PartInfo {
    /// The id as queried — the working-set join key
    pub design_id: i64,
    /// The id the catalog resolved the query to; cache key. Differs from
    /// `design_id` when the catalog redirects to a canonical mold.
    pub resolved_id: i64,
    /// Ordered taxonomy path, root-most first, never empty
    pub labels: Vec<String>,
    /// Base64 PNG, None if the fetch failed
    pub image: Option<String>,
}

/// BrickArchitect HTTP client
pub struct BrickArchitectClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BrickArchitectClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BRICK_ARCHITECT_BASE_URL)
    }

    /// Client against an alternate endpoint, for tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| crate::Error::RemoteLookup(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    /// Fetch taxonomy breadcrumbs and image for one part. Infallible by
    /// design: every failure path degrades to the documented fallback.
    pub async fn fetch_part(&self, design_id: i64) -> PartInfo {
        let (resolved_id, labels) = self.part_labels(design_id).await;
        let image = self.part_image(resolved_id).await;
        PartInfo {
            design_id,
            resolved_id,
            labels,
            image,
        }
    }

    /// Fetch the breadcrumb path for a part, following the catalog's redirect
    /// to the canonical id. Returns the root term alone when the page or its
    /// breadcrumbs cannot be fetched.
    pub async fn part_labels(&self, design_id: i64) -> (i64, Vec<String>) {
        let url = format!("{}/parts/{}", self.base_url, design_id);
        debug!(design_id, url = %url, "Fetching part taxonomy");

        let fallback = (design_id, vec![ROOT_CATEGORY.to_string()]);

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch labels for part {}: {}", design_id, e);
                return fallback;
            }
        };
        if !response.status().is_success() {
            warn!(
                "Failed to fetch labels for part {}: HTTP {}",
                design_id,
                response.status().as_u16()
            );
            return fallback;
        }

        let resolved_id = trailing_path_id(response.url().path());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read part page for {}: {}", design_id, e);
                return fallback;
            }
        };

        let labels = extract_breadcrumbs(&body);
        if labels.is_empty() {
            warn!("No breadcrumbs found for part {}", design_id);
            return fallback;
        }

        // The canonical-id rewrite only applies when the page actually
        // carried metadata for the redirect target.
        (resolved_id.unwrap_or(design_id), labels)
    }

    /// Fetch the part image, base64-encoded. None on any failure.
    pub async fn part_image(&self, design_id: i64) -> Option<String> {
        let url = format!("{}/content/parts/{}.png", self.base_url, design_id);
        debug!(design_id, url = %url, "Fetching part image");

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch image for part {}: {}", design_id, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(
                "Failed to fetch image for part {}: HTTP {}",
                design_id,
                response.status().as_u16()
            );
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => Some(STANDARD.encode(bytes)),
            Err(e) => {
                warn!("Failed to read image for part {}: {}", design_id, e);
                None
            }
        }
    }
}

/// Extract the ordered category list from the part page's breadcrumb
/// navigation, rewriting the guide title to the root term.
fn extract_breadcrumbs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div.chapternav a").expect("valid breadcrumb selector");

    let mut labels: Vec<String> = document
        .select(&selector)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|label| !label.is_empty())
        .collect();

    if labels.first().map(String::as_str) == Some(GUIDE_TITLE) {
        labels[0] = ROOT_CATEGORY.to_string();
    }
    labels
}

/// Numeric id at the end of a redirect target path, e.g. "/parts/3001".
fn trailing_path_id(path: &str) -> Option<i64> {
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART_PAGE: &str = r#"
        <html><body>
        <div class="chapternav">
            <a href="/">The LEGO Parts Guide</a>
            <a href="/parts/category-2">2. Technic</a>
            <a href="/parts/category-2-3">Gears</a>
        </div>
        <div class="content">Part 3001</div>
        </body></html>
    "#;

    #[test]
    fn breadcrumbs_are_ordered_and_root_rewritten() {
        let labels = extract_breadcrumbs(PART_PAGE);
        assert_eq!(labels, vec!["Lego", "2. Technic", "Gears"]);
    }

    #[test]
    fn missing_breadcrumb_nav_yields_no_labels() {
        let labels = extract_breadcrumbs("<html><body><p>404</p></body></html>");
        assert!(labels.is_empty());
    }

    #[test]
    fn trailing_path_id_reads_redirect_target() {
        assert_eq!(trailing_path_id("/parts/3001"), Some(3001));
        assert_eq!(trailing_path_id("/parts/3001/"), Some(3001));
        assert_eq!(trailing_path_id("/parts/3001b"), Some(3001));
        assert_eq!(trailing_path_id("/parts/unknown"), None);
    }

    #[tokio::test]
    async fn unreachable_service_falls_back_to_root_label() {
        let client = BrickArchitectClient::with_base_url("http://127.0.0.1:1").unwrap();
        let info = client.fetch_part(3001).await;
        assert_eq!(info.design_id, 3001);
        assert_eq!(info.resolved_id, 3001);
        assert_eq!(info.labels, vec![ROOT_CATEGORY.to_string()]);
        assert_eq!(info.image, None);
    }
}
