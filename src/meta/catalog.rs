//! Section listing queries: one page of applications, or the section count.

use super::{MetaClient, MetaError, config};
use crate::headsets::Headset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingVariables<'a> {
    section_id: &'a str,
    sort_order: &'a str,
    section_item_count: u64,
    section_cursor: Option<&'a str>,
    hmd_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct SectionNode {
    all_items: Option<AllItems>,
}

#[derive(Debug, Deserialize)]
struct AllItems {
    count: Option<u64>,
    #[serde(default)]
    edges: Vec<Edge>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: ListingItem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingItem {
    pub id: String,
    pub display_name: String,
    pub cover_square_image: CoverImage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoverImage {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

/// One decoded listing page.
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// Section-wide item count; the count query reads this off a 1-item page.
    pub total: Option<u64>,
    pub items: Vec<ListingItem>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl MetaClient {
    pub async fn applications_page(
        &self,
        headset: &Headset,
        page_size: u64,
        cursor: Option<&str>,
    ) -> Result<ListingPage, MetaError> {
        let variables = ListingVariables {
            section_id: headset.id,
            sort_order: config::DEFAULT_SORT_ORDER,
            section_item_count: page_size,
            section_cursor: cursor,
            hmd_type: headset.code,
        };
        let node: SectionNode = self
            .post_query(None, config::DEFAULT_LOCALE, &variables)
            .await?;
        let all_items = node.all_items.ok_or(MetaError::Missing("all_items"))?;
        Ok(ListingPage {
            total: all_items.count,
            items: all_items.edges.into_iter().map(|edge| edge.node).collect(),
            end_cursor: all_items.page_info.end_cursor,
            has_next_page: all_items.page_info.has_next_page,
        })
    }

    pub async fn applications_count(&self, headset: &Headset) -> Result<u64, MetaError> {
        let page = self.applications_page(headset, 1, None).await?;
        page.total.ok_or(MetaError::Missing("all_items.count"))
    }
}
