//! Application detail queries: localized detail payloads and the supported
//! language list, both served by the same detail document.

use super::{MetaClient, MetaError, config};
use crate::headsets::HEADSETS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailVariables<'a> {
    item_id: &'a str,
    first: u32,
    last: Option<u32>,
    after: Option<&'a str>,
    before: Option<&'a str>,
    forward: bool,
    ordering: Option<&'a str>,
    rating_scores: Option<&'a str>,
    hmd_type: &'a str,
}

impl<'a> DetailVariables<'a> {
    fn for_item(meta_id: &'a str) -> Self {
        Self {
            item_id: meta_id,
            first: 1,
            last: None,
            after: None,
            before: None,
            forward: true,
            ordering: None,
            rating_scores: None,
            hmd_type: HEADSETS[0].code,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailPayload {
    pub display_name: Option<String>,
    pub category_name: Option<String>,
    pub display_long_description: Option<String>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub supported_hmd_platforms: Vec<String>,
    pub publisher_name: Option<String>,
    pub website_url: Option<String>,
    pub website_page_meta: Option<PageMeta>,
    pub current_offer: Option<CurrentOffer>,
    pub quality_rating_aggregate: Option<f64>,
    #[serde(default)]
    pub supported_in_app_languages: Vec<Language>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentOffer {
    pub price: OfferPrice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferPrice {
    pub formatted: String,
    pub currency: String,
    /// Raw minor-unit amount as the API returns it; `"0"` marks a free item.
    pub offset_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Language {
    pub name: String,
}

impl OfferPrice {
    /// Numeric amount recovered from the display string (`"€9.99"`,
    /// `"9,99 €"`, `"$1,299.99"`). Unparseable strings fall back to 0.
    pub fn amount(&self) -> f64 {
        let digits: String = self
            .formatted
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect();
        let normalized = if digits.contains('.') {
            digits.replace(',', "")
        } else {
            digits.replace(',', ".")
        };
        normalized.parse().unwrap_or(0.0)
    }
}

impl MetaClient {
    pub async fn application_detail(
        &self,
        meta_id: &str,
        locale: &str,
    ) -> Result<DetailPayload, MetaError> {
        let variables = DetailVariables::for_item(meta_id);
        self.post_query(Some(config::DETAIL_DOC_ID), locale, &variables)
            .await
    }

    /// The supported-language names of an application, read from a detail
    /// payload fetched under the default locale.
    pub async fn supported_languages(&self, meta_id: &str) -> Result<Vec<String>, MetaError> {
        let payload = self
            .application_detail(meta_id, config::DEFAULT_LOCALE)
            .await?;
        Ok(payload
            .supported_in_app_languages
            .into_iter()
            .map(|language| language.name)
            .collect())
    }
}
