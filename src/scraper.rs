//! Catalog synchronization engine.
//!
//! Drives the store sections one at a time: resolves the per-section item
//! count through a calendar-day cache, pages through each section's listing
//! while suppressing ids already persisted or already collected this run,
//! then enriches entries that have no detail record yet, locale by locale,
//! rolling back entries the detail payload reveals to be unpriced.

use crate::headsets::{self, HEADSETS, Headset};
use crate::meta::MetaError;
use crate::meta::catalog::ListingPage;
use crate::meta::detail::DetailPayload;
use crate::models::{
    Application, ApplicationDetail, ApplicationRow, DatabaseInfos, DetailOutcome, DetailRef,
    HeadsetCountRow, ImageOutcome, OverviewOutcome,
};
use crate::supabase::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{info, warn};

pub const APPLICATIONS_TABLE: &str = "Applications";
pub const APPLICATION_DETAILS_TABLE: &str = "ApplicationDetails";
pub const HEADSET_COUNTS_TABLE: &str = "MetaHeadsetsApps";
pub const IMAGES_BUCKET: &str = "ApplicationsImages";

/// Language names accepted for detail records, with their locale codes.
/// Anything a store page supports beyond this table is dropped.
pub const LOCALE_MATCHING: [(&str, &str); 2] = [("English", "en_US"), ("French (France)", "fr_FR")];

/// Read access to the remote store catalog.
#[async_trait]
pub trait CatalogSource {
    async fn applications_count(&self, headset: &Headset) -> Result<u64, MetaError>;
    async fn applications_page(
        &self,
        headset: &Headset,
        page_size: u64,
        cursor: Option<&str>,
    ) -> Result<ListingPage, MetaError>;
    async fn supported_languages(&self, meta_id: &str) -> Result<Vec<String>, MetaError>;
    async fn application_detail(
        &self,
        meta_id: &str,
        locale: &str,
    ) -> Result<DetailPayload, MetaError>;
    async fn cover_image(&self, uri: &str) -> Result<Vec<u8>, MetaError>;
}

/// Record and blob access to the persistent store, addressed by entity name.
#[async_trait]
pub trait RecordStore {
    async fn create_record(&self, entity: &str, fields: &Value) -> Result<(), StoreError>;
    async fn list_records(&self, entity: &str, select: &str) -> Result<Vec<Value>, StoreError>;
    async fn count_records(&self, entity: &str) -> Result<u64, StoreError>;
    async fn update_record(&self, entity: &str, id: i64, fields: &Value) -> Result<(), StoreError>;
    async fn record_by_field(
        &self,
        entity: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>, StoreError>;
    async fn delete_record(&self, entity: &str, id: i64) -> Result<(), StoreError>;
    async fn list_blobs(&self, bucket: &str) -> Result<Vec<String>, StoreError>;
    async fn upload_blob(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError>;
    async fn delete_blob(&self, bucket: &str, name: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("store request failed: {0}")]
    Store(#[from] StoreError),
    #[error("catalog request failed: {0}")]
    Source(#[from] MetaError),
    #[error("invalid store row: {0}")]
    Row(#[from] serde_json::Error),
}

#[derive(Clone, Copy)]
pub struct ScraperConfig {
    pub headsets: &'static [Headset],
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headsets: &HEADSETS,
        }
    }
}

pub struct Scraper<C, S> {
    source: C,
    store: S,
    config: ScraperConfig,
}

impl<C, S> Scraper<C, S>
where
    C: CatalogSource,
    S: RecordStore,
{
    pub fn new(source: C, store: S) -> Self {
        Self::with_config(source, store, ScraperConfig::default())
    }

    pub fn with_config(source: C, store: S, config: ScraperConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub async fn database_infos(&self) -> Result<DatabaseInfos, ScrapeError> {
        let rows = self.store.list_records(APPLICATIONS_TABLE, "meta_id").await?;
        let application_meta_ids = rows
            .iter()
            .filter_map(|row| row.get("meta_id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        Ok(DatabaseInfos {
            application_meta_ids,
            applications: self.store.count_records(APPLICATIONS_TABLE).await?,
            application_details: self.store.count_records(APPLICATION_DETAILS_TABLE).await?,
            application_images: self.store.list_blobs(IMAGES_BUCKET).await?.len(),
        })
    }

    /// Per-headset store counts, served from the calendar-day cache.
    pub async fn store_infos(&self) -> Result<Vec<(String, u64)>, ScrapeError> {
        let mut counts = Vec::new();
        for headset in self.config.headsets {
            match self.count_for_headset(headset, false).await {
                Ok(count) => counts.push((headset.name.to_string(), count)),
                Err(err) => {
                    warn!(target = "scraper.counts", headset = headset.name, error = %err, "count lookup failed");
                }
            }
        }
        Ok(counts)
    }

    /// The application count for one headset. Cached counts refreshed on a
    /// previous UTC calendar day (or missing, or with `force`) trigger one
    /// live query and one cache write-back.
    pub async fn count_for_headset(
        &self,
        headset: &Headset,
        force: bool,
    ) -> Result<u64, ScrapeError> {
        let cached = self
            .store
            .record_by_field(HEADSET_COUNTS_TABLE, "headset", headset.code)
            .await?;
        let cached: Option<HeadsetCountRow> = match cached {
            Some(row) => Some(serde_json::from_value(row)?),
            None => None,
        };
        if let Some(row) = &cached {
            if !force && same_utc_day(row.updated_at, Utc::now()) {
                return Ok(row.count);
            }
        }

        let count = self.source.applications_count(headset).await?;
        let write = match &cached {
            Some(row) => {
                let fields = json!({ "count": count, "updated_at": Utc::now() });
                self.store
                    .update_record(HEADSET_COUNTS_TABLE, row.id, &fields)
                    .await
            }
            None => {
                let fields =
                    json!({ "headset": headset.code, "count": count, "updated_at": Utc::now() });
                self.store.create_record(HEADSET_COUNTS_TABLE, &fields).await
            }
        };
        if let Err(err) = write {
            warn!(target = "scraper.counts", headset = headset.name, error = %err, "count cache write failed");
        }
        Ok(count)
    }

    /// Force-refreshes every cached headset count.
    pub async fn update_headset_counts(&self) -> Result<Vec<(String, u64)>, ScrapeError> {
        let mut counts = Vec::new();
        for headset in self.config.headsets {
            match self.count_for_headset(headset, true).await {
                Ok(count) => counts.push((headset.name.to_string(), count)),
                Err(err) => {
                    warn!(target = "scraper.counts", headset = headset.name, error = %err, "count refresh failed");
                }
            }
        }
        Ok(counts)
    }

    /// Pages through every headset section and persists entries the store
    /// has not seen before.
    pub async fn scrape_applications(&self) -> Result<OverviewOutcome, ScrapeError> {
        let infos = self.database_infos().await?;
        info!(
            target = "scraper.overview",
            applications = infos.applications,
            details = infos.application_details,
            images = infos.application_images,
            "database state"
        );

        let known_ids: HashSet<String> = infos.application_meta_ids.iter().cloned().collect();
        let mut collected: BTreeMap<&'static str, Vec<Application>> = BTreeMap::new();

        for headset in self.config.headsets {
            let target = match self.count_for_headset(headset, false).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(target = "scraper.overview", headset = headset.name, error = %err, "count lookup failed, skipping section");
                    continue;
                }
            };
            info!(
                target = "scraper.overview",
                headset = headset.name,
                total = target,
                "syncing section"
            );
            self.collect_applications(headset, target, &known_ids, &mut collected)
                .await;
        }

        let mut retrieved = Vec::new();
        let mut new_entries = Vec::new();
        for headset in self.config.headsets {
            let entries = collected.remove(headset.code).unwrap_or_default();
            retrieved.push((headset.name.to_string(), entries.len()));
            new_entries.extend(entries);
        }

        let attempted = new_entries.len();
        let mut created = 0usize;
        for application in &new_entries {
            let fields = serde_json::to_value(application)?;
            match self.store.create_record(APPLICATIONS_TABLE, &fields).await {
                Ok(()) => {
                    created += 1;
                    info!(target = "scraper.overview", application = %application.display_name, "application created");
                }
                Err(err) => {
                    warn!(target = "scraper.overview", application = %application.display_name, error = %err, "application insert failed");
                }
            }
        }
        Ok(OverviewOutcome {
            retrieved,
            attempted,
            created,
        })
    }

    /// The cursor loop for one section. Stops on exhaustion, on a terminal
    /// page, or once collected entries plus suppressed duplicates reach
    /// `target`. Page errors end the section early with what it has.
    async fn collect_applications(
        &self,
        headset: &Headset,
        target: u64,
        known_ids: &HashSet<String>,
        collected: &mut BTreeMap<&'static str, Vec<Application>>,
    ) {
        collected.entry(headset.code).or_default();
        let mut cursor: Option<String> = None;
        let mut has_next_page = true;
        let mut duplicates: u64 = 0;
        let mut kept: u64 = 0;

        while (kept + duplicates) < target && has_next_page {
            let page = match self
                .source
                .applications_page(headset, target, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(target = "scraper.overview", headset = headset.name, error = %err, "page fetch failed, keeping partial results");
                    break;
                }
            };
            has_next_page = page.has_next_page;
            cursor = page.end_cursor;

            for item in page.items {
                if kept + duplicates >= target {
                    break;
                }
                if is_duplicate(&item.id, known_ids, collected) {
                    duplicates += 1;
                    continue;
                }
                kept += 1;
                collected
                    .entry(headset.code)
                    .or_default()
                    .push(Application {
                        meta_id: item.id,
                        display_name: item.display_name,
                        image_uri: item.cover_square_image.uri,
                    });
            }
            info!(
                target = "scraper.overview",
                headset = headset.name,
                retrieved = kept,
                duplicates = duplicates,
                total = target,
                "section progress"
            );
        }
    }

    /// Fetches and persists detail records for every application that has
    /// none yet, one allow-listed locale at a time.
    pub async fn scrape_application_details(&self) -> Result<DetailOutcome, ScrapeError> {
        let rows = self.store.list_records(APPLICATIONS_TABLE, "*").await?;
        let applications: Vec<ApplicationRow> = serde_json::from_value(Value::Array(rows))?;
        let detail_rows = self
            .store
            .list_records(APPLICATION_DETAILS_TABLE, "app")
            .await?;
        let detail_refs: Vec<DetailRef> = serde_json::from_value(Value::Array(detail_rows))?;
        let enriched: HashSet<i64> = detail_refs.iter().map(|detail| detail.app).collect();
        let to_process: Vec<&ApplicationRow> = applications
            .iter()
            .filter(|app| !enriched.contains(&app.id))
            .collect();
        info!(
            target = "scraper.details",
            candidates = to_process.len(),
            "scraping application details"
        );

        let mut created = 0usize;
        for app in &to_process {
            let locales = match self.allowed_locales(&app.meta_id).await {
                Ok(locales) => locales,
                Err(err) => {
                    warn!(target = "scraper.details", application = %app.display_name, error = %err, "locale lookup failed");
                    continue;
                }
            };
            for locale in locales {
                let payload = match self.source.application_detail(&app.meta_id, &locale).await {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(target = "scraper.details", application = %app.display_name, locale = %locale, error = %err, "detail fetch failed");
                        continue;
                    }
                };
                if !self.validate_detail(app, &payload).await {
                    break;
                }
                let fields = serde_json::to_value(detail_record(app.id, &locale, &payload))?;
                match self
                    .store
                    .create_record(APPLICATION_DETAILS_TABLE, &fields)
                    .await
                {
                    Ok(()) => {
                        created += 1;
                        info!(target = "scraper.details", application = %app.display_name, locale = %locale, "detail created");
                    }
                    Err(err) => {
                        warn!(target = "scraper.details", application = %app.display_name, locale = %locale, error = %err, "detail insert failed");
                    }
                }
            }
        }
        Ok(DetailOutcome {
            candidates: to_process.len(),
            created,
        })
    }

    /// Supported locales of an application, reduced to the allow-list. The
    /// supported-language order is preserved.
    async fn allowed_locales(&self, meta_id: &str) -> Result<Vec<String>, MetaError> {
        let supported = self.source.supported_languages(meta_id).await?;
        Ok(supported
            .iter()
            .filter_map(|name| {
                LOCALE_MATCHING
                    .iter()
                    .find(|(language, _)| *language == name.as_str())
                    .map(|(_, locale)| locale.to_string())
            })
            .collect())
    }

    /// The rollback gate: an application whose detail carries no offer, or a
    /// zero raw amount, is deleted together with its stored cover image.
    async fn validate_detail(&self, app: &ApplicationRow, payload: &DetailPayload) -> bool {
        let priced = payload
            .current_offer
            .as_ref()
            .map(|offer| offer.price.offset_amount != "0")
            .unwrap_or(false);
        if priced {
            return true;
        }
        info!(target = "scraper.details", application = %app.display_name, "no commercial offer, rolling back entry");
        if let Err(err) = self.store.delete_record(APPLICATIONS_TABLE, app.id).await {
            warn!(target = "scraper.details", application = %app.display_name, error = %err, "application delete failed");
        }
        let image = format!("{}.jpg", app.meta_id);
        if let Err(err) = self.store.delete_blob(IMAGES_BUCKET, &image).await {
            warn!(target = "scraper.details", image = %image, error = %err, "image delete failed");
        }
        false
    }

    /// Downloads and uploads cover images absent from the bucket.
    pub async fn scrape_application_images(&self) -> Result<ImageOutcome, ScrapeError> {
        let rows = self.store.list_records(APPLICATIONS_TABLE, "*").await?;
        let applications: Vec<ApplicationRow> = serde_json::from_value(Value::Array(rows))?;
        let existing: HashSet<String> = self
            .store
            .list_blobs(IMAGES_BUCKET)
            .await?
            .into_iter()
            .collect();
        let missing: Vec<&ApplicationRow> = applications
            .iter()
            .filter(|app| !existing.contains(&format!("{}.jpg", app.meta_id)))
            .collect();
        info!(
            target = "scraper.images",
            missing = missing.len(),
            "transferring cover images"
        );

        let mut uploaded = 0usize;
        for app in &missing {
            let name = format!("{}.jpg", app.meta_id);
            let bytes = match self.source.cover_image(&app.image_uri).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(target = "scraper.images", image = %name, error = %err, "image download failed");
                    continue;
                }
            };
            match self.store.upload_blob(IMAGES_BUCKET, &name, bytes).await {
                Ok(()) => {
                    uploaded += 1;
                    info!(target = "scraper.images", image = %name, "image uploaded");
                }
                Err(err) => {
                    warn!(target = "scraper.images", image = %name, error = %err, "image upload failed");
                }
            }
        }
        Ok(ImageOutcome {
            missing: missing.len(),
            uploaded,
        })
    }

    /// Overviews, then details, then images, strictly in that order.
    pub async fn scrape_all(
        &self,
    ) -> Result<(OverviewOutcome, DetailOutcome, ImageOutcome), ScrapeError> {
        let overview = self.scrape_applications().await?;
        let details = self.scrape_application_details().await?;
        let images = self.scrape_application_images().await?;
        Ok((overview, details, images))
    }
}

fn is_duplicate(
    meta_id: &str,
    known_ids: &HashSet<String>,
    collected: &BTreeMap<&'static str, Vec<Application>>,
) -> bool {
    known_ids.contains(meta_id)
        || collected
            .values()
            .any(|apps| apps.iter().any(|app| app.meta_id == meta_id))
}

fn same_utc_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

fn detail_record(app_id: i64, locale: &str, payload: &DetailPayload) -> ApplicationDetail {
    ApplicationDetail {
        app: app_id,
        locale: locale.to_string(),
        category: payload.category_name.clone(),
        description: payload.display_long_description.clone(),
        display_name: payload.display_name.clone(),
        genres: payload.genre_names.clone(),
        headset_names: headsets::names_for_codes(&payload.supported_hmd_platforms),
        publisher: payload.publisher_name.clone(),
        website_url: payload.website_url.clone(),
        oculus_url: payload
            .website_page_meta
            .as_ref()
            .and_then(|meta| meta.page_url.clone()),
        price: payload
            .current_offer
            .as_ref()
            .map(|offer| offer.price.amount())
            .unwrap_or(0.0),
        currency: payload
            .current_offer
            .as_ref()
            .map(|offer| offer.price.currency.clone())
            .unwrap_or_default(),
        rating: payload.quality_rating_aggregate.unwrap_or(0.0),
    }
}
