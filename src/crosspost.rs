//! Drives a single run: fetch every source, work out what's new, post it, and persist watermarks

use std::collections::BTreeSet;

use crate::{
    config::Config,
    delta::{self, Delta},
    reddit::{Destination, Session},
    repost,
    types::FeedItem,
    utils,
    watermark::{WatermarkStore, Watermarks},
    youtube::FeedSource,
};

use anyhow::Context as _;
use smartstring::alias::String as SmallString;

const LOG_TITLE_TRUNCATE_LEN: usize = 80;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub failed_sources: usize,
    pub submitted: usize,
    pub skipped_reposts: usize,
    pub failed_submissions: usize,
}

/// Everything queued up for one destination, in submission order
struct Batch {
    destination: SmallString,
    items: Vec<FeedItem>,
    // The same video can come from more than one source
    queued_ids: BTreeSet<SmallString>,
}

impl Batch {
    fn new(destination: SmallString) -> Self {
        Self {
            destination,
            items: Vec::new(),
            queued_ids: BTreeSet::new(),
        }
    }

    fn push(&mut self, item: &FeedItem) {
        if self.queued_ids.insert(item.id.clone()) {
            self.items.push(item.clone());
        } else {
            tracing::debug!(
                destination = %self.destination,
                item = %item.id,
                "Item already queued from another source"
            );
        }
    }
}

pub struct CrossPoster<'a, S, D> {
    config: &'a Config,
    source: &'a S,
    destination: &'a D,
    store: &'a WatermarkStore,
    dry_run: bool,
}

impl<'a, S, D> CrossPoster<'a, S, D>
where
    S: FeedSource,
    D: Destination,
{
    pub fn new(
        config: &'a Config,
        source: &'a S,
        destination: &'a D,
        store: &'a WatermarkStore,
    ) -> Self {
        Self {
            config,
            source,
            destination,
            store,
            dry_run: false,
        }
    }

    /// Log what would get posted without logging in, posting, or saving anything
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs a single pass starting from `watermarks`
    ///
    /// Only configuration and authentication problems are errors. Everything else gets logged and
    /// skipped, and the updated watermarks are saved exactly once at the end
    pub fn run(&self, mut watermarks: Watermarks) -> anyhow::Result<Report> {
        let mut report = Report::default();
        let loaded = watermarks.clone();

        let batches = self.collect_batches(&mut watermarks, &mut report);
        let num_pending: usize = batches.iter().map(|batch| batch.items.len()).sum();

        if num_pending == 0 {
            tracing::info!("No new items to post");
            if !self.dry_run && watermarks != loaded {
                self.store.save(&watermarks)?;
            }
            return Ok(report);
        }

        if self.dry_run {
            for Batch {
                destination, items, ..
            } in &batches
            {
                for item in items {
                    tracing::info!(
                        %destination,
                        item = %item.id,
                        title = %utils::truncate_str(&item.title, LOG_TITLE_TRUNCATE_LEN),
                        "Would submit"
                    );
                }
            }
            return Ok(report);
        }

        tracing::info!(num_pending, "Authenticating with destination");
        let session = self
            .destination
            .authenticate()
            .context("Failed authenticating with destination")?;

        for batch in &batches {
            self.submit_batch(&session, batch, &mut report);
        }

        self.store.save(&watermarks)?;
        Ok(report)
    }

    /// Fetches every source and queues its new items onto the batch for each of its destinations
    fn collect_batches(&self, watermarks: &mut Watermarks, report: &mut Report) -> Vec<Batch> {
        let mut batches: Vec<Batch> = Vec::new();

        for mapping in self.config.mappings.iter() {
            let source = mapping.source.as_str();
            let previous = watermarks.get(source).cloned().unwrap_or_default();

            let fetch = match self
                .source
                .fetch(source, previous.change_token.as_deref())
            {
                Ok(fetch) => Some(fetch),
                Err(err) => {
                    tracing::warn!(source, error = %err, "Failed fetching source, skipping it this run");
                    report.failed_sources += 1;
                    None
                }
            };

            let Delta {
                new_items,
                watermark,
            } = delta::compute_delta(source, &previous, fetch);
            watermarks.insert(mapping.source.clone(), watermark);

            if new_items.is_empty() {
                continue;
            }
            for destination in &mapping.destinations {
                let idx = match batches.iter().position(|b| b.destination == *destination) {
                    Some(idx) => idx,
                    None => {
                        batches.push(Batch::new(destination.clone()));
                        batches.len() - 1
                    }
                };
                for item in &new_items {
                    batches[idx].push(item);
                }
            }
        }

        batches
    }

    fn submit_batch(&self, session: &D::Session, batch: &Batch, report: &mut Report) {
        let destination = batch.destination.as_str();
        if batch.items.is_empty() {
            return;
        }

        let community = match session.resolve(destination) {
            Ok(community) => community,
            Err(err) => {
                tracing::error!(destination, error = %err, "Failed resolving destination, skipping its items");
                report.failed_submissions += batch.items.len();
                return;
            }
        };

        let recent = if self.config.repost_protection {
            match session.recent_entries(&community) {
                Ok(recent) => recent,
                Err(err) => {
                    tracing::warn!(destination, error = %err, "Failed listing recent posts, submitting without repost checks");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        for item in &batch.items {
            let title = utils::truncate_str(&item.title, LOG_TITLE_TRUNCATE_LEN);

            if repost::is_probable_duplicate(item, &recent) {
                tracing::info!(destination, item = %item.id, %title, "Already posted by someone else, skipping");
                report.skipped_reposts += 1;
                continue;
            }

            tracing::info!(destination, item = %item.id, %title, "Submitting");
            match session.submit(&community, &item.title, &item.url) {
                Ok(()) => report.submitted += 1,
                Err(err) => {
                    tracing::warn!(destination, item = %item.id, error = %err, "Submission failed");
                    report.failed_submissions += 1;
                }
            }
        }
    }
}
