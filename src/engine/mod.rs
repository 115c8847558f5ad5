//! Extraction engine
//!
//! Drives one run over every configured resource.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Extractor` - Orchestrates a run against the vendor API
//! - `RunContext` - State, finalized tables and counters of one run
//! - `RecordSink` - Writer strategy for typed activity and message pages
//!
//! Resources are processed strictly in order: customers, activities,
//! messages, campaigns, segments. The first failure aborts the run and the
//! caller keeps the previous state.

mod sink;
mod types;

pub use sink::{HeaderScope, RecordSink, SINGLE_ACTIVITY_TABLE};
pub use types::{RunContext, RunOutcome, RunStats};

use crate::client::{CustomerIoClient, CAMPAIGN_COLUMNS};
use crate::config::{ActivitiesConfig, CustomersConfig, ExtractorConfig, MessagesConfig};
use crate::error::{Error, Result};
use crate::output::{write_file_manifest, ResultWriter, TableDefinition, WriterOptions};
use crate::state::ExtractorState;
use crate::types::{ActivityMode, ResourceKind};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs an extraction against one account
pub struct Extractor {
    /// Vendor API client
    client: CustomerIoClient,
    /// Validated configuration
    config: ExtractorConfig,
    /// Output directory for tables and manifests
    tables_dir: PathBuf,
}

impl Extractor {
    /// Create an extractor around an existing client
    pub fn new(
        client: CustomerIoClient,
        config: ExtractorConfig,
        tables_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            client,
            config,
            tables_dir: tables_dir.as_ref().to_path_buf(),
        }
    }

    /// Build the client from the configured credentials
    pub fn from_config(config: ExtractorConfig, tables_dir: impl AsRef<Path>) -> Result<Self> {
        let secret = config
            .api_secret()
            .ok_or_else(|| Error::missing_field("#api_secret"))?;

        let client = CustomerIoClient::from_credentials(
            config.api_version,
            config.site_id(),
            secret,
            config.base_url.as_deref(),
        )?;

        Ok(Self::new(client, config, tables_dir))
    }

    /// Get the API client
    pub fn client(&self) -> &CustomerIoClient {
        &self.client
    }

    /// Get the output directory
    pub fn tables_dir(&self) -> &Path {
        &self.tables_dir
    }

    /// Run every configured resource, starting from `state`
    ///
    /// Returns the state to persist. Tables finalized before a failure stay
    /// on disk.
    pub async fn run(&self, state: ExtractorState) -> Result<RunOutcome> {
        let start = Instant::now();
        let mut ctx = RunContext::new(state);

        if !self.config.has_resources() {
            warn!("No resources configured, nothing to extract");
        }

        if let Some(customers) = self.config.customers() {
            self.extract_customers(customers, &mut ctx).await?;
        }

        if let Some(activities) = self.config.activities() {
            self.extract_activities(activities, &mut ctx).await?;
        }

        if let Some(messages) = self.config.messages() {
            self.extract_messages(messages, &mut ctx).await?;
        }

        if self.config.campaigns {
            self.extract_campaigns(&mut ctx).await?;
        }

        if self.config.segments {
            self.extract_segments(&mut ctx).await?;
        }

        ctx.stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            tables = ctx.stats.tables_written,
            records = ctx.stats.records_written,
            pages = ctx.stats.pages_fetched,
            duration_ms = ctx.stats.duration_ms,
            "Extraction finished"
        );

        Ok(ctx.into_outcome())
    }

    async fn extract_customers(
        &self,
        customers: &CustomersConfig,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let resource = ResourceKind::Customers;
        let destination = self.tables_dir.join(format!("{resource}.csv"));
        info!(path = %destination.display(), "Exporting customers");

        let job = self
            .client
            .export_to_file(
                customers.filters()?,
                resource.as_str(),
                &customers.extra_params(),
                &destination,
            )
            .await?;
        debug!(job_id = %job.id, "Customers export downloaded");

        let table = write_file_manifest(
            &destination,
            &primary_key(resource),
            self.config.incremental_output,
        )?;
        ctx.add_table(table);
        Ok(())
    }

    async fn extract_activities(
        &self,
        activities: &ActivitiesConfig,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let mode = activities.mode();
        let types = activities.distinct_types();
        info!(%mode, types = types.len(), "Extracting activities");

        let mut sink = match mode {
            ActivityMode::SingleTable => {
                RecordSink::single_table(&self.tables_dir, self.config.incremental_output)?
            }
            ActivityMode::ParsedData => RecordSink::per_type(
                &self.tables_dir,
                HeaderScope::Activity,
                self.config.incremental_output,
            ),
        };

        for activity_type in types {
            let mut pages = self.client.get_activities(activity_type, activities.deleted);

            while let Some(page) = pages.try_next().await? {
                ctx.stats.add_page();
                if page.is_empty() {
                    debug!(
                        activity_type = %activity_type,
                        page = page.number,
                        "Skipping empty page"
                    );
                    continue;
                }
                ctx.stats.add_records(page.len());
                sink.accept(activity_type, &page.records, &mut ctx.state)?;
            }

            if let Some(table) = sink.finish_kind(activity_type)? {
                ctx.add_table(table);
            }
        }

        ctx.add_tables(sink.finalize()?);
        Ok(())
    }

    async fn extract_messages(
        &self,
        messages: &MessagesConfig,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let types = messages.distinct_types();
        info!(
            types = types.len(),
            incremental = messages.incremental,
            "Extracting messages"
        );

        let mut sink = RecordSink::per_type(
            &self.tables_dir,
            HeaderScope::Message,
            self.config.incremental_output,
        );

        for message_type in types {
            let start = if messages.incremental {
                ctx.state.message_token(message_type).map(str::to_string)
            } else {
                None
            };
            if let Some(token) = &start {
                debug!(message_type = %message_type, token = %token, "Resuming messages");
            }

            let mut latest = start.clone();
            let mut pages = self.client.get_messages(message_type, start);

            while let Some(page) = pages.try_next().await? {
                ctx.stats.add_page();
                if let Some(next) = &page.next {
                    latest = Some(next.clone());
                }
                if page.is_empty() {
                    continue;
                }
                ctx.stats.add_records(page.len());
                sink.accept(message_type, &page.records, &mut ctx.state)?;
            }

            if let Some(token) = latest {
                ctx.state.set_message_token(message_type, token);
            }

            if let Some(table) = sink.finish_kind(message_type)? {
                ctx.add_table(table);
            }
        }

        ctx.add_tables(sink.finalize()?);
        Ok(())
    }

    async fn extract_campaigns(&self, ctx: &mut RunContext) -> Result<()> {
        let resource = ResourceKind::Campaigns;
        let records = self.client.get_campaigns().await?;
        info!(records = records.len(), "Extracting campaigns");

        let table = TableDefinition::new(resource.as_str(), resource.primary_key().iter().copied())
            .with_columns(CAMPAIGN_COLUMNS);
        let options = WriterOptions::new()
            .fixed()
            .with_incremental(self.config.incremental_output);

        let mut writer = ResultWriter::open(&self.tables_dir, table, options)?;
        writer.write_all(&records, true)?;
        ctx.stats.add_records(records.len());
        ctx.add_table(writer.close()?);
        Ok(())
    }

    async fn extract_segments(&self, ctx: &mut RunContext) -> Result<()> {
        let resource = ResourceKind::Segments;
        let records = self.client.get_segments().await?;
        info!(records = records.len(), "Extracting segments");

        let table = TableDefinition::new(resource.as_str(), resource.primary_key().iter().copied());
        let options = WriterOptions::new().with_incremental(self.config.incremental_output);

        let mut writer = ResultWriter::open(&self.tables_dir, table, options)?;
        writer.write_all(&records, true)?;
        ctx.stats.add_records(records.len());
        ctx.add_table(writer.close()?);
        Ok(())
    }
}

fn primary_key(resource: ResourceKind) -> Vec<String> {
    resource
        .primary_key()
        .iter()
        .map(|key| key.to_string())
        .collect()
}

#[cfg(test)]
mod tests;
