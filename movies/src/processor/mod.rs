pub mod kaggle;
pub mod ratings;
pub mod reconcile;
pub mod udf;
pub mod wiki;

pub use kaggle::MetadataLoader;
pub use ratings::{ExportReport, RatingAggregator, export_ratings, rating_column_name};
pub use reconcile::Reconciler;
pub use udf::register_udfs;
pub use wiki::WikiNormalizer;

use crate::sources;
use common::Result;
use common::config::Settings;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::{DataFrame, SessionConfig};
use std::path::Path;
use tracing::info;

/// Single-partition session with the wiki parsers registered.
pub fn new_session_context() -> Result<SessionContext> {
    let config = SessionConfig::new().with_target_partitions(1);
    let ctx = SessionContext::new_with_config(config);
    register_udfs(&ctx)?;
    Ok(ctx)
}

/// Coordinates the stages that build the movie table.
pub struct MoviesProcessor {
    pub ctx: SessionContext,
    wiki: WikiNormalizer,
    metadata: MetadataLoader,
    reconciler: Reconciler,
    ratings: RatingAggregator,
}

impl MoviesProcessor {
    pub fn new(settings: &Settings) -> Result<Self> {
        let ctx = new_session_context()?;

        Ok(Self {
            wiki: WikiNormalizer::new(ctx.clone(), settings.wiki.min_column_coverage),
            metadata: MetadataLoader::new(ctx.clone()),
            reconciler: Reconciler::new(settings.reconcile.clone()),
            ratings: RatingAggregator::new(ctx.clone()),
            ctx,
        })
    }

    /// Wiki + metadata + rating histogram, ready to be written.
    pub async fn build_movie_table(
        &self,
        wiki_path: &Path,
        metadata_path: &Path,
        ratings_path: &Path,
    ) -> Result<DataFrame> {
        let wiki = self
            .wiki
            .normalize(sources::read_wiki_records(wiki_path)?)
            .await?;
        let metadata = self.metadata.load(metadata_path).await?;
        let movies = self.reconciler.reconcile(wiki, metadata).await?;

        let ratings = self.ratings.load(ratings_path).await?;
        let histogram = self.ratings.pivot(ratings).await?;
        let movies = self.ratings.merge(movies, histogram)?;

        info!("Movie table assembled");
        Ok(movies)
    }
}
