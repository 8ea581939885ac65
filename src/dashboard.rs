//! View loading for the dashboard.
//!
//! Each view issues its independent fetches concurrently, reshapes the
//! responses and renders its charts. A response that lands after the
//! selection moved on is dropped instead of being shown.

use crate::analytics::cities::{CityDistribution, CityNormalizer};
use crate::analytics::demographics::{
    ages_from_results, decompose, genders_from_results, AgeDistribution, GenderDistribution,
};
use crate::analytics::{aggregate, AggregatedInsights, PageGrowth};
use crate::api::fetcher::PAGE_SUMMARY_METRICS;
use crate::api::types::{
    Account, Breakdown, Comment, FeedItem, InstagramProfile, MetricRecord, MetricValue, PageInfo,
};
use crate::api::{ApiError, ApiResult, BreakdownDimension, FailureKind, MetricsFetcher};
use crate::charts::{page, post, ChartBoard};
use crate::config::DemographicsConfig;
use crate::observability::OperationTimer;
use crate::report::{
    AssemblyPhase, DocumentBuilder, ReportAssembler, ReportCard, ReportDocument, ReportError, ReportInput,
    SnapshotCapturer, SnapshotMap,
};
use crate::selection::{Platform, Selection, SelectionTracker, Ticket, SELECTION_PROMPT};
use crate::telemetry::{create_view_span, generate_correlation_id};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, Instrument};

pub const NO_CAPTION: &str = "No caption available";
pub const AGE_GENDER_RECORD: &str = "page_impressions_by_age_gender_unique";
pub const FANS_CITY_RECORD: &str = "page_fans_city";

/// What a view region shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    /// Selection incomplete; nothing was fetched.
    Prompt,
    Loaded(T),
    Empty(String),
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn from_error(error: &ApiError, what: &str) -> Self {
        let message = error.user_message(what);
        match error.kind() {
            FailureKind::NetworkFailure => ViewState::Failed(message),
            FailureKind::NoData => ViewState::Empty(message),
        }
    }

    pub fn from_result(result: ApiResult<T>, what: &str) -> Self {
        match result {
            Ok(value) => ViewState::Loaded(value),
            Err(e) => Self::from_error(&e, what),
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            ViewState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// Text shown instead of content, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ViewState::Prompt => Some(SELECTION_PROMPT),
            ViewState::Empty(message) | ViewState::Failed(message) => Some(message),
            ViewState::Loaded(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewState<U> {
        match self {
            ViewState::Prompt => ViewState::Prompt,
            ViewState::Loaded(value) => ViewState::Loaded(f(value)),
            ViewState::Empty(message) => ViewState::Empty(message),
            ViewState::Failed(message) => ViewState::Failed(message),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Profile {
    Facebook(PageInfo),
    Instagram(InstagramProfile),
}

#[derive(Debug, Clone)]
pub struct Audience {
    pub ages: AgeDistribution,
    pub genders: GenderDistribution,
    pub cities: CityDistribution,
}

#[derive(Debug, Clone)]
pub struct PageOverview {
    pub profile: Profile,
    pub growth: ViewState<PageGrowth>,
    pub audience: ViewState<Audience>,
    pub charts: ChartBoard,
}

#[derive(Debug, Clone)]
pub struct FeedPost {
    pub item: FeedItem,
    pub insights: ViewState<AggregatedInsights>,
}

#[derive(Debug, Clone)]
pub struct FeedView {
    pub posts: Vec<FeedPost>,
    pub charts: ChartBoard,
}

impl FeedView {
    pub fn items(&self) -> Vec<FeedItem> {
        self.posts.iter().map(|post| post.item.clone()).collect()
    }
}

/// Facebook: `Jan 5, 2024 at 14:03`. Instagram: `Jan 5, 2024`.
pub fn display_date(item: &FeedItem, platform: Platform) -> Option<String> {
    let at = item.created_at()?;
    Some(match platform {
        Platform::Facebook => at.format("%b %-d, %Y at %H:%M").to_string(),
        Platform::Instagram => at.format("%b %-d, %Y").to_string(),
    })
}

fn range_title(platform: Platform, selection: &Selection) -> String {
    let name = match platform {
        Platform::Facebook => "Facebook",
        Platform::Instagram => "Instagram",
    };
    format!(
        "{name} Insights {} - {}",
        selection.range.since().format("%b %-d"),
        selection.range.until().format("%b %-d")
    )
}

fn breakdown_of<'a>(
    records: &'a [MetricRecord],
    name: &str,
    pick: impl Fn(&'a MetricRecord) -> Option<&'a MetricValue>,
) -> Option<&'a Breakdown> {
    records
        .iter()
        .find(|record| record.name == name)
        .and_then(pick)
        .and_then(MetricValue::as_breakdown)
}

pub struct Dashboard {
    fetcher: Arc<dyn MetricsFetcher>,
    tracker: Arc<SelectionTracker>,
    cities: CityNormalizer,
    top_cities: usize,
}

impl Dashboard {
    pub fn new(fetcher: Arc<dyn MetricsFetcher>, demographics: &DemographicsConfig) -> Self {
        Self {
            fetcher,
            tracker: Arc::new(SelectionTracker::new()),
            cities: CityNormalizer::new(demographics.city_suffixes.iter().cloned()),
            top_cities: demographics.top_cities,
        }
    }

    pub fn fetcher(&self) -> &Arc<dyn MetricsFetcher> {
        &self.fetcher
    }

    pub fn tracker(&self) -> &SelectionTracker {
        &self.tracker
    }

    /// A report session that follows this dashboard's selection.
    pub fn report_session(&self) -> ReportSession {
        ReportSession::new(Arc::clone(&self.tracker))
    }

    pub async fn load_accounts(&self) -> ViewState<Vec<Account>> {
        ViewState::from_result(self.fetcher.list_accounts().await, "accounts")
    }

    pub async fn load_comments(&self, post_id: &str) -> ViewState<Vec<Comment>> {
        match self.fetcher.fetch_comments(post_id).await {
            Ok(comments) if comments.is_empty() => ViewState::Empty("No comments available.".to_string()),
            result => ViewState::from_result(result, "comments"),
        }
    }

    /// Profile, growth and audience for the selected account.
    ///
    /// Returns `None` when the selection changed while loading.
    pub async fn load_page(&self, selection: Option<&Selection>) -> Option<ViewState<PageOverview>> {
        let Some(selection) = selection else {
            return Some(ViewState::Prompt);
        };
        let ticket = self.tracker.select(selection);
        let span = create_view_span("page", &selection.account_id, &generate_correlation_id());

        async {
            let timer = OperationTimer::new("load_page");
            let overview = match selection.platform {
                Platform::Facebook => self.facebook_page(selection).await,
                Platform::Instagram => self.instagram_page(selection).await,
            };
            timer.finish();

            if !self.tracker.is_current(&ticket) {
                debug!(key = %ticket.key(), "Discarding stale page response");
                return None;
            }
            Some(overview)
        }
        .instrument(span)
        .await
    }

    async fn facebook_page(&self, selection: &Selection) -> ViewState<PageOverview> {
        let id = selection.account_id.as_str();
        let metrics: Vec<String> = PAGE_SUMMARY_METRICS.iter().map(|m| m.to_string()).collect();
        let (info, summary, demographics) = tokio::join!(
            self.fetcher.page_info(id),
            self.fetcher.fetch_page_summary(id, &metrics, &selection.range),
            self.fetcher.fetch_page_demographics(id, &selection.range),
        );

        let info = match info {
            Ok(info) => info,
            Err(e) => return ViewState::from_error(&e, "page info"),
        };
        let growth = ViewState::from_result(summary.map(|records| PageGrowth::from_records(&records)), "insights");
        let audience = ViewState::from_result(
            demographics.and_then(|records| {
                let composite = breakdown_of(&records, AGE_GENDER_RECORD, MetricRecord::first_value);
                let cities = breakdown_of(&records, FANS_CITY_RECORD, MetricRecord::last_value);
                if composite.is_none() && cities.is_none() {
                    return Err(ApiError::no_data(AGE_GENDER_RECORD));
                }
                let (ages, genders) = composite.map(decompose).unwrap_or_default();
                let cities = self
                    .cities
                    .distribution(cities.cloned().map(|b| b.into_entries()).unwrap_or_default());
                Ok(Audience { ages, genders, cities })
            }),
            "audience demographics",
        );

        ViewState::Loaded(self.overview(
            Profile::Facebook(info),
            growth,
            audience,
            &range_title(Platform::Facebook, selection),
        ))
    }

    async fn instagram_page(&self, selection: &Selection) -> ViewState<PageOverview> {
        let id = selection.account_id.as_str();
        let (profile, insights, ages, genders, cities) = tokio::join!(
            self.fetcher.instagram_profile(id),
            self.fetcher.fetch_instagram_insights(id, &selection.range),
            self.fetcher.fetch_instagram_breakdown(id, BreakdownDimension::Age),
            self.fetcher.fetch_instagram_breakdown(id, BreakdownDimension::Gender),
            self.fetcher.fetch_instagram_breakdown(id, BreakdownDimension::City),
        );

        let profile = match profile {
            Ok(profile) => profile,
            Err(e) => return ViewState::from_error(&e, "profile"),
        };
        let growth = ViewState::from_result(insights.map(|records| PageGrowth::from_records(&records)), "insights");
        let audience = match (ages, genders, cities) {
            (Ok(ages), Ok(genders), Ok(cities)) => ViewState::Loaded(Audience {
                ages: ages_from_results(&ages),
                genders: genders_from_results(&genders),
                cities: self.cities.distribution_from_results(&cities),
            }),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => ViewState::from_error(&e, "audience demographics"),
        };

        ViewState::Loaded(self.overview(
            Profile::Instagram(profile),
            growth,
            audience,
            &range_title(Platform::Instagram, selection),
        ))
    }

    fn overview(
        &self,
        profile: Profile,
        growth: ViewState<PageGrowth>,
        audience: ViewState<Audience>,
        title: &str,
    ) -> PageOverview {
        let mut charts = ChartBoard::new();
        if let Some(chart) = growth.loaded().and_then(|g| page::growth_chart(g, title)) {
            charts.insert(chart);
        }
        if let Some(audience) = audience.loaded() {
            let regions = [
                page::age_chart(&audience.ages),
                page::gender_chart(&audience.genders),
                page::cities_chart(&audience.cities, self.top_cities),
            ];
            for region in regions.into_iter().flatten() {
                charts.insert(region);
            }
        }
        PageOverview {
            profile,
            growth,
            audience,
            charts,
        }
    }

    /// Feed items in the selected range with their grouped insights and
    /// charts. Per-post insight requests run concurrently.
    ///
    /// Returns `None` when the selection changed while loading.
    pub async fn load_feed(&self, selection: Option<&Selection>) -> Option<ViewState<FeedView>> {
        let Some(selection) = selection else {
            return Some(ViewState::Prompt);
        };
        let ticket = self.tracker.select(selection);
        let span = create_view_span("feed", &selection.account_id, &generate_correlation_id());

        async {
            let timer = OperationTimer::new("load_feed");
            let items = self
                .fetcher
                .fetch_feed(&selection.account_id, &selection.range, selection.platform)
                .await;
            if !self.tracker.is_current(&ticket) {
                debug!(key = %ticket.key(), "Discarding stale feed response");
                return None;
            }

            let items = match items {
                Ok(items) if items.is_empty() => return Some(ViewState::Empty("No posts available.".to_string())),
                Ok(items) => items,
                Err(e) => return Some(ViewState::from_error(&e, "feed")),
            };

            let insights = join_all(items.iter().map(|item| {
                self.fetcher.fetch_post_insights(
                    &item.id,
                    selection.platform,
                    &selection.account_id,
                    &selection.range,
                )
            }))
            .await;
            if !self.tracker.is_current(&ticket) {
                debug!(key = %ticket.key(), "Discarding stale insight responses");
                return None;
            }

            let mut charts = ChartBoard::new();
            let posts = items
                .into_iter()
                .zip(insights)
                .map(|(item, records)| {
                    let grouped = records.map(|records| aggregate(&records, selection.platform, item.is_video()));
                    let insights = ViewState::from_result(grouped, "insights");
                    if let Some(region) = insights.loaded().and_then(|i| post::post_chart(&item.id, i)) {
                        charts.insert(region);
                    }
                    FeedPost { item, insights }
                })
                .collect();
            timer.finish();

            Some(ViewState::Loaded(FeedView { posts, charts }))
        }
        .instrument(span)
        .await
    }

    /// Report cards for a loaded feed, with media downloaded where possible.
    pub async fn report_cards(&self, feed: &FeedView, platform: Platform) -> Vec<ReportCard> {
        let media = join_all(feed.posts.iter().map(|post| async move {
            let url = post.item.media_ref()?;
            match self.fetcher.fetch_media(url).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    debug!(item_id = %post.item.id, error = %e, "Media not embedded");
                    None
                }
            }
        }))
        .await;

        feed.posts
            .iter()
            .zip(media)
            .map(|(post, media)| {
                ReportCard::from_item(&post.item, platform, post.insights.loaded()).with_media(media)
            })
            .collect()
    }
}

/// Report preparation bound to the selection it was prepared for.
///
/// Once the dashboard moves to another selection the prepared snapshots
/// no longer count: the session reads as `Idle` and refuses to build.
pub struct ReportSession {
    assembler: ReportAssembler,
    tracker: Arc<SelectionTracker>,
    ticket: Option<Ticket>,
}

impl ReportSession {
    pub fn new(tracker: Arc<SelectionTracker>) -> Self {
        Self {
            assembler: ReportAssembler::new(),
            tracker,
            ticket: None,
        }
    }

    fn is_stale(&self) -> bool {
        self.ticket
            .as_ref()
            .is_some_and(|ticket| !self.tracker.is_current(ticket))
    }

    /// Drop snapshots taken for a selection that is no longer current.
    pub fn sync(&mut self) {
        if self.is_stale() {
            if let Some(ticket) = self.ticket.take() {
                debug!(key = %ticket.key(), "Selection changed, dropping report snapshots");
            }
            self.assembler.selection_changed();
        }
    }

    pub fn phase(&self) -> AssemblyPhase {
        if self.is_stale() {
            AssemblyPhase::Idle
        } else {
            self.assembler.phase()
        }
    }

    pub fn assembler(&mut self) -> &ReportAssembler {
        self.sync();
        &self.assembler
    }

    /// Capture snapshots for `feed`. A different selection than last time
    /// first invalidates the previous snapshots.
    pub async fn prepare(
        &mut self,
        selection: &Selection,
        feed: &FeedView,
        capturer: &dyn SnapshotCapturer,
    ) -> Result<&SnapshotMap, ReportError> {
        self.sync();
        let ticket = self.tracker.select(selection);
        if self.ticket.as_ref() != Some(&ticket) {
            self.assembler.selection_changed();
            self.ticket = Some(ticket.clone());
        }
        self.assembler
            .prepare(ticket.key().clone(), &feed.items(), &feed.charts, capturer)
            .await
    }

    pub fn build_document(
        &self,
        input: &ReportInput<'_>,
        builder: &dyn DocumentBuilder,
    ) -> Result<ReportDocument, ReportError> {
        if self.is_stale() {
            return Err(ReportError::NotReady);
        }
        self.assembler.build_document(input, builder)
    }
}
