//! Subtitle pipeline: title lookup, cached search, ranking and download.
//!
//! ### Search
//! 1. Resolve the IMDb id to a title (memoized as `imdb.title : <id>`).
//! 2. Build the upstream term: `"{name} ({year})"` for movies,
//!    `"{name} S{season:02}E{episode:02}"` for series.
//! 3. Token + search (memoized as `subdivx.subtitles.v1 : <term>`).
//! 4. Score candidates against the video filename and sort, keeping upstream
//!    order among equal scores.
//!
//! ### Fetch
//! Download and extract the archive, then normalize the text to UTF-8.

use crate::archive::ExtractedFile;
use crate::encoding::{self, DetectedEncoding};
use crate::metadata::{Title, TitleKind, TitleLookup};
use crate::subdivx::{SearchResult, SubdivxClient};
use crate::text;
use crate::validate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use subdx_core::cache::keys;
use subdx_core::{AppConfig, Error, Memoizer};

/// Language tag reported for every result; the upstream is Spanish-only.
pub const SUBTITLE_LANG: &str = "spa";

/// Source of subtitle search results and archives.
#[async_trait::async_trait]
pub trait SubtitleProvider: Send + Sync {
    /// Acquire a session and run one search for `term`.
    async fn search_subtitles(&self, term: &str) -> Result<SearchResult, Error>;

    /// Download and extract one subtitle.
    async fn fetch_subtitle(&self, id: u64) -> Result<ExtractedFile, Error>;
}

#[async_trait::async_trait]
impl SubtitleProvider for SubdivxClient {
    async fn search_subtitles(&self, term: &str) -> Result<SearchResult, Error> {
        let token = self.get_token().await?;
        self.search(&token, term).await
    }

    async fn fetch_subtitle(&self, id: u64) -> Result<ExtractedFile, Error> {
        SubdivxClient::fetch_subtitle(self, id).await
    }
}

/// Cache lifetimes for the two memoized lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub title: Duration,
    pub search: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CacheTtls {
    fn from(config: &AppConfig) -> Self {
        Self { title: config.title_ttl(), search: config.search_ttl() }
    }
}

/// A subtitle search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleQuery {
    pub kind: TitleKind,
    pub imdb_id: String,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    /// Video filename used to rank candidates.
    #[serde(default)]
    pub filename: Option<String>,
}

impl SubtitleQuery {
    pub fn validate(&self) -> Result<(), Error> {
        validate::imdb_id(&self.imdb_id)?;
        if self.kind == TitleKind::Series && (self.season.is_none() || self.episode.is_none()) {
            return Err(Error::InvalidInput("series lookups need both season and episode".to_string()));
        }
        Ok(())
    }

    /// Upstream search term for `title`.
    pub fn search_term(&self, title: &Title) -> String {
        match self.kind {
            TitleKind::Movie => match title.year {
                Some(year) => format!("{} ({year})", title.name),
                None => title.name.clone(),
            },
            TitleKind::Series => format!(
                "{} S{:02}E{:02}",
                title.name,
                self.season.unwrap_or_default(),
                self.episode.unwrap_or_default()
            ),
        }
    }
}

/// Ranked subtitle ids for a query, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedSubtitles {
    /// Search term sent upstream.
    pub term: String,
    pub ids: Vec<u64>,
    /// Score of each id, same order as `ids`.
    pub scores: Vec<usize>,
    pub lang: String,
    pub year: Option<u16>,
    pub total_records: u64,
}

/// A downloaded subtitle, transcoded to UTF-8 when the encoding was recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSubtitle {
    pub name: String,
    pub encoding: DetectedEncoding,
    pub data: Vec<u8>,
}

/// The subtitle pipeline.
#[derive(Clone)]
pub struct SubtitleService {
    memoizer: Memoizer,
    lookup: Arc<dyn TitleLookup>,
    provider: Arc<dyn SubtitleProvider>,
    ttls: CacheTtls,
}

impl SubtitleService {
    pub fn new(
        memoizer: Memoizer, lookup: Arc<dyn TitleLookup>, provider: Arc<dyn SubtitleProvider>, ttls: CacheTtls,
    ) -> Self {
        Self { memoizer, lookup, provider, ttls }
    }

    pub fn memoizer(&self) -> &Memoizer {
        &self.memoizer
    }

    /// Find and rank subtitles for a title.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed query
    /// - `MetadataLookup` if the title cannot be resolved
    /// - upstream errors from the search flow
    /// - cache store errors
    pub async fn find_subtitles(&self, query: &SubtitleQuery) -> Result<RankedSubtitles, Error> {
        query.validate()?;

        let title: Title = self
            .memoizer
            .get_or_compute(&keys::title_key(&query.imdb_id), self.ttls.title, || async {
                self.lookup.get_title(query.kind, &query.imdb_id).await
            })
            .await?;

        let term = query.search_term(&title);

        let result: SearchResult = self
            .memoizer
            .get_or_compute(&keys::search_key(&term), self.ttls.search, || async {
                self.provider.search_subtitles(&term).await
            })
            .await?;

        let filename = query.filename.as_deref().unwrap_or_default();
        let ranked = text::rank(result.candidates, filename, |candidate| candidate.description_tokens.as_slice());

        let ids: Vec<u64> = ranked.iter().map(|r| r.item.id).collect();
        let scores: Vec<usize> = ranked.iter().map(|r| r.score).collect();
        tracing::info!(title = %term, ?ids, ?scores, "found subtitles");

        Ok(RankedSubtitles {
            term,
            ids,
            scores,
            lang: SUBTITLE_LANG.to_string(),
            year: title.year,
            total_records: result.total_records,
        })
    }

    /// Download one subtitle and normalize its text encoding.
    pub async fn fetch_subtitle(&self, id: u64) -> Result<NormalizedSubtitle, Error> {
        if id == 0 {
            return Err(Error::InvalidInput("subtitle id must be positive".to_string()));
        }

        let ExtractedFile { name, data } = self.provider.fetch_subtitle(id).await?;
        let size = data.len();
        let (data, encoding) = tokio::task::spawn_blocking(move || encoding::normalize(data))
            .await
            .map_err(|e| Error::MalformedArchive(format!("normalization task failed: {e}")))?;

        tracing::info!(id, name = %name, encoding = encoding.as_str(), size, "got subtitle");
        Ok(NormalizedSubtitle { name, encoding, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subdivx::SearchCandidate;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use subdx_core::CacheDb;

    struct FakeLookup {
        title: Title,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TitleLookup for FakeLookup {
        async fn get_title(&self, _kind: TitleKind, _imdb_id: &str) -> Result<Title, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.title.clone())
        }
    }

    #[derive(Default)]
    struct FakeProvider {
        candidates: Vec<SearchCandidate>,
        terms: Mutex<Vec<String>>,
        file: Option<ExtractedFile>,
    }

    #[async_trait::async_trait]
    impl SubtitleProvider for FakeProvider {
        async fn search_subtitles(&self, term: &str) -> Result<SearchResult, Error> {
            self.terms.lock().unwrap().push(term.to_string());
            Ok(SearchResult { total_records: self.candidates.len() as u64, candidates: self.candidates.clone() })
        }

        async fn fetch_subtitle(&self, _id: u64) -> Result<ExtractedFile, Error> {
            self.file.clone().ok_or(Error::NoSubtitleInArchive)
        }
    }

    struct FailingLookup;

    #[async_trait::async_trait]
    impl TitleLookup for FailingLookup {
        async fn get_title(&self, _kind: TitleKind, imdb_id: &str) -> Result<Title, Error> {
            Err(Error::MetadataLookup(format!("{imdb_id}: title not found")))
        }
    }

    async fn service(lookup: Arc<dyn TitleLookup>, provider: Arc<FakeProvider>) -> SubtitleService {
        let memoizer = Memoizer::new(CacheDb::open_in_memory().await.unwrap());
        SubtitleService::new(memoizer, lookup, provider, CacheTtls::default())
    }

    fn dark() -> Arc<FakeLookup> {
        Arc::new(FakeLookup { title: Title { name: "Dark".into(), year: Some(2017) }, calls: AtomicUsize::new(0) })
    }

    fn series_query(filename: &str) -> SubtitleQuery {
        SubtitleQuery {
            kind: TitleKind::Series,
            imdb_id: "tt5753856".into(),
            season: Some(1),
            episode: Some(1),
            filename: Some(filename.into()),
        }
    }

    #[test]
    fn test_search_terms() {
        let heat = Title { name: "Heat".into(), year: Some(1995) };
        let movie = SubtitleQuery {
            kind: TitleKind::Movie,
            imdb_id: "tt0113277".into(),
            season: None,
            episode: None,
            filename: None,
        };
        assert_eq!(movie.search_term(&heat), "Heat (1995)");
        assert_eq!(movie.search_term(&Title { name: "Heat".into(), year: None }), "Heat");

        let episode = SubtitleQuery { season: Some(2), episode: Some(10), ..series_query("") };
        assert_eq!(episode.search_term(&heat), "Heat S02E10");
    }

    #[test]
    fn test_query_validation() {
        assert!(series_query("").validate().is_ok());

        let bad_id = SubtitleQuery { imdb_id: "5753856".into(), ..series_query("") };
        assert!(matches!(bad_id.validate(), Err(Error::InvalidInput(_))));

        let no_episode = SubtitleQuery { episode: None, ..series_query("") };
        assert!(matches!(no_episode.validate(), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_find_subtitles_ranks_by_filename() {
        let provider = Arc::new(FakeProvider {
            candidates: vec![
                SearchCandidate::new(1, "Dark", "temporada completa"),
                SearchCandidate::new(2, "Dark S01E01", "Secretos WEB-DL"),
                SearchCandidate::new(3, "Dark S01E01", "HDTV"),
            ],
            ..Default::default()
        });
        let svc = service(dark(), provider.clone()).await;

        let ranked = svc.find_subtitles(&series_query("Dark.S01E01.WEB-DL.mkv")).await.unwrap();

        assert_eq!(ranked.term, "Dark S01E01");
        assert_eq!(ranked.ids, vec![2, 3, 1]);
        assert_eq!(ranked.scores, vec![4, 2, 1]);
        assert_eq!(ranked.lang, "spa");
        assert_eq!(ranked.year, Some(2017));
        assert_eq!(ranked.total_records, 3);
        assert_eq!(*provider.terms.lock().unwrap(), vec!["Dark S01E01".to_string()]);
    }

    #[tokio::test]
    async fn test_find_subtitles_is_memoized() {
        let lookup = dark();
        let provider = Arc::new(FakeProvider {
            candidates: vec![SearchCandidate::new(9, "Dark S01E01", "")],
            ..Default::default()
        });
        let svc = service(lookup.clone(), provider.clone()).await;

        let first = svc.find_subtitles(&series_query("a.mkv")).await.unwrap();
        let second = svc.find_subtitles(&series_query("Dark.S01E01.mkv")).await.unwrap();

        assert_eq!(first.ids, second.ids);
        assert_eq!(second.scores, vec![2]);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.terms.lock().unwrap().len(), 1);

        let db = svc.memoizer().db();
        assert_eq!(db.count_prefix(keys::TITLE_PREFIX).await.unwrap(), 1);
        assert_eq!(db.count_prefix(keys::SEARCH_PREFIX).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_subtitles_without_filename_keeps_upstream_order() {
        let provider = Arc::new(FakeProvider {
            candidates: vec![SearchCandidate::new(5, "Dark", ""), SearchCandidate::new(4, "Dark", "")],
            ..Default::default()
        });
        let mut query = series_query("");
        query.filename = None;
        let ranked = service(dark(), provider).await.find_subtitles(&query).await.unwrap();
        assert_eq!(ranked.ids, vec![5, 4]);
        assert_eq!(ranked.scores, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_cached() {
        let provider = Arc::new(FakeProvider::default());
        let svc = service(Arc::new(FailingLookup), provider.clone()).await;

        let result = svc.find_subtitles(&series_query("x")).await;
        assert!(matches!(result, Err(Error::MetadataLookup(_))));
        assert!(provider.terms.lock().unwrap().is_empty());
        assert_eq!(svc.memoizer().db().count_prefix(keys::TITLE_PREFIX).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_subtitle_normalizes_encoding() {
        let provider = Arc::new(FakeProvider {
            file: Some(ExtractedFile { name: "Dark.S01E01.srt".into(), data: b"\x93Hola\x94 se\xF1or".to_vec() }),
            ..Default::default()
        });
        let svc = service(dark(), provider).await;

        let subtitle = svc.fetch_subtitle(42).await.unwrap();
        assert_eq!(subtitle.name, "Dark.S01E01.srt");
        assert_eq!(subtitle.encoding, DetectedEncoding::Windows1252);
        assert_eq!(String::from_utf8(subtitle.data).unwrap(), "\u{201C}Hola\u{201D} señor");
    }

    #[tokio::test]
    async fn test_fetch_subtitle_errors() {
        let svc = service(dark(), Arc::new(FakeProvider::default())).await;
        assert!(matches!(svc.fetch_subtitle(0).await, Err(Error::InvalidInput(_))));
        assert!(matches!(svc.fetch_subtitle(7).await, Err(Error::NoSubtitleInArchive)));
    }
}
