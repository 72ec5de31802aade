//! Composition root (C1-C11 wiring). `AppState` is the single object
//! every handler receives; building it is the only place the process
//! assembles its dependency graph.

use crate::clients::{load_initial_capture, AsrEngine, AudioFetcher, LlmSummarizer};
use crate::jobs::JobManager;
use crate::merge::MergeEngine;
use crate::pipelines::xiaohongshu::XiaohongshuFetcher;
use crate::pipelines::{BilibiliPipeline, XiaohongshuPipeline};
use midas_config::ConfigHandle;
use midas_db::{DedupeStore, MergeStore, MidasDb, NoteStore};
use midas_models::MidasError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigHandle>,
    pub db: MidasDb,
    pub notes: Arc<NoteStore>,
    pub dedupe: Arc<DedupeStore>,
    pub merge_store: Arc<MergeStore>,
    pub jobs: Arc<JobManager>,
    pub bilibili_pipeline: Arc<BilibiliPipeline>,
    pub xiaohongshu_pipeline: Arc<XiaohongshuPipeline>,
    pub xiaohongshu_fetcher: Arc<XiaohongshuFetcher>,
    pub merge_engine: Arc<MergeEngine>,
}

impl AppState {
    /// Loads config, opens the database, and constructs every
    /// component in dependency order. Failure here is fatal at startup
    /// (spec §4.2).
    pub async fn bootstrap(config_path: impl AsRef<Path>) -> Result<Self, MidasError> {
        let config = Arc::new(ConfigHandle::load(config_path)?);
        let tree = config.get();

        let db_path = config.resolve_path(&tree.storage.database_path);
        let db = MidasDb::open(&db_path).await.map_err(MidasError::from)?;
        info!(path = %db_path.display(), "midas database ready");

        let backup_dir = config.resolve_path(&tree.storage.backup_dir);
        let notes = Arc::new(NoteStore::new(db.clone(), backup_dir));
        let dedupe = Arc::new(DedupeStore::new(db.clone()));
        let merge_store = Arc::new(MergeStore::new(db.clone()));

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| MidasError::internal(format!("cannot build http client: {e}")))?;

        let scratch_dir = config.resolve_path(&tree.storage.scratch_dir);

        let bilibili_audio = AudioFetcher::new(tree.tools.clone(), scratch_dir.clone());
        let bilibili_asr = AsrEngine::new(tree.tools.whisper_binary_path.clone(), tree.asr.clone());
        let bilibili_llm = LlmSummarizer::new(http_client.clone(), tree.llm.clone());
        let bilibili_pipeline = Arc::new(BilibiliPipeline::new(
            bilibili_audio,
            bilibili_asr,
            bilibili_llm,
            tree.bilibili.clone(),
        ));

        let har_path = config.resolve_path(&tree.xiaohongshu.har_capture_path);
        let curl_path = config.resolve_path(&tree.xiaohongshu.curl_capture_path);
        let (initial_capture, report) =
            load_initial_capture(&har_path, &curl_path, &tree.xiaohongshu.allowed_hosts)?;
        info!(host = %report.request_url_host, headers = report.headers_count, "xiaohongshu auth capture loaded");
        let auth = Arc::new(Mutex::new(initial_capture));

        let xiaohongshu_fetcher = Arc::new(XiaohongshuFetcher::new(
            http_client.clone(),
            tree.xiaohongshu.clone(),
            auth,
        ));
        let xhs_audio = Arc::new(AudioFetcher::new(tree.tools.clone(), scratch_dir.clone()));
        let xhs_asr = Arc::new(AsrEngine::new(tree.tools.whisper_binary_path.clone(), tree.asr.clone()));
        let xhs_llm = Arc::new(LlmSummarizer::new(http_client.clone(), tree.llm.clone()));
        let xiaohongshu_pipeline = Arc::new(XiaohongshuPipeline::new(
            xiaohongshu_fetcher.clone(),
            xhs_audio,
            xhs_asr,
            xhs_llm,
            dedupe.clone(),
            tree.xiaohongshu.clone(),
        ));

        let merge_llm = Arc::new(LlmSummarizer::new(http_client.clone(), tree.llm.clone()));
        let merge_engine = Arc::new(MergeEngine::new(notes.clone(), merge_store.clone(), merge_llm));

        let jobs = JobManager::new();

        Ok(Self {
            config,
            db,
            notes,
            dedupe,
            merge_store,
            jobs,
            bilibili_pipeline,
            xiaohongshu_pipeline,
            xiaohongshu_fetcher,
            merge_engine,
        })
    }
}
