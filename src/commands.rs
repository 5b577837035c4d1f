//! CLI Command Handlers
//!
//! Every handler drives the [`VideosViewModel`] the same way an interactive
//! client would: set an input, wait for the derived stream to settle, print.
//! Each handler takes CLI args, the open session and Output, returns ExitCode.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::catalog::{CatalogRepository, FeedClient};
use crate::cli::{CategoryCmd, ExitCode, Output, SearchCmd, UpdateCmd, VideoCmd, WatchInput};
use crate::config::Config;
use crate::live::{DerivedStream, Snapshot};
use crate::models::VideoField;
use crate::repository::VideoRepository;
use crate::viewmodel::VideosViewModel;

// =============================================================================
// Session
// =============================================================================

/// Loaded catalog plus the view model wired to it
#[derive(Debug)]
pub struct Session {
    config: Config,
    catalog: Arc<CatalogRepository>,
    viewmodel: VideosViewModel,
}

impl Session {
    /// Wrap an already built catalog
    pub fn new(config: Config, catalog: CatalogRepository) -> Self {
        let catalog = Arc::new(catalog);
        let viewmodel = VideosViewModel::new(Arc::clone(&catalog) as Arc<dyn VideoRepository>);
        Self {
            config,
            catalog,
            viewmodel,
        }
    }

    /// Resolve the feed source, load it and build the view model
    pub async fn open(config: Config, feed: Option<&str>, output: &Output) -> Result<Self, ExitCode> {
        let Some(source) = config.feed_source(feed) else {
            return Err(output.error(
                "No catalog feed configured. Pass --feed, set VIDSHELF_FEED or add feed_url to the config file.",
                ExitCode::InvalidArgs,
            ));
        };

        output.info(format!("Loading catalog from {}", source));
        let feed = FeedClient::load(&source, config.max_retries())
            .await
            .map_err(|e| output.error(format!("Failed to load feed: {}", e), ExitCode::FeedError))?;

        let catalog = CatalogRepository::from_feed(feed);
        debug!(videos = catalog.len(), "session ready");
        Ok(Self::new(config, catalog))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogRepository {
        &self.catalog
    }

    pub fn viewmodel(&self) -> &VideosViewModel {
        &self.viewmodel
    }
}

/// Wait for `stream` to settle and unwrap the result, reporting failures
async fn settle<R>(stream: &DerivedStream<R>, output: &Output) -> Result<R, ExitCode>
where
    R: Clone + Send + Sync + 'static,
{
    match stream.settled().await {
        Ok(Snapshot::Ready(value)) => Ok(value),
        Ok(snapshot) => Err(output.error(
            format!(
                "{} failed: {}",
                stream.name(),
                snapshot.error().unwrap_or("no result")
            ),
            ExitCode::Error,
        )),
        Err(e) => Err(output.error(e.to_string(), ExitCode::Error)),
    }
}

// =============================================================================
// Search Command
// =============================================================================

pub async fn search_cmd(cmd: SearchCmd, session: &Session, output: &Output) -> ExitCode {
    output.info(format!("Searching for: {}", cmd.query));
    session.viewmodel.set_query(cmd.query);

    let mut results = match settle(&session.viewmodel.search_results(), output).await {
        Ok(results) => results,
        Err(code) => return code,
    };
    results.truncate(cmd.limit.unwrap_or_else(|| session.config.search_limit()));

    if results.is_empty() {
        output.info("No videos found");
    }
    if let Err(e) = output.print_lines(&results, &results) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Video Command
// =============================================================================

pub async fn video_cmd(cmd: VideoCmd, session: &Session, output: &Output) -> ExitCode {
    session.viewmodel.set_video_id(cmd.id);

    match settle(&session.viewmodel.video_by_id(), output).await {
        Ok(Some(video)) => {
            if let Err(e) = output.print(&video) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Ok(None) => output.error(format!("No video with id {}", cmd.id), ExitCode::NotFound),
        Err(code) => code,
    }
}

// =============================================================================
// Category Commands
// =============================================================================

pub async fn category_cmd(cmd: CategoryCmd, session: &Session, output: &Output) -> ExitCode {
    session.viewmodel.set_category(cmd.name.clone());

    let mut videos = match settle(&session.viewmodel.videos_in_category(), output).await {
        Ok(videos) => videos,
        Err(code) => return code,
    };
    if videos.is_empty() {
        return output.error(format!("No videos in category {:?}", cmd.name), ExitCode::NotFound);
    }
    videos.truncate(cmd.limit.unwrap_or_else(|| session.config.search_limit()));

    if let Err(e) = output.print_lines(&videos, &videos) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

pub async fn categories_cmd(session: &Session, output: &Output) -> ExitCode {
    let categories = match settle(&session.viewmodel.all_categories(), output).await {
        Ok(categories) => categories,
        Err(code) => return code,
    };

    if let Err(e) = output.print_lines(&categories, &categories) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Update Command
// =============================================================================

pub async fn update_cmd(cmd: UpdateCmd, session: &Session, output: &Output) -> ExitCode {
    let field = match VideoField::parse(&cmd.kind, cmd.value.as_deref()) {
        Ok(field) => field,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };

    session.viewmodel.set_video_id(cmd.id);
    let video = match settle(&session.viewmodel.video_by_id(), output).await {
        Ok(Some(video)) => video,
        Ok(None) => return output.error(format!("No video with id {}", cmd.id), ExitCode::NotFound),
        Err(code) => return code,
    };

    output.info(format!("Updating #{}: {}", video.id, field));
    match session.viewmodel.update_video(&video, field).await {
        Ok(updated) => {
            if let Err(e) = output.print(&updated) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Update failed: {}", e), ExitCode::Error),
    }
}

// =============================================================================
// Watch Command
// =============================================================================

/// Drive the view model from stdin until EOF or `quit`
pub async fn watch_cmd(session: &Session, output: &Output) -> ExitCode {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    watch_from(stdin, session, output).await
}

/// Drive the view model from `reader`, one command per line.
///
/// Bad lines are reported and skipped; the exit code reflects the last
/// failure, if any.
pub async fn watch_from<R>(reader: R, session: &Session, output: &Output) -> ExitCode
where
    R: AsyncBufRead + Unpin,
{
    let viewmodel = &session.viewmodel;
    let mut lines = reader.lines();
    let mut exit = ExitCode::Success;

    output.info("Commands: query <text> | id <n> | category <name> | quit");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return output.error(format!("Failed to read input: {}", e), ExitCode::Error),
        };
        if line.trim().is_empty() {
            continue;
        }

        let input = match WatchInput::parse(&line) {
            Ok(input) => input,
            Err(e) => {
                exit = output.error(e, ExitCode::InvalidArgs);
                continue;
            }
        };
        debug!(?input, "watch input");

        let printed = match input {
            WatchInput::Quit => break,
            WatchInput::Query(text) => {
                viewmodel.set_query(text);
                settle(&viewmodel.search_results(), output)
                    .await
                    .and_then(|videos| print_or_fail(output, output.print_lines(&videos, &videos)))
            }
            WatchInput::Id(id) => {
                viewmodel.set_video_id(id);
                match settle(&viewmodel.video_by_id(), output).await {
                    Ok(Some(video)) => print_or_fail(output, output.print(&video)),
                    Ok(None) => Err(output.error(format!("No video with id {}", id), ExitCode::NotFound)),
                    Err(code) => Err(code),
                }
            }
            WatchInput::Category(name) => {
                viewmodel.set_category(name);
                settle(&viewmodel.videos_in_category(), output)
                    .await
                    .and_then(|videos| print_or_fail(output, output.print_lines(&videos, &videos)))
            }
        };

        if let Err(code) = printed {
            exit = code;
        }
    }

    exit
}

fn print_or_fail(output: &Output, result: anyhow::Result<()>) -> Result<(), ExitCode> {
    result.map_err(|e| output.error(format!("Failed to serialize: {}", e), ExitCode::Error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoEntity;

    fn video(id: i64, title: &str, category: &str) -> VideoEntity {
        VideoEntity {
            id,
            category: category.into(),
            title: title.into(),
            description: String::new(),
            video_url: format!("http://example.com/{}.mp4", id),
            card_image_url: String::new(),
            bg_image_url: String::new(),
            studio: "Studio".into(),
            rented: false,
            status: String::new(),
            video_local_path: None,
            bg_image_local_path: None,
            card_image_local_path: None,
        }
    }

    fn session() -> Session {
        Session::new(
            Config::default(),
            CatalogRepository::from_videos(vec![
                video(1, "Cat Nap", "Animals"),
                video(2, "Dog Park", "Animals"),
                video(3, "Paris", "Travel"),
            ]),
        )
    }

    fn quiet() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    #[tokio::test]
    async fn test_open_without_feed_is_invalid_args() {
        if std::env::var(crate::config::FEED_ENV).is_ok() {
            return;
        }
        let err = Session::open(Config::default(), None, &quiet()).await.unwrap_err();
        assert_eq!(err, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_feed_error() {
        let err = Session::open(Config::default(), Some("/nonexistent/vidshelf.json"), &quiet())
            .await
            .unwrap_err();
        assert_eq!(err, ExitCode::FeedError);
    }

    #[tokio::test]
    async fn test_video_cmd_unknown_id() {
        let session = session();
        let code = video_cmd(VideoCmd { id: 42 }, &session, &quiet()).await;
        assert_eq!(code, ExitCode::NotFound);
    }

    #[tokio::test]
    async fn test_update_cmd_writes_through() {
        let session = session();
        let cmd = UpdateCmd {
            id: 2,
            kind: "status".into(),
            value: Some("downloading".into()),
        };
        assert_eq!(update_cmd(cmd, &session, &quiet()).await, ExitCode::Success);
        assert_eq!(session.catalog().revision(), 1);

        let video = session
            .viewmodel()
            .video_by_id()
            .wait_for(|s| s.ready().and_then(|v| v.as_ref()).map(|v| v.status == "downloading").unwrap_or(false))
            .await
            .unwrap();
        assert!(video.is_ready());
    }

    #[tokio::test]
    async fn test_update_cmd_rejects_bad_kind() {
        let session = session();
        let cmd = UpdateCmd {
            id: 1,
            kind: "poster".into(),
            value: None,
        };
        assert_eq!(update_cmd(cmd, &session, &quiet()).await, ExitCode::InvalidArgs);
        assert_eq!(session.catalog().revision(), 0);
    }

    #[tokio::test]
    async fn test_category_cmd_unknown_category() {
        let session = session();
        let cmd = CategoryCmd {
            name: "Horror".into(),
            limit: None,
        };
        assert_eq!(category_cmd(cmd, &session, &quiet()).await, ExitCode::NotFound);
    }

    #[tokio::test]
    async fn test_watch_drives_all_inputs() {
        let session = session();
        let input: &[u8] = b"query cat\nid 3\ncategory Travel\nquit\nid 99\n";
        let code = watch_from(input, &session, &quiet()).await;

        assert_eq!(code, ExitCode::Success);
        let vm = session.viewmodel();
        assert_eq!(vm.query().as_deref(), Some("cat"));
        assert_eq!(vm.video_id(), Some(3));
        assert_eq!(vm.category().as_deref(), Some("Travel"));
    }

    #[tokio::test]
    async fn test_watch_reports_last_failure() {
        let session = session();
        let input: &[u8] = b"dance\nid 1\n";
        let code = watch_from(input, &session, &quiet()).await;
        assert_eq!(code, ExitCode::InvalidArgs);
        assert_eq!(session.viewmodel().video_id(), Some(1));
    }
}
