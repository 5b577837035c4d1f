//! CLI Command Tests
//!
//! Argument parsing plus the command handlers run against an on-disk feed.
//! Covers exit codes and input validation.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use vidshelf::cli::{Cli, Command};

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["vidshelf"]).is_err());
    }

    #[test]
    fn test_search_with_limit() {
        let cli = Cli::parse_from(["vidshelf", "search", "big cats", "--limit", "5"]);
        match cli.command {
            Command::Search(cmd) => {
                assert_eq!(cmd.query, "big cats");
                assert_eq!(cmd.limit, Some(5));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::parse_from(["vidshelf", "s", "nature"]);
        assert!(matches!(cli.command, Command::Search(_)));

        let cli = Cli::parse_from(["vidshelf", "v", "3"]);
        assert!(matches!(cli.command, Command::Video(ref cmd) if cmd.id == 3));

        let cli = Cli::parse_from(["vidshelf", "cat", "Demo Slam", "-l", "2"]);
        match cli.command {
            Command::Category(cmd) => {
                assert_eq!(cmd.name, "Demo Slam");
                assert_eq!(cmd.limit, Some(2));
            }
            _ => panic!("Expected Category command"),
        }
    }

    #[test]
    fn test_video_id_must_be_numeric() {
        assert!(Cli::try_parse_from(["vidshelf", "video", "three"]).is_err());
    }

    #[test]
    fn test_update_rental_without_value() {
        let cli = Cli::parse_from(["vidshelf", "update", "7", "rental"]);
        match cli.command {
            Command::Update(cmd) => {
                assert_eq!(cmd.id, 7);
                assert_eq!(cmd.kind, "rental");
                assert!(cmd.value.is_none());
            }
            _ => panic!("Expected Update command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "vidshelf",
            "watch",
            "-j",
            "-c",
            "/tmp/vidshelf.toml",
            "-f",
            "http://localhost/videos.json",
        ]);
        assert!(cli.json);
        assert!(cli.should_json());
        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("/tmp/vidshelf.toml"))
        );
        assert_eq!(cli.feed.as_deref(), Some("http://localhost/videos.json"));
        assert!(matches!(cli.command, Command::Watch));
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod handlers {
    use std::path::PathBuf;

    use vidshelf::cli::{CategoryCmd, ExitCode, Output, SearchCmd, UpdateCmd, VideoCmd};
    use vidshelf::commands::{self, Session};
    use vidshelf::config::Config;

    const FEED: &str = r#"{
        "googlevideos": [
            {
                "category": "Demo Slam",
                "videos": [
                    {"title": "Chrome Speed Tests", "description": "Potatoes", "studio": "Demo Slam", "sources": ["http://example.com/1.mp4"], "card": "c1.jpg", "background": "b1.jpg"},
                    {"title": "Chrome Bike", "description": "Pedal power", "studio": "Demo Slam", "sources": ["http://example.com/2.mp4"], "card": "c2.jpg", "background": "b2.jpg"}
                ]
            },
            {
                "category": "Google+",
                "videos": [
                    {"title": "Hangouts", "description": "Video calls", "studio": "Google+", "sources": ["http://example.com/3.mp4"], "card": "c3.jpg", "background": "b3.jpg"}
                ]
            }
        ]
    }"#;

    fn feed_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vidshelf-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, FEED).unwrap();
        path
    }

    fn output() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    async fn session(name: &str, config: Config) -> Session {
        let path = feed_file(name);
        let session = Session::open(config, path.to_str(), &output()).await.unwrap();
        let _ = std::fs::remove_file(&path);
        session
    }

    #[tokio::test]
    async fn test_open_reads_feed_path_from_config() {
        let path = feed_file("config");
        let config = Config {
            feed_path: Some(path.clone()),
            ..Config::default()
        };
        // An environment override would shadow the config entry
        if std::env::var(vidshelf::config::FEED_ENV).is_err() {
            let session = Session::open(config, None, &output()).await.unwrap();
            assert_eq!(session.catalog().len(), 3);
        }
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_open_rejects_bad_feed() {
        let path = std::env::temp_dir().join(format!("vidshelf-bad-{}.json", std::process::id()));
        std::fs::write(&path, "not json").unwrap();

        let err = Session::open(Config::default(), path.to_str(), &output())
            .await
            .unwrap_err();
        assert_eq!(err, ExitCode::FeedError);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let session = session("search", Config::default()).await;
        let cmd = SearchCmd {
            query: "chrome".into(),
            limit: Some(1),
        };
        assert_eq!(commands::search_cmd(cmd, &session, &output()).await, ExitCode::Success);

        let results = session
            .viewmodel()
            .search_results()
            .current()
            .into_ready()
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_search_without_matches_succeeds() {
        let session = session("nomatch", Config::default()).await;
        let cmd = SearchCmd {
            query: "zebra".into(),
            limit: None,
        };
        assert_eq!(commands::search_cmd(cmd, &session, &output()).await, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_video_lookup() {
        let session = session("video", Config::default()).await;
        assert_eq!(
            commands::video_cmd(VideoCmd { id: 3 }, &session, &output()).await,
            ExitCode::Success
        );
        assert_eq!(
            commands::video_cmd(VideoCmd { id: 4 }, &session, &output()).await,
            ExitCode::NotFound
        );
    }

    #[tokio::test]
    async fn test_category_and_categories() {
        let session = session("category", Config::default()).await;
        let cmd = CategoryCmd {
            name: "Google+".into(),
            limit: None,
        };
        assert_eq!(commands::category_cmd(cmd, &session, &output()).await, ExitCode::Success);
        assert_eq!(commands::categories_cmd(&session, &output()).await, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_update_requires_value() {
        let session = session("update", Config::default()).await;
        let cmd = UpdateCmd {
            id: 1,
            kind: "video".into(),
            value: None,
        };
        assert_eq!(commands::update_cmd(cmd, &session, &output()).await, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_update_marks_rented() {
        let session = session("rent", Config::default()).await;
        let cmd = UpdateCmd {
            id: 2,
            kind: "RENTAL".into(),
            value: None,
        };
        assert_eq!(commands::update_cmd(cmd, &session, &output()).await, ExitCode::Success);

        let video = session
            .viewmodel()
            .video_by_id()
            .wait_for(|s| matches!(s.ready(), Some(Some(v)) if v.rented))
            .await
            .unwrap();
        assert_eq!(video.into_ready().flatten().unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_update_unknown_video() {
        let session = session("ghost", Config::default()).await;
        let cmd = UpdateCmd {
            id: 40,
            kind: "status".into(),
            value: Some("watched".into()),
        };
        assert_eq!(commands::update_cmd(cmd, &session, &output()).await, ExitCode::NotFound);
        assert_eq!(session.catalog().revision(), 0);
    }
}
