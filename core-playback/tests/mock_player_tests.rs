//! Strict call-count tests against a mocked player capability.

mod common;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioSource, BridgeError, PlayerCapability, PlayerOptions};
use common::controller_with;
use core_playback::{PlaybackConfig, PlaybackError, PlaybackState};
use mockall::mock;
use mockall::predicate::eq;
use std::sync::Arc;
use std::time::Duration;

mock! {
    Player {}

    #[async_trait]
    impl PlayerCapability for Player {
        async fn play_from_file(&self, options: PlayerOptions) -> BridgeResult<()>;
        async fn play_from_url(&self, options: PlayerOptions) -> BridgeResult<()>;
        async fn pause(&self) -> BridgeResult<()>;
        async fn resume(&self) -> BridgeResult<()>;
        async fn dispose(&self) -> BridgeResult<()>;
        async fn seek_to(&self, position: Duration) -> BridgeResult<()>;
        async fn track_duration(&self) -> BridgeResult<Duration>;
        fn change_speed(&self, multiplier: f32) -> BridgeResult<()>;
        fn set_volume(&self, level: f32);
        fn current_position(&self) -> Duration;
        fn is_playing(&self) -> bool;
    }
}

fn playing_player() -> MockPlayer {
    let mut player = MockPlayer::new();
    player
        .expect_play_from_file()
        .times(1)
        .returning(|_| Ok(()));
    player
        .expect_track_duration()
        .times(1)
        .returning(|| Ok(Duration::from_secs(12)));
    player.expect_set_volume().with(eq(1.0)).return_const(());
    player
        .expect_current_position()
        .return_const(Duration::from_secs(4));
    player.expect_is_playing().return_const(true);
    player
}

#[core_async::test]
async fn test_stop_disposes_exactly_once() {
    let mut player = playing_player();
    player.expect_dispose().times(1).returning(|| Ok(()));
    let (controller, _notifier) = controller_with(Arc::new(player), PlaybackConfig::default());

    controller
        .play(AudioSource::local("/music/angel.mp3"))
        .await
        .unwrap();
    controller.stop().await.unwrap();

    assert_eq!(controller.state(), PlaybackState::Idle);
    assert_eq!(controller.track_duration_ms(), 12_000);
}

#[core_async::test]
async fn test_stop_while_idle_still_disposes() {
    let mut player = MockPlayer::new();
    player.expect_dispose().times(1).returning(|| Ok(()));
    let (controller, notifier) = controller_with(Arc::new(player), PlaybackConfig::default());

    controller.stop().await.unwrap();

    assert_eq!(controller.state(), PlaybackState::Idle);
    assert_eq!(notifier.notices().len(), 1);
}

#[core_async::test]
async fn test_rejected_play_skips_duration_query() {
    let mut player = MockPlayer::new();
    player
        .expect_play_from_url()
        .times(1)
        .returning(|_| Err(BridgeError::Rejected("404".to_string())));
    player.expect_track_duration().never();
    player.expect_set_volume().never();
    let (controller, notifier) = controller_with(Arc::new(player), PlaybackConfig::default());

    let err = controller
        .play(AudioSource::remote("https://cdn.example.com/missing.mp3"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlaybackError::DelegateFailure {
            source: BridgeError::Rejected(_),
            ..
        }
    ));
    assert_eq!(controller.state(), PlaybackState::Error);
    assert_eq!(notifier.errors().len(), 1);
}

#[core_async::test]
async fn test_pause_reports_position() {
    let mut player = playing_player();
    player.expect_pause().times(1).returning(|| Ok(()));
    player.expect_resume().never();
    let (controller, _notifier) = controller_with(Arc::new(player), PlaybackConfig::default());

    controller
        .play(AudioSource::local("/music/angel.mp3"))
        .await
        .unwrap();
    controller.pause().await.unwrap();

    assert_eq!(controller.state(), PlaybackState::Paused);
    assert_eq!(controller.remaining_ms(), 12_000);
}

#[core_async::test]
async fn test_speed_failure_leaves_speed_unchanged() {
    let mut player = playing_player();
    player
        .expect_change_speed()
        .with(eq(2.0))
        .times(1)
        .returning(|_| Err(BridgeError::OperationFailed("rate locked".to_string())));
    let (controller, notifier) = controller_with(Arc::new(player), PlaybackConfig::default());

    controller
        .play(AudioSource::local("/music/angel.mp3"))
        .await
        .unwrap();
    let err = controller.set_speed_multiplier(2.0).unwrap_err();

    assert!(matches!(
        err,
        PlaybackError::DelegateFailure {
            operation: "change speed",
            ..
        }
    ));
    assert_eq!(controller.speed(), core_playback::PlaybackSpeed::Normal);
    assert_eq!(notifier.errors().len(), 1);
}
