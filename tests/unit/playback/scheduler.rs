use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::foundation::core::{Canvas, Region};
use crate::model::frame::{BlendOp, DisposeOp, FrameDescriptor, InlinePixels, PixelSource};
use crate::playback::sink::InMemorySink;
use crate::timing::delay::DelayFraction;

fn desc(i: u32, delay: (u16, u16), px: Arc<dyn PixelSource>) -> FrameDescriptor {
    FrameDescriptor::new(
        i,
        Region {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        },
        BlendOp::Source,
        DisposeOp::None,
        DelayFraction::new(delay.0, delay.1),
        px,
    )
    .unwrap()
}

fn animated(delays: &[(u16, u16)]) -> Arc<DecodedImage> {
    let frames = delays
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            desc(
                i as u32,
                d,
                Arc::new(InlinePixels::solid(2, 2, [i as u8 * 40, 0, 0, 255])),
            )
        })
        .collect();
    Arc::new(DecodedImage::animated(Canvas::new(2, 2).unwrap(), frames, 0).unwrap())
}

fn scheduler(image: Arc<DecodedImage>, opts: ScheduleOpts) -> Scheduler {
    let store = FrameStore::new(image.clone());
    Scheduler::new(image, store, opts).unwrap()
}

#[test]
fn plays_once_and_freezes_on_end() {
    let mut s = scheduler(animated(&[(0, 0), (0, 0), (0, 0)]), ScheduleOpts::default());
    let sink = InMemorySink::new();
    let out = s.run(&sink, &CancelToken::new()).unwrap();

    assert_eq!(out, PlaybackOutcome::Ended { unload: false });
    assert_eq!(s.state(), PlaybackState::Ended);
    assert_eq!(s.current_index(), 2);
    assert_eq!(
        sink.kinds(),
        vec!["started", "frame", "frame", "frame", "ended"]
    );
    assert_eq!(sink.frame_indices(), vec![0, 1, 2]);
}

#[test]
fn unload_on_end_emits_unloaded_before_ended() {
    let opts = ScheduleOpts {
        end_behavior: EndBehavior::UnloadOnEnd,
        ..Default::default()
    };
    let mut s = scheduler(animated(&[(0, 0), (0, 0)]), opts);
    let sink = InMemorySink::new();
    let out = s.run(&sink, &CancelToken::new()).unwrap();
    assert_eq!(out, PlaybackOutcome::Ended { unload: true });
    assert_eq!(
        sink.kinds(),
        vec!["started", "frame", "frame", "unloaded", "ended"]
    );
}

#[test]
fn repeat_restarts_at_zero_from_cache_and_never_ends() {
    let opts = ScheduleOpts {
        repeat: true,
        ..Default::default()
    };
    let mut s = scheduler(animated(&[(0, 0), (0, 0), (0, 0)]), opts);
    let cancel = CancelToken::new();
    let (tx, rx) = crossbeam_channel::unbounded();

    let runner_cancel = cancel.clone();
    let h = thread::spawn(move || {
        let out = s.run(&tx, &runner_cancel);
        (s, out)
    });

    let mut events = Vec::new();
    let mut starts = 0;
    while starts < 3 {
        let ev = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        if matches!(ev, PlaybackEvent::Started) {
            starts += 1;
        }
        events.push(ev);
    }
    cancel.cancel();
    let (s, out) = h.join().unwrap();
    assert_eq!(out.unwrap(), PlaybackOutcome::Cancelled);
    assert_eq!(s.state(), PlaybackState::Cancelled);
    assert!(s.loops_completed() >= 2);

    // Loop passes composite nothing new.
    assert_eq!(s.store().composited_count(), 3);
    events.extend(rx.try_iter());
    assert!(!events.iter().any(|e| matches!(e, PlaybackEvent::Ended)));

    let frames: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Frame(f) => Some(f.clone()),
            _ => None,
        })
        .collect();
    for (n, f) in frames.iter().enumerate() {
        assert_eq!(f.index() as usize, n % 3);
    }
    assert!(frames.len() >= 7);
    assert!(Arc::ptr_eq(&frames[0], &frames[3]));
    assert_eq!(frames[1].as_ref(), frames[4].as_ref());
}

#[test]
fn single_frame_emits_once_without_notifications() {
    let frame = desc(0, (50, 0), Arc::new(InlinePixels::solid(2, 2, [1, 2, 3, 255])));
    let image = Arc::new(DecodedImage::still(Canvas::new(2, 2).unwrap(), frame).unwrap());
    let opts = ScheduleOpts {
        repeat: true,
        ..Default::default()
    };
    let mut s = scheduler(image, opts);
    let sink = InMemorySink::new();
    let start = Instant::now();
    s.run(&sink, &CancelToken::new()).unwrap();
    assert_eq!(sink.kinds(), vec!["frame"]);
    assert!(start.elapsed() < Duration::from_millis(400));
}

#[test]
fn cancelled_before_start_emits_nothing() {
    let mut s = scheduler(animated(&[(0, 0), (0, 0)]), ScheduleOpts::default());
    let sink = InMemorySink::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(s.run(&sink, &cancel).unwrap(), PlaybackOutcome::Cancelled);
    assert!(sink.kinds().is_empty());
}

#[test]
fn cancel_mid_delay_stops_before_next_frame_without_ended() {
    // Frame 0 is held for 30 s; cancellation must cut that short.
    let mut s = scheduler(animated(&[(30, 1), (0, 0)]), ScheduleOpts::default());
    let cancel = CancelToken::new();
    let (tx, rx) = crossbeam_channel::unbounded();
    let runner_cancel = cancel.clone();
    let h = thread::spawn(move || s.run(&tx, &runner_cancel));

    let mut kinds = Vec::new();
    loop {
        let ev = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        kinds.push(ev.kind());
        if ev.kind() == "frame" {
            break;
        }
    }
    let start = Instant::now();
    cancel.cancel();
    assert_eq!(h.join().unwrap().unwrap(), PlaybackOutcome::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(5));

    kinds.extend(rx.try_iter().map(|e| e.kind()));
    assert_eq!(kinds, vec!["started", "frame"]);
}

#[test]
fn speed_ratio_shortens_the_schedule() {
    let opts = ScheduleOpts {
        speed_ratio: SpeedRatio::new(2.0),
        ..Default::default()
    };
    // 2 x 500 ms at double speed = ~500 ms.
    let mut s = scheduler(animated(&[(5, 10), (5, 10)]), opts);
    let sink = InMemorySink::new();
    let start = Instant::now();
    s.run(&sink, &CancelToken::new()).unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(950), "{elapsed:?}");
}

#[test]
fn compositing_error_reports_failed_once_and_stops() {
    let frames = vec![
        desc(0, (0, 0), Arc::new(InlinePixels::solid(2, 2, [9, 9, 9, 255]))),
        desc(1, (0, 0), Arc::new(InlinePixels::new(vec![0u8; 3]))),
        desc(2, (0, 0), Arc::new(InlinePixels::solid(2, 2, [9, 9, 9, 255]))),
    ];
    let image = Arc::new(DecodedImage::animated(Canvas::new(2, 2).unwrap(), frames, 0).unwrap());
    let mut s = scheduler(image, ScheduleOpts::default());
    let sink = InMemorySink::new();
    let err = s.run(&sink, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, ApngError::MalformedFrame(_)));
    assert_eq!(s.state(), PlaybackState::Failed);
    assert_eq!(sink.kinds(), vec!["started", "frame", "failed"]);
}

#[test]
fn a_scheduler_runs_once() {
    let mut s = scheduler(animated(&[(0, 0)]), ScheduleOpts::default());
    let sink = InMemorySink::new();
    s.run(&sink, &CancelToken::new()).unwrap();
    assert!(matches!(
        s.run(&sink, &CancelToken::new()),
        Err(ApngError::InvalidState(_))
    ));
}

#[test]
fn mismatched_store_is_rejected() {
    let image = animated(&[(0, 0), (0, 0)]);
    let other = animated(&[(0, 0)]);
    assert!(matches!(
        Scheduler::new(image, FrameStore::new(other), ScheduleOpts::default()),
        Err(ApngError::InvalidState(_))
    ));
}
