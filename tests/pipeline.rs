use chordpad::chord::{Chord, ChordInputMapping, ChordOutputMapping, Modifier, OutputEvent};
use chordpad::controller::{Button, ButtonEvent, ButtonSource, SourceError};
use chordpad::output::{KeySink, OutputError};
use chordpad::pipeline::{ChordPipeline, PipelineError};
use evdev::Key;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Plays a fixed script, then either fails or waits forever
struct ScriptedSource {
    script: VecDeque<Result<ButtonEvent, SourceError>>,
    fail_at_end: bool,
    closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn new(events: Vec<ButtonEvent>) -> (Self, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let source = Self {
            script: events.into_iter().map(Ok).collect(),
            fail_at_end: false,
            closed: closed.clone(),
        };
        (source, closed)
    }

    fn failing_after(events: Vec<ButtonEvent>) -> Self {
        let (mut source, _) = Self::new(events);
        source.fail_at_end = true;
        source
    }

    fn with_unbound(mut self, index: usize) -> Self {
        self.script.insert(
            index,
            Err(SourceError::UnboundInput("KEY_VOLUMEUP".to_string())),
        );
        self
    }
}

impl ButtonSource for ScriptedSource {
    async fn read_event(&mut self) -> Result<ButtonEvent, SourceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SourceError::Closed);
        }
        if let Some(next) = self.script.pop_front() {
            return next;
        }
        if self.fail_at_end {
            return Err(SourceError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device unplugged",
            )));
        }
        std::future::pending().await
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Stroke {
    Press(Key),
    Release(Key),
}

#[derive(Clone, Default)]
struct RecordingSink {
    log: Arc<Mutex<Vec<Stroke>>>,
    fail: bool,
}

impl RecordingSink {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn strokes(&self) -> Vec<Stroke> {
        self.log.lock().unwrap().clone()
    }

    async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.log.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("sink did not receive enough strokes");
    }
}

impl KeySink for RecordingSink {
    fn press(&mut self, key: Key) -> Result<(), OutputError> {
        if self.fail {
            return Err(OutputError::Emit {
                key,
                source: io::Error::other("uinput gone"),
            });
        }
        self.log.lock().unwrap().push(Stroke::Press(key));
        Ok(())
    }

    fn release(&mut self, key: Key) -> Result<(), OutputError> {
        self.log.lock().unwrap().push(Stroke::Release(key));
        Ok(())
    }
}

fn bit(index: u8) -> Chord {
    Chord::bit(index).unwrap()
}

fn typed(key: Key) -> [Stroke; 2] {
    [Stroke::Press(key), Stroke::Release(key)]
}

/// A = bit 0, B = bit 1, LeftTrigger = bit 2 (Ctrl)
fn pipeline() -> ChordPipeline {
    let input = ChordInputMapping::new([
        (Button::South, bit(0)),
        (Button::East, bit(1)),
        (Button::LeftTrigger, bit(2)),
    ])
    .unwrap();

    let mut output = ChordOutputMapping::new(vec![Modifier {
        bit: bit(2),
        key: Key::KEY_RIGHTCTRL,
    }])
    .unwrap();
    output
        .bind(bit(0) | bit(1), OutputEvent::Press(Key::KEY_Q))
        .unwrap();
    output.bind(bit(0), OutputEvent::Press(Key::KEY_E)).unwrap();
    output.bind(bit(1), OutputEvent::Press(Key::KEY_T)).unwrap();

    ChordPipeline::new(input, output, Duration::ZERO)
}

fn tap(button: Button) -> [ButtonEvent; 2] {
    [ButtonEvent::down(button), ButtonEvent::up(button)]
}

#[tokio::test]
async fn test_rolled_chord_types_once() {
    let (source, closed) = ScriptedSource::new(vec![
        ButtonEvent::down(Button::South),
        ButtonEvent::down(Button::East),
        ButtonEvent::up(Button::South),
        ButtonEvent::up(Button::East),
    ]);
    let sink = RecordingSink::default();
    let shutdown = CancellationToken::new();
    let pipeline = pipeline();

    let run = {
        let sink = sink.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { pipeline.run(source, sink, &shutdown).await })
    };

    sink.wait_for(2).await;
    shutdown.cancel();
    run.await.unwrap().unwrap();

    assert_eq!(sink.strokes(), typed(Key::KEY_Q).to_vec());
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_chords_are_typed_in_order() {
    let mut events = Vec::new();
    events.extend(tap(Button::East));
    events.extend(tap(Button::South));
    events.extend(tap(Button::East));
    let (source, _) = ScriptedSource::new(events);
    let sink = RecordingSink::default();
    let shutdown = CancellationToken::new();
    let pipeline = pipeline();

    let run = {
        let sink = sink.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { pipeline.run(source, sink, &shutdown).await })
    };

    sink.wait_for(6).await;
    shutdown.cancel();
    run.await.unwrap().unwrap();

    let expected: Vec<Stroke> = [Key::KEY_T, Key::KEY_E, Key::KEY_T]
        .into_iter()
        .flat_map(typed)
        .collect();
    assert_eq!(sink.strokes(), expected);
}

#[tokio::test]
async fn test_modifier_wraps_chord() {
    let (source, _) = ScriptedSource::new(vec![
        ButtonEvent::down(Button::LeftTrigger),
        ButtonEvent::down(Button::South),
        ButtonEvent::down(Button::East),
        ButtonEvent::up(Button::East),
        ButtonEvent::up(Button::South),
        ButtonEvent::up(Button::LeftTrigger),
    ]);
    let sink = RecordingSink::default();
    let shutdown = CancellationToken::new();
    let pipeline = pipeline();

    let run = {
        let sink = sink.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { pipeline.run(source, sink, &shutdown).await })
    };

    sink.wait_for(4).await;
    shutdown.cancel();
    run.await.unwrap().unwrap();

    assert_eq!(
        sink.strokes(),
        vec![
            Stroke::Press(Key::KEY_RIGHTCTRL),
            Stroke::Press(Key::KEY_Q),
            Stroke::Release(Key::KEY_Q),
            Stroke::Release(Key::KEY_RIGHTCTRL),
        ]
    );
}

#[tokio::test]
async fn test_unbound_input_and_chords_are_skipped() {
    let mut events = Vec::new();
    // Ctrl alone resolves to nothing
    events.extend(tap(Button::LeftTrigger));
    events.extend(tap(Button::South));
    let (source, _) = ScriptedSource::new(events);
    let source = source.with_unbound(1);
    let sink = RecordingSink::default();
    let shutdown = CancellationToken::new();
    let pipeline = pipeline();

    let run = {
        let sink = sink.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { pipeline.run(source, sink, &shutdown).await })
    };

    sink.wait_for(2).await;
    shutdown.cancel();
    run.await.unwrap().unwrap();

    assert_eq!(sink.strokes(), typed(Key::KEY_E).to_vec());
}

#[tokio::test]
async fn test_source_error_is_reported_as_source_failure() {
    let mut events = Vec::new();
    events.extend(tap(Button::South));
    let source = ScriptedSource::failing_after(events);
    let sink = RecordingSink::default();
    let shutdown = CancellationToken::new();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline().run(source, sink.clone(), &shutdown),
    )
    .await
    .expect("pipeline did not stop");

    match result {
        Err(e @ PipelineError::Source(SourceError::Io(_))) => assert!(!e.is_fatal()),
        other => panic!("expected a source failure, got {:?}", other),
    }
    assert!(!shutdown.is_cancelled());
}

#[tokio::test]
async fn test_sink_failure_is_reported_as_output_failure() {
    let (source, closed) = ScriptedSource::new(tap(Button::South).to_vec());
    let shutdown = CancellationToken::new();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline().run(source, RecordingSink::failing(), &shutdown),
    )
    .await
    .expect("pipeline did not stop");

    match result {
        Err(e @ PipelineError::Output(OutputError::Emit { .. })) => assert!(e.is_fatal()),
        other => panic!("expected an output failure, got {:?}", other),
    }
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancellation_ends_run_cleanly() {
    let (source, closed) = ScriptedSource::new(Vec::new());
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let result = pipeline()
        .run(source, RecordingSink::default(), &shutdown)
        .await;

    assert!(result.is_ok());
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_pipeline_can_run_again_after_cancellation() {
    let pipeline = pipeline();

    let first = CancellationToken::new();
    first.cancel();
    let (source, _) = ScriptedSource::new(Vec::new());
    pipeline
        .run(source, RecordingSink::default(), &first)
        .await
        .unwrap();

    let (source, _) = ScriptedSource::new(tap(Button::East).to_vec());
    let sink = RecordingSink::default();
    let second = CancellationToken::new();
    let run = {
        let sink = sink.clone();
        let second = second.clone();
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.run(source, sink, &second).await })
    };

    sink.wait_for(2).await;
    second.cancel();
    run.await.unwrap().unwrap();
    assert_eq!(sink.strokes(), typed(Key::KEY_T).to_vec());
}
