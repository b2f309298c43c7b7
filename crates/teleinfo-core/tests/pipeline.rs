use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender, unbounded};

use teleinfo_core::{
    EventKind, Handler, Observer, Record, RunError, SerialFrameSource, SourceError,
};

const TWO_FRAME_STREAM: &[u8] =
    b"\x02\nADCO 012345678901 F\r\nOPTARIF BASE 0\r\x03\x02\nADCO 012345678901 F\r\nISOUSC 45 ?\r\x03\x02";

struct Collector {
    sink: Sender<(EventKind, i64, String)>,
}

impl Observer for Collector {
    fn notify(&self, event: EventKind, record: &Record) {
        let _ = self
            .sink
            .send((event, record.timestamp(), record.json().to_string()));
    }
}

struct Sleeper {
    pause: Duration,
}

impl Observer for Sleeper {
    fn notify(&self, _event: EventKind, _record: &Record) {
        thread::sleep(self.pause);
    }
}

fn handler() -> Handler {
    // run_with_source never opens the path, it only has to exist.
    Handler::new(std::env::temp_dir()).expect("temp dir exists")
}

fn drain(
    notifications: &Receiver<(EventKind, i64, String)>,
    count: usize,
) -> Vec<(EventKind, i64, String)> {
    (0..count)
        .map(|_| {
            notifications
                .recv_timeout(Duration::from_secs(5))
                .expect("notification arrives")
        })
        .collect()
}

#[test]
fn pipeline_decodes_and_dispatches_every_frame() {
    let (sink, notifications) = unbounded();
    let mut handler = handler();
    // One worker keeps delivery in dispatch order.
    handler.set_workers(1);
    handler.register(Arc::new(Collector { sink }));

    let source = SerialFrameSource::from_reader(Cursor::new(TWO_FRAME_STREAM.to_vec()));
    let err = handler.run_with_source(source).unwrap_err();
    assert!(matches!(err, RunError::Source(SourceError::StreamClosed)));

    let received = drain(&notifications, 2);
    for (event, _, json) in &received {
        assert_eq!(*event, EventKind::RecordReceived);
        assert!(json.contains("\"ADCO\":\"012345678901\""));
        assert!(json.contains("\"DATE\":"));
    }
    assert!(received[0].2.contains("\"OPTARIF\":\"BASE\""));
    assert!(received[1].2.contains("\"ISOUSC\":\"45\""));
}

#[test]
fn all_observers_see_every_record() {
    let (first_sink, first) = unbounded();
    let (second_sink, second) = unbounded();
    let mut handler = handler();
    handler.register(Arc::new(Collector { sink: first_sink }));
    handler.register(Arc::new(Collector { sink: second_sink }));

    let source = SerialFrameSource::from_reader(Cursor::new(TWO_FRAME_STREAM.to_vec()));
    handler.run_with_source(source).unwrap_err();

    assert_eq!(drain(&first, 2).len(), 2);
    assert_eq!(drain(&second, 2).len(), 2);
}

#[test]
fn slow_observer_does_not_delay_the_read_loop() {
    let pause = Duration::from_secs(2);
    let (sink, notifications) = unbounded();
    let mut handler = handler();
    handler.register(Arc::new(Sleeper { pause }));
    handler.register(Arc::new(Collector { sink }));

    let source = SerialFrameSource::from_reader(Cursor::new(TWO_FRAME_STREAM.to_vec()));
    let started = Instant::now();
    handler.run_with_source(source).unwrap_err();
    let elapsed = started.elapsed();

    // The loop reads, decodes and enqueues without waiting on the
    // sleeping observer.
    assert!(
        elapsed < pause / 2,
        "read loop took {elapsed:?}, sleeper pause is {pause:?}"
    );

    let received = drain(&notifications, 2);
    let delta = received[1].1 - received[0].1;
    assert!(
        delta.unsigned_abs() <= 1,
        "back-to-back frame timestamps differ by {delta}s"
    );
}
