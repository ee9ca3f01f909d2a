use std::sync::Arc;
use std::time::Duration;

use alarmvisor::{AlarmService, BufferConsole, Config, MessageNumber};

fn service(cfg: Config) -> (AlarmService, Arc<BufferConsole>) {
    let console = Arc::new(BufferConsole::new());
    (AlarmService::new(cfg, console.clone(), Vec::new()), console)
}

fn acks(console: &BufferConsole) -> Vec<String> {
    console
        .lines()
        .into_iter()
        .filter(|l| !l.starts_with("Display thread"))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn start_cancel_cancel() {
    let (svc, console) = service(Config::default());
    let input: &[u8] = b"Start_Alarm: 1 hello\nCancel_Alarm: 1\nCancel_Alarm: 1\n";

    svc.run_until(input, std::future::pending()).await.unwrap();

    assert_eq!(
        acks(&console),
        vec![
            "First Alarm Request With Message Number 1",
            "Cancel Alarm Request With Message Number 1",
            "Error: No Alarm Request With Message Number 1",
        ]
    );
    assert!(!console.contains("Received Alarm"));
    assert!(svc.table().is_empty());
}

#[tokio::test(start_paused = true)]
async fn malformed_lines_do_not_touch_the_table() {
    let (svc, console) = service(Config::default());
    let input: &[u8] = b"Start_Alarm: 7 in=1h keep me\n\
        garbage text\n\
        Start_Alarm: x hello\n\
        Start_Alarm: 7 in=soon hello\n\
        Cancel_Alarm:\n\
        Snooze_Alarm: 7\n";

    svc.run_until(input, std::future::pending()).await.unwrap();

    assert_eq!(
        acks(&console),
        vec![
            "First Alarm Request With Message Number 7",
            "Bad command",
            "Error: Incorrect format",
            "Error: Incorrect format",
            "Error: Incorrect format",
            "Bad command",
        ]
    );
    let kept = svc.table().get(MessageNumber::new(7).unwrap()).unwrap();
    assert_eq!(kept.message, "keep me");
    assert_eq!(svc.table().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn replacement_updates_in_place_and_is_displayed() {
    let (svc, console) = service(Config {
        linger: true,
        ..Config::default()
    });
    let input: &[u8] = b"Start_Alarm: 3 in=10s original\nReplace_Alarm: 3 in=2s updated\n";

    svc.run_until(input, std::future::pending()).await.unwrap();

    assert_eq!(
        acks(&console),
        vec![
            "First Alarm Request With Message Number 3",
            "Replacement Alarm Request With Message Number 3",
        ]
    );
    assert_eq!(console.count("Received"), 1);
    assert!(console.contains(
        "Display thread 3: Received Replacement Alarm With Message Number 3"
    ));
    assert!(console.contains(": in=2s updated"));
    assert!(!console.contains("original"));
}

#[tokio::test(start_paused = true)]
async fn linger_drains_every_partition() {
    let (svc, console) = service(Config {
        workers: 2,
        linger: true,
        ..Config::default()
    });
    let input: &[u8] = b"Start_Alarm: 1 in=3s one\n\
        Start_Alarm: 2 in=1s two\n\
        Start_Alarm: 3 in=2s three\n";

    svc.run_until(input, std::future::pending()).await.unwrap();

    // Worker 1 owns 1 and 3 and shows them in due order.
    let three = console.position("Display thread 1: Received Alarm With Message Number 3").unwrap();
    let one = console.position("Display thread 1: Received Alarm With Message Number 1").unwrap();
    assert!(three < one);
    assert!(console.contains("Display thread 2: Received Alarm With Message Number 2"));
    assert!(console.contains("Display thread exiting at time"));
    assert!(console.lines().iter().any(|l| l.ends_with(": thread 1")));
    assert!(console.lines().iter().any(|l| l.ends_with(": thread 2")));
    assert!(svc.table().is_empty());
    assert!(svc.table().running_workers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn worker_restarts_after_draining() {
    let (svc, console) = service(Config {
        workers: 1,
        linger: true,
        ..Config::default()
    });
    let (tx, rx) = tokio::io::duplex(256);
    let reader = tokio::io::BufReader::new(rx);

    let feeder = tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        let mut tx = tx;
        tx.write_all(b"Start_Alarm: 1 in=1s early\n").await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.write_all(b"Start_Alarm: 2 in=1s late\n").await.unwrap();
    });

    svc.run_until(reader, std::future::pending()).await.unwrap();
    feeder.await.unwrap();

    assert_eq!(console.count("Display thread exiting at time"), 2);
    let first_exit = console.position("exiting").unwrap();
    let late = console.position("Message Number 2 at").unwrap();
    assert!(first_exit < late);
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_stops_periodic_alarms() {
    let (svc, console) = service(Config {
        linger: true,
        ..Config::default()
    });
    let input: &[u8] = b"Start_Alarm: 4 every=1s tick\n";
    let shutdown = tokio::time::sleep(Duration::from_millis(3500));

    svc.run_until(input, shutdown).await.unwrap();

    assert_eq!(console.count("Received Alarm With Message Number 4"), 3);
    assert!(console.contains(": every=1s tick"));
    assert!(!console.contains("exiting"));
}

#[tokio::test(start_paused = true)]
async fn empty_input_with_zero_grace_stops_cleanly() {
    let (svc, _console) = service(Config {
        grace: Duration::ZERO,
        ..Config::default()
    });
    let input: &[u8] = b"";

    let result = svc.run_until(input, std::future::pending()).await;
    assert!(result.is_ok(), "unexpected {result:?}");
}

#[tokio::test(start_paused = true)]
async fn out_of_range_durations_are_rejected() {
    let (svc, console) = service(Config::default());
    let input: &[u8] = b"Start_Alarm: 1 in=18446744073709551615 hello\n\
        Replace_Alarm: 1 every=18446744073709551615ms hello\n\
        Start_Alarm: 2 in=1s ok\n\
        Start_Alarm: 3 in=3153600000 a century\n";

    svc.run_until(input, std::future::pending()).await.unwrap();

    assert_eq!(
        acks(&console),
        vec![
            "Error: Incorrect format",
            "Error: Incorrect format",
            "First Alarm Request With Message Number 2",
            "First Alarm Request With Message Number 3",
        ]
    );
    assert!(!svc.table().contains(MessageNumber::new(1).unwrap()));
}
