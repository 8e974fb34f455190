//! End-to-end behaviour of a single poll cycle against scripted feeds.

use docketwatch_notify::Dispatcher;
use docketwatch_scout::poll::poll_source;
use docketwatch_scout::testing::{
    entry, feed, minute, watch, FailingSink, NumberedOnlySink, Recorded, RecordingSink,
    ScriptedFeeds,
};
use docketwatch_scout::watchlist::Watchlist;

fn watching_100() -> Watchlist {
    Watchlist::from_entries([watch("ilnd", 100, "")])
}

fn recording_dispatcher() -> (Dispatcher, Recorded) {
    let (sink, seen) = RecordingSink::new("recording");
    (Dispatcher::new(vec![Box::new(sink)]), seen)
}

#[tokio::test]
async fn no_op_cycle_returns_update_time_and_dispatches_nothing() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed(
        "ilnd",
        feed(
            Some(minute(30)),
            vec![
                entry(100).number(9).filed(minute(30)).build(),
                entry(100).number(8).filed(minute(10)).build(),
            ],
        ),
    );
    let (dispatcher, seen) = recording_dispatcher();

    let outcome = poll_source(&feeds, "ilnd", minute(30), &watching_100(), &dispatcher)
        .await
        .unwrap();

    assert_eq!(outcome.watermark, minute(30));
    assert!(!outcome.corrected);
    assert_eq!(outcome.dispatched, 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_feed_is_a_valid_cycle() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed("ilnd", feed(Some(minute(45)), vec![]));
    let (dispatcher, seen) = recording_dispatcher();

    let outcome = poll_source(&feeds, "ilnd", minute(0), &watching_100(), &dispatcher)
        .await
        .unwrap();

    assert_eq!(outcome.watermark, minute(45));
    assert_eq!(outcome.new_entries, 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn lying_update_time_is_replaced_by_newest_entry() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed(
        "ilnd",
        feed(
            Some(minute(10)),
            vec![entry(100).number(3).filed(minute(25)).build()],
        ),
    );
    let (dispatcher, seen) = recording_dispatcher();

    let outcome = poll_source(&feeds, "ilnd", minute(10), &watching_100(), &dispatcher)
        .await
        .unwrap();

    assert!(outcome.corrected);
    assert_eq!(outcome.claimed, Some(minute(10)));
    assert_eq!(outcome.watermark, minute(25));
    // the entry hidden behind the stale claim is still reported
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn entries_sharing_a_document_are_merged_without_repeats() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed(
        "ilnd",
        feed(
            Some(minute(30)),
            vec![
                entry(100).number(7).document("shared").title("A").filed(minute(30)).build(),
                entry(100).number(7).document("shared").title("B").filed(minute(29)).build(),
                entry(100).number(7).document("shared").title("A").filed(minute(28)).build(),
            ],
        ),
    );
    let (dispatcher, seen) = recording_dispatcher();

    let outcome = poll_source(&feeds, "ilnd", minute(0), &watching_100(), &dispatcher)
        .await
        .unwrap();

    assert_eq!(outcome.new_entries, 3);
    assert_eq!(outcome.dispatched, 1);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].title, "A // B");
    assert_eq!(seen[0].filed_at, minute(30));
}

#[tokio::test]
async fn unnumbered_entries_merge_on_docket_link() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed(
        "ilnd",
        feed(
            Some(minute(30)),
            vec![
                entry(100).title("Minute Entry").filed(minute(30)).build(),
                entry(100).title("Notice of Hearing").filed(minute(20)).build(),
            ],
        ),
    );
    let (dispatcher, seen) = recording_dispatcher();

    poll_source(&feeds, "ilnd", minute(0), &watching_100(), &dispatcher)
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].title, "Minute Entry // Notice of Hearing");
    assert_eq!(seen[0].link, seen[0].docket_link);
}

#[tokio::test]
async fn records_are_dispatched_oldest_first() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed(
        "ilnd",
        feed(
            Some(minute(30)),
            vec![
                entry(100).number(3).filed(minute(30)).build(),
                entry(100).number(2).filed(minute(20)).build(),
                entry(100).number(1).filed(minute(10)).build(),
            ],
        ),
    );
    let (dispatcher, seen) = recording_dispatcher();

    poll_source(&feeds, "ilnd", minute(5), &watching_100(), &dispatcher)
        .await
        .unwrap();

    let order: Vec<_> = seen.lock().unwrap().iter().map(|r| r.filed_at).collect();
    assert_eq!(order, vec![minute(10), minute(20), minute(30)]);
}

#[tokio::test]
async fn unnumbered_record_uses_sentinels_and_skips_keyed_sinks() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed(
        "ilnd",
        feed(
            Some(minute(30)),
            vec![entry(100).title("Minute Entry").filed(minute(30)).build()],
        ),
    );
    let (keyed, keyed_seen) = NumberedOnlySink::new();
    let (plain, plain_seen) = RecordingSink::new("plain");
    let dispatcher = Dispatcher::new(vec![Box::new(keyed), Box::new(plain)]);

    poll_source(&feeds, "ilnd", minute(0), &watching_100(), &dispatcher)
        .await
        .unwrap();

    assert!(keyed_seen.lock().unwrap().is_empty());
    let plain_seen = plain_seen.lock().unwrap();
    assert_eq!(plain_seen.len(), 1);
    assert_eq!(plain_seen[0].number, 0);
    assert_eq!(plain_seen[0].link, plain_seen[0].docket_link);
    assert!(!plain_seen[0].cross_reference().reliable);
}

#[tokio::test]
async fn failing_sink_does_not_stop_later_sinks_or_records() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed(
        "ilnd",
        feed(
            Some(minute(30)),
            vec![
                entry(100).number(2).filed(minute(30)).build(),
                entry(100).number(1).filed(minute(20)).build(),
            ],
        ),
    );
    let (first, first_seen) = RecordingSink::new("first");
    let (failing, attempts) = FailingSink::new();
    let (last, last_seen) = RecordingSink::new("last");
    let dispatcher = Dispatcher::new(vec![Box::new(first), Box::new(failing), Box::new(last)]);

    let outcome = poll_source(&feeds, "ilnd", minute(0), &watching_100(), &dispatcher)
        .await
        .unwrap();

    assert_eq!(*attempts.lock().unwrap(), 2);
    assert_eq!(first_seen.lock().unwrap().len(), 2);
    assert_eq!(last_seen.lock().unwrap().len(), 2);
    assert_eq!(outcome.partially_failed, 2);
    assert_eq!(outcome.watermark, minute(30));
}

#[tokio::test]
async fn only_watched_cases_are_reported_with_alias() {
    let feeds = ScriptedFeeds::new();
    feeds.push_feed(
        "ilnd",
        feed(
            Some(minute(30)),
            vec![
                entry(100).number(2).filed(minute(30)).build(),
                entry(555).number(9).filed(minute(25)).build(),
            ],
        ),
    );
    let watchlist = Watchlist::from_entries([watch("ilnd", 100, "Prenda v. Godfread")]);
    let (dispatcher, seen) = recording_dispatcher();

    let outcome = poll_source(&feeds, "ilnd", minute(0), &watchlist, &dispatcher)
        .await
        .unwrap();

    assert_eq!(outcome.new_entries, 2);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].pacer_num, 100);
    assert_eq!(seen[0].case_name, "Prenda v. Godfread");
    assert_eq!(seen[0].case, "1:13-cv-04341");
}
