//! # Callbacks and Clients
//!
//! Traces, notifiers and the clients that own them:
//!
//! - Trace masks, scopes and firing order
//! - Notifier delivery modes (immediate, when idle, foreign only)
//! - Re-entrant callbacks that modify the table they observe
//! - Callback failures reported to the owning client
//! - Client lifetime, attach and per-client keys

use datatable::{
    AxisKind, ClientOptions, ColumnType, ErrorKind, NotifyEvent, NotifyKind, NotifyMask,
    NotifyScope, Selector, Table, TableError, TraceEvent, TraceMask, TraceScope,
};
use parking_lot::Mutex;
use std::sync::Arc;

type Log<T> = Arc<Mutex<Vec<T>>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn trace_log(t: &Table, scope: TraceScope, mask: TraceMask) -> Log<(TraceMask, String)> {
    let log: Log<(TraceMask, String)> = Arc::default();
    let sink = Arc::clone(&log);
    t.create_trace(scope, mask, move |e: &TraceEvent| -> eyre::Result<()> {
        sink.lock()
            .push((e.mask, e.value.as_str().unwrap_or_default().to_string()));
        Ok(())
    })
    .unwrap();
    log
}

fn notify_log(t: &Table, scope: NotifyScope, mask: NotifyMask) -> Log<NotifyEvent> {
    let log: Log<NotifyEvent> = Arc::default();
    let sink = Arc::clone(&log);
    t.create_notifier(scope, mask, move |e: &NotifyEvent| -> eyre::Result<()> {
        sink.lock().push(e.clone());
        Ok(())
    })
    .unwrap();
    log
}

mod traces {
    use super::*;

    #[test]
    fn masks_filter_events() {
        init_logging();
        let t = Table::new("t");
        let c = t.create_column(None, ColumnType::String).unwrap();
        let r = t.create_row(None).unwrap();
        let writes = trace_log(&t, TraceScope::cell(r, c), TraceMask::WRITE);
        let unsets = trace_log(&t, TraceScope::column(c), TraceMask::UNSET);
        let reads = trace_log(&t, TraceScope::row(r), TraceMask::READ);

        t.set(r, c, "a").unwrap();
        t.set(r, c, "b").unwrap();
        t.get(r, c).unwrap();
        assert!(t.unset(r, c).unwrap());
        assert!(!t.unset(r, c).unwrap());

        assert_eq!(
            *writes.lock(),
            vec![
                (TraceMask::WRITE, "a".to_string()),
                (TraceMask::WRITE, "b".to_string())
            ]
        );
        assert_eq!(*reads.lock(), vec![(TraceMask::READ, "b".to_string())]);
        assert_eq!(*unsets.lock(), vec![(TraceMask::UNSET, "b".to_string())]);
    }

    #[test]
    fn create_fires_only_on_empty_cell() {
        let t = Table::new("t");
        let c = t.create_column(None, ColumnType::String).unwrap();
        let r = t.create_row(None).unwrap();
        let creates = trace_log(&t, TraceScope::cell(r, c), TraceMask::CREATE);
        t.set(r, c, "a").unwrap();
        t.set(r, c, "b").unwrap();
        t.unset(r, c).unwrap();
        t.set(r, c, "c").unwrap();
        assert_eq!(creates.lock().len(), 2);
    }

    #[test]
    fn tag_traces_follow_membership() {
        let t = Table::new("t");
        let c = t.create_column(None, ColumnType::String).unwrap();
        let rows = t.extend_rows(3);
        let log = trace_log(&t, TraceScope::row_tag("watched"), TraceMask::WRITE);

        t.set(rows[0], c, "before").unwrap();
        t.add_tag(AxisKind::Row, rows[0], "watched").unwrap();
        t.set(rows[0], c, "during").unwrap();
        t.remove_tag(AxisKind::Row, rows[0], "watched").unwrap();
        t.set(rows[0], c, "after").unwrap();

        let values: Vec<String> = log.lock().iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(values, vec!["during"]);
    }

    #[test]
    fn all_tag_scope_covers_new_rows() {
        let t = Table::new("t");
        let c = t.create_column(None, ColumnType::String).unwrap();
        let log = trace_log(
            &t,
            TraceScope::new(Selector::Tag("all".into()), Selector::Any),
            TraceMask::WRITE,
        );
        for r in t.extend_rows(3) {
            t.set(r, c, "x").unwrap();
        }
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn delete_trace_is_idempotent() {
        let t = Table::new("t");
        let c = t.create_column(None, ColumnType::String).unwrap();
        let id = t
            .create_trace(
                TraceScope::column(c),
                TraceMask::ALL,
                |_: &TraceEvent| -> eyre::Result<()> { Ok(()) },
            )
            .unwrap();
        let (scope, mask) = t.trace_info(id).unwrap();
        assert_eq!(scope, TraceScope::column(c));
        assert_eq!(mask, TraceMask::ALL);
        assert!(t.delete_trace(id));
        assert!(!t.delete_trace(id));
        let err = t.trace_info(id).unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::NotFound));
    }

    #[test]
    fn failing_callback_does_not_abort_write() {
        let t = Table::new("t");
        let c = t.create_column(None, ColumnType::String).unwrap();
        let r = t.create_row(None).unwrap();
        t.create_trace(
            TraceScope::column(c),
            TraceMask::WRITE,
            |_: &TraceEvent| -> eyre::Result<()> { eyre::bail!("rejected") },
        )
        .unwrap();
        let later = trace_log(&t, TraceScope::column(c), TraceMask::WRITE);

        t.set(r, c, "kept").unwrap();
        assert_eq!(t.get(r, c).unwrap().as_str(), Some("kept"));
        assert_eq!(later.lock().len(), 1);
        let errors = t.take_callback_errors();
        assert_eq!(errors.len(), 1);
        assert!(format!("{:#}", errors[0]).contains("rejected"));
        assert!(t.take_callback_errors().is_empty());
    }

    #[test]
    fn callbacks_may_write_back() {
        let t = Arc::new(Table::new("t"));
        let src = t.create_column(Some("src"), ColumnType::String).unwrap();
        let copy = t.create_column(Some("copy"), ColumnType::String).unwrap();
        let r = t.create_row(None).unwrap();
        let inner = Arc::downgrade(&t);
        t.create_trace(
            TraceScope::column(src),
            TraceMask::WRITE,
            move |e: &TraceEvent| -> eyre::Result<()> {
                if let Some(t) = inner.upgrade() {
                    t.set(e.row, copy, format!("{}!", e.value.as_str().unwrap_or_default()))?;
                }
                Ok(())
            },
        )
        .unwrap();

        t.set(r, src, "hi").unwrap();
        assert_eq!(t.get(r, copy).unwrap().as_str(), Some("hi!"));
        assert!(t.take_callback_errors().is_empty());
    }

    #[test]
    fn sibling_traces_see_writes() {
        let a = Table::new("t");
        let c = a.create_column(None, ColumnType::String).unwrap();
        let r = a.create_row(None).unwrap();
        let b = a.share(ClientOptions::new());
        let log = trace_log(&b, TraceScope::cell(r, c), TraceMask::WRITE);
        a.set(r, c, "from a").unwrap();
        assert_eq!(log.lock().len(), 1);
        drop(b);
        a.set(r, c, "again").unwrap();
        assert_eq!(log.lock().len(), 1);
    }
}

mod notifiers {
    use super::*;

    #[test]
    fn structural_events_in_order() {
        let t = Table::new("t");
        let log = notify_log(&t, NotifyScope::All, NotifyMask::ALL_EVENTS);
        let rows = t.extend_rows(3);
        let c = t.create_column(None, ColumnType::String).unwrap();
        t.move_rows(0, 1, rows[2], true).unwrap();
        t.delete_column(c).unwrap();

        let seen: Vec<(AxisKind, NotifyKind)> =
            log.lock().iter().map(|e| (e.axis, e.kind)).collect();
        assert_eq!(
            seen,
            vec![
                (AxisKind::Row, NotifyKind::Created),
                (AxisKind::Row, NotifyKind::Created),
                (AxisKind::Row, NotifyKind::Created),
                (AxisKind::Column, NotifyKind::Created),
                (AxisKind::Row, NotifyKind::Moved),
                (AxisKind::Row, NotifyKind::Moved),
                (AxisKind::Row, NotifyKind::Moved),
                (AxisKind::Column, NotifyKind::Deleted),
            ]
        );
    }

    #[test]
    fn labels_and_tags_are_not_structural() {
        let t = Table::new("t");
        let r = t.create_row(None).unwrap();
        let log = notify_log(&t, NotifyScope::All, NotifyMask::ALL_EVENTS);
        t.relabel(AxisKind::Row, r, "renamed").unwrap();
        t.add_tag(AxisKind::Row, r, "x").unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn when_idle_queues_until_flush() {
        let t = Table::new("t");
        let log = notify_log(
            &t,
            NotifyScope::All,
            NotifyMask::ROW_CREATED | NotifyMask::WHEN_IDLE,
        );
        let r = t.create_row(None).unwrap();
        t.create_row(None).unwrap();
        assert!(log.lock().is_empty());
        assert_eq!(t.pending_notifications(), 2);

        assert_eq!(t.flush_pending_notifications(), 2);
        assert_eq!(log.lock().len(), 2);
        assert_eq!(log.lock()[0].id, r);
        assert_eq!(t.pending_notifications(), 0);
        assert_eq!(t.flush_pending_notifications(), 0);
    }

    #[test]
    fn foreign_only_skips_own_changes() {
        let a = Table::new("t");
        let b = a.share(ClientOptions::new());
        let log = notify_log(
            &a,
            NotifyScope::All,
            NotifyMask::ROWS | NotifyMask::FOREIGN_ONLY,
        );
        a.create_row(None).unwrap();
        assert!(log.lock().is_empty());
        b.create_row(None).unwrap();
        assert_eq!(log.lock().len(), 1);
        assert_eq!(log.lock()[0].origin, b.id());
    }

    #[test]
    fn node_scope_retires_after_delete() {
        let t = Table::new("t");
        let rows = t.extend_rows(2);
        let log = notify_log(&t, NotifyScope::Row(rows[0]), NotifyMask::ROWS);
        let tagged = notify_log(&t, NotifyScope::RowTag("x".into()), NotifyMask::ROWS);
        t.add_tag(AxisKind::Row, rows[0], "x").unwrap();

        t.move_rows(1, 1, rows[0], false).unwrap();
        assert_eq!(log.lock().len(), 1);
        t.delete_row(rows[0]).unwrap();
        assert_eq!(
            log.lock().iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![NotifyKind::Moved, NotifyKind::Deleted]
        );
        assert_eq!(tagged.lock().len(), 2);
        assert_eq!(t.notifier_ids().len(), 1);
    }

    #[test]
    fn end_tag_scope_rejected() {
        let t = Table::new("t");
        let err = t
            .create_notifier(
                NotifyScope::RowTag("end".into()),
                NotifyMask::ROWS,
                |_: &NotifyEvent| -> eyre::Result<()> { Ok(()) },
            )
            .unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::ReservedTag));
    }
}

mod clients {
    use super::*;

    #[test]
    fn core_outlives_first_client() {
        let a = Table::new("shared");
        let r = a.create_row(Some("keep")).unwrap();
        let b = a.share(ClientOptions::new().with_name("viewer"));
        assert_eq!(a.client_count(), 2);
        assert_eq!(b.name(), "viewer");
        drop(a);
        assert_eq!(b.client_count(), 1);
        assert_eq!(b.row_label(r).unwrap(), "keep");
    }

    #[test]
    fn attach_drops_registrations() {
        let one = Table::new("one");
        let two = Table::new("two");
        let r = one.create_row(None).unwrap();
        let mut view = one.share(ClientOptions::new());
        view.create_notifier(
            NotifyScope::All,
            NotifyMask::ALL_EVENTS,
            |_: &NotifyEvent| -> eyre::Result<()> { Ok(()) },
        )
        .unwrap();
        view.create_trace(
            TraceScope::row(r),
            TraceMask::ALL,
            |_: &TraceEvent| -> eyre::Result<()> { Ok(()) },
        )
        .unwrap();

        view.attach(&two);
        assert!(view.shares_core_with(&two));
        assert!(view.notifier_ids().is_empty());
        assert!(view.trace_ids().is_empty());
        assert_eq!(one.client_count(), 1);
        assert_eq!(two.client_count(), 2);
    }

    #[test]
    fn empty_value_is_per_client() {
        let a = Table::new("t");
        let c = a.create_column(None, ColumnType::String).unwrap();
        let r = a.create_row(None).unwrap();
        let b = a.share(ClientOptions::new().with_empty_value("-"));
        assert_eq!(a.render(r, c).unwrap(), "");
        assert_eq!(b.render(r, c).unwrap(), "-");
        a.set(r, c, "v").unwrap();
        assert_eq!(b.render(r, c).unwrap(), "v");
    }

    #[test]
    fn keys_rebuild_after_changes() {
        let t = Table::new("t");
        let first = t.create_column(Some("first"), ColumnType::String).unwrap();
        let last = t.create_column(Some("last"), ColumnType::String).unwrap();
        let a = t.create_row(None).unwrap();
        t.set_row_values(a, ["Ada", "Lovelace"]).unwrap();
        t.set_keys(&[first, last]).unwrap();
        assert_eq!(t.find_by_key(&["Ada", "Lovelace"]).unwrap(), Some(a));

        let b = t.create_row(None).unwrap();
        t.set_row_values(b, ["Alan", "Turing"]).unwrap();
        assert_eq!(t.find_by_key(&["Alan", "Turing"]).unwrap(), Some(b));
        assert_eq!(t.find_by_key(&["Alan", ""]).unwrap(), None);

        let err = t.find_by_key(&["Alan"]).unwrap_err();
        assert!(TableError::kind_of(&err).is_none());
        t.delete_column(last).unwrap();
        assert_eq!(t.keys(), vec![first]);
    }
}
