mod support;

use recordsync::list::{
    FetchError, ListMode, PageResponse, QueryChange, Record, SortDirection, SortSpec,
};
use recordsync::{CoreConfig, Event, Model, ScreenId};
use serde_json::json;
use support::{configure, ids, mount, records, resolve_delay, resolve_fetch, send, Tester};

fn calls() -> ScreenId {
    ScreenId::new("calls")
}

fn edit(app: &Tester, model: &mut Model, change: QueryChange) -> support::Effects {
    send(
        app,
        model,
        Event::QueryEdited {
            screen: calls(),
            change,
        },
    )
}

#[test]
fn mount_fetches_first_page_and_renders_loading() {
    let app = Tester::default();
    let mut model = Model::default();

    let effects = mount(&app, &mut model, "calls", "calls", &["records-changed"], 10);
    assert!(effects.renders > 0);
    let request = effects.single_fetch();
    let page = request.operation.request();
    assert_eq!(page.collection, "calls");
    assert_eq!((page.skip, page.limit), (0, 10));
    assert_eq!(page.to_query_string(), "skip=0&limit=10");

    let view = app.view(&model);
    let screen = view.screen(&calls()).expect("screen is mounted");
    assert!(screen.loading);
    assert!(screen.items.is_empty());
}

#[test]
fn full_page_then_short_page_settles_the_total() {
    let app = Tester::default();
    let mut model = Model::default();

    let mut request = mount(&app, &mut model, "calls", "calls", &[], 10).single_fetch();
    let effects = resolve_fetch(&app, &mut model, &mut request, Ok(PageResponse::new(records(0..10))));
    assert!(effects.renders > 0);

    let view = app.view(&model);
    let screen = view.screen(&calls()).unwrap();
    assert_eq!(screen.items.len(), 10);
    assert!(screen.has_more);
    assert!(!screen.total_is_exact);
    assert!(screen.displayed_total >= 11);
    assert_eq!(screen.total_label, "11+");

    let mut request = edit(&app, &mut model, QueryChange::Page(3)).single_fetch();
    assert_eq!(request.operation.request().skip, 20);
    resolve_fetch(&app, &mut model, &mut request, Ok(PageResponse::new(records(20..24))));

    let view = app.view(&model);
    let screen = view.screen(&calls()).unwrap();
    assert_eq!(screen.page_index, 3);
    assert!(screen.total_is_exact);
    assert_eq!(screen.displayed_total, 24);
    assert_eq!(screen.total_label, "24");
    assert!(!screen.has_more);
}

#[test]
fn slow_earlier_response_never_overwrites_a_later_query() {
    let app = Tester::default();
    let mut model = Model::default();

    let mut initial = mount(&app, &mut model, "calls", "calls", &[], 10).single_fetch();
    let mut first = edit(&app, &mut model, QueryChange::Search("a".into())).single_fetch();
    let mut second = edit(&app, &mut model, QueryChange::Search("ab".into())).single_fetch();
    assert_eq!(second.operation.request().search.as_deref(), Some("ab"));

    resolve_fetch(&app, &mut model, &mut second, Ok(PageResponse::new(records(100..102))));
    let late = resolve_fetch(&app, &mut model, &mut first, Ok(PageResponse::new(records(0..10))));
    let later = resolve_fetch(&app, &mut model, &mut initial, Ok(PageResponse::new(records(50..60))));
    assert_eq!(late.renders, 0);
    assert_eq!(later.renders, 0);

    let view = app.view(&model);
    let screen = view.screen(&calls()).unwrap();
    assert_eq!(ids(&screen.items), ["100", "101"]);
    assert_eq!(screen.search_text, "ab");
    assert!(!screen.loading);
}

#[test]
fn typed_search_is_debounced_to_the_last_value() {
    let app = Tester::default();
    let mut model = Model::default();
    mount(&app, &mut model, "calls", "calls", &[], 10);

    let mut delays = Vec::new();
    for text in ["j", "ja", "jan"] {
        let effects = send(
            &app,
            &mut model,
            Event::SearchTyped {
                screen: calls(),
                text: text.into(),
            },
        );
        assert!(effects.fetches.is_empty());
        assert_eq!(effects.delays.len(), 1);
        assert_eq!(effects.delays[0].operation.millis, 400);
        delays.extend(effects.delays);
    }
    assert_eq!(app.view(&model).screen(&calls()).unwrap().search_text, "jan");

    let mut last = delays.pop().unwrap();
    for mut stale in delays {
        let effects = resolve_delay(&app, &mut model, &mut stale, 1_000);
        assert!(effects.fetches.is_empty());
    }

    let request = resolve_delay(&app, &mut model, &mut last, 1_400).single_fetch();
    let page = request.operation.request();
    assert_eq!(page.search.as_deref(), Some("jan"));
    assert_eq!(page.skip, 0);
}

#[test]
fn filter_change_returns_to_first_page() {
    let app = Tester::default();
    let mut model = Model::default();
    mount(&app, &mut model, "calls", "calls", &[], 10);
    edit(&app, &mut model, QueryChange::Page(4));

    let request = edit(
        &app,
        &mut model,
        QueryChange::SetFilter {
            key: "status".into(),
            values: vec!["open".into(), "pending".into()],
        },
    )
    .single_fetch();
    assert_eq!(
        request.operation.request().to_query_string(),
        "skip=0&limit=10&status=open&status=pending"
    );
}

#[test]
fn failure_shows_error_with_empty_list_and_retry_recovers() {
    let app = Tester::default();
    let mut model = Model::default();

    let mut request = mount(&app, &mut model, "calls", "calls", &[], 10).single_fetch();
    resolve_fetch(&app, &mut model, &mut request, Ok(PageResponse::new(records(0..10))));
    let total = app.view(&model).screen(&calls()).unwrap().displayed_total;

    let mut request = edit(&app, &mut model, QueryChange::Page(2)).single_fetch();
    resolve_fetch(&app, &mut model, &mut request, Err(FetchError::network("offline")));

    let view = app.view(&model);
    let screen = view.screen(&calls()).unwrap();
    assert!(screen.items.is_empty());
    assert_eq!(screen.displayed_total, total);
    let error = screen.error.as_ref().expect("error is shown");
    assert!(error.is_retryable);
    assert_eq!(error.error_code, "NETWORK_ERROR");

    let mut request = send(&app, &mut model, Event::RetryRequested { screen: calls() }).single_fetch();
    assert_eq!(request.operation.request().skip, 10);
    resolve_fetch(&app, &mut model, &mut request, Ok(PageResponse::new(records(10..20))));
    let view = app.view(&model);
    let screen = view.screen(&calls()).unwrap();
    assert!(screen.error.is_none());
    assert_eq!(ids(&screen.items).first().map(String::as_str), Some("10"));
}

#[test]
fn sorted_view_is_built_from_a_snapshot() {
    let app = Tester::default();
    let mut model = Model::default();
    mount(&app, &mut model, "calls", "calls", &[], 10);

    let mut request = edit(
        &app,
        &mut model,
        QueryChange::Sort(Some(SortSpec::new("Duration", SortDirection::Desc))),
    )
    .single_fetch();
    let page = request.operation.request();
    assert_eq!((page.skip, page.limit), (0, 1000));
    assert_eq!(page.sort, None);

    let snapshot = vec![
        Record::from_pairs([("id", json!("two")), ("Duration", json!("2 minutes"))]),
        Record::from_pairs([("id", json!("ten")), ("Duration", json!("10 minutes"))]),
        Record::from_pairs([("id", json!("blank")), ("Duration", json!(""))]),
    ];
    resolve_fetch(&app, &mut model, &mut request, Ok(PageResponse::new(snapshot)));

    let view = app.view(&model);
    let screen = view.screen(&calls()).unwrap();
    assert_eq!(screen.mode, ListMode::ClientSortedSnapshot);
    assert_eq!(ids(&screen.items), ["ten", "two", "blank"]);
    assert_eq!(screen.total_label, "3");

    // Flipping direction re-sorts locally without a request.
    let effects = edit(
        &app,
        &mut model,
        QueryChange::ToggleSort {
            column: "Duration".into(),
        },
    );
    assert!(effects.fetches.is_empty());
    let view = app.view(&model);
    assert_eq!(ids(&view.screen(&calls()).unwrap().items), ["blank", "two", "ten"]);
}

#[test]
fn results_for_an_unmounted_screen_are_dropped() {
    let app = Tester::default();
    let mut model = Model::default();

    let mut request = mount(&app, &mut model, "calls", "calls", &["records-changed"], 10).single_fetch();
    send(&app, &mut model, Event::ScreenUnmounted { screen: calls() });
    assert!(model.screens.is_empty());

    let effects = resolve_fetch(&app, &mut model, &mut request, Ok(PageResponse::new(records(0..3))));
    assert!(effects.is_empty());
    assert!(app.view(&model).screens.is_empty());
}

#[test]
fn invalid_page_edit_is_rejected() {
    let app = Tester::default();
    let mut model = Model::default();
    mount(&app, &mut model, "calls", "calls", &[], 10);

    let effects = edit(&app, &mut model, QueryChange::Page(0));
    assert!(effects.is_empty());
    assert_eq!(app.view(&model).screen(&calls()).unwrap().page_index, 1);
}

#[test]
fn reconfigured_snapshot_cap_reaches_mounted_screens() {
    let app = Tester::default();
    let mut model = Model::default();
    mount(&app, &mut model, "calls", "calls", &[], 10);

    configure(
        &app,
        &mut model,
        CoreConfig {
            snapshot_cap: 200,
            ..CoreConfig::default()
        },
    );
    let request = edit(
        &app,
        &mut model,
        QueryChange::Sort(Some(SortSpec::new("Name", SortDirection::Asc))),
    )
    .single_fetch();
    assert_eq!(request.operation.request().limit, 200);
}
